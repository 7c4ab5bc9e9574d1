//! Aggregation utilities
//!
//! Statistics over a [`Dataset`](crate::dataset::Dataset) or a collection of datasets:
//! climatologies, area-weighted averages and subregion aggregates, along with the lat/lon
//! normalisation and time-unit decoding used when datasets are built.

pub mod climatology;
pub mod grid;
pub mod regional;
pub mod time_units;

pub use climatology::{
    calc_area_weighted_spatial_average, calc_climatology_monthly, calc_climatology_season,
    calc_climatology_year, calc_temporal_mean, calc_time_series, flatten_annual_to_monthly,
    reshape_monthly_to_annually,
};
pub use grid::normalize_lat_lon_values;
pub use regional::{
    calc_subregion_area_mean, calc_subregion_area_mean_and_std, SubregionMeans,
    SubregionStatistics,
};
pub use time_units::{decode_time_values, parse_time_base, parse_time_units, TimeUnit};

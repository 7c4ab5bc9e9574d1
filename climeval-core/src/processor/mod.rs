//! Dataset processor
//!
//! Composable transforms that bring heterogeneous datasets onto a common grid and time basis.
//! Every function borrows its input and returns a new [`Dataset`](crate::dataset::Dataset), except
//! where ownership of the inputs is taken to produce replacements (e.g. [`mask_missing_data`]).
//! Missing-value masks are propagated through every transform.

pub mod combine;
pub mod spatial;
pub mod temporal;
pub mod units;

pub use combine::{ensemble, mask_missing_data};
pub use spatial::{get_spatial_overlap, mask_outside, safe_subset, spatial_regrid, subset};
pub use temporal::{
    get_temporal_overlap, normalize_dataset_datetimes, temporal_rebin, temporal_subset, TimeStep,
};
pub use units::{
    temperature_unit_conversion, variable_unit_conversion, water_flux_unit_conversion,
};

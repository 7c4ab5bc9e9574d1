//! Dataset builders shared by the unit tests

use crate::dataset::Dataset;
use chrono::{NaiveDate, NaiveDateTime};
use ndarray::{Array1, Array3};

pub(crate) fn month(year: i32, month: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// `n` consecutive months starting January 2000
pub(crate) fn monthly_times(n: usize) -> Vec<NaiveDateTime> {
    (0..n)
        .map(|i| month(2000 + (i / 12) as i32, (i % 12) as u32 + 1))
        .collect()
}

/// A monthly dataset on an evenly spaced grid
pub(crate) fn monthly_dataset(values: Array3<f64>) -> Dataset {
    let (_, ny, nx) = values.dim();
    let lats = Array1::linspace(-45.0, 45.0, ny.max(1));
    let lons = Array1::linspace(-90.0, 90.0, nx.max(1));
    dataset(lats, lons, values)
}

/// A monthly dataset on the given grid
pub(crate) fn dataset(lats: Array1<f64>, lons: Array1<f64>, values: Array3<f64>) -> Dataset {
    let times = monthly_times(values.dim().0);
    Dataset::new(lats, lons, times, values, "tas").unwrap()
}

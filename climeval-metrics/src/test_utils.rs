//! Datasets shared by the metric tests

use chrono::NaiveDate;
use climeval_core::dataset::Dataset;
use ndarray::{Array, Array1, Array3};

/// A monthly dataset starting January 2000 on an evenly spaced grid
pub(crate) fn range_dataset(values: Array3<f64>) -> Dataset {
    let (nt, ny, nx) = values.dim();
    let times = (0..nt)
        .map(|i| {
            NaiveDate::from_ymd_opt(2000 + (i / 12) as i32, (i % 12) as u32 + 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        })
        .collect();
    let lats = Array1::linspace(-40.0, 40.0, ny);
    let lons = Array1::linspace(-80.0, 80.0, nx);
    Dataset::new(lats, lons, times, values, "tas").unwrap()
}

/// `range(300)` and `range(300, 600)` on a `[12, 5, 5]` grid
pub(crate) fn scenario_datasets() -> (Dataset, Dataset) {
    let reference = Array::range(0.0, 300.0, 1.0)
        .into_shape_with_order((12, 5, 5))
        .unwrap();
    let target = Array::range(300.0, 600.0, 1.0)
        .into_shape_with_order((12, 5, 5))
        .unwrap();
    (range_dataset(reference), range_dataset(target))
}

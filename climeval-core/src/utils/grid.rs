//! Latitude/longitude axis normalisation

use crate::errors::{EvalError, EvalResult};
use crate::masked::MaskedArray;
use ndarray::{Array1, Array2, Axis, Ix3};
use tracing::debug;

#[derive(Debug, PartialEq)]
enum Order {
    Ascending,
    Descending,
}

fn order_of(axis_name: &str, values: &Array1<f64>) -> EvalResult<Order> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(EvalError::Value(format!(
            "{} contain non-finite values",
            axis_name
        )));
    }
    let decreasing: Vec<bool> = values
        .windows(2)
        .into_iter()
        .map(|w| w[1] < w[0])
        .collect();
    if decreasing.iter().all(|d| *d) {
        Ok(Order::Descending)
    } else if decreasing.iter().any(|d| *d) {
        Err(EvalError::Value(format!("{} must be sorted", axis_name)))
    } else {
        Ok(Order::Ascending)
    }
}

/// Bring lat/lon axes (and the matching value axes) into canonical order
///
/// * Longitudes that are all greater than 180 are moved down by 360.
/// * A fully descending axis is reversed, together with the matching axis of `values`.
/// * Longitudes on a `[0, 360)` grid are shifted into `[-180, 180)` and the longitude axis of
///   `values` is rotated to match. A grid ending exactly at 180 is shifted too, unless it
///   also starts at -180.
///
/// Axes that are neither ascending nor fully descending are rejected.
/// Canonical input is returned unchanged.
pub fn normalize_lat_lon_values(
    lats: &Array1<f64>,
    lons: &Array1<f64>,
    values: &MaskedArray<Ix3>,
) -> EvalResult<(Array1<f64>, Array1<f64>, MaskedArray<Ix3>)> {
    let mut lons = lons.clone();
    if lons.iter().all(|l| *l > 180.0) {
        lons.mapv_inplace(|l| l - 360.0);
    }

    let lat_order = order_of("Latitudes", lats)?;
    let lon_order = order_of("Longitudes", &lons)?;

    let mut lats = lats.clone();
    let mut values = values.clone();

    // A single-element axis counts as descending and reversing it is a no-op
    if lat_order == Order::Descending && lats.len() > 1 {
        debug!("Reversing descending latitude axis");
        lats = lats.iter().rev().copied().collect();
        values = values.reversed(Axis(1));
    }
    if lon_order == Order::Descending && lons.len() > 1 {
        debug!("Reversing descending longitude axis");
        lons = lons.iter().rev().copied().collect();
        values = values.reversed(Axis(2));
    }

    let lon_min = lons.iter().cloned().fold(f64::INFINITY, f64::min);
    let lon_max = lons.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    // 180 maps onto -180 unless the grid already holds that meridian
    if lon_max > 180.0 || (lon_max == 180.0 && lon_min > -180.0) {
        let split = lons.iter().position(|l| *l >= 180.0).unwrap_or(lons.len());
        debug!(split, "Shifting longitudes from [0, 360) to [-180, 180)");
        let order: Vec<usize> = (split..lons.len()).chain(0..split).collect();
        lons = order
            .iter()
            .map(|i| if lons[*i] >= 180.0 { lons[*i] - 360.0 } else { lons[*i] })
            .collect();
        values = values.select(Axis(2), &order);
    }

    Ok((lats, lons, values))
}

/// Collapse 2-D `[Y, X]` coordinate arrays of a rectilinear grid to 1-D axes
///
/// Every row of `lats` must be constant and every column of `lons` must be constant.
pub fn collapse_meshgrid(
    lats: &Array2<f64>,
    lons: &Array2<f64>,
) -> EvalResult<(Array1<f64>, Array1<f64>)> {
    if lats.shape() != lons.shape() {
        return Err(EvalError::shape_mismatch(
            "meshgrid coordinates",
            lats.shape(),
            lons.shape(),
        ));
    }
    if lats.is_empty() {
        return Err(EvalError::Value("empty coordinate arrays".to_string()));
    }
    let lat_axis = lats.column(0).to_owned();
    let lon_axis = lons.row(0).to_owned();

    let rectilinear = lats
        .rows()
        .into_iter()
        .zip(lat_axis.iter())
        .all(|(row, lat)| row.iter().all(|v| v == lat))
        && lons
            .columns()
            .into_iter()
            .zip(lon_axis.iter())
            .all(|(col, lon)| col.iter().all(|v| v == lon));
    if !rectilinear {
        return Err(EvalError::Value(
            "2-D latitude/longitude arrays do not describe a rectilinear grid".to_string(),
        ));
    }
    Ok((lat_axis, lon_axis))
}

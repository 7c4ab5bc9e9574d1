//! Spatial transforms

use crate::bounds::{Bounds, MaskBounds, Rectangle};
use crate::dataset::Dataset;
use crate::errors::{EvalError, EvalResult};
use crate::masked::MaskedArray;
use ndarray::{Array1, Array3, Axis};
use tracing::{debug, warn};

fn indices_where<T>(values: impl Iterator<Item = T>, keep: impl Fn(&T) -> bool) -> Vec<usize> {
    values
        .enumerate()
        .filter(|(_, v)| keep(v))
        .map(|(i, _)| i)
        .collect()
}

/// Restrict `dataset` to `bounds`
///
/// For a [`Rectangle`] the result holds the latitudes, longitudes and times inside the closed
/// intervals of the rectangle; a rectangle without a time window keeps every time step.
/// For a [`MaskBounds`] the grid is cropped to the bounding box of the cells with an accepted
/// label and every non-accepted cell inside the crop is masked.
///
/// Fails with [`EvalError::Bounds`] when nothing of the dataset is left.
pub fn subset(bounds: &Bounds, dataset: &Dataset) -> EvalResult<Dataset> {
    match bounds {
        Bounds::Rectangle(rectangle) => subset_rectangle(rectangle, dataset),
        Bounds::Mask(mask) => subset_mask(mask, dataset),
    }
}

fn subset_rectangle(bounds: &Rectangle, dataset: &Dataset) -> EvalResult<Dataset> {
    let lat_idx = indices_where(dataset.lats().iter(), |lat| bounds.contains_lat(**lat));
    let lon_idx = indices_where(dataset.lons().iter(), |lon| bounds.contains_lon(**lon));
    let time_idx = indices_where(dataset.times().iter(), |t| bounds.contains_time(t));

    for (axis, indices) in [("latitude", &lat_idx), ("longitude", &lon_idx), ("time", &time_idx)] {
        if indices.is_empty() {
            return Err(EvalError::Bounds(format!(
                "{} does not intersect '{}' along the {} axis",
                bounds,
                dataset.name(),
                axis
            )));
        }
    }

    let values = dataset
        .values()
        .select(Axis(0), &time_idx)
        .select(Axis(1), &lat_idx)
        .select(Axis(2), &lon_idx);
    dataset.derive_with(
        dataset.lats().select(Axis(0), &lat_idx),
        dataset.lons().select(Axis(0), &lon_idx),
        time_idx.iter().map(|i| dataset.times()[*i]).collect(),
        values,
    )
}

fn subset_mask(bounds: &MaskBounds, dataset: &Dataset) -> EvalResult<Dataset> {
    let (nt, ny, nx) = dataset.shape();
    let selection = bounds.selection();
    if selection.shape() != [ny, nx] {
        return Err(EvalError::shape_mismatch(
            "mask bounds",
            &[ny, nx],
            selection.shape(),
        ));
    }

    let rows = indices_where(selection.rows().into_iter(), |row| row.iter().any(|s| *s));
    let cols = indices_where(selection.columns().into_iter(), |col| {
        col.iter().any(|s| *s)
    });
    let (lat_idx, lon_idx): (Vec<usize>, Vec<usize>) =
        match (rows.first(), rows.last(), cols.first(), cols.last()) {
            (Some(y0), Some(y1), Some(x0), Some(x1)) => {
                ((*y0..=*y1).collect(), (*x0..=*x1).collect())
            }
            _ => {
                return Err(EvalError::Bounds(format!(
                    "mask '{}' does not select any cell of '{}'",
                    bounds.variable(),
                    dataset.name()
                )))
            }
        };

    let cropped = selection.select(Axis(0), &lat_idx).select(Axis(1), &lon_idx);
    let outside = Array3::from_shape_fn((nt, lat_idx.len(), lon_idx.len()), |(_, y, x)| {
        !cropped[[y, x]]
    });
    let values = dataset
        .values()
        .select(Axis(1), &lat_idx)
        .select(Axis(2), &lon_idx)
        .apply_mask(&outside)?;

    dataset.derive_with(
        dataset.lats().select(Axis(0), &lat_idx),
        dataset.lons().select(Axis(0), &lon_idx),
        dataset.times().to_vec(),
        values,
    )
}

/// Clip `bounds` to the domain of `dataset` before subsetting
///
/// Useful when a region is specified more generously than the data covers.
pub fn safe_subset(bounds: &Rectangle, dataset: &Dataset) -> EvalResult<Dataset> {
    let extent = dataset.spatial_boundaries();
    let (start, end) = dataset.time_range();

    let lat_min = bounds.lat_min().max(extent.lat_min);
    let lat_max = bounds.lat_max().min(extent.lat_max);
    let lon_min = bounds.lon_min().max(extent.lon_min);
    let lon_max = bounds.lon_max().min(extent.lon_max);
    if lat_min > lat_max || lon_min > lon_max {
        return Err(EvalError::Bounds(format!(
            "{} lies outside the domain of '{}'",
            bounds,
            dataset.name()
        )));
    }

    let clipped = match (bounds.start(), bounds.end()) {
        (Some(s), Some(e)) => {
            let (s, e) = (s.max(start), e.min(end));
            if s > e {
                return Err(EvalError::Bounds(format!(
                    "{} lies outside the time range of '{}'",
                    bounds,
                    dataset.name()
                )));
            }
            Rectangle::with_time(lat_min, lat_max, lon_min, lon_max, s, e)?
        }
        _ => Rectangle::new(lat_min, lat_max, lon_min, lon_max)?,
    };
    if &clipped != bounds {
        warn!(
            dataset = %dataset.name(),
            requested = %bounds,
            clipped = %clipped,
            "Bounds clipped to the dataset domain"
        );
    }
    subset_rectangle(&clipped, dataset)
}

/// Mask every cell and time step of `dataset` outside `bounds`, keeping the full grid
pub fn mask_outside(bounds: &Rectangle, dataset: &Dataset) -> EvalResult<Dataset> {
    let lats = dataset.lats();
    let lons = dataset.lons();
    let times = dataset.times();
    let outside = Array3::from_shape_fn(dataset.shape(), |(t, y, x)| {
        !(bounds.contains_time(&times[t])
            && bounds.contains_lat(lats[y])
            && bounds.contains_lon(lons[x]))
    });
    let values = dataset.values().apply_mask(&outside)?;
    dataset.clone().with_values(values)
}

/// Bracketing indices and the weight of the upper one, `None` outside the axis
fn bracket(axis: &Array1<f64>, target: f64) -> Option<(usize, usize, f64)> {
    let last = axis.len() - 1;
    if target < axis[0] || target > axis[last] {
        return None;
    }
    let upper = axis.iter().position(|v| *v >= target)?;
    if upper == 0 {
        return Some((0, 0, 0.0));
    }
    let lower = upper - 1;
    let span = axis[upper] - axis[lower];
    let weight = if span > 0.0 {
        (target - axis[lower]) / span
    } else {
        0.0
    };
    Some((lower, upper, weight))
}

fn check_target_axis(name: &str, axis: &Array1<f64>) -> EvalResult<()> {
    if axis.is_empty() {
        return Err(EvalError::Value(format!("new {} axis is empty", name)));
    }
    if axis.iter().any(|v| !v.is_finite()) || axis.windows(2).into_iter().any(|w| w[1] <= w[0]) {
        return Err(EvalError::Value(format!(
            "new {} axis must be finite and strictly ascending",
            name
        )));
    }
    Ok(())
}

/// Minimum share of the interpolation weight that must come from valid source cells
const MIN_VALID_WEIGHT: f64 = 0.5;

/// Bilinearly interpolate `dataset` onto a new lat/lon grid
///
/// Target points outside the source grid are masked. Masked source cells drop out of the
/// interpolation and the weights of the remaining corners are renormalised, provided the valid
/// corners carry at least half of the total weight; otherwise the target point is masked.
pub fn spatial_regrid(
    dataset: &Dataset,
    new_lats: &Array1<f64>,
    new_lons: &Array1<f64>,
) -> EvalResult<Dataset> {
    check_target_axis("latitude", new_lats)?;
    check_target_axis("longitude", new_lons)?;

    let lat_brackets: Vec<_> = new_lats.iter().map(|v| bracket(dataset.lats(), *v)).collect();
    let lon_brackets: Vec<_> = new_lons.iter().map(|v| bracket(dataset.lons(), *v)).collect();

    let source = dataset.values();
    let data = source.data();
    let mask = source.mask();
    let (nt, _, _) = dataset.shape();

    let regridded = Array3::from_shape_fn((nt, new_lats.len(), new_lons.len()), |(t, y, x)| {
        let ((y0, y1, wy), (x0, x1, wx)) = match (lat_brackets[y], lon_brackets[x]) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return None,
        };
        let corners = [
            (y0, x0, (1.0 - wy) * (1.0 - wx)),
            (y0, x1, (1.0 - wy) * wx),
            (y1, x0, wy * (1.0 - wx)),
            (y1, x1, wy * wx),
        ];
        let (total, weight) = corners
            .iter()
            .filter(|(cy, cx, _)| !mask[[t, *cy, *cx]])
            .fold((0.0, 0.0), |(total, weight), (cy, cx, w)| {
                (total + w * data[[t, *cy, *cx]], weight + w)
            });
        (weight >= MIN_VALID_WEIGHT).then(|| total / weight)
    });
    let values = MaskedArray::from_options(regridded);
    debug!(
        dataset = %dataset.name(),
        from = ?(dataset.lats().len(), dataset.lons().len()),
        to = ?(new_lats.len(), new_lons.len()),
        masked = values.len() - values.count(),
        "Regridded dataset"
    );

    dataset.derive_with(
        new_lats.clone(),
        new_lons.clone(),
        dataset.times().to_vec(),
        values,
    )
}

/// The lat/lon rectangle covered by every dataset
pub fn get_spatial_overlap(datasets: &[Dataset]) -> EvalResult<Rectangle> {
    let mut extents = datasets.iter().map(|d| d.spatial_boundaries());
    let mut overlap = extents
        .next()
        .ok_or_else(|| EvalError::Value("at least one dataset is required".to_string()))?;
    for extent in extents {
        overlap.lat_min = overlap.lat_min.max(extent.lat_min);
        overlap.lat_max = overlap.lat_max.min(extent.lat_max);
        overlap.lon_min = overlap.lon_min.max(extent.lon_min);
        overlap.lon_max = overlap.lon_max.min(extent.lon_max);
    }
    if overlap.lat_min > overlap.lat_max || overlap.lon_min > overlap.lon_max {
        return Err(EvalError::Bounds(
            "datasets do not overlap spatially".to_string(),
        ));
    }
    Rectangle::new(
        overlap.lat_min,
        overlap.lat_max,
        overlap.lon_min,
        overlap.lon_max,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{dataset, month};
    use is_close::is_close;
    use ndarray::{array, Array2, Array3};

    fn grid() -> Dataset {
        // value = 10 * y + x on a 5x5 one-degree grid
        dataset(
            Array1::range(0.0, 5.0, 1.0),
            Array1::range(0.0, 5.0, 1.0),
            Array3::from_shape_fn((3, 5, 5), |(t, y, x)| (100 * t + 10 * y + x) as f64),
        )
    }

    #[test]
    fn subset_rectangle_intersects() {
        let ds = grid();
        let bounds = Bounds::spatial(1.0, 2.5, 3.0, 10.0).unwrap();
        let sub = subset(&bounds, &ds).unwrap();
        assert_eq!(sub.lats(), &array![1.0, 2.0]);
        assert_eq!(sub.lons(), &array![3.0, 4.0]);
        assert_eq!(sub.shape(), (3, 2, 2));
        assert_eq!(sub.values().get([1, 0, 0]), Some(113.0));
    }

    #[test]
    fn subset_time_window() {
        let ds = grid();
        let bounds =
            Bounds::spatio_temporal(0.0, 4.0, 0.0, 4.0, month(2000, 2), month(2000, 6)).unwrap();
        let sub = subset(&bounds, &ds).unwrap();
        assert_eq!(sub.times(), &[month(2000, 2), month(2000, 3)]);
    }

    #[test]
    fn subset_outside_domain_fails() {
        let ds = grid();
        let bounds = Bounds::spatial(-40.0, -20.0, 0.0, 4.0).unwrap();
        assert!(matches!(subset(&bounds, &ds), Err(EvalError::Bounds(_))));
    }

    #[test]
    fn subset_is_idempotent_with_enclosing_bounds() {
        let ds = grid();
        let inner = Bounds::spatial(1.0, 3.0, 1.0, 3.0).unwrap();
        let outer = Bounds::spatial(-10.0, 10.0, -10.0, 10.0).unwrap();
        let once = subset(&inner, &ds).unwrap();
        let twice = subset(&outer, &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn subset_mask_crops_and_masks() {
        let ds = grid();
        let mut labels = Array2::zeros((5, 5));
        labels[[1, 1]] = 3;
        labels[[2, 3]] = 3;
        labels[[2, 2]] = 4;
        let bounds = Bounds::from_mask("region", labels, vec![3]).unwrap();
        let sub = subset(&bounds, &ds).unwrap();
        assert_eq!(sub.lats(), &array![1.0, 2.0]);
        assert_eq!(sub.lons(), &array![1.0, 2.0, 3.0]);
        assert_eq!(sub.values().get([0, 0, 0]), Some(11.0));
        assert_eq!(sub.values().get([0, 1, 2]), Some(23.0));
        assert!(sub.values().is_masked([0, 1, 1]));
        assert_eq!(sub.values().count(), 3 * 2);

        let wrong = Bounds::from_mask("region", Array2::ones((2, 2)), vec![1]).unwrap();
        assert!(matches!(
            subset(&wrong, &ds),
            Err(EvalError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn safe_subset_clips() {
        let ds = grid();
        let bounds = Rectangle::new(-50.0, 2.0, 3.0, 50.0).unwrap();
        let sub = safe_subset(&bounds, &ds).unwrap();
        assert_eq!(sub.lats(), &array![0.0, 1.0, 2.0]);
        assert_eq!(sub.lons(), &array![3.0, 4.0]);
    }

    #[test]
    fn mask_outside_keeps_grid() {
        let ds = grid();
        let bounds = Rectangle::new(0.0, 1.0, 0.0, 0.0).unwrap();
        let masked = mask_outside(&bounds, &ds).unwrap();
        assert_eq!(masked.shape(), ds.shape());
        assert_eq!(masked.values().count(), 3 * 2);
    }

    #[test]
    fn regrid_interpolates_linear_field() {
        let ds = grid();
        let out = spatial_regrid(&ds, &array![0.5, 2.25], &array![1.5, 4.0]).unwrap();
        assert_eq!(out.shape(), (3, 2, 2));
        assert!(is_close!(out.values().get([0, 0, 0]).unwrap(), 6.5));
        assert!(is_close!(out.values().get([2, 1, 1]).unwrap(), 226.5));
    }

    #[test]
    fn regrid_masks_outside_points() {
        let ds = grid();
        let out = spatial_regrid(&ds, &array![-1.0, 2.0], &array![2.0]).unwrap();
        assert!(out.values().is_masked([0, 0, 0]));
        assert_eq!(out.values().get([0, 1, 0]), Some(22.0));
    }

    #[test]
    fn regrid_respects_mask() {
        let mut values = Array3::from_elem((1, 2, 2), 1.0);
        values[[0, 0, 0]] = f64::NAN;
        let ds = dataset(array![0.0, 1.0], array![0.0, 1.0], values);
        let out = spatial_regrid(&ds, &array![0.0, 0.5, 1.0], &array![0.0, 0.5]).unwrap();
        // on the masked node
        assert!(out.values().is_masked([0, 0, 0]));
        // three of four corners valid
        assert_eq!(out.values().get([0, 1, 1]), Some(1.0));
        // half of the weight valid
        assert_eq!(out.values().get([0, 0, 1]), Some(1.0));
        assert_eq!(out.values().get([0, 2, 0]), Some(1.0));
    }

    #[test]
    fn regrid_requires_ascending_axes() {
        let ds = grid();
        assert!(spatial_regrid(&ds, &array![2.0, 1.0], &array![1.0]).is_err());
        assert!(spatial_regrid(&ds, &Array1::zeros(0), &array![1.0]).is_err());
    }

    #[test]
    fn spatial_overlap() {
        let a = grid();
        let b = dataset(
            array![2.0, 3.0, 8.0],
            array![-3.0, 1.0],
            Array3::zeros((1, 3, 2)),
        );
        let overlap = get_spatial_overlap(&[a, b]).unwrap();
        assert_eq!(
            (overlap.lat_min(), overlap.lat_max(), overlap.lon_min(), overlap.lon_max()),
            (2.0, 4.0, 0.0, 1.0)
        );
    }
}

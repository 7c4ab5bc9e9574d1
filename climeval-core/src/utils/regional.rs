//! Subregion aggregation
//!
//! Grid cells are assigned to named [`Subregion`]s by testing their lat/lon against each
//! subregion's rectangle. The assignment is returned as a `[Y, X]` label grid where `0` marks an
//! unassigned cell and `i` the `(i - 1)`-th subregion. Where subregions overlap the later one
//! wins.

use crate::bounds::Subregion;
use crate::dataset::Dataset;
use crate::errors::{EvalError, EvalResult};
use crate::masked::{mean, std, MaskedArray};
use ndarray::{Array2, Array3, Ix2, Ix3};
use serde::{Deserialize, Serialize};

/// Mean of each subregion at every time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubregionMeans {
    /// `[time, subregion]`
    pub means: MaskedArray<Ix2>,
    /// `[lat, lon]` subregion membership, `0` for unassigned cells
    pub labels: Array2<usize>,
}

/// Mean and population standard deviation of each subregion for several datasets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubregionStatistics {
    /// `[dataset, time, subregion]`
    pub means: MaskedArray<Ix3>,
    /// `[dataset, time, subregion]`
    pub stds: MaskedArray<Ix3>,
    /// `[lat, lon]` subregion membership, `0` for unassigned cells
    pub labels: Array2<usize>,
}

/// Label each grid cell of `dataset` with the subregion containing it
pub fn subregion_labels(dataset: &Dataset, subregions: &[Subregion]) -> Array2<usize> {
    let lats = dataset.lats();
    let lons = dataset.lons();
    let mut labels = Array2::zeros((lats.len(), lons.len()));
    for (i, subregion) in subregions.iter().enumerate() {
        let bounds = &subregion.bounds;
        for ((y, x), label) in labels.indexed_iter_mut() {
            if bounds.contains_lat(lats[y]) && bounds.contains_lon(lons[x]) {
                *label = i + 1;
            }
        }
    }
    labels
}

/// Valid values of each subregion, per time step: `[time][subregion] -> values`
fn collect_regions(dataset: &Dataset, labels: &Array2<usize>, n_regions: usize) -> Vec<Vec<Vec<f64>>> {
    let values = dataset.values();
    values
        .data()
        .outer_iter()
        .zip(values.mask().outer_iter())
        .map(|(step, mask)| {
            let mut regions = vec![Vec::new(); n_regions];
            for ((index, v), m) in step.indexed_iter().zip(mask.iter()) {
                let label = labels[index];
                if label > 0 && !*m {
                    regions[label - 1].push(*v);
                }
            }
            regions
        })
        .collect()
}

fn check_subregions(subregions: &[Subregion]) -> EvalResult<()> {
    if subregions.is_empty() {
        return Err(EvalError::Configuration(
            "at least one subregion is required".to_string(),
        ));
    }
    Ok(())
}

/// Area mean of every subregion at every time step
///
/// Subregions that contain no valid cell at a time step are masked.
pub fn calc_subregion_area_mean(
    dataset: &Dataset,
    subregions: &[Subregion],
) -> EvalResult<SubregionMeans> {
    check_subregions(subregions)?;
    let labels = subregion_labels(dataset, subregions);
    let per_step = collect_regions(dataset, &labels, subregions.len());
    let means = Array2::from_shape_fn((per_step.len(), subregions.len()), |(t, r)| {
        mean(&per_step[t][r])
    });
    Ok(SubregionMeans {
        means: MaskedArray::from_options(means),
        labels,
    })
}

/// Area mean and population standard deviation of every subregion for each dataset
///
/// All datasets must share the shape of the first one; the label grid is derived from it.
pub fn calc_subregion_area_mean_and_std(
    datasets: &[Dataset],
    subregions: &[Subregion],
) -> EvalResult<SubregionStatistics> {
    check_subregions(subregions)?;
    let first = datasets
        .first()
        .ok_or_else(|| EvalError::Value("at least one dataset is required".to_string()))?;
    let (nt, ny, nx) = first.shape();
    for dataset in datasets.iter().skip(1) {
        let (t, y, x) = dataset.shape();
        if (t, y, x) != (nt, ny, nx) {
            return Err(EvalError::shape_mismatch(
                "subregion statistics",
                &[nt, ny, nx],
                &[t, y, x],
            ));
        }
    }

    let labels = subregion_labels(first, subregions);
    let nr = subregions.len();
    let shape = (datasets.len(), nt, nr);
    let mut means = Array3::from_elem(shape, None);
    let mut stds = Array3::from_elem(shape, None);
    for (d, dataset) in datasets.iter().enumerate() {
        for (t, regions) in collect_regions(dataset, &labels, nr).iter().enumerate() {
            for (r, values) in regions.iter().enumerate() {
                means[[d, t, r]] = mean(values);
                stds[[d, t, r]] = std(values, 0);
            }
        }
    }

    Ok(SubregionStatistics {
        means: MaskedArray::from_options(means),
        stds: MaskedArray::from_options(stds),
        labels,
    })
}

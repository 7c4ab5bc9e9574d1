//! Operations over several datasets sharing a grid and time axis

use crate::dataset::Dataset;
use crate::errors::{EvalError, EvalResult};
use crate::masked::MaskedArray;
use ndarray::{Array3, Axis, Ix3, Zip};

pub const ENSEMBLE_NAME: &str = "Dataset Ensemble";

fn check_same_shape(context: &str, datasets: &[Dataset]) -> EvalResult<()> {
    if let Some(first) = datasets.first() {
        let (t, y, x) = first.shape();
        for dataset in &datasets[1..] {
            let (ot, oy, ox) = dataset.shape();
            if (ot, oy, ox) != (t, y, x) {
                return Err(EvalError::shape_mismatch(
                    context,
                    &[t, y, x],
                    &[ot, oy, ox],
                ));
            }
        }
    }
    Ok(())
}

/// Element-wise mean of datasets on the same grid and time axis
///
/// A cell of the ensemble is masked only where every member is masked. Grid and times are taken
/// from the first member.
pub fn ensemble(datasets: &[Dataset]) -> EvalResult<Dataset> {
    let first = datasets
        .first()
        .ok_or_else(|| EvalError::Value("an ensemble needs at least one dataset".to_string()))?;
    check_same_shape("ensemble", datasets)?;

    let members: Vec<MaskedArray<Ix3>> = datasets.iter().map(|d| d.values().clone()).collect();
    let values = MaskedArray::stack(Axis(0), &members)?.mean_axis(Axis(0));

    Ok(first
        .derive_with(
            first.lats().clone(),
            first.lons().clone(),
            first.times().to_vec(),
            values,
        )?
        .with_name(ENSEMBLE_NAME))
}

/// Apply the union of all missing-value masks to every dataset
///
/// Afterwards every dataset has the same mask, so statistics computed jointly over them use
/// the same set of cells.
pub fn mask_missing_data(datasets: Vec<Dataset>) -> EvalResult<Vec<Dataset>> {
    check_same_shape("mask missing data", &datasets)?;
    if datasets.is_empty() {
        return Ok(datasets);
    }

    let mut union: Array3<bool> = datasets[0].values().mask().clone();
    for dataset in &datasets[1..] {
        Zip::from(&mut union)
            .and(dataset.values().mask())
            .for_each(|u, m| *u = *u || *m);
    }

    datasets
        .into_iter()
        .map(|dataset| {
            let values = dataset.values().apply_mask(&union)?;
            dataset.with_values(values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::monthly_dataset;
    use ndarray::{array, Array3};

    #[test]
    fn ensemble_mean_ignores_masked_members() {
        let a = monthly_dataset(Array3::from_elem((2, 1, 2), 1.0));
        let mut values = Array3::from_elem((2, 1, 2), 3.0);
        values[[0, 0, 0]] = f64::NAN;
        let b = monthly_dataset(values);

        let mean = ensemble(&[a, b]).unwrap();
        assert_eq!(mean.name(), ENSEMBLE_NAME);
        assert_eq!(mean.values().get([0, 0, 0]), Some(1.0));
        assert_eq!(mean.values().get([0, 0, 1]), Some(2.0));
    }

    #[test]
    fn ensemble_masks_when_all_members_masked() {
        let a = monthly_dataset(array![[[f64::NAN]]]);
        let b = monthly_dataset(array![[[f64::NAN]]]);
        assert!(ensemble(&[a, b]).unwrap().values().is_masked([0, 0, 0]));
    }

    #[test]
    fn ensemble_errors() {
        assert!(matches!(ensemble(&[]), Err(EvalError::Value(_))));
        let a = monthly_dataset(Array3::zeros((2, 1, 2)));
        let b = monthly_dataset(Array3::zeros((3, 1, 2)));
        assert!(matches!(
            ensemble(&[a, b]),
            Err(EvalError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn masks_are_unioned() {
        let mut va = Array3::zeros((2, 2, 2));
        va[[0, 0, 0]] = f64::NAN;
        let mut vb = Array3::ones((2, 2, 2));
        vb[[1, 1, 1]] = f64::NAN;
        let a = monthly_dataset(va);
        let b = monthly_dataset(vb);
        let expected = Zip::from(a.values().mask())
            .and(b.values().mask())
            .map_collect(|x, y| *x || *y);

        let masked = mask_missing_data(vec![a, b]).unwrap();
        assert_eq!(masked.len(), 2);
        assert_eq!(masked[0].values().mask(), &expected);
        assert_eq!(masked[1].values().mask(), &expected);
        assert_eq!(masked[1].values().count(), 6);
    }
}

//! Masked arrays
//!
//! Gridded observations and model output routinely contain missing cells (ocean cells of a land
//! product, gaps in a satellite record, fill values written by a model). [`MaskedArray`] pairs a
//! value array with a boolean mask of the same shape where `true` marks a missing element.
//!
//! Every reduction in this module skips masked elements. A reduction lane with no valid element
//! produces a masked result rather than a `NaN`.
//!
//! ```rust
//! use climeval_core::masked::MaskedArray;
//! use ndarray::{array, Axis};
//!
//! let values = MaskedArray::from_data(array![[1.0, f64::NAN], [3.0, 4.0]]);
//! assert_eq!(values.count(), 3);
//!
//! let column_means = values.mean_axis(Axis(0));
//! assert_eq!(column_means.get(0), Some(2.0));
//! assert_eq!(column_means.get(1), Some(4.0));
//! ```

use crate::errors::{EvalError, EvalResult};
use ndarray::{
    Array, ArrayView, Axis, Dimension, IntoDimension, IxDyn, NdIndex, RemoveAxis, Zip,
};
use serde::{Deserialize, Serialize};

/// Value stored under masked elements produced by reductions
pub const FILL_VALUE: f64 = 0.0;

/// An array of `f64` values with an element-wise missing-value mask
///
/// Deserialisation goes through [`MaskedArray::new`], so the shape check applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawMaskedArray<D>", into = "RawMaskedArray<D>")]
#[serde(bound(
    serialize = "D: Dimension + Serialize",
    deserialize = "D: Dimension + Deserialize<'de>"
))]
pub struct MaskedArray<D: Dimension> {
    data: Array<f64, D>,
    mask: Array<bool, D>,
}

#[derive(Serialize, Deserialize)]
#[serde(bound(
    serialize = "D: Dimension + Serialize",
    deserialize = "D: Dimension + Deserialize<'de>"
))]
struct RawMaskedArray<D: Dimension> {
    data: Array<f64, D>,
    mask: Array<bool, D>,
}

impl<D: Dimension> TryFrom<RawMaskedArray<D>> for MaskedArray<D> {
    type Error = EvalError;

    fn try_from(raw: RawMaskedArray<D>) -> Result<Self, Self::Error> {
        MaskedArray::new(raw.data, raw.mask)
    }
}

/// Masked elements are written as [`FILL_VALUE`]
impl<D: Dimension> From<MaskedArray<D>> for RawMaskedArray<D> {
    fn from(m: MaskedArray<D>) -> Self {
        let data = Zip::from(&m.data)
            .and(&m.mask)
            .map_collect(|v, masked| if *masked { FILL_VALUE } else { *v });
        RawMaskedArray { data, mask: m.mask }
    }
}

impl<D: Dimension> MaskedArray<D> {
    /// Pair `data` with an explicit `mask`
    ///
    /// Non-finite values are masked in addition to the supplied mask.
    pub fn new(data: Array<f64, D>, mask: Array<bool, D>) -> EvalResult<Self> {
        if data.shape() != mask.shape() {
            return Err(EvalError::shape_mismatch(
                "masked array",
                data.shape(),
                mask.shape(),
            ));
        }
        let mask = Zip::from(&data)
            .and(&mask)
            .map_collect(|v, m| *m || !v.is_finite());
        Ok(Self { data, mask })
    }

    /// Wrap `data`, masking every non-finite element
    pub fn from_data(data: Array<f64, D>) -> Self {
        let mask = data.mapv(|v| !v.is_finite());
        Self { data, mask }
    }

    /// Build a masked array from optional values, `None` becoming a masked element
    pub fn from_options(values: Array<Option<f64>, D>) -> Self {
        let data = values.mapv(|v| v.unwrap_or(FILL_VALUE));
        let mask = values.mapv(|v| v.is_none());
        Self { data, mask }
    }

    pub fn data(&self) -> &Array<f64, D> {
        &self.data
    }

    pub fn mask(&self) -> &Array<bool, D> {
        &self.mask
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn raw_dim(&self) -> D {
        self.data.raw_dim()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_parts(self) -> (Array<f64, D>, Array<bool, D>) {
        (self.data, self.mask)
    }

    /// The value at `index`, or `None` if it is masked or out of bounds
    pub fn get<I: NdIndex<D> + Copy>(&self, index: I) -> Option<f64> {
        match (self.data.get(index), self.mask.get(index)) {
            (Some(v), Some(false)) => Some(*v),
            _ => None,
        }
    }

    pub fn is_masked<I: NdIndex<D> + Copy>(&self, index: I) -> bool {
        self.mask.get(index).copied().unwrap_or(true)
    }

    /// Number of valid (unmasked) elements
    pub fn count(&self) -> usize {
        self.mask.iter().filter(|m| !**m).count()
    }

    /// Valid values in logical order
    pub fn compressed(&self) -> Vec<f64> {
        self.data
            .iter()
            .zip(self.mask.iter())
            .filter(|(_, m)| !**m)
            .map(|(v, _)| *v)
            .collect()
    }

    /// Mean over all valid elements
    pub fn mean(&self) -> Option<f64> {
        mean(&self.compressed())
    }

    /// Standard deviation over all valid elements with `ddof` delta degrees of freedom
    pub fn std(&self, ddof: usize) -> Option<f64> {
        std(&self.compressed(), ddof)
    }

    pub fn sum(&self) -> f64 {
        self.compressed().iter().sum()
    }

    /// Apply `f` to every element, keeping the mask
    ///
    /// Elements whose result is not finite are masked.
    pub fn mapv<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        let data = self.data.mapv(f);
        let mask = Zip::from(&data)
            .and(&self.mask)
            .map_collect(|v, m| *m || !v.is_finite());
        Self { data, mask }
    }

    /// Combine two arrays element-wise
    ///
    /// The result is masked wherever either operand is masked. Operands must have the same shape.
    pub fn zip_with<F>(&self, other: &MaskedArray<D>, context: &str, f: F) -> EvalResult<Self>
    where
        F: Fn(f64, f64) -> f64,
    {
        if self.shape() != other.shape() {
            return Err(EvalError::shape_mismatch(
                context,
                self.shape(),
                other.shape(),
            ));
        }
        let data = Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|a, b| f(*a, *b));
        let mask = Zip::from(&data)
            .and(&self.mask)
            .and(&other.mask)
            .map_collect(|v, a, b| *a || *b || !v.is_finite());
        Ok(Self { data, mask })
    }

    /// Mask every element that is masked in `self` or set in `mask`
    pub fn apply_mask(&self, mask: &Array<bool, D>) -> EvalResult<Self> {
        if self.shape() != mask.shape() {
            return Err(EvalError::shape_mismatch(
                "apply mask",
                self.shape(),
                mask.shape(),
            ));
        }
        let mask = Zip::from(&self.mask)
            .and(mask)
            .map_collect(|a, b| *a || *b);
        Ok(Self {
            data: self.data.clone(),
            mask,
        })
    }

    /// Select `indices` along `axis`
    pub fn select(&self, axis: Axis, indices: &[usize]) -> Self
    where
        D: RemoveAxis,
    {
        Self {
            data: self.data.select(axis, indices),
            mask: self.mask.select(axis, indices),
        }
    }

    /// Reverse the order of `axis`
    pub fn reversed(&self, axis: Axis) -> Self
    where
        D: RemoveAxis,
    {
        let indices: Vec<usize> = (0..self.data.len_of(axis)).rev().collect();
        self.select(axis, &indices)
    }

    /// The sub-array at `index` along `axis`
    pub fn index_axis(&self, axis: Axis, index: usize) -> MaskedArray<D::Smaller>
    where
        D: RemoveAxis,
    {
        MaskedArray {
            data: self.data.index_axis(axis, index).to_owned(),
            mask: self.mask.index_axis(axis, index).to_owned(),
        }
    }

    /// Reinterpret the elements, in logical order, with a new shape
    pub fn into_shape<E>(self, shape: E) -> EvalResult<MaskedArray<E::Dim>>
    where
        E: IntoDimension,
    {
        let dim = shape.into_dimension();
        let data = Array::from_shape_vec(dim.clone(), self.data.iter().copied().collect())
            .map_err(|e| EvalError::Shape(e.to_string()))?;
        let mask = Array::from_shape_vec(dim, self.mask.iter().copied().collect())
            .map_err(|e| EvalError::Shape(e.to_string()))?;
        Ok(MaskedArray { data, mask })
    }

    pub fn into_dyn(self) -> MaskedArray<IxDyn> {
        MaskedArray {
            data: self.data.into_dyn(),
            mask: self.mask.into_dyn(),
        }
    }

    /// Reduce each lane along `axis` with `f`, which receives only the valid values of the lane
    pub fn reduce_axis<F>(&self, axis: Axis, f: F) -> MaskedArray<D::Smaller>
    where
        D: RemoveAxis,
        F: Fn(&[f64]) -> Option<f64>,
    {
        let reduced = Zip::from(self.data.lanes(axis))
            .and(self.mask.lanes(axis))
            .map_collect(|values, mask| {
                let valid: Vec<f64> = values
                    .iter()
                    .zip(mask.iter())
                    .filter(|(_, m)| !**m)
                    .map(|(v, _)| *v)
                    .collect();
                f(&valid)
            });
        MaskedArray::from_options(reduced)
    }

    /// Mean along `axis`, ignoring masked elements
    pub fn mean_axis(&self, axis: Axis) -> MaskedArray<D::Smaller>
    where
        D: RemoveAxis,
    {
        self.reduce_axis(axis, mean)
    }

    /// Standard deviation along `axis`, ignoring masked elements
    pub fn std_axis(&self, axis: Axis, ddof: usize) -> MaskedArray<D::Smaller>
    where
        D: RemoveAxis,
    {
        self.reduce_axis(axis, |values| std(values, ddof))
    }

    /// Number of valid elements along `axis`
    pub fn count_axis(&self, axis: Axis) -> Array<usize, D::Smaller>
    where
        D: RemoveAxis,
    {
        self.mask.map_axis(axis, |lane| lane.iter().filter(|m| !**m).count())
    }

    /// Stack arrays of equal shape along a new `axis`
    pub fn stack(axis: Axis, arrays: &[MaskedArray<D>]) -> EvalResult<MaskedArray<D::Larger>>
    where
        D::Larger: RemoveAxis,
    {
        let data: Vec<ArrayView<f64, D>> = arrays.iter().map(|a| a.data.view()).collect();
        let mask: Vec<ArrayView<bool, D>> = arrays.iter().map(|a| a.mask.view()).collect();
        let data = ndarray::stack(axis, &data).map_err(|e| EvalError::Shape(e.to_string()))?;
        let mask = ndarray::stack(axis, &mask).map_err(|e| EvalError::Shape(e.to_string()))?;
        Ok(MaskedArray { data, mask })
    }

    /// Join arrays along an existing `axis`
    pub fn concatenate(axis: Axis, arrays: &[MaskedArray<D>]) -> EvalResult<MaskedArray<D>>
    where
        D: RemoveAxis,
    {
        let data: Vec<ArrayView<f64, D>> = arrays.iter().map(|a| a.data.view()).collect();
        let mask: Vec<ArrayView<bool, D>> = arrays.iter().map(|a| a.mask.view()).collect();
        let data =
            ndarray::concatenate(axis, &data).map_err(|e| EvalError::Shape(e.to_string()))?;
        let mask =
            ndarray::concatenate(axis, &mask).map_err(|e| EvalError::Shape(e.to_string()))?;
        Ok(MaskedArray { data, mask })
    }
}

/// Masks must agree and unmasked values must be equal; values under the mask are ignored.
impl<D: Dimension> PartialEq for MaskedArray<D> {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape()
            && self.mask == other.mask
            && Zip::from(&self.data)
                .and(&other.data)
                .and(&self.mask)
                .all(|a, b, m| *m || a == b)
    }
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Standard deviation with `ddof` delta degrees of freedom
///
/// `None` when fewer than `ddof + 1` values are available.
pub fn std(values: &[f64], ddof: usize) -> Option<f64> {
    if values.len() <= ddof {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - ddof) as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3, Ix1, Ix2};

    #[test]
    fn non_finite_values_are_masked() {
        let a = MaskedArray::from_data(array![1.0, f64::NAN, f64::INFINITY, 4.0]);
        assert_eq!(a.count(), 2);
        assert_eq!(a.compressed(), vec![1.0, 4.0]);
        assert_eq!(a.get(1), None);
        assert_eq!(a.get(3), Some(4.0));
    }

    #[test]
    fn deserialising_checks_the_mask_shape() {
        let a = MaskedArray::from_data(array![1.0, f64::NAN, 3.0]);
        let json = serde_json::to_string(&a).unwrap();
        let parsed: MaskedArray<Ix1> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, a);

        let bad = r#"{"data":{"v":1,"dim":[2],"data":[1.0,2.0]},"mask":{"v":1,"dim":[1],"data":[false]}}"#;
        assert!(serde_json::from_str::<MaskedArray<Ix1>>(bad).is_err());
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let result = MaskedArray::new(array![1.0, 2.0], array![false]);
        assert!(matches!(result, Err(EvalError::ShapeMismatch { .. })));
    }

    #[test]
    fn mean_axis_skips_masked() {
        let a = MaskedArray::new(
            array![[1.0, 2.0], [3.0, 100.0], [5.0, 6.0]],
            array![[false, false], [false, true], [false, false]],
        )
        .unwrap();
        let m = a.mean_axis(Axis(0));
        assert_eq!(m.data(), &array![3.0, 4.0]);
        assert_eq!(m.count(), 2);
    }

    #[test]
    fn fully_masked_lane_is_masked() {
        let a = MaskedArray::new(array![[1.0, 2.0], [3.0, 4.0]], array![[true, false], [true, false]])
            .unwrap();
        let m = a.mean_axis(Axis(0));
        assert!(m.is_masked(0));
        assert_eq!(m.get(1), Some(3.0));
    }

    #[test]
    fn std_with_ddof() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(std(&values, 0), Some(2.0));
        assert!(std(&[1.0], 1).is_none());
    }

    #[test]
    fn zip_with_unions_masks() {
        let a = MaskedArray::new(array![1.0, 2.0, 3.0], array![true, false, false]).unwrap();
        let b = MaskedArray::new(array![1.0, 2.0, 3.0], array![false, false, true]).unwrap();
        let c = a.zip_with(&b, "test", |x, y| x + y).unwrap();
        assert_eq!(c.mask(), &array![true, false, true]);
        assert_eq!(c.get(1), Some(4.0));

        let d = MaskedArray::from_data(array![1.0, 2.0]);
        assert!(a.zip_with(&d, "test", |x, y| x + y).is_err());
    }

    #[test]
    fn equality_ignores_masked_values() {
        let a = MaskedArray::new(array![1.0, 2.0], array![false, true]).unwrap();
        let b = MaskedArray::new(array![1.0, 99.0], array![false, true]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reshape_keeps_logical_order() {
        let a = MaskedArray::from_data(Array3::from_shape_fn((4, 1, 1), |(t, _, _)| t as f64));
        let b = a.clone().into_shape((2, 2)).unwrap();
        assert_eq!(b.data(), &array![[0.0, 1.0], [2.0, 3.0]]);
        let c: MaskedArray<Ix2> = a.reversed(Axis(0)).into_shape((2, 2)).unwrap();
        assert_eq!(c.data(), &array![[3.0, 2.0], [1.0, 0.0]]);
    }
}

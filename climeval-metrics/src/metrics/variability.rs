//! Spread of values over time and space

use super::check_shapes;
use climeval_core::dataset::Dataset;
use climeval_core::errors::EvalResult;
use climeval_core::masked::MaskedArray;
use climeval_core::metric::{BinaryMetric, MetricValue, UnaryMetric};
use ndarray::{Axis, Dimension, Ix2};
use serde::{Deserialize, Serialize};

/// Sample standard deviation over time, `[Y, X]`
///
/// Cells with fewer than two valid time steps are masked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalStdDev {}

impl TemporalStdDev {
    pub fn calculate(&self, target: &Dataset) -> MaskedArray<Ix2> {
        target.values().std_axis(Axis(0), 1)
    }
}

#[typetag::serde]
impl UnaryMetric for TemporalStdDev {
    fn name(&self) -> &str {
        "TemporalStdDev"
    }

    fn run(&self, target: &Dataset) -> EvalResult<MetricValue> {
        Ok(self.calculate(target).into())
    }
}

/// Ratio of the population standard deviation of the target to that of the reference
///
/// Both deviations are taken over every valid cell in time and space.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StdDevRatio {}

impl StdDevRatio {
    pub fn calculate(&self, reference: &Dataset, target: &Dataset) -> EvalResult<f64> {
        check_shapes(self.name(), reference, target)?;
        Ok(std_ratio(reference.values(), target.values()))
    }
}

#[typetag::serde]
impl BinaryMetric for StdDevRatio {
    fn name(&self) -> &str {
        "StdDevRatio"
    }

    fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
        Ok(self.calculate(reference, target)?.into())
    }
}

/// NaN when either array has no valid cells
pub(crate) fn std_ratio<D: Dimension>(
    reference: &MaskedArray<D>,
    target: &MaskedArray<D>,
) -> f64 {
    match (reference.std(0), target.std(0)) {
        (Some(r), Some(t)) => t / r,
        _ => f64::NAN,
    }
}

//! Differences between a target and a reference dataset

use super::check_shapes;
use climeval_core::dataset::Dataset;
use climeval_core::errors::EvalResult;
use climeval_core::masked::MaskedArray;
use climeval_core::metric::{BinaryMetric, MetricValue};
use ndarray::{Axis, Ix2, Ix3};
use serde::{Deserialize, Serialize};

/// Element-wise `reference - target`
///
/// The result keeps the `[T, Y, X]` shape of the inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bias {}

impl Bias {
    pub fn calculate(
        &self,
        reference: &Dataset,
        target: &Dataset,
    ) -> EvalResult<MaskedArray<Ix3>> {
        check_shapes(self.name(), reference, target)?;
        reference
            .values()
            .zip_with(target.values(), self.name(), |r, t| r - t)
    }
}

#[typetag::serde]
impl BinaryMetric for Bias {
    fn name(&self) -> &str {
        "Bias"
    }

    fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
        Ok(self.calculate(reference, target)?.into())
    }
}

/// Time mean of `reference - target`, `[Y, X]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeanBias {
    /// Take the absolute value of each difference before averaging
    #[serde(default)]
    pub absolute: bool,
}

impl MeanBias {
    pub fn absolute() -> Self {
        Self { absolute: true }
    }

    pub fn calculate(
        &self,
        reference: &Dataset,
        target: &Dataset,
    ) -> EvalResult<MaskedArray<Ix2>> {
        let diff = Bias {}.calculate(reference, target)?;
        Ok(time_mean(diff, self.absolute))
    }
}

#[typetag::serde]
impl BinaryMetric for MeanBias {
    fn name(&self) -> &str {
        "MeanBias"
    }

    fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
        Ok(self.calculate(reference, target)?.into())
    }
}

/// Time mean of `target - reference`, `[Y, X]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalMeanBias {
    #[serde(default)]
    pub absolute: bool,
}

impl TemporalMeanBias {
    pub fn calculate(
        &self,
        reference: &Dataset,
        target: &Dataset,
    ) -> EvalResult<MaskedArray<Ix2>> {
        check_shapes(self.name(), reference, target)?;
        let diff = target
            .values()
            .zip_with(reference.values(), self.name(), |t, r| t - r)?;
        Ok(time_mean(diff, self.absolute))
    }
}

#[typetag::serde]
impl BinaryMetric for TemporalMeanBias {
    fn name(&self) -> &str {
        "TemporalMeanBias"
    }

    fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
        Ok(self.calculate(reference, target)?.into())
    }
}

fn time_mean(diff: MaskedArray<Ix3>, absolute: bool) -> MaskedArray<Ix2> {
    let diff = if absolute { diff.mapv(f64::abs) } else { diff };
    diff.mean_axis(Axis(0))
}

use super::check_shapes;
use climeval_core::dataset::Dataset;
use climeval_core::errors::EvalResult;
use climeval_core::metric::{BinaryMetric, MetricValue};
use serde::{Deserialize, Serialize};

/// Root mean square of `target - reference` over time and space
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RmsError {}

impl RmsError {
    pub fn calculate(&self, reference: &Dataset, target: &Dataset) -> EvalResult<f64> {
        check_shapes(self.name(), reference, target)?;
        let squared = target
            .values()
            .zip_with(reference.values(), self.name(), |t, r| (t - r).powi(2))?;
        Ok(squared.mean().map_or(f64::NAN, f64::sqrt))
    }
}

#[typetag::serde]
impl BinaryMetric for RmsError {
    fn name(&self) -> &str {
        "RmsError"
    }

    fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
        Ok(self.calculate(reference, target)?.into())
    }
}

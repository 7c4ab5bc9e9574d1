mod bias;
pub mod correlation;
mod rms;
mod variability;

pub use bias::{Bias, MeanBias, TemporalMeanBias};
pub use correlation::{
    PatternCorrelation, SeasonalPatternCorrelation, SpatialPatternTaylorDiagram,
    TemporalCorrelation, TemporalCorrelationResult,
};
pub use rms::RmsError;
pub use variability::{StdDevRatio, TemporalStdDev};

use climeval_core::dataset::Dataset;
use climeval_core::errors::{EvalError, EvalResult};

/// Binary metrics compare datasets cell by cell and never broadcast
fn check_shapes(metric: &str, reference: &Dataset, target: &Dataset) -> EvalResult<()> {
    let (rt, ry, rx) = reference.shape();
    let (tt, ty, tx) = target.shape();
    if (rt, ry, rx) != (tt, ty, tx) {
        return Err(EvalError::shape_mismatch(
            metric,
            &[rt, ry, rx],
            &[tt, ty, tx],
        ));
    }
    Ok(())
}

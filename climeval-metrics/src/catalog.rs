//! Lookup of the standard metrics by name

use crate::metrics::{
    Bias, MeanBias, PatternCorrelation, RmsError, SeasonalPatternCorrelation,
    SpatialPatternTaylorDiagram, StdDevRatio, TemporalCorrelation, TemporalMeanBias,
    TemporalStdDev,
};
use climeval_core::errors::{EvalError, EvalResult};
use climeval_core::metric::Metric;

pub const METRIC_NAMES: &[&str] = &[
    "Bias",
    "MeanBias",
    "TemporalMeanBias",
    "TemporalStdDev",
    "StdDevRatio",
    "PatternCorrelation",
    "SpatialPatternTaylorDiagram",
    "SeasonalPatternCorrelation",
    "RmsError",
    "TemporalCorrelation",
];

/// A default-configured instance of the named metric
pub fn metric_from_name(name: &str) -> EvalResult<Metric> {
    let metric = match name {
        "Bias" => Metric::binary(Bias::default()),
        "MeanBias" => Metric::binary(MeanBias::default()),
        "TemporalMeanBias" => Metric::binary(TemporalMeanBias::default()),
        "TemporalStdDev" => Metric::unary(TemporalStdDev::default()),
        "StdDevRatio" => Metric::binary(StdDevRatio::default()),
        "PatternCorrelation" => Metric::binary(PatternCorrelation::default()),
        "SpatialPatternTaylorDiagram" => Metric::binary(SpatialPatternTaylorDiagram::default()),
        "SeasonalPatternCorrelation" => Metric::binary(SeasonalPatternCorrelation::default()),
        "RmsError" => Metric::binary(RmsError::default()),
        "TemporalCorrelation" => Metric::binary(TemporalCorrelation::default()),
        _ => {
            return Err(EvalError::Configuration(format!(
                "unknown metric '{}', expected one of {:?}",
                name, METRIC_NAMES
            )))
        }
    };
    Ok(metric)
}

/// Metrics for a list of names, in order
pub fn metrics_from_names<S: AsRef<str>>(names: &[S]) -> EvalResult<Vec<Metric>> {
    names.iter().map(|n| metric_from_name(n.as_ref())).collect()
}

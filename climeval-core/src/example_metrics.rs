#![allow(dead_code)]

//! Minimal metrics used to exercise the evaluation driver

use crate::dataset::Dataset;
use crate::errors::{EvalError, EvalResult};
use crate::metric::{BinaryMetric, MetricValue, UnaryMetric};
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// Element-wise `reference - target`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Difference {}

#[typetag::serde]
impl BinaryMetric for Difference {
    fn name(&self) -> &str {
        "Difference"
    }

    fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
        let diff = reference
            .values()
            .zip_with(target.values(), "difference", |r, t| r - t)?;
        Ok(diff.into())
    }
}

/// Mean over the time axis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct TimeMean {}

#[typetag::serde]
impl UnaryMetric for TimeMean {
    fn name(&self) -> &str {
        "TimeMean"
    }

    fn run(&self, target: &Dataset) -> EvalResult<MetricValue> {
        Ok(target.values().mean_axis(Axis(0)).into())
    }
}

/// Always fails
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Failing {}

#[typetag::serde]
impl BinaryMetric for Failing {
    fn name(&self) -> &str {
        "Failing"
    }

    fn run(&self, _reference: &Dataset, _target: &Dataset) -> EvalResult<MetricValue> {
        Err(EvalError::Value("this metric always fails".to_string()))
    }
}

//! Metric contract
//!
//! A metric is a unit of comparison logic applied by the [`Evaluation`](crate::evaluation::Evaluation)
//! driver. Metrics come in two capabilities:
//!
//! - [`UnaryMetric`]: a statistic of a single dataset, e.g. the temporal standard deviation
//! - [`BinaryMetric`]: a comparison of a target dataset against a reference, e.g. the bias
//!
//! Both traits are object safe and serialisable through `typetag`, so a list of metrics can be
//! read from configuration. Options such as `absolute` live on the concrete metric struct.
//!
//! Metrics must be deterministic and must not broadcast: inputs of incompatible shape are
//! rejected with [`EvalError::ShapeMismatch`](crate::errors::EvalError::ShapeMismatch).
//!
//! # Implementing a metric
//!
//! ```rust
//! use climeval_core::dataset::Dataset;
//! use climeval_core::errors::EvalResult;
//! use climeval_core::metric::{BinaryMetric, MetricValue};
//! use serde::{Deserialize, Serialize};
//!
//! /// Difference of the overall means
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! pub struct MeanDifference {}
//!
//! #[typetag::serde]
//! impl BinaryMetric for MeanDifference {
//!     fn name(&self) -> &str {
//!         "MeanDifference"
//!     }
//!
//!     fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
//!         let reference = reference.values().mean().unwrap_or(f64::NAN);
//!         let target = target.values().mean().unwrap_or(f64::NAN);
//!         Ok(MetricValue::Scalar(target - reference))
//!     }
//! }
//! ```

use crate::dataset::Dataset;
use crate::errors::EvalResult;
use crate::masked::MaskedArray;
use ndarray::{Dimension, IxDyn};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Result of a single metric evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    Scalar(f64),
    Scalars(Vec<f64>),
    Field(MaskedArray<IxDyn>),
    Fields(Vec<MaskedArray<IxDyn>>),
}

impl MetricValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MetricValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_scalars(&self) -> Option<&[f64]> {
        match self {
            MetricValue::Scalars(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&MaskedArray<IxDyn>> {
        match self {
            MetricValue::Field(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_fields(&self) -> Option<&[MaskedArray<IxDyn>]> {
        match self {
            MetricValue::Fields(v) => Some(v),
            _ => None,
        }
    }

    /// Shape of the value, empty for a scalar
    pub fn shape(&self) -> Vec<usize> {
        match self {
            MetricValue::Scalar(_) => vec![],
            MetricValue::Scalars(v) => vec![v.len()],
            MetricValue::Field(f) => f.shape().to_vec(),
            MetricValue::Fields(f) => {
                let mut shape = vec![f.len()];
                if let Some(first) = f.first() {
                    shape.extend_from_slice(first.shape());
                }
                shape
            }
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Scalar(value)
    }
}

impl<D: Dimension> From<MaskedArray<D>> for MetricValue {
    fn from(value: MaskedArray<D>) -> Self {
        MetricValue::Field(value.into_dyn())
    }
}

/// A statistic of a single dataset
#[typetag::serde(tag = "type")]
pub trait UnaryMetric: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, target: &Dataset) -> EvalResult<MetricValue>;
}

/// A comparison of a target dataset against a reference
#[typetag::serde(tag = "type")]
pub trait BinaryMetric: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue>;
}

/// A metric of either capability
///
/// Serialised with a `kind` tag (`unary` or `binary`) next to the metric's own `type` tag:
///
/// ```toml
/// kind = "binary"
/// type = "MeanBias"
/// absolute = true
/// ```
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Metric {
    Unary(Box<dyn UnaryMetric>),
    Binary(Box<dyn BinaryMetric>),
}

impl Metric {
    pub fn unary(metric: impl UnaryMetric + 'static) -> Self {
        Metric::Unary(Box::new(metric))
    }

    pub fn binary(metric: impl BinaryMetric + 'static) -> Self {
        Metric::Binary(Box::new(metric))
    }

    pub fn name(&self) -> &str {
        match self {
            Metric::Unary(m) => m.name(),
            Metric::Binary(m) => m.name(),
        }
    }

    pub fn is_unary(&self) -> bool {
        matches!(self, Metric::Unary(_))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Metric::Binary(_))
    }

    /// Apply the metric to a (reference, target) pair
    ///
    /// Unary metrics only see the target.
    pub fn evaluate(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
        match self {
            Metric::Unary(m) => m.run(target),
            Metric::Binary(m) => m.run(reference, target),
        }
    }
}

//! Alignment and evaluation of gridded climate model output against observations
//!
//! This crate bundles [`climeval_core`] (datasets, processing, evaluation driver) with the
//! standard metrics of [`climeval_metrics`].
//!
//! ```rust
//! use climeval::prelude::*;
//! use climeval::chrono::NaiveDate;
//! use climeval::ndarray::{Array1, Array3};
//!
//! let times: Vec<_> = (1..=3)
//!     .map(|m| NaiveDate::from_ymd_opt(2000, m, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
//!     .collect();
//! let lats = Array1::from(vec![-10.0, 10.0]);
//! let lons = Array1::from(vec![0.0, 10.0]);
//! let reference = Dataset::new(lats.clone(), lons.clone(), times.clone(), Array3::zeros((3, 2, 2)), "tas")?;
//! let target = Dataset::new(lats, lons, times, Array3::ones((3, 2, 2)), "tas")?;
//!
//! let mut evaluation = Evaluation::new(reference, vec![target], vec![Metric::binary(MeanBias::default())]);
//! let results = evaluation.run()?;
//! let mean_bias = results.get(0, 0, None).and_then(MetricValue::as_field).unwrap();
//! assert_eq!(mean_bias.mean(), Some(-1.0));
//! # Ok::<(), climeval::prelude::EvalError>(())
//! ```

pub mod pipeline;

pub use chrono;
pub use climeval_core as core;
pub use climeval_metrics as metrics;
pub use ndarray;

pub mod prelude {
    pub use crate::pipeline::evaluation_from_config;
    pub use climeval_core::bounds::{Bounds, Rectangle, Subregion};
    pub use climeval_core::config::EvaluationConfig;
    pub use climeval_core::dataset::{Dataset, TimeResolution};
    pub use climeval_core::errors::{EvalError, EvalResult};
    pub use climeval_core::evaluation::{Evaluation, EvaluationSettings, ResultGrid};
    pub use climeval_core::loader::{LoaderOptions, LoaderRegistry, LoaderRequest};
    pub use climeval_core::masked::MaskedArray;
    pub use climeval_core::metric::{BinaryMetric, Metric, MetricValue, UnaryMetric};
    pub use climeval_metrics::catalog::{metric_from_name, metrics_from_names};
    pub use climeval_metrics::metrics::*;
}

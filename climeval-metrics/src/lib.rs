//! Standard metrics for comparing gridded climate datasets
//!
//! Every metric implements [`UnaryMetric`](climeval_core::metric::UnaryMetric) or
//! [`BinaryMetric`](climeval_core::metric::BinaryMetric) and is registered with `typetag`, so it
//! can be named in an evaluation configuration:
//!
//! ```toml
//! [[metrics]]
//! kind = "binary"
//! type = "MeanBias"
//! absolute = true
//! ```

pub mod catalog;
pub mod metrics;
pub mod statistics;

#[cfg(test)]
mod test_utils;

//! Core of the climate model evaluation framework
//!
//! Gridded [`Dataset`](dataset::Dataset)s are processed (subset, rebinned, regridded, converted)
//! by the [`processor`] functions, summarised by the [`utils`] aggregations and compared by
//! [`metric`]s that an [`Evaluation`](evaluation::Evaluation) applies across targets and
//! subregions.

pub mod bounds;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod loader;
pub mod masked;
pub mod metric;
pub mod processor;
pub mod utils;

pub mod errors;

#[cfg(test)]
mod example_metrics;
#[cfg(test)]
mod test_utils;

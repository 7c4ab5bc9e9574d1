//! Evaluation configuration
//!
//! An evaluation can be described in TOML:
//!
//! ```toml
//! [settings]
//! parallel = true
//!
//! [[metrics]]
//! kind = "binary"
//! type = "MeanBias"
//! absolute = true
//!
//! [[subregions]]
//! name = "R01"
//! bounds = { lat_min = 36.5, lat_max = 42.0, lon_min = -12.0, lon_max = 2.0 }
//! ```
//!
//! Bounds are validated while deserialising, so an invalid rectangle is reported as a
//! parse failure. Reading the file is left to the caller.

use crate::bounds::Subregion;
use crate::errors::EvalResult;
use crate::evaluation::EvaluationSettings;
use crate::loader::LoaderRequest;
use crate::metric::Metric;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub settings: EvaluationSettings,
    /// Where to load the reference dataset from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<LoaderRequest>,
    /// Where to load the target datasets from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<LoaderRequest>,
    pub metrics: Vec<Metric>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subregions: Vec<Subregion>,
}

impl EvaluationConfig {
    pub fn from_toml_str(contents: &str) -> EvalResult<Self> {
        Ok(toml::from_str(contents)?)
    }
}

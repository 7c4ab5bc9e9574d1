//! Loader registry
//!
//! File formats and remote services are not part of this crate. Instead, callers register a
//! loader function against a source tag (e.g. `"netcdf"`) and datasets are requested by tag.

use crate::dataset::Dataset;
use crate::errors::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

/// Free-form options passed through to a loader
pub type LoaderOptions = BTreeMap<String, String>;

type LoaderFn = dyn Fn(&LoaderOptions) -> EvalResult<Vec<Dataset>> + Send + Sync;

/// A request for datasets from a registered source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderRequest {
    pub source: String,
    #[serde(default)]
    pub options: LoaderOptions,
}

impl LoaderRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            options: LoaderOptions::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

#[derive(Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Box<LoaderFn>>,
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("sources", &self.sources())
            .finish()
    }
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader for a source tag
    ///
    /// Tags must be non-empty, free of whitespace and not already registered.
    pub fn register<F>(&mut self, source: impl Into<String>, loader: F) -> EvalResult<()>
    where
        F: Fn(&LoaderOptions) -> EvalResult<Vec<Dataset>> + Send + Sync + 'static,
    {
        let source = source.into();
        if source.is_empty() || source.chars().any(char::is_whitespace) {
            return Err(EvalError::Configuration(format!(
                "invalid loader source tag '{}'",
                source
            )));
        }
        if self.loaders.contains_key(&source) {
            return Err(EvalError::Configuration(format!(
                "a loader is already registered for '{}'",
                source
            )));
        }
        self.loaders.insert(source, Box::new(loader));
        Ok(())
    }

    pub fn contains(&self, source: &str) -> bool {
        self.loaders.contains_key(source)
    }

    /// Registered source tags, sorted
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        sources.sort_unstable();
        sources
    }

    pub fn load(&self, request: &LoaderRequest) -> EvalResult<Vec<Dataset>> {
        let loader = self.loaders.get(&request.source).ok_or_else(|| {
            EvalError::Configuration(format!(
                "no loader registered for '{}', known sources: {:?}",
                request.source,
                self.sources()
            ))
        })?;
        let datasets = loader(&request.options)?;
        debug!(
            source = %request.source,
            datasets = datasets.len(),
            "Loaded datasets"
        );
        Ok(datasets)
    }

    /// Load every request, concatenating the datasets in request order
    pub fn load_all(&self, requests: &[LoaderRequest]) -> EvalResult<Vec<Dataset>> {
        let mut datasets = vec![];
        for request in requests {
            datasets.extend(self.load(request)?);
        }
        Ok(datasets)
    }
}

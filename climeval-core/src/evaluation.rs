//! Evaluation driver
//!
//! An [`Evaluation`] holds a reference dataset, a list of target datasets, a list of metrics and
//! an optional list of subregions. Running it applies every metric to every target (and, for
//! unary metrics, to the reference) and stores the results.
//!
//! Results are indexed `[metric][target]`, or `[metric][target][subregion]` when subregions are
//! configured. When subregions are present every dataset is subset to each subregion before any
//! metric runs.

use crate::bounds::{Bounds, Subregion};
use crate::config::EvaluationConfig;
use crate::dataset::Dataset;
use crate::errors::{EvalError, EvalResult};
use crate::metric::{Metric, MetricValue};
use crate::processor::spatial::subset;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Runtime switches for an evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationSettings {
    /// Evaluate (metric, target, subregion) cells on the rayon thread pool
    pub parallel: bool,
}

/// Results of an evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultGrid {
    /// Indexed `[metric][target]`
    Flat(Vec<Vec<MetricValue>>),
    /// Indexed `[metric][target][subregion]`
    Regional(Vec<Vec<Vec<MetricValue>>>),
}

impl ResultGrid {
    /// Look up a single result
    ///
    /// `subregion` is ignored for flat results and required for regional ones.
    pub fn get(
        &self,
        metric: usize,
        target: usize,
        subregion: Option<usize>,
    ) -> Option<&MetricValue> {
        match (self, subregion) {
            (ResultGrid::Flat(grid), _) => grid.get(metric)?.get(target),
            (ResultGrid::Regional(grid), Some(region)) => {
                grid.get(metric)?.get(target)?.get(region)
            }
            (ResultGrid::Regional(_), None) => None,
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            ResultGrid::Flat(grid) => vec![grid.len(), grid.first().map_or(0, Vec::len)],
            ResultGrid::Regional(grid) => {
                let targets = grid.first().map_or(0, Vec::len);
                let regions = grid
                    .first()
                    .and_then(|t| t.first())
                    .map_or(0, Vec::len);
                vec![grid.len(), targets, regions]
            }
        }
    }
}

/// Results of the unary metrics applied to the reference dataset
///
/// One entry per metric, `None` for binary metrics. Each unary entry holds one value per
/// subregion, or a single value without subregions.
pub type ReferenceResults = Vec<Option<Vec<MetricValue>>>;

/// A configured evaluation of target datasets against a reference
#[derive(Debug)]
pub struct Evaluation {
    reference: Dataset,
    targets: Vec<Dataset>,
    metrics: Vec<Metric>,
    subregions: Option<Vec<Subregion>>,
    settings: EvaluationSettings,
    results: Option<ResultGrid>,
    reference_results: Option<ReferenceResults>,
}

impl Evaluation {
    pub fn new(reference: Dataset, targets: Vec<Dataset>, metrics: Vec<Metric>) -> Self {
        Self {
            reference,
            targets,
            metrics,
            subregions: None,
            settings: EvaluationSettings::default(),
            results: None,
            reference_results: None,
        }
    }

    /// Build an evaluation from a parsed configuration
    ///
    /// An empty subregion list in the configuration means no subregions.
    pub fn from_config(reference: Dataset, targets: Vec<Dataset>, config: EvaluationConfig) -> Self {
        let mut evaluation = Self::new(reference, targets, config.metrics);
        if !config.subregions.is_empty() {
            evaluation.with_subregions(config.subregions);
        }
        evaluation.with_settings(config.settings);
        evaluation
    }

    pub fn add_dataset(&mut self, target: Dataset) -> &mut Self {
        self.targets.push(target);
        self
    }

    pub fn add_datasets(&mut self, targets: impl IntoIterator<Item = Dataset>) -> &mut Self {
        self.targets.extend(targets);
        self
    }

    pub fn add_metric(&mut self, metric: Metric) -> &mut Self {
        self.metrics.push(metric);
        self
    }

    pub fn add_metrics(&mut self, metrics: impl IntoIterator<Item = Metric>) -> &mut Self {
        self.metrics.extend(metrics);
        self
    }

    pub fn with_subregions(&mut self, subregions: Vec<Subregion>) -> &mut Self {
        self.subregions = Some(subregions);
        self
    }

    pub fn with_settings(&mut self, settings: EvaluationSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    pub fn reference(&self) -> &Dataset {
        &self.reference
    }

    pub fn targets(&self) -> &[Dataset] {
        &self.targets
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn subregions(&self) -> Option<&[Subregion]> {
        self.subregions.as_deref()
    }

    pub fn settings(&self) -> EvaluationSettings {
        self.settings
    }

    /// Results of the last successful run
    pub fn results(&self) -> Option<&ResultGrid> {
        self.results.as_ref()
    }

    /// Unary metric results for the reference from the last successful run
    pub fn reference_results(&self) -> Option<&ReferenceResults> {
        self.reference_results.as_ref()
    }

    /// Check that the evaluation can be run
    pub fn validate(&self) -> EvalResult<()> {
        if self.metrics.is_empty() {
            return Err(EvalError::Configuration(
                "an evaluation needs at least one metric".to_string(),
            ));
        }
        if self.targets.is_empty() && self.metrics.iter().any(Metric::is_binary) {
            return Err(EvalError::Configuration(
                "binary metrics need at least one target dataset".to_string(),
            ));
        }
        if let Some(subregions) = &self.subregions {
            if subregions.is_empty() {
                return Err(EvalError::Configuration(
                    "subregions were given but the list is empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Run every metric
    ///
    /// Evaluation stops at the first failing metric and the error is returned. Results from a
    /// previous run are only replaced once every metric has succeeded.
    pub fn run(&mut self) -> EvalResult<&ResultGrid> {
        self.validate()?;
        info!(
            reference = %self.reference.name(),
            targets = self.targets.len(),
            metrics = self.metrics.len(),
            subregions = self.subregions.as_ref().map_or(0, Vec::len),
            parallel = self.settings.parallel,
            "Running evaluation"
        );

        let (results, reference_results) = match &self.subregions {
            None => self.run_flat()?,
            Some(subregions) => self.run_regional(subregions)?,
        };

        info!("Evaluation complete");
        self.reference_results = Some(reference_results);
        Ok(&*self.results.insert(results))
    }

    fn run_flat(&self) -> EvalResult<(ResultGrid, ReferenceResults)> {
        let n_targets = self.targets.len();
        let cells: Vec<(usize, usize)> = (0..self.metrics.len())
            .flat_map(|m| (0..n_targets).map(move |t| (m, t)))
            .collect();

        let values = self.evaluate_cells(&cells, |(m, t)| {
            self.metrics[m].evaluate(&self.reference, &self.targets[t])
        })?;
        let grid = split_rows(values, self.metrics.len());

        let reference_results = self.run_reference(std::slice::from_ref(&self.reference))?;
        Ok((ResultGrid::Flat(grid), reference_results))
    }

    fn run_regional(
        &self,
        subregions: &[Subregion],
    ) -> EvalResult<(ResultGrid, ReferenceResults)> {
        let bounds: Vec<Bounds> = subregions
            .iter()
            .map(|s| Bounds::Rectangle(s.bounds.clone()))
            .collect();
        let subset_all = |dataset: &Dataset| -> EvalResult<Vec<Dataset>> {
            bounds.iter().map(|b| subset(b, dataset)).collect()
        };

        debug!(subregions = subregions.len(), "Subsetting datasets to subregions");
        let reference_subsets = subset_all(&self.reference)?;
        let target_subsets = self
            .targets
            .iter()
            .map(subset_all)
            .collect::<EvalResult<Vec<_>>>()?;

        let n_targets = self.targets.len();
        let n_regions = subregions.len();
        let cells: Vec<(usize, usize, usize)> = (0..self.metrics.len())
            .flat_map(|m| {
                (0..n_targets).flat_map(move |t| (0..n_regions).map(move |r| (m, t, r)))
            })
            .collect();

        let values = self.evaluate_cells(&cells, |(m, t, r)| {
            self.metrics[m].evaluate(&reference_subsets[r], &target_subsets[t][r])
        })?;
        let by_target = split_rows(values, self.metrics.len() * n_targets);
        let grid = split_rows(by_target, self.metrics.len());

        let reference_results = self.run_reference(&reference_subsets)?;
        Ok((ResultGrid::Regional(grid), reference_results))
    }

    /// Apply the unary metrics to each reference subset
    fn run_reference(&self, references: &[Dataset]) -> EvalResult<ReferenceResults> {
        self.metrics
            .iter()
            .map(|metric| match metric {
                Metric::Unary(m) => references
                    .iter()
                    .map(|reference| m.run(reference))
                    .collect::<EvalResult<Vec<_>>>()
                    .map(Some),
                Metric::Binary(_) => Ok(None),
            })
            .collect()
    }

    fn evaluate_cells<C, F>(&self, cells: &[C], f: F) -> EvalResult<Vec<MetricValue>>
    where
        C: Copy + Send + Sync,
        F: Fn(C) -> EvalResult<MetricValue> + Send + Sync,
    {
        if self.settings.parallel {
            cells.par_iter().map(|cell| f(*cell)).collect()
        } else {
            cells.iter().map(|cell| f(*cell)).collect()
        }
    }
}

/// Split a row-major vector into `rows` rows of equal length
fn split_rows<T>(values: Vec<T>, rows: usize) -> Vec<Vec<T>> {
    if rows == 0 {
        return vec![];
    }
    let size = values.len() / rows;
    let mut iter = values.into_iter();
    (0..rows).map(|_| iter.by_ref().take(size).collect()).collect()
}

//! Correlation based metrics

use super::check_shapes;
use super::variability::std_ratio;
use crate::statistics::{correlation_significance, pattern_correlation, pearson};
use climeval_core::dataset::Dataset;
use climeval_core::errors::EvalResult;
use climeval_core::masked::MaskedArray;
use climeval_core::metric::{BinaryMetric, MetricValue};
use climeval_core::utils::{calc_climatology_season, calc_temporal_mean};
use ndarray::{Axis, Ix2, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum number of jointly valid time steps for a per-cell correlation
pub const MIN_CORRELATION_STEPS: usize = 3;

/// Pearson correlation of the flattened grids over the jointly valid cells
///
/// NaN when the correlation is undefined (fewer than two valid cells or no variance).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternCorrelation {}

impl PatternCorrelation {
    pub fn calculate(&self, reference: &Dataset, target: &Dataset) -> EvalResult<f64> {
        check_shapes(self.name(), reference, target)?;
        pattern_correlation(reference.values(), target.values(), self.name())
    }
}

#[typetag::serde]
impl BinaryMetric for PatternCorrelation {
    fn name(&self) -> &str {
        "PatternCorrelation"
    }

    fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
        Ok(self.calculate(reference, target)?.into())
    }
}

/// Pattern correlation of the seasonal climatologies
///
/// Seasons may wrap the year end, e.g. `month_start = 12, month_end = 2` for DJF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPatternCorrelation {
    pub month_start: u32,
    pub month_end: u32,
}

impl Default for SeasonalPatternCorrelation {
    fn default() -> Self {
        Self {
            month_start: 1,
            month_end: 12,
        }
    }
}

impl SeasonalPatternCorrelation {
    pub fn new(month_start: u32, month_end: u32) -> Self {
        Self {
            month_start,
            month_end,
        }
    }

    pub fn calculate(&self, reference: &Dataset, target: &Dataset) -> EvalResult<f64> {
        check_shapes(self.name(), reference, target)?;
        let (_, reference_climatology) =
            calc_climatology_season(self.month_start, self.month_end, reference)?;
        let (_, target_climatology) =
            calc_climatology_season(self.month_start, self.month_end, target)?;
        pattern_correlation(&reference_climatology, &target_climatology, self.name())
    }
}

#[typetag::serde]
impl BinaryMetric for SeasonalPatternCorrelation {
    fn name(&self) -> &str {
        "SeasonalPatternCorrelation"
    }

    fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
        Ok(self.calculate(reference, target)?.into())
    }
}

/// Standard deviation ratio and pattern correlation of the time-mean fields
///
/// These are the two coordinates of a target on a Taylor diagram. The result is
/// `Scalars([std_ratio, correlation])`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialPatternTaylorDiagram {}

impl SpatialPatternTaylorDiagram {
    pub fn calculate(&self, reference: &Dataset, target: &Dataset) -> EvalResult<[f64; 2]> {
        check_shapes(self.name(), reference, target)?;
        let reference_mean = calc_temporal_mean(reference);
        let target_mean = calc_temporal_mean(target);
        let correlation = pattern_correlation(&reference_mean, &target_mean, self.name())?;
        Ok([std_ratio(&reference_mean, &target_mean), correlation])
    }
}

#[typetag::serde]
impl BinaryMetric for SpatialPatternTaylorDiagram {
    fn name(&self) -> &str {
        "SpatialPatternTaylorDiagram"
    }

    fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
        Ok(MetricValue::Scalars(
            self.calculate(reference, target)?.to_vec(),
        ))
    }
}

/// Per-cell correlation of the two time series
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalCorrelationResult {
    /// Pearson correlation, `[Y, X]`
    pub correlation: MaskedArray<Ix2>,
    /// `1 - p` of a two-sided Student-t test, `[Y, X]`
    pub significance: MaskedArray<Ix2>,
}

/// Per-cell Pearson correlation between the reference and target time series
///
/// The result is `Fields([correlation, significance])`. Cells with fewer than
/// [`MIN_CORRELATION_STEPS`] jointly valid time steps, or without variance, are masked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalCorrelation {}

impl TemporalCorrelation {
    pub fn calculate(
        &self,
        reference: &Dataset,
        target: &Dataset,
    ) -> EvalResult<TemporalCorrelationResult> {
        check_shapes(self.name(), reference, target)?;
        let (r, t) = (reference.values(), target.values());

        let cells = Zip::from(r.data().lanes(Axis(0)))
            .and(r.mask().lanes(Axis(0)))
            .and(t.data().lanes(Axis(0)))
            .and(t.mask().lanes(Axis(0)))
            .map_collect(|r_data, r_mask, t_data, t_mask| {
                let (xs, ys): (Vec<f64>, Vec<f64>) = r_data
                    .iter()
                    .zip(r_mask.iter())
                    .zip(t_data.iter().zip(t_mask.iter()))
                    .filter(|((_, rm), (_, tm))| !**rm && !**tm)
                    .map(|((x, _), (y, _))| (*x, *y))
                    .unzip();
                if xs.len() < MIN_CORRELATION_STEPS {
                    return (None, None);
                }
                match pearson(&xs, &ys) {
                    Some(corr) => (Some(corr), correlation_significance(corr, xs.len()).ok()),
                    None => (None, None),
                }
            });

        let correlation = MaskedArray::from_options(cells.mapv(|(c, _)| c));
        let significance = MaskedArray::from_options(cells.mapv(|(_, s)| s));
        debug!(
            cells = correlation.len(),
            masked = correlation.len() - correlation.count(),
            "Computed temporal correlation"
        );
        Ok(TemporalCorrelationResult {
            correlation,
            significance,
        })
    }
}

#[typetag::serde]
impl BinaryMetric for TemporalCorrelation {
    fn name(&self) -> &str {
        "TemporalCorrelation"
    }

    fn run(&self, reference: &Dataset, target: &Dataset) -> EvalResult<MetricValue> {
        let result = self.calculate(reference, target)?;
        Ok(MetricValue::Fields(vec![
            result.correlation.into_dyn(),
            result.significance.into_dyn(),
        ]))
    }
}

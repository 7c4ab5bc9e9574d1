//! Temporal transforms

use crate::dataset::{Dataset, TimeResolution};
use crate::errors::{EvalError, EvalResult};
use crate::masked::MaskedArray;
use crate::utils::climatology::{check_month, group_seasons, in_season};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use ndarray::{Axis, Ix2};
use tracing::debug;

/// Start of the `resolution` period containing `time`
pub(crate) fn period_start(
    time: NaiveDateTime,
    resolution: TimeResolution,
) -> EvalResult<NaiveDateTime> {
    let date = time.date();
    let start = match resolution {
        TimeResolution::Minutely => date.and_hms_opt(time.hour(), time.minute(), 0),
        TimeResolution::Hourly => date.and_hms_opt(time.hour(), 0, 0),
        TimeResolution::Daily => Some(date.and_time(NaiveTime::MIN)),
        TimeResolution::Monthly => date.with_day(1).map(|d| d.and_time(NaiveTime::MIN)),
        TimeResolution::Yearly => {
            NaiveDate::from_ymd_opt(date.year(), 1, 1).map(|d| d.and_time(NaiveTime::MIN))
        }
    };
    start.ok_or_else(|| EvalError::Value(format!("unable to normalise timestamp {}", time)))
}

/// Move every timestamp to the start of its period
///
/// Monthly data stamped mid-month by one source and on the first by another compare equal
/// after normalisation. `resolution` is one of `minutely`, `hourly`, `daily`, `monthly` or
/// `yearly`.
pub fn normalize_dataset_datetimes(dataset: &Dataset, resolution: &str) -> EvalResult<Dataset> {
    let resolution: TimeResolution = resolution.parse()?;
    let times = dataset
        .times()
        .iter()
        .map(|t| period_start(*t, resolution))
        .collect::<EvalResult<Vec<_>>>()?;
    dataset.derive_with(
        dataset.lats().clone(),
        dataset.lons().clone(),
        times,
        dataset.values().clone(),
    )
}

/// Keep the time steps whose month lies in `[month_start, month_end]`
///
/// When `month_start > month_end` the season wraps over the year end, e.g. `(12, 2)` is DJF.
///
/// With `average_each_year` the steps of each season are averaged into a single step labelled
/// with the season's first timestamp. A wrapped season belongs to the year in which it starts and
/// incomplete seasons are dropped.
pub fn temporal_subset(
    month_start: u32,
    month_end: u32,
    dataset: &Dataset,
    average_each_year: bool,
) -> EvalResult<Dataset> {
    check_month(month_start)?;
    check_month(month_end)?;
    let times = dataset.times();

    let (times, values) = if average_each_year {
        let groups = group_seasons(times, month_start, month_end)?;
        let means: Vec<MaskedArray<Ix2>> = groups
            .iter()
            .map(|indices| dataset.values().select(Axis(0), indices).mean_axis(Axis(0)))
            .collect();
        if means.is_empty() {
            return Err(no_season(dataset, month_start, month_end));
        }
        let labels = groups.iter().map(|indices| times[indices[0]]).collect();
        (labels, MaskedArray::stack(Axis(0), &means)?)
    } else {
        let indices: Vec<usize> = times
            .iter()
            .enumerate()
            .filter(|(_, t)| in_season(t.month(), month_start, month_end))
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            return Err(no_season(dataset, month_start, month_end));
        }
        let labels = indices.iter().map(|i| times[*i]).collect();
        (labels, dataset.values().select(Axis(0), &indices))
    };

    dataset.derive_with(dataset.lats().clone(), dataset.lons().clone(), times, values)
}

fn no_season(dataset: &Dataset, month_start: u32, month_end: u32) -> EvalError {
    EvalError::Bounds(format!(
        "'{}' has no time steps in months {} to {}",
        dataset.name(),
        month_start,
        month_end
    ))
}

/// Width of the bins produced by [`temporal_rebin`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimeStep {
    /// Calendar days, labelled at midnight
    Daily,
    /// Calendar months, labelled on the first of the month
    Monthly,
    /// Calendar years, labelled on January 1st
    Annual,
    /// A single bin spanning the whole dataset, labelled with the first timestamp
    Full,
    /// Fixed-width bins anchored at the first timestamp
    Every(TimeDelta),
}

impl TimeStep {
    /// Map a bin width in days onto the closest calendar step
    pub fn from_days(days: i64) -> Self {
        match days {
            1 => TimeStep::Daily,
            2..=31 => TimeStep::Monthly,
            32..=366 => TimeStep::Annual,
            _ => TimeStep::Full,
        }
    }
}

/// Average consecutive time steps into bins of width `step`
///
/// Each bin is labelled with its start and holds the mask-aware mean of the steps that fall
/// inside it. A partial bin (e.g. a year with only six months of data) is kept and averaged over
/// the steps it contains. Bins without any time step are not emitted.
pub fn temporal_rebin(dataset: &Dataset, step: TimeStep) -> EvalResult<Dataset> {
    let times = dataset.times();
    let first = times[0];

    let every_ms = match step {
        TimeStep::Every(width) => {
            let ms = width.num_milliseconds();
            if ms <= 0 {
                return Err(EvalError::Value(format!(
                    "bin width must be positive, got {}",
                    width
                )));
            }
            Some(ms)
        }
        _ => None,
    };

    let label_of = |time: NaiveDateTime| -> EvalResult<NaiveDateTime> {
        match step {
            TimeStep::Daily => period_start(time, TimeResolution::Daily),
            TimeStep::Monthly => period_start(time, TimeResolution::Monthly),
            TimeStep::Annual => period_start(time, TimeResolution::Yearly),
            TimeStep::Full => Ok(first),
            TimeStep::Every(_) => {
                let width = every_ms.unwrap_or(1);
                let elapsed = (time - first).num_milliseconds();
                Ok(first + TimeDelta::milliseconds((elapsed / width) * width))
            }
        }
    };

    let mut bins: Vec<(NaiveDateTime, Vec<usize>)> = Vec::new();
    for (i, time) in times.iter().enumerate() {
        let label = label_of(*time)?;
        if let Some((current, indices)) = bins.last_mut() {
            if *current == label {
                indices.push(i);
                continue;
            }
        }
        bins.push((label, vec![i]));
    }
    debug!(
        dataset = %dataset.name(),
        steps = times.len(),
        bins = bins.len(),
        "Rebinned time axis"
    );

    let means: Vec<MaskedArray<Ix2>> = bins
        .iter()
        .map(|(_, indices)| dataset.values().select(Axis(0), indices).mean_axis(Axis(0)))
        .collect();
    let labels = bins.into_iter().map(|(label, _)| label).collect();
    let values = MaskedArray::stack(Axis(0), &means)?;

    dataset.derive_with(dataset.lats().clone(), dataset.lons().clone(), labels, values)
}

/// The time window covered by every dataset
pub fn get_temporal_overlap(datasets: &[Dataset]) -> EvalResult<(NaiveDateTime, NaiveDateTime)> {
    let mut ranges = datasets.iter().map(|d| d.time_range());
    let (mut start, mut end) = ranges
        .next()
        .ok_or_else(|| EvalError::Value("at least one dataset is required".to_string()))?;
    for (s, e) in ranges {
        start = start.max(s);
        end = end.min(e);
    }
    if start > end {
        return Err(EvalError::Bounds(
            "datasets do not overlap in time".to_string(),
        ));
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{month, monthly_dataset, monthly_times};
    use chrono::NaiveDate;
    use ndarray::{array, Array3};

    fn day(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn series(times: Vec<NaiveDateTime>, values: Vec<f64>) -> Dataset {
        let n = times.len();
        Dataset::new(
            array![0.0],
            array![0.0],
            times,
            Array3::from_shape_vec((n, 1, 1), values).unwrap(),
            "tas",
        )
        .unwrap()
    }

    #[test]
    fn normalize_monthly_and_daily() {
        let ds = series(vec![day(2000, 1, 15, 12), day(2000, 2, 14, 6)], vec![1.0, 2.0]);
        let monthly = normalize_dataset_datetimes(&ds, "monthly").unwrap();
        assert_eq!(monthly.times(), &[month(2000, 1), month(2000, 2)]);
        let daily = normalize_dataset_datetimes(&ds, "DAILY").unwrap();
        assert_eq!(daily.times(), &[day(2000, 1, 15, 0), day(2000, 2, 14, 0)]);
        assert_eq!(daily.values(), ds.values());
        assert!(matches!(
            normalize_dataset_datetimes(&ds, "weekly"),
            Err(EvalError::Resolution(_))
        ));
    }

    #[test]
    fn subset_summer() {
        let ds = monthly_dataset(Array3::from_shape_fn((24, 1, 1), |(t, _, _)| t as f64));
        let jja = temporal_subset(6, 8, &ds, false).unwrap();
        assert_eq!(jja.times().len(), 6);
        assert_eq!(jja.values().get([0, 0, 0]), Some(5.0));
        assert_eq!(jja.values().get([3, 0, 0]), Some(17.0));
    }

    #[test]
    fn subset_wraps_year_end() {
        let ds = monthly_dataset(Array3::from_shape_fn((24, 1, 1), |(t, _, _)| t as f64));
        let djf = temporal_subset(12, 2, &ds, false).unwrap();
        let months: Vec<u32> = djf.times().iter().map(|t| t.month()).collect();
        assert_eq!(months, vec![1, 2, 12, 1, 2, 12]);
        assert!(djf.times().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn subset_averages_complete_seasons() {
        let ds = monthly_dataset(Array3::from_shape_fn((24, 1, 1), |(t, _, _)| t as f64));
        let djf = temporal_subset(12, 2, &ds, true).unwrap();
        assert_eq!(djf.times(), &[month(2000, 12)]);
        assert_eq!(djf.values().get([0, 0, 0]), Some(12.0));

        assert!(matches!(
            temporal_subset(13, 2, &ds, false),
            Err(EvalError::Configuration(_))
        ));
    }

    #[test]
    fn rebin_annual_keeps_partial_bins() {
        let ds = monthly_dataset(Array3::from_shape_fn((18, 1, 1), |(t, _, _)| t as f64));
        let annual = temporal_rebin(&ds, TimeStep::Annual).unwrap();
        assert_eq!(annual.times(), &[month(2000, 1), month(2001, 1)]);
        assert_eq!(annual.values().get([0, 0, 0]), Some(5.5));
        assert_eq!(annual.values().get([1, 0, 0]), Some(14.5));
    }

    #[test]
    fn rebin_daily_to_monthly() {
        let times: Vec<NaiveDateTime> = (0..60)
            .map(|d| day(2000, 1, 1, 0) + TimeDelta::days(d))
            .collect();
        let ds = series(times, vec![1.0; 60]);
        let monthly = temporal_rebin(&ds, TimeStep::from_days(31)).unwrap();
        assert_eq!(monthly.times(), &[month(2000, 1), month(2000, 2)]);
        assert_eq!(monthly.values().mean(), Some(1.0));
    }

    #[test]
    fn rebin_fixed_width() {
        let times: Vec<NaiveDateTime> = (0..5).map(|h| day(2000, 1, 1, h)).collect();
        let ds = series(times, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let binned = temporal_rebin(&ds, TimeStep::Every(TimeDelta::hours(2))).unwrap();
        assert_eq!(
            binned.times(),
            &[day(2000, 1, 1, 0), day(2000, 1, 1, 2), day(2000, 1, 1, 4)]
        );
        assert_eq!(binned.values().data().iter().copied().collect::<Vec<_>>(), vec![0.5, 2.5, 4.0]);
        assert!(temporal_rebin(&ds, TimeStep::Every(TimeDelta::zero())).is_err());
    }

    #[test]
    fn rebin_full() {
        let ds = monthly_dataset(Array3::from_shape_fn((4, 1, 1), |(t, _, _)| t as f64));
        let full = temporal_rebin(&ds, TimeStep::Full).unwrap();
        assert_eq!(full.times(), &[month(2000, 1)]);
        assert_eq!(full.values().get([0, 0, 0]), Some(1.5));
    }

    #[test]
    fn time_step_from_days() {
        assert_eq!(TimeStep::from_days(1), TimeStep::Daily);
        assert_eq!(TimeStep::from_days(30), TimeStep::Monthly);
        assert_eq!(TimeStep::from_days(365), TimeStep::Annual);
        assert_eq!(TimeStep::from_days(3650), TimeStep::Full);
    }

    #[test]
    fn temporal_overlap() {
        let a = monthly_dataset(Array3::zeros((12, 1, 1)));
        let times = monthly_times(18)[6..].to_vec();
        let b = Dataset::new(array![0.0], array![0.0], times, Array3::zeros((12, 1, 1)), "tas")
            .unwrap();
        assert_eq!(
            get_temporal_overlap(&[a, b]).unwrap(),
            (month(2000, 7), month(2000, 12))
        );
    }
}

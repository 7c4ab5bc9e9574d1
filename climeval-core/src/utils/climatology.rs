//! Temporal reductions and climatologies

use crate::dataset::Dataset;
use crate::errors::{EvalError, EvalResult};
use crate::masked::{mean, MaskedArray};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use ndarray::{Array1, Axis, Ix1, Ix2, Ix3, Ix4};
use tracing::warn;

pub const MONTHS_PER_YEAR: usize = 12;

/// View a monthly `[T, Y, X]` cube as `[T / 12, 12, Y, X]`
pub fn reshape_monthly_to_annually(dataset: &Dataset) -> EvalResult<MaskedArray<Ix4>> {
    let (nt, ny, nx) = dataset.shape();
    if nt % MONTHS_PER_YEAR != 0 {
        return Err(EvalError::Shape(format!(
            "'{}' has {} time steps which is not a whole number of years",
            dataset.name(),
            nt
        )));
    }
    dataset
        .values()
        .clone()
        .into_shape((nt / MONTHS_PER_YEAR, MONTHS_PER_YEAR, ny, nx))
}

/// Inverse of [`reshape_monthly_to_annually`]
pub fn flatten_annual_to_monthly(values: MaskedArray<Ix4>) -> EvalResult<MaskedArray<Ix3>> {
    let shape = values.shape().to_vec();
    values.into_shape((shape[0] * shape[1], shape[2], shape[3]))
}

/// Annual means `[N, Y, X]` and their overall mean `[Y, X]`
///
/// The time axis must be a whole number of years of monthly data.
pub fn calc_climatology_year(
    dataset: &Dataset,
) -> EvalResult<(MaskedArray<Ix3>, MaskedArray<Ix2>)> {
    let annual = reshape_monthly_to_annually(dataset)?.mean_axis(Axis(1));
    let total = annual.mean_axis(Axis(0));
    Ok((annual, total))
}

/// Per-calendar-month means `[12, Y, X]` with representative timestamps
///
/// Timestamps are the first of each month in nominal year 1, starting from the month of the
/// first time step.
pub fn calc_climatology_monthly(
    dataset: &Dataset,
) -> EvalResult<(MaskedArray<Ix3>, Vec<NaiveDateTime>)> {
    let monthly = reshape_monthly_to_annually(dataset)?.mean_axis(Axis(0));

    let first_month = dataset.times()[0].month();
    let start = NaiveDate::from_ymd_opt(1, first_month, 1)
        .ok_or_else(|| EvalError::Value(format!("invalid month {}", first_month)))?;
    let times = (0..MONTHS_PER_YEAR as u32)
        .map(|i| {
            start
                .checked_add_months(Months::new(i))
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| EvalError::Value("climatology timestamp out of range".to_string()))
        })
        .collect::<EvalResult<Vec<_>>>()?;
    Ok((monthly, times))
}

/// Check that `month` is a calendar month
pub fn check_month(month: u32) -> EvalResult<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(EvalError::Configuration(format!(
            "month {} is outside 1..=12",
            month
        )))
    }
}

/// Whether `month` lies in the season `[month_start, month_end]`, wrapping over the year end
/// when `month_start > month_end`
pub fn in_season(month: u32, month_start: u32, month_end: u32) -> bool {
    if month_start <= month_end {
        month_start <= month && month <= month_end
    } else {
        month >= month_start || month <= month_end
    }
}

fn season_length(month_start: u32, month_end: u32) -> usize {
    if month_start <= month_end {
        (month_end - month_start + 1) as usize
    } else {
        (12 - month_start + 1 + month_end) as usize
    }
}

/// Indices of the time steps of each complete season, in chronological order
///
/// A season wrapping over the year end belongs to the year in which it starts, so Dec 2000,
/// Jan 2001 and Feb 2001 form the 2000 DJF season. Seasons missing any of their months are
/// dropped.
pub fn group_seasons(
    times: &[NaiveDateTime],
    month_start: u32,
    month_end: u32,
) -> EvalResult<Vec<Vec<usize>>> {
    check_month(month_start)?;
    check_month(month_end)?;

    let mut groups: Vec<(i32, Vec<usize>)> = Vec::new();
    for (i, time) in times.iter().enumerate() {
        let month = time.month();
        if !in_season(month, month_start, month_end) {
            continue;
        }
        let season_year = if month_start > month_end && month <= month_end {
            time.year() - 1
        } else {
            time.year()
        };
        if let Some((year, indices)) = groups.last_mut() {
            if *year == season_year {
                indices.push(i);
                continue;
            }
        }
        groups.push((season_year, vec![i]));
    }

    let expected = season_length(month_start, month_end);
    let mut complete = Vec::with_capacity(groups.len());
    for (year, indices) in groups {
        let mut months: Vec<u32> = indices.iter().map(|i| times[*i].month()).collect();
        months.sort_unstable();
        months.dedup();
        if months.len() == expected {
            complete.push(indices);
        } else {
            warn!(
                season_year = year,
                months = months.len(),
                expected,
                "Dropping incomplete season"
            );
        }
    }
    Ok(complete)
}

/// Per-season means `[N, Y, X]` and the overall seasonal mean `[Y, X]`
///
/// Seasons are grouped as in [`group_seasons`].
pub fn calc_climatology_season(
    month_start: u32,
    month_end: u32,
    dataset: &Dataset,
) -> EvalResult<(MaskedArray<Ix3>, MaskedArray<Ix2>)> {
    let groups = group_seasons(dataset.times(), month_start, month_end)?;
    if groups.is_empty() {
        return Err(EvalError::Shape(format!(
            "'{}' does not contain a complete season for months {} to {}",
            dataset.name(),
            month_start,
            month_end
        )));
    }
    let seasonal: Vec<MaskedArray<Ix2>> = groups
        .iter()
        .map(|indices| dataset.values().select(Axis(0), indices).mean_axis(Axis(0)))
        .collect();
    let t_series = MaskedArray::stack(Axis(0), &seasonal)?;
    let means = t_series.mean_axis(Axis(0));
    Ok((t_series, means))
}

/// Mean over the time axis, `[Y, X]`
pub fn calc_temporal_mean(dataset: &Dataset) -> MaskedArray<Ix2> {
    dataset.values().mean_axis(Axis(0))
}

/// Unweighted spatial mean of every time step, `[T]`
pub fn calc_time_series(dataset: &Dataset) -> MaskedArray<Ix1> {
    let values = dataset.values();
    let series: Array1<Option<f64>> = values
        .data()
        .outer_iter()
        .zip(values.mask().outer_iter())
        .map(|(step, mask)| {
            let valid: Vec<f64> = step
                .iter()
                .zip(mask.iter())
                .filter(|(_, m)| !**m)
                .map(|(v, _)| *v)
                .collect();
            mean(&valid)
        })
        .collect();
    MaskedArray::from_options(series)
}

/// Spatial mean of every time step weighted by `cos(latitude)`, `[T]`
pub fn calc_area_weighted_spatial_average(dataset: &Dataset) -> MaskedArray<Ix1> {
    let weights = dataset.lats().mapv(|lat| lat.to_radians().cos().max(0.0));
    let values = dataset.values();
    let series: Array1<Option<f64>> = values
        .data()
        .outer_iter()
        .zip(values.mask().outer_iter())
        .map(|(step, mask)| {
            let (total, weight_sum) = step
                .indexed_iter()
                .zip(mask.iter())
                .filter(|(_, m)| !**m)
                .fold((0.0, 0.0), |(total, sum), (((y, _), v), _)| {
                    (total + weights[y] * v, sum + weights[y])
                });
            (weight_sum > 0.0).then(|| total / weight_sum)
        })
        .collect();
    MaskedArray::from_options(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{monthly_dataset, monthly_times};
    use approx::assert_relative_eq;
    use ndarray::{array, Array3};

    #[test]
    fn reshape_requires_whole_years() {
        let ds = monthly_dataset(Array3::zeros((13, 2, 2)));
        assert!(matches!(
            reshape_monthly_to_annually(&ds),
            Err(EvalError::Shape(_))
        ));
    }

    #[test]
    fn reshape_round_trip() {
        let ds = monthly_dataset(Array3::from_shape_fn((24, 2, 3), |(t, y, x)| {
            (t * 6 + y * 3 + x) as f64
        }));
        let annual = reshape_monthly_to_annually(&ds).unwrap();
        assert_eq!(annual.shape(), &[2, 12, 2, 3]);
        assert_eq!(annual.get([1, 0, 1, 2]), ds.values().get([12, 1, 2]));
        assert_eq!(&flatten_annual_to_monthly(annual).unwrap(), ds.values());
    }

    #[test]
    fn climatology_year_is_mean_of_all_steps() {
        let ds = monthly_dataset(Array3::from_shape_fn((36, 2, 2), |(t, y, x)| {
            (t * t) as f64 + y as f64 - x as f64
        }));
        let (annual, total) = calc_climatology_year(&ds).unwrap();
        assert_eq!(annual.shape(), &[3, 2, 2]);
        let expected = ds.values().mean_axis(Axis(0));
        for (a, b) in total.data().iter().zip(expected.data().iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn climatology_monthly() {
        let ds = monthly_dataset(Array3::from_shape_fn((24, 1, 1), |(t, _, _)| t as f64));
        let (values, times) = calc_climatology_monthly(&ds).unwrap();
        assert_eq!(values.shape(), &[12, 1, 1]);
        assert_eq!(values.get([0, 0, 0]), Some(6.0));
        assert_eq!(values.get([11, 0, 0]), Some(17.0));
        assert_eq!(times.len(), 12);
        assert_eq!(times[0].year(), 1);
        assert_eq!(times[0].month(), 1);
        assert_eq!(times[11].month(), 12);
    }

    #[test]
    fn wrapped_seasons_belong_to_their_start_year() {
        // Jan 2000 .. Dec 2001
        let times = monthly_times(24);
        let groups = group_seasons(&times, 12, 2).unwrap();
        // Jan/Feb 2000 belong to the incomplete 1999 season, Dec 2001 to the incomplete 2001 season
        assert_eq!(groups, vec![vec![11, 12, 13]]);
    }

    #[test]
    fn season_membership() {
        assert!(in_season(1, 12, 2));
        assert!(in_season(12, 12, 2));
        assert!(!in_season(3, 12, 2));
        assert!(in_season(7, 6, 8));
        assert!(!in_season(9, 6, 8));
        assert!(group_seasons(&monthly_times(12), 0, 2).is_err());
        assert!(group_seasons(&monthly_times(12), 1, 13).is_err());
    }

    #[test]
    fn climatology_season() {
        let ds = monthly_dataset(Array3::from_shape_fn((24, 1, 1), |(t, _, _)| t as f64));
        let (series, mean) = calc_climatology_season(6, 8, &ds).unwrap();
        assert_eq!(series.shape(), &[2, 1, 1]);
        assert_eq!(series.get([0, 0, 0]), Some(6.0));
        assert_eq!(series.get([1, 0, 0]), Some(18.0));
        assert_eq!(mean.get([0, 0]), Some(12.0));

        let short = monthly_dataset(Array3::zeros((2, 1, 1)));
        assert!(matches!(
            calc_climatology_season(6, 8, &short),
            Err(EvalError::Shape(_))
        ));
    }

    #[test]
    fn uniform_field_area_average() {
        let ds = crate::test_utils::dataset(
            array![-80.0, -30.0, 0.0, 45.0, 89.0],
            array![-170.0, 0.0, 120.0],
            Array3::from_elem((4, 5, 3), 7.25),
        );
        let series = calc_area_weighted_spatial_average(&ds);
        assert_eq!(series.shape(), &[4]);
        for v in series.compressed() {
            assert_relative_eq!(v, 7.25, max_relative = 1e-12);
        }
    }

    #[test]
    fn area_average_weights_latitudes() {
        let mut values = Array3::zeros((1, 2, 1));
        values[[0, 1, 0]] = 1.0;
        let ds = crate::test_utils::dataset(array![0.0, 60.0], array![0.0], values);
        let series = calc_area_weighted_spatial_average(&ds);
        // weights 1.0 and 0.5
        assert_relative_eq!(series.get(0).unwrap(), 1.0 / 3.0, max_relative = 1e-12);
        assert_eq!(calc_time_series(&ds).get(0), Some(0.5));
    }

    #[test]
    fn temporal_mean() {
        let ds = monthly_dataset(Array3::from_shape_fn((3, 1, 2), |(t, _, x)| (t + x) as f64));
        assert_eq!(calc_temporal_mean(&ds).data(), &array![[1.0, 2.0]]);
    }
}

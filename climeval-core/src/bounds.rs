//! Spatial and temporal bounds
//!
//! A [`Bounds`] is an immutable filter used when subsetting a [`Dataset`](crate::dataset::Dataset).
//! It is either a lat/lon [`Rectangle`] (optionally with a time window) or a [`MaskBounds`]
//! selecting grid cells by label from an externally supplied mask grid.
//!
//! Bounds are validated on construction, including when deserialised from configuration.
//!
//! ```rust
//! use climeval_core::bounds::Bounds;
//!
//! let bounds = Bounds::spatial(-45.0, 42.0, -24.0, 60.0).unwrap();
//! assert!(Bounds::spatial(42.0, -45.0, -24.0, 60.0).is_err());
//! # let _ = bounds;
//! ```

use crate::errors::{EvalError, EvalResult};
use chrono::NaiveDateTime;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A lat/lon rectangle with an optional time window
///
/// All intervals are closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRectangle", into = "RawRectangle")]
pub struct Rectangle {
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
    time: Option<(NaiveDateTime, NaiveDateTime)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRectangle {
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end: Option<NaiveDateTime>,
}

impl TryFrom<RawRectangle> for Rectangle {
    type Error = EvalError;

    fn try_from(raw: RawRectangle) -> Result<Self, Self::Error> {
        let time = match (raw.start, raw.end) {
            (Some(start), Some(end)) => Some((start, end)),
            (None, None) => None,
            _ => {
                return Err(EvalError::Configuration(
                    "start and end must be supplied together".to_string(),
                ))
            }
        };
        Rectangle::build(raw.lat_min, raw.lat_max, raw.lon_min, raw.lon_max, time)
    }
}

impl From<Rectangle> for RawRectangle {
    fn from(r: Rectangle) -> Self {
        RawRectangle {
            lat_min: r.lat_min,
            lat_max: r.lat_max,
            lon_min: r.lon_min,
            lon_max: r.lon_max,
            start: r.time.map(|(s, _)| s),
            end: r.time.map(|(_, e)| e),
        }
    }
}

impl Rectangle {
    /// A purely spatial rectangle
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> EvalResult<Self> {
        Self::build(lat_min, lat_max, lon_min, lon_max, None)
    }

    /// A rectangle restricted to the time window `[start, end]`
    pub fn with_time(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> EvalResult<Self> {
        Self::build(lat_min, lat_max, lon_min, lon_max, Some((start, end)))
    }

    fn build(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        time: Option<(NaiveDateTime, NaiveDateTime)>,
    ) -> EvalResult<Self> {
        check_interval("latitude", lat_min, lat_max, 90.0)?;
        check_interval("longitude", lon_min, lon_max, 180.0)?;
        if let Some((start, end)) = time {
            if start > end {
                return Err(EvalError::Configuration(format!(
                    "start ({}) must not be after end ({})",
                    start, end
                )));
            }
        }
        Ok(Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            time,
        })
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.time.map(|(s, _)| s)
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.time.map(|(_, e)| e)
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        self.lat_min <= lat && lat <= self.lat_max
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        self.lon_min <= lon && lon <= self.lon_max
    }

    /// Always true when the rectangle has no time window
    pub fn contains_time(&self, time: &NaiveDateTime) -> bool {
        match self.time {
            Some((start, end)) => start <= *time && *time <= end,
            None => true,
        }
    }

    /// Whether `other` lies entirely inside this rectangle
    pub fn encloses(&self, other: &Rectangle) -> bool {
        let spatial = self.lat_min <= other.lat_min
            && other.lat_max <= self.lat_max
            && self.lon_min <= other.lon_min
            && other.lon_max <= self.lon_max;
        let temporal = match (self.time, other.time) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some((s, e)), Some((os, oe))) => s <= os && oe <= e,
        };
        spatial && temporal
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Bounds - lat-range: ({}, {}), lon-range: ({}, {})",
            self.lat_min, self.lat_max, self.lon_min, self.lon_max
        )?;
        if let Some((start, end)) = self.time {
            write!(f, ", time-range: ({}, {})", start, end)?;
        }
        write!(f, ">")
    }
}

fn check_interval(axis: &str, min: f64, max: f64, limit: f64) -> EvalResult<()> {
    let in_range = |v: f64| -limit <= v && v <= limit;
    if !(in_range(min) && in_range(max)) {
        return Err(EvalError::Configuration(format!(
            "{} bounds ({}, {}) must lie within [{}, {}]",
            axis, min, max, -limit, limit
        )));
    }
    if min > max {
        return Err(EvalError::Configuration(format!(
            "{} minimum ({}) is greater than maximum ({})",
            axis, min, max
        )));
    }
    Ok(())
}

/// Cells of a `[Y, X]` label grid whose label is one of `accepted`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMaskBounds", into = "RawMaskBounds")]
pub struct MaskBounds {
    variable: String,
    labels: Array2<i32>,
    accepted: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawMaskBounds {
    mask_variable: String,
    labels: Array2<i32>,
    accepted_values: Vec<i32>,
}

impl TryFrom<RawMaskBounds> for MaskBounds {
    type Error = EvalError;

    fn try_from(raw: RawMaskBounds) -> Result<Self, Self::Error> {
        MaskBounds::new(raw.mask_variable, raw.labels, raw.accepted_values)
    }
}

impl From<MaskBounds> for RawMaskBounds {
    fn from(m: MaskBounds) -> Self {
        RawMaskBounds {
            mask_variable: m.variable,
            labels: m.labels,
            accepted_values: m.accepted,
        }
    }
}

impl MaskBounds {
    pub fn new(
        variable: impl Into<String>,
        labels: Array2<i32>,
        accepted: Vec<i32>,
    ) -> EvalResult<Self> {
        let variable = variable.into();
        if variable.is_empty() {
            return Err(EvalError::Configuration(
                "mask bounds require the name of the mask variable".to_string(),
            ));
        }
        if labels.is_empty() {
            return Err(EvalError::Configuration(format!(
                "mask '{}' has an empty label grid",
                variable
            )));
        }
        if accepted.is_empty() {
            return Err(EvalError::Configuration(format!(
                "mask '{}' does not accept any label values",
                variable
            )));
        }
        Ok(Self {
            variable,
            labels,
            accepted,
        })
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn labels(&self) -> &Array2<i32> {
        &self.labels
    }

    pub fn accepted(&self) -> &[i32] {
        &self.accepted
    }

    /// `true` for every cell whose label is accepted
    pub fn selection(&self) -> Array2<bool> {
        self.labels.mapv(|l| self.accepted.contains(&l))
    }
}

/// A spatial/temporal filter applied by [`subset`](crate::processor::subset)
///
/// Serialised with a `type` tag of `rectangle` or `mask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Bounds {
    Rectangle(Rectangle),
    Mask(MaskBounds),
}

impl Bounds {
    pub fn spatial(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> EvalResult<Self> {
        Rectangle::new(lat_min, lat_max, lon_min, lon_max).map(Bounds::Rectangle)
    }

    pub fn spatio_temporal(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> EvalResult<Self> {
        Rectangle::with_time(lat_min, lat_max, lon_min, lon_max, start, end)
            .map(Bounds::Rectangle)
    }

    pub fn from_mask(
        variable: impl Into<String>,
        labels: Array2<i32>,
        accepted: Vec<i32>,
    ) -> EvalResult<Self> {
        MaskBounds::new(variable, labels, accepted).map(Bounds::Mask)
    }
}

impl From<Rectangle> for Bounds {
    fn from(r: Rectangle) -> Self {
        Bounds::Rectangle(r)
    }
}

/// A named rectangular sub-domain used for regional aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subregion {
    pub name: String,
    pub bounds: Rectangle,
}

impl Subregion {
    pub fn new(name: impl Into<String>, bounds: Rectangle) -> Self {
        Self {
            name: name.into(),
            bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn rejects_reversed_or_out_of_range() {
        assert!(Bounds::spatial(10.0, -10.0, 0.0, 10.0).is_err());
        assert!(Bounds::spatial(-10.0, 10.0, 20.0, 10.0).is_err());
        assert!(Bounds::spatial(-91.0, 10.0, 0.0, 10.0).is_err());
        assert!(Bounds::spatial(-10.0, 10.0, 0.0, 181.0).is_err());
        assert!(Bounds::spatial(f64::NAN, 10.0, 0.0, 10.0).is_err());
        assert!(Bounds::spatio_temporal(
            -10.0,
            10.0,
            0.0,
            10.0,
            date(2001, 1, 1),
            date(2000, 1, 1)
        )
        .is_err());
    }

    #[test]
    fn degenerate_rectangle_is_allowed() {
        let r = Rectangle::new(5.0, 5.0, 10.0, 10.0).unwrap();
        assert!(r.contains_lat(5.0));
        assert!(r.contains_lon(10.0));
    }

    #[test]
    fn time_window_is_closed() {
        let r = Rectangle::with_time(-1.0, 1.0, -1.0, 1.0, date(2000, 1, 1), date(2000, 12, 1))
            .unwrap();
        assert!(r.contains_time(&date(2000, 1, 1)));
        assert!(r.contains_time(&date(2000, 12, 1)));
        assert!(!r.contains_time(&date(2001, 1, 1)));
        assert!(Rectangle::new(-1.0, 1.0, -1.0, 1.0)
            .unwrap()
            .contains_time(&date(1850, 1, 1)));
    }

    #[test]
    fn mask_bounds_require_accepted_values() {
        assert!(Bounds::from_mask("regions", array![[1, 2]], vec![]).is_err());
        let mask = MaskBounds::new("regions", array![[1, 2], [2, 3]], vec![2]).unwrap();
        assert_eq!(mask.selection(), array![[false, true], [true, false]]);
    }

    #[test]
    fn deserialise_validates() {
        let ok: Rectangle = serde_json::from_str(
            r#"{"lat_min": -10, "lat_max": 10, "lon_min": 0, "lon_max": 20,
                "start": "2000-01-01T00:00:00", "end": "2001-01-01T00:00:00"}"#,
        )
        .unwrap();
        assert_eq!(ok.start(), Some(date(2000, 1, 1)));

        let reversed =
            serde_json::from_str::<Rectangle>(r#"{"lat_min": 10, "lat_max": -10, "lon_min": 0, "lon_max": 20}"#);
        assert!(reversed.is_err());

        let lone_start = serde_json::from_str::<Rectangle>(
            r#"{"lat_min": -10, "lat_max": 10, "lon_min": 0, "lon_max": 20, "start": "2000-01-01T00:00:00"}"#,
        );
        assert!(lone_start.is_err());
    }

    #[test]
    fn tagged_bounds_keep_validation_messages() {
        let bounds: Bounds = serde_json::from_str(
            r#"{"type": "rectangle", "lat_min": -10, "lat_max": 10, "lon_min": 0, "lon_max": 20}"#,
        )
        .unwrap();
        assert_eq!(bounds, Bounds::spatial(-10.0, 10.0, 0.0, 20.0).unwrap());

        let mask = Bounds::from_mask("regions", array![[1, 2]], vec![2]).unwrap();
        let json = serde_json::to_string(&mask).unwrap();
        assert!(json.contains(r#""type":"mask""#));
        assert_eq!(serde_json::from_str::<Bounds>(&json).unwrap(), mask);

        let err = serde_json::from_str::<Bounds>(
            r#"{"type": "rectangle", "lat_min": 10, "lat_max": -10, "lon_min": 0, "lon_max": 20}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("latitude minimum"));
    }

    #[test]
    fn encloses() {
        let outer = Rectangle::new(-20.0, 20.0, -20.0, 20.0).unwrap();
        let inner = Rectangle::new(-10.0, 10.0, 0.0, 20.0).unwrap();
        assert!(outer.encloses(&inner));
        assert!(!inner.encloses(&outer));
    }
}

//! Gridded datasets
//!
//! A [`Dataset`] is a single climate variable on a rectilinear lat/lon grid over a sequence of
//! timestamps. Values are held in a `[time, lat, lon]` [`MaskedArray`] so that missing cells are
//! carried through every transform.
//!
//! Datasets are values: processor functions borrow a dataset and return a new one. The only
//! way to replace the values of an existing dataset is to give it up, e.g. via
//! [`Dataset::with_values`], which consumes `self`.
//!
//! # Examples
//!
//! ```rust
//! use chrono::NaiveDate;
//! use climeval_core::dataset::Dataset;
//! use ndarray::{array, Array3};
//!
//! let times = vec![NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()];
//! let dataset = Dataset::new(
//!     array![10.0, -10.0],
//!     array![0.0, 90.0, 180.0, 270.0],
//!     times,
//!     Array3::zeros((1, 2, 4)),
//!     "tas",
//! )
//! .unwrap();
//!
//! // Axes are normalised on construction
//! assert_eq!(dataset.lats(), &array![-10.0, 10.0]);
//! assert_eq!(dataset.lons(), &array![-180.0, -90.0, 0.0, 90.0]);
//! ```

use crate::errors::{EvalError, EvalResult};
use crate::masked::MaskedArray;
use crate::utils::grid::{collapse_meshgrid, normalize_lat_lon_values};
use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, Array3, Array4, Axis, Ix3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Temporal resolution of a time axis
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeResolution {
    Minutely,
    Hourly,
    Daily,
    Monthly,
    Yearly,
}

impl FromStr for TimeResolution {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minutely" => Ok(TimeResolution::Minutely),
            "hourly" => Ok(TimeResolution::Hourly),
            "daily" => Ok(TimeResolution::Daily),
            "monthly" => Ok(TimeResolution::Monthly),
            "yearly" | "annual" => Ok(TimeResolution::Yearly),
            _ => Err(EvalError::Resolution(s.to_string())),
        }
    }
}

impl fmt::Display for TimeResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeResolution::Minutely => "minutely",
            TimeResolution::Hourly => "hourly",
            TimeResolution::Daily => "daily",
            TimeResolution::Monthly => "monthly",
            TimeResolution::Yearly => "yearly",
        };
        write!(f, "{}", name)
    }
}

/// Latitude/longitude extent of a dataset
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

/// One variable on a lat/lon/time grid
///
/// Deserialised datasets are validated like those built with [`Dataset::from_masked`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset", into = "RawDataset")]
pub struct Dataset {
    lats: Array1<f64>,
    lons: Array1<f64>,
    times: Vec<NaiveDateTime>,
    values: MaskedArray<Ix3>,
    variable: String,
    units: Option<String>,
    name: String,
}

#[derive(Serialize, Deserialize)]
struct RawDataset {
    lats: Array1<f64>,
    lons: Array1<f64>,
    times: Vec<NaiveDateTime>,
    values: MaskedArray<Ix3>,
    variable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    units: Option<String>,
    name: String,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = EvalError;

    fn try_from(raw: RawDataset) -> Result<Self, Self::Error> {
        let mut dataset =
            Dataset::from_masked(raw.lats, raw.lons, raw.times, raw.values, raw.variable)?
                .with_name(raw.name);
        dataset.units = raw.units;
        Ok(dataset)
    }
}

impl From<Dataset> for RawDataset {
    fn from(d: Dataset) -> Self {
        RawDataset {
            lats: d.lats,
            lons: d.lons,
            times: d.times,
            values: d.values,
            variable: d.variable,
            units: d.units,
            name: d.name,
        }
    }
}

impl Dataset {
    /// Create a dataset from raw values, masking every non-finite element
    ///
    /// `values` must be indexed `[time, lat, lon]`.
    pub fn new(
        lats: Array1<f64>,
        lons: Array1<f64>,
        times: Vec<NaiveDateTime>,
        values: Array3<f64>,
        variable: impl Into<String>,
    ) -> EvalResult<Self> {
        Self::from_masked(lats, lons, times, MaskedArray::from_data(values), variable)
    }

    /// Create a dataset with an explicit missing-value mask
    pub fn with_mask(
        lats: Array1<f64>,
        lons: Array1<f64>,
        times: Vec<NaiveDateTime>,
        values: Array3<f64>,
        mask: Array3<bool>,
        variable: impl Into<String>,
    ) -> EvalResult<Self> {
        let values = MaskedArray::new(values, mask)?;
        Self::from_masked(lats, lons, times, values, variable)
    }

    /// Create a dataset from an already masked value cube
    pub fn from_masked(
        lats: Array1<f64>,
        lons: Array1<f64>,
        times: Vec<NaiveDateTime>,
        values: MaskedArray<Ix3>,
        variable: impl Into<String>,
    ) -> EvalResult<Self> {
        let variable = variable.into();
        let (lats, lons, values) = validate(lats, lons, &times, values)?;
        Ok(Self {
            lats,
            lons,
            times,
            values,
            name: variable.clone(),
            variable,
            units: None,
        })
    }

    /// Create a dataset from 2-D `[Y, X]` coordinate arrays of a rectilinear grid
    pub fn from_meshgrid(
        lats: &Array2<f64>,
        lons: &Array2<f64>,
        times: Vec<NaiveDateTime>,
        values: Array3<f64>,
        variable: impl Into<String>,
    ) -> EvalResult<Self> {
        let (lats, lons) = collapse_meshgrid(lats, lons)?;
        Self::new(lats, lons, times, values, variable)
    }

    /// Create a dataset from a `[time, level, lat, lon]` cube by keeping a single level
    pub fn from_levels(
        lats: Array1<f64>,
        lons: Array1<f64>,
        times: Vec<NaiveDateTime>,
        values: Array4<f64>,
        level: usize,
        variable: impl Into<String>,
    ) -> EvalResult<Self> {
        let n_levels = values.len_of(Axis(1));
        if level >= n_levels {
            return Err(EvalError::Value(format!(
                "level index {} is out of range for {} levels",
                level, n_levels
            )));
        }
        let values = values.index_axis(Axis(1), level).to_owned();
        Self::new(lats, lons, times, values, variable)
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the value cube, consuming the previous dataset
    pub fn with_values(self, values: MaskedArray<Ix3>) -> EvalResult<Self> {
        let expected = [self.times.len(), self.lats.len(), self.lons.len()];
        if values.shape() != expected {
            return Err(EvalError::shape_mismatch(
                "dataset values",
                &expected,
                values.shape(),
            ));
        }
        Ok(Self { values, ..self })
    }

    /// Replace the time axis and value cube together, consuming the previous dataset
    pub fn with_times_and_values(
        self,
        times: Vec<NaiveDateTime>,
        values: MaskedArray<Ix3>,
    ) -> EvalResult<Self> {
        let (lats, lons, values) = validate(self.lats, self.lons, &times, values)?;
        Ok(Self {
            lats,
            lons,
            times,
            values,
            ..self
        })
    }

    /// Replace the grid and value cube together, consuming the previous dataset
    pub fn with_grid_and_values(
        self,
        lats: Array1<f64>,
        lons: Array1<f64>,
        values: MaskedArray<Ix3>,
    ) -> EvalResult<Self> {
        let (lats, lons, values) = validate(lats, lons, &self.times, values)?;
        Ok(Self {
            lats,
            lons,
            values,
            ..self
        })
    }

    /// A new dataset with the metadata of `self` and the given coordinates and values
    pub(crate) fn derive_with(
        &self,
        lats: Array1<f64>,
        lons: Array1<f64>,
        times: Vec<NaiveDateTime>,
        values: MaskedArray<Ix3>,
    ) -> EvalResult<Self> {
        let (lats, lons, values) = validate(lats, lons, &times, values)?;
        Ok(Self {
            lats,
            lons,
            times,
            values,
            variable: self.variable.clone(),
            units: self.units.clone(),
            name: self.name.clone(),
        })
    }

    /// Apply `f` to every value, keeping the mask
    pub fn map_values<F>(self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        let values = self.values.mapv(f);
        Self { values, ..self }
    }

    pub fn lats(&self) -> &Array1<f64> {
        &self.lats
    }

    pub fn lons(&self) -> &Array1<f64> {
        &self.lons
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn values(&self) -> &MaskedArray<Ix3> {
        &self.values
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(time, lat, lon)` lengths
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.times.len(), self.lats.len(), self.lons.len())
    }

    pub fn spatial_boundaries(&self) -> SpatialExtent {
        SpatialExtent {
            lat_min: self.lats[0],
            lat_max: self.lats[self.lats.len() - 1],
            lon_min: self.lons[0],
            lon_max: self.lons[self.lons.len() - 1],
        }
    }

    /// First and last timestamps
    pub fn time_range(&self) -> (NaiveDateTime, NaiveDateTime) {
        (self.times[0], self.times[self.times.len() - 1])
    }

    /// Grid spacing as `(lat, lon)` derived from the first two points of each axis
    ///
    /// A single-point axis has a spacing of zero.
    pub fn spatial_resolution(&self) -> (f64, f64) {
        let step = |axis: &Array1<f64>| {
            if axis.len() > 1 {
                axis[1] - axis[0]
            } else {
                0.0
            }
        };
        (step(&self.lats), step(&self.lons))
    }

    /// Resolution of the time axis derived from the first time step
    pub fn temporal_resolution(&self) -> EvalResult<TimeResolution> {
        if self.times.len() < 2 {
            return Err(EvalError::Value(format!(
                "'{}' needs at least two time steps to determine its temporal resolution",
                self.name
            )));
        }
        let step = self.times[1] - self.times[0];
        let resolution = match step.num_days() {
            0 if step.num_hours() >= 1 => TimeResolution::Hourly,
            0 => TimeResolution::Minutely,
            1 => TimeResolution::Daily,
            2..=31 => TimeResolution::Monthly,
            _ => TimeResolution::Yearly,
        };
        Ok(resolution)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extent = self.spatial_boundaries();
        let (start, end) = self.time_range();
        write!(
            f,
            "<Dataset - name: {}, lat-range: ({}, {}), lon-range: ({}, {}), time-range: ({}, {}), var: {}, units: {}>",
            self.name,
            extent.lat_min,
            extent.lat_max,
            extent.lon_min,
            extent.lon_max,
            start,
            end,
            self.variable,
            self.units.as_deref().unwrap_or("unknown"),
        )
    }
}

fn validate(
    lats: Array1<f64>,
    lons: Array1<f64>,
    times: &[NaiveDateTime],
    values: MaskedArray<Ix3>,
) -> EvalResult<(Array1<f64>, Array1<f64>, MaskedArray<Ix3>)> {
    if lats.is_empty() || lons.is_empty() || times.is_empty() {
        return Err(EvalError::Value(
            "datasets need at least one latitude, longitude and time step".to_string(),
        ));
    }
    let expected = [times.len(), lats.len(), lons.len()];
    if values.shape() != expected {
        return Err(EvalError::shape_mismatch(
            "dataset values",
            &expected,
            values.shape(),
        ));
    }
    if times.windows(2).any(|w| w[1] < w[0]) {
        return Err(EvalError::Value("times must be in ascending order".to_string()));
    }
    normalize_lat_lon_values(&lats, &lons, &values)
}

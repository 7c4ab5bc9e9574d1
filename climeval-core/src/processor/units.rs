//! Unit conversions
//!
//! Conversions are linear, `converted = value * scale + offset`, and are looked up in small
//! static tables keyed by the source unit string. Water-flux conversions only apply to variables
//! that are recognised as water fluxes by name.

use crate::dataset::Dataset;
use tracing::{debug, warn};

/// A linear conversion between two unit strings
#[derive(Debug, Clone, Copy)]
pub struct UnitConversion {
    /// Accepted spellings of the source unit
    pub from: &'static [&'static str],
    pub to: &'static str,
    pub scale: f64,
    pub offset: f64,
}

impl UnitConversion {
    fn matches(&self, units: &str) -> bool {
        let units = units.trim();
        self.from.iter().any(|u| u.eq_ignore_ascii_case(units))
    }

    pub fn apply(&self, dataset: Dataset) -> Dataset {
        let (scale, offset) = (self.scale, self.offset);
        dataset
            .map_values(|v| v * scale + offset)
            .with_units(self.to)
    }
}

pub static TEMPERATURE_CONVERSIONS: &[UnitConversion] = &[UnitConversion {
    from: &["K", "kelvin", "degK"],
    to: "C",
    scale: 1.0,
    offset: -273.15,
}];

pub static WATER_FLUX_CONVERSIONS: &[UnitConversion] = &[
    UnitConversion {
        from: &[
            "kg m-2 s-1",
            "kg m^-2 s^-1",
            "kg/m2/s",
            "kg/(m2 s)",
            "mm s-1",
            "mm/s",
            "mm/sec",
        ],
        to: "mm/day",
        scale: 86400.0,
        offset: 0.0,
    },
    UnitConversion {
        from: &["m"],
        to: "mm",
        scale: 1000.0,
        offset: 0.0,
    },
];

/// Variable names treated as water fluxes
///
/// A name matches when it equals an entry, ignoring case, optionally followed by a `_` or `.`
/// suffix such as `pr_day`.
pub static WATER_FLUX_VARIABLES: &[&str] = &[
    "pr",
    "prc",
    "prsn",
    "precip",
    "precipitation",
    "evspsbl",
    "mrro",
    "mrros",
    "swe",
];

fn is_water_flux(variable: &str) -> bool {
    let base = variable
        .trim()
        .split(|c: char| c == '_' || c == '.')
        .next()
        .unwrap_or_default();
    WATER_FLUX_VARIABLES
        .iter()
        .any(|v| v.eq_ignore_ascii_case(base))
}

fn convert_with(table: &[UnitConversion], dataset: Dataset) -> Result<Dataset, Dataset> {
    let conversion = dataset
        .units()
        .and_then(|units| table.iter().find(|c| c.matches(units)))
        .copied();
    match conversion {
        Some(conversion) => {
            debug!(
                variable = %dataset.variable(),
                from = ?dataset.units(),
                to = conversion.to,
                "Converting units"
            );
            Ok(conversion.apply(dataset))
        }
        None => Err(dataset),
    }
}

/// Convert Kelvin to degrees Celsius, leaving any other unit untouched
pub fn temperature_unit_conversion(dataset: Dataset) -> Dataset {
    convert_with(TEMPERATURE_CONVERSIONS, dataset).unwrap_or_else(|d| d)
}

/// Convert water fluxes to `mm/day` (and snow water equivalent to `mm`)
///
/// Datasets whose variable is not a water flux are returned untouched.
pub fn water_flux_unit_conversion(dataset: Dataset) -> Dataset {
    if !is_water_flux(dataset.variable()) {
        return dataset;
    }
    convert_with(WATER_FLUX_CONVERSIONS, dataset).unwrap_or_else(|d| d)
}

/// Apply the known temperature and water-flux conversions
///
/// Unrecognised units pass through unchanged with a warning.
pub fn variable_unit_conversion(dataset: Dataset) -> Dataset {
    let dataset = match convert_with(TEMPERATURE_CONVERSIONS, dataset) {
        Ok(converted) => return converted,
        Err(dataset) => dataset,
    };
    if is_water_flux(dataset.variable()) {
        match convert_with(WATER_FLUX_CONVERSIONS, dataset) {
            Ok(converted) => return converted,
            Err(dataset) => return pass_through(dataset),
        }
    }
    pass_through(dataset)
}

fn pass_through(dataset: Dataset) -> Dataset {
    warn!(
        variable = %dataset.variable(),
        units = dataset.units().unwrap_or("unknown"),
        "No unit conversion known, values left unchanged"
    );
    dataset
}

use thiserror::Error;

/// Error type for invalid evaluation operations.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Malformed bound, metric list, registry entry or configuration file
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    /// Subset request that leaves nothing of the dataset behind
    #[error("Bounds error: {0}")]
    Bounds(String),
    #[error("Shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// A reshape precondition was violated, e.g. a time axis that is not a whole number of years
    #[error("Invalid shape: {0}")]
    Shape(String),
    #[error("Unsupported temporal resolution '{0}'. Expected one of minutely, hourly, daily, monthly or yearly")]
    Resolution(String),
    #[error("Unable to parse time units '{units}': {reason}")]
    TimeParse { units: String, reason: String },
    #[error("Invalid value: {0}")]
    Value(String),
    #[error("Unable to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EvalError {
    pub fn shape_mismatch(context: &str, expected: &[usize], found: &[usize]) -> Self {
        EvalError::ShapeMismatch {
            context: context.to_string(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

/// Convenience type for `Result<T, EvalError>`.
pub type EvalResult<T> = Result<T, EvalError>;

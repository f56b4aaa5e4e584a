use thiserror::Error;

/// Main error type for the RiskWatch system
#[derive(Error, Debug)]
pub enum RwError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Writing an output artifact (report, history export) failed.
    #[error("Output error: {0}")]
    Output(String),
}

impl RwError {
    /// True for errors that must abort a run before any indicator is computed
    /// (empty, non-overlapping or unreadable input).
    pub fn is_fatal_input(&self) -> bool {
        matches!(self, RwError::Data(_) | RwError::Io(_))
    }
}

/// Data-related errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    #[error("Series {series} is empty")]
    EmptySeries { series: String },

    #[error("Input series share no common trading dates")]
    NoOverlap,

    #[error("Invalid data format: {message}")]
    InvalidFormat { message: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },

    #[error("Data parsing error: {message}")]
    ParseError { message: String },
}

/// Volatility-model errors. These never abort a run; the model folds them
/// into an unavailable estimate and downstream stages fall back to realized
/// volatility.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Insufficient observations: {got} < {required}")]
    InsufficientData { got: usize, required: usize },

    #[error("Return series is degenerate (variance {variance:e})")]
    DegenerateSeries { variance: f64 },

    #[error("Optimizer did not converge after {iterations} iterations")]
    ConvergenceFailed { iterations: usize },

    #[error("Numerical instability: {message}")]
    NumericalInstability { message: String },

    #[error("Invalid parameters: omega={omega}, alpha={alpha}, beta={beta}")]
    InvalidParameters { omega: f64, alpha: f64, beta: f64 },
}

/// Result type alias for RiskWatch operations
pub type RwResult<T> = Result<T, RwError>;

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::errors::RwError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::errors::RwError::Config(format!($($arg)*))
    };
}

/// Macro for creating output errors
#[macro_export]
macro_rules! output_error {
    ($($arg:tt)*) => {
        $crate::errors::RwError::Output(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ModelError::InsufficientData { got: 12, required: 30 };

        assert!(error.to_string().contains("Insufficient observations"));
        assert!(error.to_string().contains("12"));
        assert!(error.to_string().contains("30"));
    }

    #[test]
    fn test_error_conversion() {
        let data_error = DataError::EmptySeries {
            series: "VIX".to_string(),
        };
        let rw_error: RwError = data_error.into();

        match rw_error {
            RwError::Data(DataError::EmptySeries { ref series }) => assert_eq!(series, "VIX"),
            _ => panic!("Expected Data error"),
        }
        assert!(rw_error.is_fatal_input());
    }

    #[test]
    fn model_errors_are_not_fatal_input() {
        let err: RwError = ModelError::ConvergenceFailed { iterations: 10 }.into();
        assert!(!err.is_fatal_input());
        assert!(!config_error!("bad window {}", 0).is_fatal_input());
    }

    #[test]
    fn output_errors_are_not_fatal_input() {
        let err = output_error!("cannot write {}", "docs/risk_report.json");
        assert!(!err.is_fatal_input());
        assert!(err.to_string().starts_with("Output error"));
    }

    #[test]
    fn test_macros() {
        let _internal_err = internal_error!("Something went wrong");
        let _config_err = config_error!("Missing required field: {}", "vix");
    }
}

//! Error types.
//!
//! Two layers:
//!
//! - [`ModelError`]: typed failures raised by the library (interpolation, loss
//!   models, sweeps, file parsing). These carry enough context to locate the
//!   problem (table name, file line, grid coordinate).
//! - [`AppError`]: what the binary reports. Each error has a process exit code:
//!   `2` usage/IO/malformed input, `3` data-domain problems, `4` computational failures.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Insufficient data for {what}: need at least {needed} points, got {got}.")]
    InsufficientData {
        what: String,
        needed: usize,
        got: usize,
    },

    #[error("{what}: {value:e} lies outside the valid domain [{min:e}, {max:e}].")]
    DomainExtrapolation {
        what: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Malformed input in {input}{}: {message}", line_suffix(.line))]
    MalformedInput {
        input: String,
        line: Option<usize>,
        message: String,
    },

    #[error("Singular model: {what} at T={temperature} K, f={frequency:e} Hz.")]
    SingularModel {
        what: String,
        temperature: f64,
        frequency: f64,
    },

    #[error("Fit failed: {what}.")]
    FitFailed { what: String },

    #[error("Invalid parameter {what}: {message}")]
    InvalidParameter { what: String, message: String },

    #[error("At grid point T={temperature} K, f={frequency:e} Hz: {source}")]
    AtGridPoint {
        temperature: f64,
        frequency: f64,
        #[source]
        source: Box<ModelError>,
    },
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" (line {line})"),
        None => String::new(),
    }
}

impl ModelError {
    pub fn malformed(input: impl Into<String>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            input: input.into(),
            line,
            message: message.into(),
        }
    }

    pub fn invalid(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Attach a sweep coordinate. Errors that already carry one are returned unchanged.
    pub fn at_point(self, temperature: f64, frequency: f64) -> Self {
        match self {
            Self::AtGridPoint { .. } | Self::SingularModel { .. } => self,
            other => Self::AtGridPoint {
                temperature,
                frequency,
                source: Box::new(other),
            },
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MalformedInput { .. } | Self::InvalidParameter { .. } => 2,
            Self::InsufficientData { .. } | Self::DomainExtrapolation { .. } => 3,
            Self::SingularModel { .. } | Self::FitFailed { .. } => 4,
            Self::AtGridPoint { source, .. } => source.exit_code(),
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let short = ModelError::InsufficientData {
            what: "table".into(),
            needed: 4,
            got: 2,
        };
        assert_eq!(AppError::from(short).exit_code(), 3);

        let singular = ModelError::SingularModel {
            what: "substrate c_v <= 0".into(),
            temperature: 12.0,
            frequency: 390.0,
        };
        assert_eq!(AppError::from(singular).exit_code(), 4);

        let bad = ModelError::malformed("modes.txt", Some(3), "expected 2 columns");
        assert_eq!(AppError::from(bad.clone()).exit_code(), 2);
        assert_eq!(bad.to_string(), "Malformed input in modes.txt (line 3): expected 2 columns");
    }

    #[test]
    fn grid_point_wrapper_keeps_inner_exit_code() {
        let err = ModelError::DomainExtrapolation {
            what: "dilution curve".into(),
            value: 10.0,
            min: 100.0,
            max: 200.0,
        }
        .at_point(300.0, 10.0);
        assert!(matches!(err, ModelError::AtGridPoint { .. }));
        assert_eq!(err.exit_code(), 3);

        // Already-located errors are not wrapped twice.
        let again = err.clone().at_point(1.0, 1.0);
        assert_eq!(again, err);
    }
}

//! Error types for the QAP solver.
//!
//! Every fallible operation returns [`AcoResult`]. Nothing is retried: an
//! error aborts the run (or the whole experiment) it was raised in.

use thiserror::Error;

/// Result type alias for solver operations.
pub type AcoResult<T> = Result<T, AcoError>;

/// Unified error type for the solver.
#[derive(Debug, Error)]
pub enum AcoError {
    /// Matrix or path dimensions do not agree, `N < 1`, or a matrix holds a
    /// negative or non-finite entry.
    #[error("Input shape error: {0}")]
    InputShape(String),

    /// A path evaluated to a fitness whose reciprocal cannot be deposited.
    #[error("Degenerate fitness {fitness} for path {path:?}")]
    DegenerateFitness {
        /// Offending fitness value.
        fitness: f64,
        /// Path that produced it.
        path: Vec<usize>,
    },

    /// Invalid algorithm parameter.
    #[error("Parameter error: {0}")]
    Parameter(String),

    /// Malformed instance text.
    #[error("Parse error at token {position}: {message}")]
    Parse {
        /// Zero-based index of the offending token.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AcoError {
    /// Create an input shape error.
    #[must_use]
    pub fn shape(message: impl Into<String>) -> Self {
        Self::InputShape(message.into())
    }

    /// Create a parameter error.
    #[must_use]
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AcoError::shape("distance matrix has 3 rows, expected 4");
        assert_eq!(
            err.to_string(),
            "Input shape error: distance matrix has 3 rows, expected 4"
        );

        let err = AcoError::DegenerateFitness {
            fitness: 0.0,
            path: vec![0, 1],
        };
        assert!(err.to_string().contains("[0, 1]"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AcoError = io.into();
        assert!(matches!(err, AcoError::Io(_)));
    }
}

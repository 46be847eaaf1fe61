//! Error taxonomy shared by every measurement transform.
//!
//! All errors are raised synchronously by the operation that violates its
//! contract. Operands are never mutated, so a failed transform leaves the
//! source measurement untouched.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeasurementError {
    /// Invalid or contradictory constructor/transform arguments.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// Rank or ordinal-length invariant violated.
    #[error("axes metadata mismatch: {0}")]
    AxesMismatch(String),
    /// Concatenation or equality precondition violated.
    #[error("incompatible axes: {0}")]
    IncompatibleAxis(String),
    #[error("base axes cannot be reduced (requested {axes:?})")]
    ReduceOnBaseAxis { axes: Vec<usize> },
    #[error("base axes cannot be indexed (requested {axes:?})")]
    IndexOnBaseAxis { axes: Vec<usize> },
    /// Requested angle exceeds the simulated bandwidth.
    #[error("angle {angle} exceeds the maximum simulated angle {max:?}")]
    AngleOutOfRange { angle: f64, max: (f64, f64) },
    #[error("unsupported mode: {0}")]
    UnsupportedMode(String),
    /// Elementwise operation across mismatched shape, sampling or axes.
    #[error("incompatible measurements: {0}")]
    IncompatibleMeasurement(String),
    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: isize, len: usize },
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("i/o failed: {0}")]
    Io(String),
}

impl From<serde_json::Error> for MeasurementError {
    fn from(err: serde_json::Error) -> Self {
        MeasurementError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for MeasurementError {
    fn from(err: std::io::Error) -> Self {
        MeasurementError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MeasurementError>;

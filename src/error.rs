//! Error types for asymmetry analysis.
//!
//! Every error is fatal to the computation that raised it and carries the
//! offending counts or dimensions. Recoverable numerical anomalies are not
//! errors; see [`crate::warning::ComputationWarning`].

use thiserror::Error;

/// Main error type for asymmetry analysis operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AsymmetryError {
    /// Too few usable landmarks or samples.
    #[error("Insufficient data for {context}: need at least {required}, got {actual}")]
    InsufficientData {
        context: String,
        required: usize,
        actual: usize,
    },

    /// Paired structures disagree in length or shape.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Requested more principal components than the data can provide.
    #[error("Invalid component count: requested {requested}, available {available}")]
    InvalidComponentCount { requested: usize, available: usize },

    /// Spike order is not smaller than the sample dimensionality.
    #[error("Spike order {order} too large for sample dimension {dimension}")]
    SpikeOrderTooLarge { order: usize, dimension: usize },

    /// The assignment solver could not produce a perfect matching.
    #[error("Assignment failed: {0}")]
    AssignmentFailed(String),

    /// Numerical computation resulted in NaN or Inf.
    #[error("Numerical instability: {context}")]
    NumericalInstability { context: String },

    /// Input validation errors.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for asymmetry analysis operations.
pub type Result<T> = std::result::Result<T, AsymmetryError>;

impl AsymmetryError {
    /// Create an insufficient data error.
    #[must_use]
    pub fn insufficient_data(context: impl Into<String>, required: usize, actual: usize) -> Self {
        Self::InsufficientData {
            context: context.into(),
            required,
            actual,
        }
    }

    /// Create a dimension mismatch error.
    #[must_use]
    pub fn dimension_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create an invalid component count error.
    #[must_use]
    pub const fn invalid_component_count(requested: usize, available: usize) -> Self {
        Self::InvalidComponentCount {
            requested,
            available,
        }
    }

    /// Create a spike order error.
    #[must_use]
    pub const fn spike_order_too_large(order: usize, dimension: usize) -> Self {
        Self::SpikeOrderTooLarge { order, dimension }
    }

    /// Create an assignment failure.
    #[must_use]
    pub fn assignment(msg: impl Into<String>) -> Self {
        Self::AssignmentFailed(msg.into())
    }

    /// Create a numerical instability error.
    #[must_use]
    pub fn numerical_instability(context: impl Into<String>) -> Self {
        Self::NumericalInstability {
            context: context.into(),
        }
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

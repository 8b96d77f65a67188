//! Error types for ForensicFlow.

use crate::domain::Domain;
use thiserror::Error;

/// Result type alias using `FlowError`.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that can occur while validating input or running the analysis.
#[derive(Debug, Error)]
pub enum FlowError {
    /// One or more required fields are absent or blank.
    #[error("Row {row}{}: missing required field(s): {}", tx_suffix(.transaction_id), .fields.join(", "))]
    MissingFields {
        /// 1-based row number in the input sequence.
        row: usize,
        /// Transaction id, when the row carried one.
        transaction_id: Option<String>,
        /// Names of the missing fields.
        fields: Vec<String>,
    },

    /// The amount field could not be parsed or is negative.
    #[error("Row {row}{}: invalid amount {value:?}: {reason}", tx_suffix(.transaction_id))]
    InvalidAmount {
        /// 1-based row number.
        row: usize,
        /// Transaction id, when present.
        transaction_id: Option<String>,
        /// Offending raw value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The timestamp field matched none of the accepted formats.
    #[error("Row {row}{}: unparsable timestamp {value:?}", tx_suffix(.transaction_id))]
    InvalidTimestamp {
        /// 1-based row number.
        row: usize,
        /// Transaction id, when present.
        transaction_id: Option<String>,
        /// Offending raw value.
        value: String,
    },

    /// Generic input validation failure.
    #[error("Input validation failed: {0}")]
    ValidationError(String),

    /// A stage referenced state that the upstream stages never produced.
    #[error("Invariant violated in {domain}: {message}")]
    InvariantViolation {
        /// Stage domain that detected the violation.
        domain: Domain,
        /// Description of the violation.
        message: String,
    },

    /// Kernel not found in registry.
    #[error("Kernel not found: {0}")]
    KernelNotFound(String),

    /// Kernel already registered.
    #[error("Kernel already registered: {0}")]
    KernelAlreadyRegistered(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Timeout waiting for a stage.
    #[error("Timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Internal error.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn tx_suffix(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" (transaction {id})"),
        None => String::new(),
    }
}

impl FlowError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        FlowError::ValidationError(msg.into())
    }

    /// Create an invariant violation raised by the given stage.
    #[must_use]
    pub fn invariant(domain: Domain, msg: impl Into<String>) -> Self {
        FlowError::InvariantViolation {
            domain,
            message: msg.into(),
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        FlowError::InternalError(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        FlowError::ConfigError(msg.into())
    }

    /// Create a kernel not found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        FlowError::KernelNotFound(id.into())
    }

    /// Returns true if the caller can fix the input and retry.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FlowError::MissingFields { .. }
                | FlowError::InvalidAmount { .. }
                | FlowError::InvalidTimestamp { .. }
                | FlowError::ValidationError(_)
                | FlowError::ConfigError(_)
                | FlowError::Timeout(_)
        )
    }

    /// Returns true if this error rejects the caller's input.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            FlowError::MissingFields { .. }
                | FlowError::InvalidAmount { .. }
                | FlowError::InvalidTimestamp { .. }
                | FlowError::ValidationError(_)
        )
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::SerializationError(err.to_string())
    }
}

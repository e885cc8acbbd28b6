//! Core error types for the pool engine.
//!
//! This module defines storage-agnostic error types. Ledger-specific errors
//! (from whatever store backs the engine) are converted to these types by the
//! ledger layer.

use thiserror::Error;

use crate::investments::eligibility::RejectionReason;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
///
/// The four failure classes the engine distinguishes:
/// - [`Error::Rejected`]: eligibility gate rejections. User-recoverable,
///   surfaced with a specific reason, never retried automatically.
/// - [`Error::NotFound`]: a referenced pool/investment/user does not exist.
///   Terminal for the operation.
/// - [`Error::StateConflict`]: an attempted transition violates the current
///   state (e.g. resuming a pool that is not paused). Terminal, surfaced to
///   the caller.
/// - [`Error::Ledger`] with [`LedgerError::Unavailable`]: transient
///   infrastructure failure. Schedulers retry on the next tick; request-path
///   operations fail the single request without side effects.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Capital movement rejected: {0}")]
    Rejected(#[from] RejectionReason),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Notification dispatch failed: {0}")]
    Notification(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Shorthand for a NotFound error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a StateConflict error.
    pub fn state_conflict(msg: impl Into<String>) -> Self {
        Error::StateConflict(msg.into())
    }

    /// True when the error is transient and the operation may be retried on
    /// a later scheduler tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Ledger(LedgerError::Unavailable(_)))
    }
}

/// Storage-agnostic error type for ledger operations.
///
/// Uses `String` for all error details so a concrete store (SQL, KV, ...)
/// can convert its own errors into this format.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The ledger store could not be reached. Transient.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// A conditional write found the record in an unexpected state.
    #[error("Conditional write failed: {0}")]
    WriteConflict(String),

    /// A ledger query failed to execute.
    #[error("Ledger query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Validation errors for malformed input data.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] chrono::ParseError),
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

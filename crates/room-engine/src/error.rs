//! Error types for room-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A reservation's start or end could not be turned into a valid interval.
    #[error("Malformed interval for reservation {id}: {reason}")]
    MalformedInterval { id: String, reason: String },

    /// A batch of records is not a JSON object or array.
    #[error("Invalid reservation records: {0}")]
    InvalidRecords(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid engine config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

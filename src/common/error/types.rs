//! Unified error types for csv-dialect.
//!
//! Errors fall into two classes. Configuration errors (`Configuration`,
//! `DuplicateHeader`) leave the engine usable. Fatal errors (`Io`,
//! `SafetyLimitExceeded`) close the engine before they are returned, so any
//! later call reports `Closed`.
use std::fmt;
use thiserror::Error;

/// Which safety ceiling a record ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyLimitKind {
    /// Too many fields in one record
    FieldCount,
    /// Too many characters in one field
    FieldLength,
}

impl fmt::Display for SafetyLimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyLimitKind::FieldCount => f.write_str("field count"),
            SafetyLimitKind::FieldLength => f.write_str("field length"),
        }
    }
}

/// Main error type for csv-dialect operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error reported by the underlying source or sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid dialect or constructor argument
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A header list named the same column twice
    #[error("Duplicate header name: {0:?}")]
    DuplicateHeader(String),

    /// The engine was closed, explicitly or by an earlier fatal error
    #[error("This engine has already been closed")]
    Closed,

    /// A record exceeded one of the safety ceilings
    #[error("Safety limit exceeded: {kind} over {limit} in record {record}")]
    SafetyLimitExceeded {
        kind: SafetyLimitKind,
        limit: usize,
        record: u64,
    },
}

impl Error {
    /// Whether this error closed the engine that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::SafetyLimitExceeded { .. })
    }
}

/// Result type for csv-dialect operations.
pub type Result<T> = std::result::Result<T, Error>;

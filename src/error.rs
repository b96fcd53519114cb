//! Error types for the query DSL
//!
//! Every fallible operation in this crate reports one of the variants below.
//! The first four are caller-input errors: they are always reported and never
//! clamped or defaulted. `Entropy` is an environment fault raised when the
//! secure random source cannot be read.

use thiserror::Error;

/// Main error type for the query DSL
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed range expression or identifier text
    #[error("Format error: {0}")]
    Format(String),

    /// Unknown IANA timezone name
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Date-time literal does not match the fixed layout or does not exist in the zone
    #[error("Invalid date-time: {0}")]
    InvalidDateTime(String),

    /// Argument outside of its documented domain (non-positive divisor, empty id list, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operating system's secure random source is unavailable
    #[error("Secure random source unavailable: {0}")]
    Entropy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a format error for an unexpected character in a text expression
    ///
    /// `position` is the 0-based byte offset of `ch` in the input.
    pub fn unexpected_char(ch: char, position: usize) -> Self {
        Error::Format(format!("1:{}: unexpected char '{}'", position, ch))
    }

    /// Returns true if the error was caused by the caller's input
    ///
    /// Caller errors should be reported back to the requester. Everything else
    /// is an environment fault that aborts the current request.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::Format(_)
                | Error::InvalidTimezone(_)
                | Error::InvalidDateTime(_)
                | Error::InvalidArgument(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

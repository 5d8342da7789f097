//! Error types for the strand core library
//!
//! Errors are split along one axis that matters to callers: transient
//! (worth retrying) versus definitive (actionable only by changing the
//! request). Nothing in this crate catches and logs; failures propagate
//! to the caller or are retried under the bounded policies in
//! [`crate::retry`] and [`crate::consistency`].

use thiserror::Error;

/// Result alias used throughout strand
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for strand operations
#[derive(Error, Debug)]
pub enum Error {
    /// A location string could not be parsed
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    /// Object or file not found
    #[error("not found: {0}")]
    NotFound(String),

    /// The source of a copy does not exist
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// The destination of a copy already exists and neither force nor
    /// skip was requested
    #[error("destination already exists: {0}")]
    DestinationExists(String),

    /// An exclusive create found the target already present
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Transferred bytes do not match the provider-reported etag
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// Network or provider error (may be transient)
    #[error("network error: {0}")]
    Network(String),

    /// Authentication or authorization failure
    #[error("authentication error: {0}")]
    Auth(String),

    /// An option was requested that does not apply to the target
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// An open mode was requested that the location cannot support
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// Named profile does not exist
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors that do not fit other categories
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether this error class may clear on its own and is worth
    /// retrying with backoff.
    ///
    /// Integrity failures count as transient: an etag mismatch usually
    /// means a corrupted connection, not a permanent fault, and the
    /// failed-copy guarantees leave no partial destination behind.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Integrity(_) => true,
            Error::Network(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout")
                    || msg_lower.contains("connection reset")
                    || msg_lower.contains("connection refused")
                    || msg_lower.contains("503")
                    || msg_lower.contains("500")
                    || msg_lower.contains("service unavailable")
                    || msg_lower.contains("internal error")
                    || msg_lower.contains("too many requests")
                    || msg_lower.contains("429")
                    || msg_lower.contains("request rate")
                    || msg_lower.contains("slow down")
            }
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
            ),
            Error::InvalidLocation(_)
            | Error::NotFound(_)
            | Error::SourceNotFound(_)
            | Error::DestinationExists(_)
            | Error::AlreadyExists(_)
            | Error::Auth(_)
            | Error::InvalidOption(_)
            | Error::InvalidMode(_)
            | Error::ProfileNotFound(_)
            | Error::Config(_) => false,
            Error::General(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout") || msg_lower.contains("temporary")
            }
        }
    }
}

//! Process exit codes
//!
//! Stable mapping from command outcomes to exit codes so scripts can
//! branch on failure class.

use strand_core::Error;

/// Exit codes reported by the strand binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Command completed
    Success,
    /// Unclassified failure
    GeneralError,
    /// Bad arguments or an invalid location string
    UsageError,
    /// Source, object, or profile not found
    NotFound,
    /// Provider or network failure
    NetworkError,
}

impl ExitCode {
    /// Map a core error to the exit code scripts should see
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::InvalidLocation(_)
            | Error::InvalidOption(_)
            | Error::InvalidMode(_)
            | Error::DestinationExists(_)
            | Error::AlreadyExists(_) => ExitCode::UsageError,
            Error::NotFound(_) | Error::SourceNotFound(_) | Error::ProfileNotFound(_) => {
                ExitCode::NotFound
            }
            Error::Network(_) | Error::Integrity(_) | Error::Auth(_) => ExitCode::NetworkError,
            Error::Config(_) | Error::Io(_) | Error::General(_) => ExitCode::GeneralError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        match code {
            ExitCode::Success => std::process::ExitCode::from(0),
            ExitCode::GeneralError => std::process::ExitCode::from(1),
            ExitCode::UsageError => std::process::ExitCode::from(2),
            ExitCode::NotFound => std::process::ExitCode::from(3),
            ExitCode::NetworkError => std::process::ExitCode::from(4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ExitCode::from_error(&Error::NotFound("x".to_string())),
            ExitCode::NotFound
        );
        assert_eq!(
            ExitCode::from_error(&Error::InvalidLocation("x".to_string())),
            ExitCode::UsageError
        );
        assert_eq!(
            ExitCode::from_error(&Error::Network("x".to_string())),
            ExitCode::NetworkError
        );
    }
}

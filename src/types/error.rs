//! Error types for Turnstile
//!
//! One crate-wide taxonomy: validation and creation failures are
//! caller-fixable, not-found is absence, auth failures carry no detail
//! beyond "access denied", internal errors are opaque to the caller.

use hyper::StatusCode;

/// Main error type for Turnstile operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input, rejected before any store access
    #[error("{0}")]
    Validation(String),

    /// Store-level rejection during provisioning or claim assignment;
    /// the system is back in its pre-call state when this surfaces
    #[error("{0}")]
    Creation(String),

    /// Lookup miss
    #[error("{0}")]
    NotFound(String),

    /// Bad credential or lockout
    #[error("{0}")]
    Auth(String),

    /// Raised by an account store when it refuses an operation for a
    /// reportable reason (uniqueness, password policy). The identity
    /// manager consumes this and rephrases it as `Creation`.
    #[error("{0}")]
    Rejected(String),

    /// Store backend failure
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level request problem
    #[error("HTTP error: {0}")]
    Http(String),

    /// Unexpected collaborator failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Creation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Rejected(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Http(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for Error {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for Turnstile operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::Validation("Invalid Username".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Auth("Login failed".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::NotFound("missing".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Database("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_user_facing_errors_display_bare_message() {
        assert_eq!(
            Error::Validation("Invalid Username".into()).to_string(),
            "Invalid Username"
        );
        assert_eq!(Error::Auth("Login failed".into()).to_string(), "Login failed");
    }
}

//! Error types for the RIM client.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, API, storage and input validation errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for RIM client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (missing or rejected credentials).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Non-success responses returned by the API.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Credential storage errors.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation errors (bad URLs, header values, payloads).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns true if this error is an HTTP 401 from the API.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api(err) if err.is_unauthorized())
    }

    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(err) => Some(err.status),
            Error::Auth(AuthError::RefreshFailed { status, .. }) => *status,
            _ => None,
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("failed to decode response: {message}")]
    Decode { message: String },

    /// WebSocket protocol or I/O failure.
    #[error("websocket error: {message}")]
    WebSocket { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            TransportError::Decode {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Authentication-related errors.
///
/// These are `Clone` so that a single refresh outcome can be handed to
/// every request queued behind it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No refresh token is stored, so the session cannot be recovered.
    #[error("session expired: no refresh token available")]
    MissingRefreshToken,

    /// The refresh call failed.
    #[error("token refresh failed: {reason}")]
    RefreshFailed { status: Option<u16>, reason: String },

    /// The refresh initiator went away before the refresh settled.
    #[error("token refresh abandoned before completion")]
    RefreshAbandoned,

    /// The operation requires a stored access token.
    #[error("not logged in")]
    NotAuthenticated,
}

impl AuthError {
    /// Derive the error handed to queued requests from a refresh failure.
    pub fn refresh_failed(err: &Error) -> Self {
        match err {
            Error::Auth(auth) => auth.clone(),
            other => AuthError::RefreshFailed {
                status: other.status(),
                reason: other.to_string(),
            },
        }
    }
}

/// A non-success response from the API.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Error detail reported by the server (if present).
    pub detail: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref detail) = self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: u16, detail: Option<String>) -> Self {
        Self { status, detail }
    }

    /// Check if this is an authorization failure.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Credential storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The stored data could not be parsed.
    #[error("corrupt credential store {path}: {message}")]
    Corrupt { path: String, message: String },

    /// The store lock was poisoned by a panicking writer.
    #[error("credential store lock poisoned")]
    Poisoned,
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Invalid WebSocket base URL.
    #[error("invalid socket URL '{value}': {reason}")]
    SocketUrl { value: String, reason: String },

    /// A token contains characters that cannot go into a header.
    #[error("token is not a valid header value")]
    TokenEncoding,

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_detail() {
        let err = ApiError::new(404, Some("Bike not found".into()));
        assert_eq!(err.to_string(), "HTTP 404: Bike not found");
        assert_eq!(ApiError::new(503, None).to_string(), "HTTP 503");
    }

    #[test]
    fn unauthorized_detection() {
        assert!(Error::from(ApiError::new(401, None)).is_unauthorized());
        assert!(!Error::from(ApiError::new(403, None)).is_unauthorized());
        assert!(!Error::from(AuthError::MissingRefreshToken).is_unauthorized());
    }

    #[test]
    fn refresh_failure_keeps_status_and_reason() {
        let err = Error::from(ApiError::new(400, Some("Token has expired".into())));
        let derived = AuthError::refresh_failed(&err);
        assert_eq!(
            derived,
            AuthError::RefreshFailed {
                status: Some(400),
                reason: "API error: HTTP 400: Token has expired".into(),
            }
        );
    }

    #[test]
    fn refresh_failure_passes_auth_errors_through() {
        let err = Error::from(AuthError::MissingRefreshToken);
        assert_eq!(
            AuthError::refresh_failed(&err),
            AuthError::MissingRefreshToken
        );
    }
}

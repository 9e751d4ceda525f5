//! Shared error type across sieve crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request or config.
    BadRequest,
    /// Batch too large.
    PayloadTooLarge,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Relay is draining.
    Unavailable,
    /// Internal error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SieveError>;

/// Unified error type used by core and relay.
#[derive(Debug, Error)]
pub enum SieveError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("unavailable")]
    Unavailable,
    #[error("sink failed: {0}")]
    Sink(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SieveError {
    /// Map internal error to a stable client-facing code.
    ///
    /// Sink failures never reach clients directly; they report as internal.
    pub fn client_code(&self) -> ClientCode {
        match self {
            SieveError::BadRequest(_) => ClientCode::BadRequest,
            SieveError::PayloadTooLarge => ClientCode::PayloadTooLarge,
            SieveError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            SieveError::Unavailable => ClientCode::Unavailable,
            SieveError::Sink(_) | SieveError::Internal(_) => ClientCode::Internal,
        }
    }
}

//! Error types for request dispatch and transport.
//!
//! # Design
//! Two families of failure exist and they never mix. `TransportError` is what
//! a transport reports for a single request (DNS, TLS, bad URL, timeout); the
//! executor turns it into a terminal `set_error` write on the handle, so the
//! caller only ever sees it as status `0` plus a message in the body.
//! `HttpsError` is returned directly to the caller: usage mistakes such as
//! reading a response that is not ready yet, and failures to schedule work.

use thiserror::Error;

/// Errors returned to the caller of the dispatcher and handle accessors.
#[derive(Debug, Error)]
pub enum HttpsError {
    /// `require_response` was called before the terminal write happened.
    #[error("request is not yet complete")]
    NotComplete,

    /// The background worker for a request could not be started.
    #[error("failed to spawn request worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// Request options could not be decoded.
    #[error("invalid request options: {0}")]
    InvalidOptions(String),
}

/// Errors reported by a `Transport` for one request.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be built (malformed URL, bad method or header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, TLS, protocol or timeout failure.
    #[error("{0}")]
    Transport(String),

    /// The response body is larger than the configured limit.
    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(u64),

    /// Reading the response body failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Io(e) => TransportError::Io(e),
            ureq::Error::Http(e) => TransportError::InvalidRequest(e.to_string()),
            ureq::Error::BodyExceedsLimit(limit) => TransportError::BodyTooLarge(limit),
            ureq::Error::BadUri(uri) => TransportError::InvalidRequest(format!("bad uri: {uri}")),
            other => TransportError::Transport(other.to_string()),
        }
    }
}

/// Result type alias using `HttpsError`.
pub type Result<T> = std::result::Result<T, HttpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_complete_message_is_explicit() {
        assert_eq!(HttpsError::NotComplete.to_string(), "request is not yet complete");
    }

    #[test]
    fn transport_message_is_passed_through() {
        let err = TransportError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn body_limit_maps_to_body_too_large() {
        let err = TransportError::from(ureq::Error::BodyExceedsLimit(4));
        assert!(matches!(err, TransportError::BodyTooLarge(4)));
        assert_eq!(err.to_string(), "response body exceeds 4 bytes");
    }
}

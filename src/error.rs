//! Unified error types for the portfolio feed client.

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] WsError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Transport-level failures of a feed connection.
///
/// Every variant that reaches a consumer as a `FeedEvent::Error` is terminal
/// for that connection instance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WsError {
    #[error("Not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timed out after {0}ms")]
    Timeout(u64),

    #[error("Invalid WebSocket URL: {0}")]
    InvalidUrl(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Connection closed unexpectedly: code={code:?} reason={reason}")]
    Closed { code: Option<u16>, reason: String },

    #[error("No Tokio runtime available to drive the connection")]
    NoRuntime,
}

#[cfg(feature = "ws-native")]
impl From<tokio_tungstenite::tungstenite::Error> for WsError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error;
        match err {
            Error::ConnectionClosed | Error::AlreadyClosed => WsError::Closed {
                code: None,
                reason: err.to_string(),
            },
            Error::Io(e) => WsError::Io(e.to_string()),
            Error::Protocol(e) => WsError::Protocol(e.to_string()),
            Error::Url(e) => WsError::InvalidUrl(e.to_string()),
            Error::Http(resp) => {
                WsError::ConnectionFailed(format!("HTTP error: {}", resp.status()))
            }
            Error::HttpFormat(e) => WsError::ConnectionFailed(e.to_string()),
            other => WsError::Protocol(other.to_string()),
        }
    }
}

/// Reasons a single feed payload could not become a sample.
///
/// Always recovered locally: the payload is dropped and the window untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Malformed payload: {0}")]
    Json(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Non-finite portfolio value: {0}")]
    NonFiniteValue(f64),

    #[error("Invalid holdings field `{field}`: {value}")]
    InvalidHoldings { field: &'static str, value: f64 },
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Json(err.to_string())
    }
}

use std::error::Error as StdError;

use serde_json::Value;
use thiserror::Error;

use crate::jsonrpc::JsonRpcError;

/// Boxed lower-level cause attached to a library error.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type used throughout Josser.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Marker for every error that originates from Josser.
///
/// Carries no behaviour of its own. Use [`is_josser_error`] to classify an
/// arbitrary `dyn Error`, or match on [`Error`] to tell the kinds apart.
pub trait JosserError: StdError + Send + Sync + 'static {}

/// The response could not be decoded or is not a valid JSON-RPC message.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct InvalidResponseError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl InvalidResponseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Build the error with the lower-level failure that caused it.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Consume the error and hand back the wrapped cause, if any.
    pub fn into_source(self) -> Option<BoxError> {
        self.source
    }
}

/// The remote procedure failed and said so in a well-formed response.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("RPC fault {code}: {message}")]
pub struct RpcFaultError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcFaultError {
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

impl From<JsonRpcError> for RpcFaultError {
    fn from(err: JsonRpcError) -> Self {
        Self::new(err.code, err.message, err.data)
    }
}

/// The request was not delivered, or no response could be read back.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed before a response was received")]
    ConnectionClosed,

    #[error("Timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Response exceeds {limit} bytes")]
    ResponseTooLarge { limit: u64 },

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[source] BoxError),
}

/// Any error raised by the Josser client.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidResponse(#[from] InvalidResponseError),

    #[error(transparent)]
    RpcFault(#[from] RpcFaultError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Error {
    pub fn is_invalid_response(&self) -> bool {
        matches!(self, Self::InvalidResponse(_))
    }

    pub fn is_rpc_fault(&self) -> bool {
        matches!(self, Self::RpcFault(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn as_rpc_fault(&self) -> Option<&RpcFaultError> {
        match self {
            Self::RpcFault(fault) => Some(fault),
            _ => None,
        }
    }

    pub fn as_invalid_response(&self) -> Option<&InvalidResponseError> {
        match self {
            Self::InvalidResponse(err) => Some(err),
            _ => None,
        }
    }
}

impl JosserError for InvalidResponseError {}
impl JosserError for RpcFaultError {}
impl JosserError for TransportError {}
impl JosserError for Error {}

/// Whether `err` is one of Josser's own error types.
///
/// Only the error itself is inspected, not its `source()` chain: an
/// `std::io::Error` wrapped inside a [`TransportError`] is still a generic
/// error when examined on its own.
pub fn is_josser_error(err: &(dyn StdError + 'static)) -> bool {
    err.is::<Error>()
        || err.is::<InvalidResponseError>()
        || err.is::<RpcFaultError>()
        || err.is::<TransportError>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn assert_josser<E: JosserError>(_: &E) {}

    #[test]
    fn invalid_response_is_josser_error() {
        let err = InvalidResponseError::new("Response is not an object");
        assert_josser(&err);
        assert!(is_josser_error(&err));

        let wrapped = Error::from(err);
        assert!(is_josser_error(&wrapped));
        assert!(wrapped.is_invalid_response());
    }

    #[test]
    fn invalid_response_preserves_message_and_source() {
        let cause = io::Error::new(io::ErrorKind::UnexpectedEof, "truncated payload");
        let err = InvalidResponseError::with_source("Failed to decode response", cause);

        assert_eq!(err.message(), "Failed to decode response");
        assert_eq!(err.to_string(), "Failed to decode response");

        let source = err.source().unwrap();
        let io_err = source.downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(io_err.to_string(), "truncated payload");
    }

    #[test]
    fn invalid_response_without_source() {
        let err = InvalidResponseError::new("Response id mismatch");
        assert!(err.source().is_none());
        assert!(err.into_source().is_none());
    }

    #[test]
    fn invalid_response_and_rpc_fault_are_distinct() {
        let invalid: Error = InvalidResponseError::new("bad").into();
        let fault: Error = RpcFaultError::new(-32601, "Method not found", None).into();

        assert!(is_josser_error(&invalid));
        assert!(is_josser_error(&fault));

        assert!(invalid.is_invalid_response() && !invalid.is_rpc_fault());
        assert!(fault.is_rpc_fault() && !fault.is_invalid_response());

        let bare = RpcFaultError::new(-32601, "Method not found", None);
        let dyn_err: &(dyn StdError + 'static) = &bare;
        assert!(dyn_err.downcast_ref::<RpcFaultError>().is_some());
        assert!(dyn_err.downcast_ref::<InvalidResponseError>().is_none());
    }

    #[test]
    fn generic_errors_are_not_josser_errors() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(!is_josser_error(&io_err));

        let parse_err = "x".parse::<i32>().unwrap_err();
        assert!(!is_josser_error(&parse_err));
    }

    #[test]
    fn transport_error_is_josser_error() {
        let err = TransportError::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(is_josser_error(&err));
        assert!(!is_josser_error(err.source().unwrap()));
        assert!(Error::from(err).is_transport());
    }

    #[test]
    fn rpc_fault_from_wire_error() {
        let wire = JsonRpcError {
            code: -32602,
            message: "Invalid params".to_string(),
            data: Some(serde_json::json!({"field": "name"})),
        };
        let fault = RpcFaultError::from(wire);
        assert_eq!(fault.code(), -32602);
        assert_eq!(fault.message(), "Invalid params");
        assert_eq!(fault.data().unwrap()["field"], "name");
        assert_eq!(fault.to_string(), "RPC fault -32602: Invalid params");
    }
}

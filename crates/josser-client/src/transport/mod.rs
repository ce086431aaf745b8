//! Transports move encoded JSON-RPC payloads to a server and bring raw
//! response bytes back. They never interpret the payload; validation is
//! left to [`josser_protocol::Protocol`].

mod http;
#[cfg(unix)]
mod unix;

pub use http::HttpTransport;
#[cfg(unix)]
pub use unix::UnixTransport;

use async_trait::async_trait;
use josser_protocol::TransportError;

/// Trait that all transports must implement.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name (e.g., "unix", "http").
    fn name(&self) -> &str;

    /// Deliver a request and return the raw response bytes.
    async fn send(&self, payload: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Deliver a notification without waiting for a response.
    async fn notify(&self, payload: &[u8]) -> Result<(), TransportError>;
}

fn timeout_error(timeout: std::time::Duration) -> TransportError {
    TransportError::Timeout {
        after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

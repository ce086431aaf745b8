use std::sync::atomic::{AtomicI64, Ordering};

use josser_protocol::{Error, InvalidResponseError, Protocol, RequestId, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::transport::Transport;

/// JSON-RPC client: one protocol revision over one transport.
///
/// Request ids are integers starting at 1. The counter is atomic, so a
/// client shared behind an `Arc` hands out distinct ids to concurrent calls.
pub struct Client {
    transport: Box<dyn Transport>,
    protocol: Protocol,
    next_id: AtomicI64,
}

impl Client {
    pub fn new(transport: impl Transport + 'static, protocol: Protocol) -> Self {
        Self::with_boxed(Box::new(transport), protocol)
    }

    pub fn with_boxed(transport: Box<dyn Transport>, protocol: Protocol) -> Self {
        Self {
            transport,
            protocol,
            next_id: AtomicI64::new(1),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = config.build_transport()?;
        Ok(Self::with_boxed(transport, config.client.protocol))
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn next_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Call `method` and return the raw `result` member.
    pub async fn call_value(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id();
        let request = self.protocol.request(method, params, id.clone());
        let payload = self.protocol.encode(&request)?;

        debug!(
            method = %method,
            id = %id,
            transport = self.transport.name(),
            protocol = %self.protocol,
            "Calling remote method"
        );

        let raw = self.transport.send(&payload).await?;
        let outcome = self.protocol.decode_response(&raw, &id);

        match &outcome {
            Ok(_) => debug!(method = %method, id = %id, "Call succeeded"),
            Err(Error::RpcFault(fault)) => {
                debug!(method = %method, id = %id, code = fault.code(), "Remote reported a fault");
            }
            Err(e) => warn!(method = %method, id = %id, error = %e, "Invalid response"),
        }

        outcome
    }

    /// Call `method` and deserialize its result into `R`.
    ///
    /// A result that does not fit `R` is an invalid response; the serde
    /// error is kept as its source.
    pub async fn call<R: DeserializeOwned>(&self, method: &str, params: Option<Value>) -> Result<R> {
        let value = self.call_value(method, params).await?;
        serde_json::from_value(value).map_err(|e| {
            InvalidResponseError::with_source(
                format!("Unexpected result type for {method}: {e}"),
                e,
            )
            .into()
        })
    }

    /// Send a notification. No response is read.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let request = self.protocol.notification(method, params);
        let payload = self.protocol.encode(&request)?;

        debug!(method = %method, transport = self.transport.name(), "Sending notification");
        self.transport.notify(&payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use josser_protocol::{is_josser_error, TransportError};
    use std::sync::{Arc, Mutex};

    /// Replies with a canned body and records every payload it sees.
    struct CannedTransport {
        reply: Vec<u8>,
        sent: Arc<Mutex<Vec<Value>>>,
    }

    impl CannedTransport {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.as_bytes().to_vec(),
                sent: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        fn name(&self) -> &str {
            "canned"
        }

        async fn send(&self, payload: &[u8]) -> std::result::Result<Vec<u8>, TransportError> {
            self.sent
                .lock()
                .unwrap()
                .push(serde_json::from_slice(payload).unwrap());
            Ok(self.reply.clone())
        }

        async fn notify(&self, payload: &[u8]) -> std::result::Result<(), TransportError> {
            self.sent
                .lock()
                .unwrap()
                .push(serde_json::from_slice(payload).unwrap());
            Ok(())
        }
    }

    struct ClosedTransport;

    #[async_trait]
    impl Transport for ClosedTransport {
        fn name(&self) -> &str {
            "closed"
        }

        async fn send(&self, _payload: &[u8]) -> std::result::Result<Vec<u8>, TransportError> {
            Err(TransportError::ConnectionClosed)
        }

        async fn notify(&self, _payload: &[u8]) -> std::result::Result<(), TransportError> {
            Err(TransportError::ConnectionClosed)
        }
    }

    #[tokio::test]
    async fn call_returns_result() {
        let client = Client::new(CannedTransport::new(r#"{"result": 42, "id": 1}"#), Protocol::V2);
        let answer: i64 = client.call("answer", None).await.unwrap();
        assert_eq!(answer, 42);
    }

    #[tokio::test]
    async fn call_with_wrong_result_type_is_invalid_response() {
        let client = Client::new(CannedTransport::new(r#"{"result": "x", "id": 1}"#), Protocol::V2);
        let err = client.call::<i64>("answer", None).await.unwrap_err();
        let invalid = err.as_invalid_response().unwrap();
        assert!(invalid.message().starts_with("Unexpected result type for answer"));
        let source = std::error::Error::source(invalid).unwrap();
        assert!(source.downcast_ref::<serde_json::Error>().is_some());
    }

    #[tokio::test]
    async fn ids_increase_per_call() {
        let client = Client::new(CannedTransport::new(r#"{"result": 1, "id": 1}"#), Protocol::V2);
        client.call_value("a", None).await.unwrap();
        // The canned reply still says id 1, so the second call must be rejected.
        let err = client.call_value("b", None).await.unwrap_err();
        assert!(err.is_invalid_response());
        assert!(err.to_string().contains("expected 2"));
    }

    #[tokio::test]
    async fn notify_sends_without_id() {
        let transport = CannedTransport::new("");
        let sent = transport.sent.clone();
        let client = Client::new(transport, Protocol::V2);
        client
            .notify("log", Some(serde_json::json!(["hello"])))
            .await
            .unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(
            sent[0],
            serde_json::json!({"jsonrpc": "2.0", "method": "log", "params": ["hello"]})
        );
    }

    #[tokio::test]
    async fn transport_failure_is_transport_error() {
        let client = Client::new(ClosedTransport, Protocol::V1);
        let err = client.call_value("a", None).await.unwrap_err();
        assert!(err.is_transport());
        assert!(is_josser_error(&err));
        assert!(client.notify("a", None).await.unwrap_err().is_transport());
    }

    #[test]
    fn from_config_uses_configured_protocol() {
        let config: Config = toml::from_str(
            "[client]\nprotocol = \"1.0\"\n\n[transport]\nkind = \"http\"\nurl = \"http://127.0.0.1:8332/\"\n",
        )
        .unwrap();
        let client = Client::from_config(&config).unwrap();
        assert_eq!(client.protocol(), Protocol::V1);
        assert_eq!(client.transport.name(), "http");
    }

    #[test]
    fn client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Client>();
        assert_send_sync::<Error>();
    }
}

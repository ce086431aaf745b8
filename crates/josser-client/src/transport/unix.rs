use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use josser_protocol::TransportError;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use super::{timeout_error, Transport};

/// Longest response line accepted by default (16 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 16 * 1024 * 1024;

/// Newline-delimited JSON over a Unix domain socket.
///
/// Every message opens its own connection: the payload is written followed
/// by `\n` and, for requests, exactly one line is read back.
pub struct UnixTransport {
    socket_path: PathBuf,
    timeout: Option<Duration>,
    max_response_bytes: u64,
}

impl UnixTransport {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: None,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cap the length of a response line, excluding the trailing `\n`.
    pub fn with_max_response_bytes(mut self, limit: u64) -> Self {
        self.max_response_bytes = limit;
        self
    }

    async fn exchange(
        &self,
        payload: &[u8],
        expect_response: bool,
    ) -> Result<Vec<u8>, TransportError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (reader, mut writer) = stream.into_split();

        writer.write_all(payload).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        if !expect_response {
            writer.shutdown().await?;
            return Ok(Vec::new());
        }

        let mut reader = BufReader::new(reader).take(self.max_response_bytes.saturating_add(1));
        let mut line = Vec::new();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Err(TransportError::ConnectionClosed);
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        } else if line.len() as u64 > self.max_response_bytes {
            return Err(TransportError::ResponseTooLarge {
                limit: self.max_response_bytes,
            });
        }

        debug!(bytes = line.len(), "Read response line");
        Ok(line)
    }

    async fn exchange_with_timeout(
        &self,
        payload: &[u8],
        expect_response: bool,
    ) -> Result<Vec<u8>, TransportError> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.exchange(payload, expect_response))
                .await
                .map_err(|_| timeout_error(timeout))?,
            None => self.exchange(payload, expect_response).await,
        }
    }
}

#[async_trait]
impl Transport for UnixTransport {
    fn name(&self) -> &str {
        "unix"
    }

    async fn send(&self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        debug!(socket = %self.socket_path.display(), "Sending request over Unix socket");
        self.exchange_with_timeout(payload, true).await
    }

    async fn notify(&self, payload: &[u8]) -> Result<(), TransportError> {
        debug!(socket = %self.socket_path.display(), "Sending notification over Unix socket");
        self.exchange_with_timeout(payload, false).await?;
        Ok(())
    }
}

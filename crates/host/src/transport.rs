//! Newline-delimited JSON-RPC over a byte stream pair
//!
//! Requests are strictly sequential: the caller holds the I/O lock from
//! writing a request until its response arrives, so responses never need
//! to be routed to other waiters.

use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::protocol::{Incoming, JsonRpcNotification, JsonRpcRequest};
use crate::{HostError, Result};

/// Default time to wait for a single response
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

type Writer = Box<dyn AsyncWrite + Send + Unpin>;
type Reader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

struct Io {
    writer: Writer,
    reader: Reader,
}

/// JSON-RPC client side of a stdio connection
pub struct JsonRpcTransport {
    io: Mutex<Io>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl JsonRpcTransport {
    /// Wrap a writer (the server's stdin) and a reader (its stdout)
    pub fn new<W, R>(writer: W, reader: R) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncRead + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self {
            io: Mutex::new(Io {
                writer: Box::new(writer),
                reader: BufReader::new(reader),
            }),
            next_id: AtomicU64::new(1),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Send a request and wait for its result
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);

        let mut io = self.io.lock().await;
        write_line(&mut io.writer, &request).await?;
        trace!("Sent request {} ({})", id, method);

        let incoming = tokio::time::timeout(self.request_timeout, read_response(&mut io.reader, id))
            .await
            .map_err(|_| {
                HostError::Transport(format!(
                    "no response to '{}' within {}s",
                    method,
                    self.request_timeout.as_secs()
                ))
            })??;

        incoming.map_err(|e| HostError::Rpc {
            code: e.code,
            message: e.message,
        })
    }

    /// Send a notification; no reply is expected
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JsonRpcNotification::new(method, params);
        let mut io = self.io.lock().await;
        write_line(&mut io.writer, &notification).await
    }
}

async fn write_line<T: Serialize>(writer: &mut Writer, message: &T) -> Result<()> {
    let mut line = serde_json::to_string(message)
        .map_err(|e| HostError::Protocol(format!("cannot encode request: {}", e)))?;
    line.push('\n');

    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| HostError::Transport(format!("write failed: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| HostError::Transport(format!("flush failed: {}", e)))
}

/// Read lines until the response carrying `id` shows up
async fn read_response(
    reader: &mut Reader,
    id: u64,
) -> Result<std::result::Result<Value, crate::protocol::JsonRpcError>> {
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| HostError::Transport(format!("read failed: {}", e)))?;
        if read == 0 {
            return Err(HostError::Transport("tool host closed its output".to_string()));
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring non-JSON output from tool host: {}", trimmed);
                continue;
            }
        };

        match Incoming::classify(value) {
            Some(Incoming::Response { id: got, outcome }) if got == id => return Ok(outcome),
            Some(Incoming::Response { id: got, .. }) => {
                warn!("Dropping response for unknown request id {}", got);
            }
            Some(Incoming::Notification { method }) => {
                debug!("Tool host notification: {}", method);
            }
            Some(Incoming::Request { id, method }) => {
                warn!("Ignoring request from tool host: {} (id {})", method, id);
            }
            None => warn!("Ignoring unrecognized message from tool host"),
        }
    }
}

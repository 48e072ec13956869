//! The framing and correlation core shared by every transport driver.
//!
//! A [`Connection`] owns the write half of a byte stream and a background
//! reader task over the read half. Outbound requests get a monotonically
//! increasing `id` and park a oneshot sender in the pending map; the reader
//! task is the single consumer of inbound frames and routes each reply to
//! its sink. Writes are serialized through a mutex so concurrent callers
//! cannot interleave frames.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use vigil_types::{TransportErrorCategory, TransportErrorRecord};

use crate::error::{Result, TransportError};
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// Shared, append-only log of observed transport failures.
#[derive(Clone, Default)]
pub struct ErrorLog {
    records: Arc<Mutex<Vec<TransportErrorRecord>>>,
}

impl ErrorLog {
    /// Append a record.
    pub fn record(&self, record: TransportErrorRecord) {
        warn!(
            category = %record.category,
            operation = %record.operation,
            message = %record.message,
            "transport error"
        );
        self.records.lock().push(record);
    }

    /// Snapshot all records so far.
    pub fn snapshot(&self) -> Vec<TransportErrorRecord> {
        self.records.lock().clone()
    }
}

/// A live framed JSON-RPC connection over an arbitrary byte stream pair.
pub struct Connection<W> {
    writer: tokio::sync::Mutex<W>,
    next_id: AtomicU64,
    pending: PendingMap,
    errors: ErrorLog,
    cancel: CancellationToken,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl<W: AsyncWrite + Unpin + Send> Connection<W> {
    /// Build a connection from a write half and a read half, spawning the
    /// reader task.
    pub fn new<R>(writer: W, reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let errors = ErrorLog::default();
        let cancel = CancellationToken::new();

        let reader_task = tokio::spawn(read_loop(
            reader,
            Arc::clone(&pending),
            errors.clone(),
            cancel.clone(),
        ));

        Self {
            writer: tokio::sync::Mutex::new(writer),
            next_id: AtomicU64::new(1),
            pending,
            errors,
            cancel,
            reader_task: Mutex::new(Some(reader_task)),
        }
    }

    /// The shared transport error log.
    pub fn error_log(&self) -> &ErrorLog {
        &self.errors
    }

    /// Send a request and await its correlated reply within `timeout_ms`.
    ///
    /// On timeout the pending entry is dropped and a record is logged, but
    /// the connection remains usable for other requests.
    pub async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout_ms: u64,
    ) -> Result<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        // Register before writing so a fast reply cannot race the sink.
        self.pending.lock().insert(id, tx);

        let frame = JsonRpcRequest::new(id, method, params);
        if let Err(err) = self.write_frame(&frame).await {
            self.pending.lock().remove(&id);
            self.errors.record(TransportErrorRecord::new(
                err.category(),
                method,
                err.to_string(),
            ));
            return Err(err);
        }

        match tokio::time::timeout(Duration::from_millis(timeout_ms), rx).await {
            Ok(Ok(response)) => {
                if let Some(rpc_err) = response.error {
                    return Err(TransportError::Rpc(rpc_err));
                }
                Ok(response.result.unwrap_or(serde_json::Value::Null))
            }
            // Sender dropped: the reader exited and drained the map.
            Ok(Err(_)) => Err(TransportError::Cancelled),
            Err(_) => {
                self.pending.lock().remove(&id);
                let err = TransportError::Timeout {
                    operation: method.to_string(),
                    timeout_ms,
                };
                self.errors.record(TransportErrorRecord::new(
                    TransportErrorCategory::Timeout,
                    method,
                    err.to_string(),
                ));
                Err(err)
            }
        }
    }

    /// Send a fire-and-forget notification.
    pub async fn notify(&self, method: &str, params: serde_json::Value) -> Result<()> {
        self.write_frame(&JsonRpcRequest::notification(method, params)).await
    }

    /// Close the connection: stop the reader and drain pending sinks with a
    /// cancelled error.
    pub async fn close(&self) {
        self.cancel.cancel();
        self.pending.lock().clear();
        let task = self.reader_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    async fn write_frame(&self, frame: &JsonRpcRequest) -> Result<()> {
        let mut encoded = serde_json::to_string(frame)?;
        encoded.push('\n');
        trace!(frame = %encoded.trim_end(), "outbound frame");
        let mut writer = self.writer.lock().await;
        writer
            .write_all(encoded.as_bytes())
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(())
    }
}

/// The single-consumer reader loop: parse each line, record anomalies, and
/// route replies to their pending sinks.
async fn read_loop<R>(reader: R, pending: PendingMap, errors: ErrorLog, cancel: CancellationToken)
where
    R: AsyncRead + Unpin + Send,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(&line, &pending, &errors),
                Ok(None) => {
                    debug!("transport stream closed by peer");
                    break;
                }
                Err(err) => {
                    errors.record(TransportErrorRecord::new(
                        TransportErrorCategory::ConnectionRefused,
                        "read",
                        err.to_string(),
                    ));
                    break;
                }
            }
        }
    }
    // Dropping the sinks fails every in-flight await with a recv error,
    // which callers surface as cancelled.
    pending.lock().clear();
}

fn handle_line(line: &str, pending: &PendingMap, errors: &ErrorLog) {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return;
    }

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(err) => {
            errors.record(
                TransportErrorRecord::new(
                    TransportErrorCategory::InvalidJson,
                    "read",
                    format!("stdout line is not JSON: {err}"),
                )
                .with_raw(trimmed),
            );
            return;
        }
    };

    let Some(obj) = value.as_object() else {
        errors.record(
            TransportErrorRecord::new(
                TransportErrorCategory::ProtocolError,
                "read",
                "frame is not a JSON object",
            )
            .with_raw(trimmed),
        );
        return;
    };

    if obj.get("jsonrpc").and_then(|v| v.as_str()) != Some(JSONRPC_VERSION) {
        errors.record(
            TransportErrorRecord::new(
                TransportErrorCategory::ProtocolError,
                "read",
                "frame missing jsonrpc version",
            )
            .with_raw(trimmed),
        );
        return;
    }

    // Server-initiated requests and notifications carry a method; this core
    // is a pure client, so they are logged and dropped.
    if obj.contains_key("method") {
        debug!(frame = %trimmed, "ignoring server-initiated message");
        return;
    }

    let Some(id) = obj.get("id").and_then(|v| v.as_u64()) else {
        errors.record(
            TransportErrorRecord::new(
                TransportErrorCategory::ProtocolError,
                "read",
                "reply missing usable id",
            )
            .with_raw(trimmed),
        );
        return;
    };

    let response: JsonRpcResponse = match serde_json::from_value(value) {
        Ok(response) => response,
        Err(err) => {
            errors.record(
                TransportErrorRecord::new(
                    TransportErrorCategory::ProtocolError,
                    "read",
                    format!("malformed reply envelope: {err}"),
                )
                .with_raw(trimmed),
            );
            return;
        }
    };

    let sender = pending.lock().remove(&id);
    match sender {
        Some(sender) => {
            // A dropped receiver just means the caller timed out first.
            let _ = sender.send(response);
        }
        None => {
            errors.record(
                TransportErrorRecord::new(
                    TransportErrorCategory::ProtocolError,
                    "read",
                    format!("reply for unknown id {id}"),
                )
                .with_raw(trimmed),
            );
        }
    }
}

//! Stdio transport: newline-delimited JSON-RPC over a child process.
//!
//! The server is spawned with piped stdio; requests go to its stdin, replies
//! come back on stdout, and stderr is captured into a bounded ring as
//! diagnostics (stderr output is never treated as a transport error).

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tracing::debug;

use vigil_types::TransportErrorRecord;

use crate::client::McpTransport;
use crate::connection::Connection;
use crate::error::{Result, TransportError};

/// How many trailing stderr lines are retained.
const STDERR_RING_CAPACITY: usize = 100;

/// A JSON-RPC transport over a spawned child process.
pub struct StdioTransport {
    connection: Connection<ChildStdin>,
    child: Mutex<Option<Child>>,
    stderr_ring: Arc<Mutex<VecDeque<String>>>,
    command_line: String,
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("command_line", &self.command_line)
            .finish()
    }
}

impl StdioTransport {
    /// Spawn `program` with `args` and frame JSON-RPC over its stdio.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransportError::Spawn(format!("{program}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Spawn("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Spawn("child stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TransportError::Spawn("child stderr unavailable".into()))?;

        let stderr_ring = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_RING_CAPACITY)));
        let ring = Arc::clone(&stderr_ring);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(line = %line, "server stderr");
                let mut ring = ring.lock();
                if ring.len() == STDERR_RING_CAPACITY {
                    ring.pop_front();
                }
                ring.push_back(line);
            }
        });

        let command_line = if args.is_empty() {
            program.to_string()
        } else {
            format!("{program} {}", args.join(" "))
        };

        Ok(Self {
            connection: Connection::new(stdin, stdout),
            child: Mutex::new(Some(child)),
            stderr_ring,
            command_line,
        })
    }

    /// Spawn from a single command line, split on whitespace.
    pub fn spawn_command_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| TransportError::Spawn("empty server command".into()))?;
        let args: Vec<String> = parts.map(str::to_string).collect();
        Self::spawn(program, &args)
    }

    /// The trailing stderr lines captured so far.
    pub fn stderr_lines(&self) -> Vec<String> {
        self.stderr_ring.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout_ms: u64,
    ) -> Result<serde_json::Value> {
        self.connection.request(method, params, timeout_ms).await
    }

    async fn notify(&self, method: &str, params: serde_json::Value) -> Result<()> {
        self.connection.notify(method, params).await
    }

    fn transport_errors(&self) -> Vec<TransportErrorRecord> {
        self.connection.error_log().snapshot()
    }

    fn describe(&self) -> String {
        self.command_line.clone()
    }

    async fn close(&self) {
        self.connection.close().await;
        let child = self.child.lock().take();
        if let Some(mut child) = child {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

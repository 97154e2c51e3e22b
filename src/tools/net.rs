// src/tools/net.rs

use crate::tools::{Tool, ToolCall, ToolId, ToolOutput, ToolSpec};
use serde_json::json;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

/// Opens a TCP connection to `host:port` and reports whether it succeeded.
///
/// An unreachable port is still a successful probe: the payload says
/// `reachable: false` and the evaluator turns that into a failed check.
pub struct TcpPortCheckTool {
    pub timeout: Duration,
}

impl TcpPortCheckTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpPortCheckTool {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, String> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| format!("DNS resolution failed: {e}"))?
        .next()
        .ok_or_else(|| "no address resolved".to_string())
}

impl Tool for TcpPortCheckTool {
    fn id(&self) -> ToolId {
        ToolId::TcpPortcheck
    }

    fn description(&self) -> &str {
        "Checks that a TCP port accepts connections."
    }

    fn execute(&self, call: &ToolCall<'_>) -> ToolOutput {
        let Some(host) = call.host() else {
            return ToolOutput::failure(self.id(), "missing required argument 'host'");
        };
        let Some(port) = call.port() else {
            return ToolOutput::failure(self.id(), "missing required argument 'port'");
        };

        let start = Instant::now();
        let outcome = resolve(host, port).and_then(|addr| {
            TcpStream::connect_timeout(&addr, self.timeout)
                .map(|_| ())
                .map_err(|e| e.to_string())
        });
        let latency_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                tracing::debug!(host, port, latency_ms, "port reachable");
                ToolOutput::success(
                    self.id(),
                    json!({
                        "host": host,
                        "port": port,
                        "reachable": true,
                        "latency_ms": latency_ms,
                    }),
                )
            }
            Err(error) => {
                tracing::debug!(host, port, %error, "port unreachable");
                ToolOutput::success(
                    self.id(),
                    json!({
                        "host": host,
                        "port": port,
                        "reachable": false,
                        "latency_ms": latency_ms,
                        "error": error,
                    }),
                )
            }
        }
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.id().as_str().into(),
            description: self.description().into(),
            input_hint: "host, port".into(),
            tags: vec!["network".into(), "probe".into()],
        }
    }
}

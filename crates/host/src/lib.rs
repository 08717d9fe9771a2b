//! Tool host client
//!
//! Launches an MCP server as a child process and talks JSON-RPC 2.0 to it
//! over stdin/stdout: `initialize`, `tools/list` and `tools/call`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;

pub mod client;
pub mod launch;
pub mod protocol;
pub mod transport;

pub use client::McpClient;
pub use launch::LaunchSpec;
pub use protocol::{CallToolResult, ContentItem, RemoteTool, ServerInfo};
pub use transport::JsonRpcTransport;

/// Tool host errors
#[derive(Error, Debug)]
pub enum HostError {
    #[error("server file {0} does not exist")]
    NotFound(PathBuf),

    #[error("server file {0} is not executable")]
    NotExecutable(PathBuf),

    #[error("failed to start tool host: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("tool host connection lost: {0}")]
    Transport(String),

    #[error("tool host error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected reply from tool host: {0}")]
    Protocol(String),
}

impl HostError {
    /// True when the host itself is unreachable, as opposed to a single
    /// request being rejected. Callers abort the current query on these.
    pub fn is_transport(&self) -> bool {
        matches!(self, HostError::Transport(_) | HostError::Spawn(_))
    }
}

pub type Result<T> = std::result::Result<T, HostError>;

/// The operations the agent needs from a tool host
#[async_trait]
pub trait ToolHost: Send + Sync {
    /// Tools the host currently exposes
    async fn list_tools(&self) -> Result<Vec<RemoteTool>>;

    /// Run one tool. A tool that reports failure returns `Ok` with
    /// `is_error` set; `Err` means the request itself did not complete.
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<CallToolResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(HostError::Transport("eof".to_string()).is_transport());
        assert!(HostError::Spawn(std::io::Error::other("nope")).is_transport());
        assert!(!HostError::Rpc {
            code: -32602,
            message: "bad params".to_string()
        }
        .is_transport());
        assert!(!HostError::Protocol("garbage".to_string()).is_transport());
        assert!(!HostError::NotFound(PathBuf::from("x")).is_transport());
    }

    #[test]
    fn test_error_display() {
        let err = HostError::NotFound(PathBuf::from("/tmp/server.py"));
        assert_eq!(err.to_string(), "server file /tmp/server.py does not exist");

        let err = HostError::Rpc {
            code: -32601,
            message: "Method not found".to_string(),
        };
        assert_eq!(err.to_string(), "tool host error -32601: Method not found");
    }
}

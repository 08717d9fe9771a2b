//! MCP client over a child process's stdio

use async_trait::async_trait;
use std::collections::HashSet;
use serde_json::{Map, Value};
use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::launch::LaunchSpec;
use crate::protocol::{self, CallToolResult, InitializeResult, RemoteTool, ServerInfo, ToolsListResult};
use crate::transport::JsonRpcTransport;
use crate::{HostError, Result, ToolHost};

const CLIENT_NAME: &str = env!("CARGO_PKG_NAME");
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A connected tool host
pub struct McpClient {
    transport: JsonRpcTransport,
    child: Option<Child>,
    server_info: ServerInfo,
}

impl McpClient {
    /// Start the host process and complete the `initialize` handshake
    pub async fn connect(spec: &LaunchSpec) -> Result<Self> {
        info!("Starting tool host: {:?} {:?}", spec.program, spec.args);
        let mut child = spec.command().spawn().map_err(HostError::Spawn)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HostError::Transport("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HostError::Transport("child stdout unavailable".to_string()))?;

        let mut client = Self::with_transport(JsonRpcTransport::new(stdin, stdout));
        client.child = Some(child);
        client.initialize().await?;
        Ok(client)
    }

    /// Wrap an existing transport; call [`McpClient::initialize`] before use
    pub fn with_transport(transport: JsonRpcTransport) -> Self {
        Self {
            transport,
            child: None,
            server_info: ServerInfo::default(),
        }
    }

    /// `initialize` request followed by the `notifications/initialized` notice
    pub async fn initialize(&mut self) -> Result<()> {
        let params = protocol::initialize_params(CLIENT_NAME, CLIENT_VERSION);
        let result = self.transport.request("initialize", Some(params)).await?;
        let init: InitializeResult = decode(result)?;

        if init.protocol_version != protocol::PROTOCOL_VERSION {
            debug!(
                "Tool host negotiated protocol {} (requested {})",
                init.protocol_version,
                protocol::PROTOCOL_VERSION
            );
        }
        info!(
            "Connected to tool host {} {}",
            init.server_info.name, init.server_info.version
        );
        self.server_info = init.server_info;

        self.transport
            .notify("notifications/initialized", None)
            .await
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Stop the host process
    pub async fn shutdown(mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                warn!("Failed to stop tool host: {}", e);
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| HostError::Protocol(e.to_string()))
}

#[async_trait]
impl ToolHost for McpClient {
    async fn list_tools(&self) -> Result<Vec<RemoteTool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let params = protocol::tools_list_params(cursor.as_deref());
            let page: ToolsListResult = decode(self.transport.request("tools/list", params).await?)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if seen.insert(next.clone()) => cursor = Some(next),
                Some(next) => {
                    warn!("Tool host repeated cursor {:?}; stopping pagination", next);
                    break;
                }
                None => break,
            }
        }

        debug!("Tool host lists {} tools", tools.len());
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<CallToolResult> {
        debug!("Calling tool {}", name);
        let params = protocol::tools_call_params(name, &arguments);
        let result = self.transport.request("tools/call", Some(params)).await?;
        decode(result)
    }
}

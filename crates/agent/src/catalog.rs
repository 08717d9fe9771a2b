//! Tool catalog

use std::sync::Arc;

use mcpbot_host::ToolHost;
use mcpbot_provider::ToolDescriptor;
use tracing::debug;

use crate::{AgentError, Result};

/// Fresh view of the host's tools, fetched on every refresh
#[derive(Clone)]
pub struct ToolCatalog {
    host: Arc<dyn ToolHost>,
}

impl ToolCatalog {
    pub fn new(host: Arc<dyn ToolHost>) -> Self {
        Self { host }
    }

    /// List the host's tools as function declarations for the model.
    /// Any listing failure means the host cannot serve this query.
    pub async fn refresh(&self) -> Result<Vec<ToolDescriptor>> {
        let tools = self
            .host
            .list_tools()
            .await
            .map_err(AgentError::HostUnavailable)?;

        debug!("Tool catalog refreshed: {} tools", tools.len());

        Ok(tools
            .into_iter()
            .map(|t| ToolDescriptor::new(t.name, t.description, t.input_schema))
            .collect())
    }
}

//! Tool invocation against the host

use std::sync::Arc;

use mcpbot_host::{HostError, ToolHost};
use mcpbot_provider::ToolCallRequest;
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Outcome of one tool call, ready to go into the transcript
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallResult {
    pub tool_call_id: String,
    pub content: String,
    pub is_error: bool,
    /// Set when the arguments could not be decoded and the tool was called
    /// with an empty map instead
    pub argument_error: Option<String>,
}

/// What happened when a tool was invoked
#[derive(Debug)]
pub enum Invocation {
    /// The host answered. The tool may still have failed; see `is_error`.
    Completed(ToolCallResult),
    /// The host could not be reached. The query must stop here.
    HostLost(HostError),
}

/// Runs single tool calls, absorbing tool failures into the result
#[derive(Clone)]
pub struct ToolInvoker {
    host: Arc<dyn ToolHost>,
}

impl ToolInvoker {
    pub fn new(host: Arc<dyn ToolHost>) -> Self {
        Self { host }
    }

    pub async fn invoke(&self, request: &ToolCallRequest) -> Invocation {
        let (arguments, argument_error) = match parse_arguments(&request.raw_arguments) {
            Ok(map) => (map, None),
            Err(reason) => {
                let notice = format!(
                    "arguments for '{}' were not a JSON object ({}); called with no arguments",
                    request.tool_name, reason
                );
                warn!("{}", notice);
                (Map::new(), Some(notice))
            }
        };

        info!("Calling tool {} with args {}", request.tool_name, request.raw_arguments);

        let (content, is_error) = match self.host.call_tool(&request.tool_name, arguments).await {
            Ok(result) if result.is_error => (format!("Error: {}", result.text()), true),
            Ok(result) => (result.text(), false),
            Err(e) if e.is_transport() => return Invocation::HostLost(e),
            Err(e) => (format!("Error: {}", e), true),
        };

        let content = match &argument_error {
            Some(notice) => format!("{}\n\n[{}]", content, notice),
            None => content,
        };

        Invocation::Completed(ToolCallResult {
            tool_call_id: request.id.clone(),
            content,
            is_error,
            argument_error,
        })
    }
}

/// Decode model-supplied arguments. Blank text and `null` mean no arguments.
pub fn parse_arguments(raw: &str) -> std::result::Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(format!("expected an object, got {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Conversation log for a single query

use mcpbot_provider::{Message, Role, ToolCallRequest};
use tracing::warn;

/// Ordered, append-only message log. The order here is exactly the order
/// sent to the completion API; entries are never edited or removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the log with a system prompt
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    pub fn append_assistant(&mut self, text: impl Into<String>, tool_calls: Vec<ToolCallRequest>) {
        self.messages
            .push(Message::assistant_with_tool_calls(text, tool_calls));
    }

    /// Record a tool's output. The id must answer a still-open call of the
    /// nearest preceding assistant message.
    pub fn append_tool_result(
        &mut self,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) {
        let tool_call_id = tool_call_id.into();
        let answers_open_call = self
            .unanswered_tool_calls()
            .contains(&tool_call_id.as_str());
        if !answers_open_call {
            warn!("Tool result {} does not answer an open tool call", tool_call_id);
        }
        debug_assert!(answers_open_call, "unpaired tool result {}", tool_call_id);
        self.messages
            .push(Message::tool(tool_call_id, tool_name, content));
    }

    /// Read-only view handed to the completion client
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Ids of tool calls in the latest assistant message that have no tool
    /// result after it yet
    pub fn unanswered_tool_calls(&self) -> Vec<&str> {
        let Some(pos) = self.messages.iter().rposition(|m| m.role == Role::Assistant) else {
            return Vec::new();
        };

        let answered: Vec<&str> = self.messages[pos + 1..]
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        self.messages[pos]
            .tool_calls
            .iter()
            .map(|tc| tc.id.as_str())
            .filter(|id| !answered.contains(id))
            .collect()
    }
}

/// State of one query: the log plus the iteration budget
#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub state: ConversationState,
    iteration_count: u32,
    max_iterations: u32,
}

impl ConversationSession {
    pub fn new(state: ConversationState, max_iterations: u32) -> Self {
        Self {
            state,
            iteration_count: 0,
            max_iterations,
        }
    }

    /// Claim the next iteration; `false` once the budget is spent
    pub fn begin_iteration(&mut self) -> bool {
        if self.iteration_count >= self.max_iterations {
            return false;
        }
        self.iteration_count += 1;
        true
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }
}

//! Tool-use orchestration
//!
//! [`LoopController`] answers one user query by cycling the conversation
//! through the completion API and the tool host until the model produces a
//! final answer or the iteration budget runs out.

use thiserror::Error;

pub mod catalog;
pub mod conversation;
pub mod invoker;
pub mod loop_agent;

pub use catalog::ToolCatalog;
pub use conversation::{ConversationSession, ConversationState};
pub use invoker::{Invocation, ToolCallResult, ToolInvoker};
pub use loop_agent::{LoopController, QueryOutcome, DEFAULT_MAX_ITERATIONS, EXHAUSTED_MESSAGE};

/// Failures that abort a query. The display text is what the user sees.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Tool host unavailable: {0}")]
    HostUnavailable(#[source] mcpbot_host::HostError),

    #[error("Error calling the completion API: {0}")]
    Completion(#[from] mcpbot_provider::ProviderError),
}

pub type Result<T> = std::result::Result<T, AgentError>;

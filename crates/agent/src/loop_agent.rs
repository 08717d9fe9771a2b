//! Agent loop - core processing engine

use std::sync::Arc;

use mcpbot_host::ToolHost;
use mcpbot_provider::{CompletionClient, FinishReason};
use tracing::{debug, error, info, warn};

use crate::catalog::ToolCatalog;
use crate::conversation::{ConversationSession, ConversationState};
use crate::invoker::{Invocation, ToolInvoker};
use crate::{AgentError, Result};

/// Completion calls allowed per query unless configured otherwise
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Returned when the budget runs out before the model gives an answer
pub const EXHAUSTED_MESSAGE: &str = "Maximum iterations reached without completing the request";

/// How a query ended
#[derive(Debug)]
pub enum QueryOutcome {
    /// The model gave a final answer
    Answer(String),
    /// The iteration budget was spent first
    Exhausted,
    /// The query was aborted
    Failed(AgentError),
}

impl QueryOutcome {
    /// Text to show the user
    pub fn into_text(self) -> String {
        match self {
            QueryOutcome::Answer(text) => text,
            QueryOutcome::Exhausted => EXHAUSTED_MESSAGE.to_string(),
            QueryOutcome::Failed(e) => e.to_string(),
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, QueryOutcome::Answer(_))
    }
}

/// Drives one query through completion and tool calls until it ends
pub struct LoopController {
    client: Arc<dyn CompletionClient>,
    catalog: ToolCatalog,
    invoker: ToolInvoker,
    max_iterations: u32,
    system_prompt: Option<String>,
}

impl LoopController {
    pub fn new(client: Arc<dyn CompletionClient>, host: Arc<dyn ToolHost>) -> Self {
        Self {
            client,
            catalog: ToolCatalog::new(host.clone()),
            invoker: ToolInvoker::new(host),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Answer one query in a fresh session
    pub async fn process_query(&self, query: &str) -> QueryOutcome {
        self.run_session(query).await.0
    }

    /// Like [`process_query`](Self::process_query), also returning the
    /// finished session
    pub async fn run_session(&self, query: &str) -> (QueryOutcome, ConversationSession) {
        info!("Processing query");
        debug!("Query: {}", truncate(query, 100));

        let mut state = match &self.system_prompt {
            Some(prompt) => ConversationState::with_system_prompt(prompt.as_str()),
            None => ConversationState::new(),
        };
        state.append_user(query);
        let mut session = ConversationSession::new(state, self.max_iterations);

        let outcome = match self.run_agent_loop(&mut session).await {
            Ok(Some(answer)) => QueryOutcome::Answer(answer),
            Ok(None) => {
                warn!(
                    "No answer after {} iterations",
                    session.iteration_count()
                );
                QueryOutcome::Exhausted
            }
            Err(e) => {
                error!("Agent loop error: {}", e);
                QueryOutcome::Failed(e)
            }
        };

        (outcome, session)
    }

    /// `Ok(None)` means the budget ran out
    async fn run_agent_loop(&self, session: &mut ConversationSession) -> Result<Option<String>> {
        while session.begin_iteration() {
            debug!(
                "Agent iteration {}/{}",
                session.iteration_count(),
                session.max_iterations()
            );

            let tools = self.catalog.refresh().await?;

            let response = self
                .client
                .complete(session.state.snapshot(), &tools)
                .await
                .map_err(AgentError::Completion)?;

            debug!(
                "Completion finished with {:?} ({} prompt / {} completion tokens)",
                response.finish_reason,
                response.usage.prompt_tokens,
                response.usage.completion_tokens
            );

            let message = response.message;

            if response.finish_reason == FinishReason::Stop || !message.has_tool_calls() {
                if response.finish_reason == FinishReason::ToolCalls {
                    warn!("Model asked for tool calls but sent none; treating as final");
                }
                session.state.append_assistant(message.content.as_str(), Vec::new());
                return Ok(Some(message.content));
            }

            // Each call gets its own assistant entry followed by its result.
            // Any text the model sent rides on the first one.
            let mut text = Some(message.content);
            for call in message.tool_calls {
                let result = match self.invoker.invoke(&call).await {
                    Invocation::Completed(result) => result,
                    Invocation::HostLost(e) => return Err(AgentError::HostUnavailable(e)),
                };

                if result.is_error {
                    debug!("Tool {} reported an error", call.tool_name);
                }

                let tool_name = call.tool_name.clone();
                session
                    .state
                    .append_assistant(text.take().unwrap_or_default(), vec![call]);
                session
                    .state
                    .append_tool_result(result.tool_call_id, tool_name, result.content);
            }
        }

        Ok(None)
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

//! Ollama native chat API (`/api/chat`)
//!
//! Ollama differs from the OpenAI schema in three ways that matter here:
//! tool-call arguments travel as JSON objects rather than encoded text, tool
//! calls usually carry no id, and there is no `finish_reason` for tool use.

use crate::*;
use reqwest::Client;
use serde_json::json;

/// Client for a local (or remote) Ollama server
pub struct OllamaClient {
    client: Client,
    host: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            model: model.into(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_request(&self, history: &[Message], tools: &[ToolDescriptor]) -> Value {
        let messages: Vec<Value> = history
            .iter()
            .map(|m| {
                let mut obj = json!({ "role": m.role.as_str(), "content": &m.content });
                if m.has_tool_calls() {
                    let calls: Vec<Value> = m
                        .tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": &tc.id,
                                "function": {
                                    "name": &tc.tool_name,
                                    "arguments": arguments_object(&tc.raw_arguments)
                                }
                            })
                        })
                        .collect();
                    obj["tool_calls"] = json!(calls);
                }
                if let Some(tool_call_id) = &m.tool_call_id {
                    obj["tool_call_id"] = json!(tool_call_id);
                }
                if let Some(name) = &m.name {
                    obj["name"] = json!(name);
                }
                obj
            })
            .collect();

        let mut body = json!({
            "model": &self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens
            }
        });

        if !tools.is_empty() {
            let tools: Vec<Value> = tools.iter().map(|t| t.to_function_declaration()).collect();
            body["tools"] = json!(tools);
        }

        body
    }

    fn parse_response(&self, json: Value) -> Result<CompletionResult> {
        let message = json
            .get("message")
            .ok_or_else(|| ProviderError::InvalidResponse("missing message".to_string()))?;
        let content = message["content"].as_str().unwrap_or_default().to_string();

        let tool_calls: Vec<ToolCallRequest> = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| {
                        let function = &call["function"];
                        let raw_arguments = match &function["arguments"] {
                            Value::String(s) => s.clone(),
                            Value::Null => "{}".to_string(),
                            other => other.to_string(),
                        };
                        let id = call["id"]
                            .as_str()
                            .filter(|id| !id.is_empty())
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));

                        ToolCallRequest {
                            id,
                            tool_name: function["name"].as_str().unwrap_or_default().to_string(),
                            raw_arguments,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let finish_reason = if tool_calls.is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolCalls
        };

        let usage = Usage {
            prompt_tokens: json["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
            completion_tokens: json["eval_count"].as_u64().unwrap_or(0) as u32,
        };

        Ok(CompletionResult {
            finish_reason,
            message: Message::assistant_with_tool_calls(content, tool_calls),
            usage,
        })
    }
}

/// Ollama wants argument objects; fall back to `{}` for anything that does
/// not decode to one
fn arguments_object(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        _ => json!({}),
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<CompletionResult> {
        let url = format!("{}/api/chat", self.host);
        trace!("Requesting completion from {}", url);

        let body = self.build_request(history, tools);
        let json = post_json(self.client.post(&url), &body).await?;

        let result = self.parse_response(json)?;
        debug!(
            "{} replied with {:?} and {} tool calls",
            self.name(),
            result.finish_reason,
            result.message.tool_calls.len()
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

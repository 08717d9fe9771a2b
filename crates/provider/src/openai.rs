//! OpenAI-compatible chat completions (DeepSeek, OpenAI, vLLM, ...)

use crate::*;
use reqwest::Client;
use serde_json::json;

/// Client for any `/chat/completions` endpoint speaking the OpenAI schema
pub struct OpenAiCompatibleClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiCompatibleClient {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
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
                let mut obj = json!({ "role": m.role.as_str() });
                if m.has_tool_calls() {
                    obj["content"] = if m.content.is_empty() {
                        Value::Null
                    } else {
                        json!(&m.content)
                    };
                    let calls: Vec<Value> = m
                        .tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": &tc.id,
                                "type": "function",
                                "function": {
                                    "name": &tc.tool_name,
                                    "arguments": &tc.raw_arguments
                                }
                            })
                        })
                        .collect();
                    obj["tool_calls"] = json!(calls);
                } else {
                    obj["content"] = json!(&m.content);
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
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        if !tools.is_empty() {
            let tools: Vec<Value> = tools.iter().map(|t| t.to_function_declaration()).collect();
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }

        body
    }

    fn parse_response(&self, json: Value) -> Result<CompletionResult> {
        let choice = json["choices"]
            .get(0)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices returned".to_string()))?;
        let message = &choice["message"];
        let content = message["content"].as_str().unwrap_or_default().to_string();
        let finish_reason = match choice["finish_reason"].as_str() {
            Some("tool_calls") => FinishReason::ToolCalls,
            _ => FinishReason::Stop,
        };

        let mut tool_calls = Vec::new();
        if let Some(calls) = message["tool_calls"].as_array() {
            for call in calls {
                let function = &call["function"];
                // Arguments should be JSON text; some servers send an object.
                let raw_arguments = match &function["arguments"] {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };

                tool_calls.push(ToolCallRequest {
                    id: call["id"].as_str().unwrap_or_default().to_string(),
                    tool_name: function["name"].as_str().unwrap_or_default().to_string(),
                    raw_arguments,
                });
            }
        }

        let usage = Usage {
            prompt_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(CompletionResult {
            finish_reason,
            message: Message::assistant_with_tool_calls(content, tool_calls),
            usage,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<CompletionResult> {
        let url = format!("{}/chat/completions", self.api_base);
        trace!("Requesting completion from {}", url);

        let body = self.build_request(history, tools);
        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key));
        let json = post_json(request, &body).await?;

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
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

//! OpenAI Chat Completions planner
//!
//! Sends the rendered system prompt, the bounded history and the tool schemas
//! in one request and maps the first choice back into text plus tool calls.
//! Transient failures (network, timeouts, 429 and 5xx) are retried with
//! exponential backoff; a `Retry-After` header overrides the backoff.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Message, StopReason, TokenUsage, ToolCall};
use crate::config::LlmConfig;

/// Attempts after the first for transient errors
const MAX_RETRIES: u32 = 3;

/// Backoff before the first retry; doubles each attempt
const INITIAL_BACKOFF_MS: u64 = 500;

/// Longest server-requested wait honored before retrying
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);

pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    timeout: Duration,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl OpenAIClient {
    /// Create a client, reading the API key from the configured variable
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key =
            std::env::var(&config.api_key_env).map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
            max_tokens: config.max_tokens,
            temperature: Some(config.temperature),
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let messages: Vec<Value> = std::iter::once(json!({"role": "system", "content": request.system_prompt}))
            .chain(request.messages.iter().map(wire_message))
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": request.max_tokens.min(self.max_tokens),
        });
        if let Some(temperature) = request.temperature.or(self.temperature) {
            body["temperature"] = json!(temperature);
        }
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(|t| t.to_openai_schema()).collect();
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }
        body
    }

    /// One HTTP round trip, classified into a response or an `LlmError`
    async fn send(&self, body: &Value) -> Result<CompletionResponse, LlmError> {
        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { LlmError::Timeout(self.timeout) } else { LlmError::Network(e) })?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(LlmError::RateLimited {
                retry_after: retry_after(&response).unwrap_or(Duration::from_secs(1)),
            });
        }
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, message });
        }

        let api_response: ChatResponse = response.json().await?;
        into_completion(api_response)
    }
}

fn wire_message(message: &Message) -> Value {
    json!({
        "role": message.role.as_str(),
        "content": message.content,
    })
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn backoff(attempt: u32, err: &LlmError) -> Duration {
    err.retry_after()
        .map(|d| d.min(MAX_RETRY_AFTER))
        .unwrap_or_else(|| Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt)))
}

/// First choice as text plus tool calls
///
/// Arguments that are not a JSON object become `{}` so the tool reports the
/// missing parameters instead of the whole turn failing.
fn into_completion(api_response: ChatResponse) -> Result<CompletionResponse, LlmError> {
    let usage = TokenUsage {
        input_tokens: api_response.usage.prompt_tokens,
        output_tokens: api_response.usage.completion_tokens,
    };
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("response had no choices".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| {
            let input = match serde_json::from_str::<Value>(&call.function.arguments) {
                Ok(value @ Value::Object(_)) => value,
                Ok(_) | Err(_) => {
                    warn!(tool = %call.function.name, "into_completion: tool arguments are not a JSON object");
                    json!({})
                }
            };
            ToolCall::new(call.id, call.function.name, input)
        })
        .collect();

    Ok(CompletionResponse {
        content: choice.message.content,
        tool_calls,
        stop_reason: StopReason::from_openai(choice.finish_reason.as_deref()),
        usage,
    })
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, message_count = request.messages.len(), "complete: called");
        let body = self.request_body(&request);

        let mut attempt = 0;
        loop {
            match self.send(&body).await {
                Ok(response) => {
                    debug!(tool_calls = response.tool_calls.len(), "complete: success");
                    return Ok(response);
                }
                Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                    let delay = backoff(attempt, &err);
                    attempt += 1;
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "complete: retrying planner call");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageBody,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageBody {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolDefinition;

    fn client(max_tokens: u32) -> OpenAIClient {
        OpenAIClient {
            model: "gpt-4".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.openai.com".to_string(),
            http: Client::new(),
            timeout: Duration::from_secs(5),
            max_tokens,
            temperature: Some(0.7),
        }
    }

    fn request(messages: Vec<Message>, tools: Vec<ToolDefinition>, max_tokens: u32) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You manage todo lists".to_string(),
            messages,
            tools,
            max_tokens,
            temperature: None,
        }
    }

    #[test]
    fn test_body_puts_system_prompt_first_and_keeps_reference_entry() {
        let messages = vec![Message::user("list my tasks"), Message::system("[Tool Results Reference]")];

        let body = client(8192).request_body(&request(messages, vec![], 1000));

        let roles: Vec<&str> = body["messages"].as_array().unwrap().iter().map(|m| m["role"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["system", "user", "system"]);
        assert_eq!(body["messages"][0]["content"], "You manage todo lists");
        assert_eq!(body["max_tokens"], 1000);
        assert!(body.get("tools").is_none());
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_body_caps_tokens_and_exposes_tools() {
        let tools = vec![ToolDefinition::new("list_tasks", "List", json!({"type": "object"}))];

        let body = client(1000).request_body(&request(vec![], tools, 5000));

        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["tools"][0]["function"]["name"], "list_tasks");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn test_tool_calls_with_bad_arguments_become_empty_objects() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "call_1", "type": "function", "function": {"name": "add_task", "arguments": "{\"text\":\"Buy milk\"}"}},
                        {"id": "call_2", "type": "function", "function": {"name": "list_tasks", "arguments": "not json"}},
                        {"id": "call_3", "type": "function", "function": {"name": "complete_task", "arguments": "[1]"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        });

        let response = into_completion(serde_json::from_value(raw).unwrap()).unwrap();

        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.tool_calls[0].input["text"], "Buy milk");
        assert_eq!(response.tool_calls[1].input, json!({}));
        assert_eq!(response.tool_calls[2].input, json!({}));
        assert_eq!(response.usage.input_tokens, 10);
    }

    #[test]
    fn test_text_reply_without_tool_calls() {
        let raw = json!({
            "choices": [{"message": {"content": "You're welcome!"}, "finish_reason": "stop"}]
        });

        let response = into_completion(serde_json::from_value(raw).unwrap()).unwrap();

        assert_eq!(response.content.as_deref(), Some("You're welcome!"));
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn test_empty_choices_is_invalid() {
        let err = into_completion(serde_json::from_value(json!({"choices": []})).unwrap()).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_backoff_doubles_and_honors_retry_after() {
        let server = LlmError::ApiError {
            status: 503,
            message: String::new(),
        };
        assert_eq!(backoff(0, &server), Duration::from_millis(500));
        assert_eq!(backoff(2, &server), Duration::from_millis(2000));

        let limited = LlmError::RateLimited {
            retry_after: Duration::from_secs(120),
        };
        assert_eq!(backoff(0, &limited), MAX_RETRY_AFTER);
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = LlmConfig {
            api_key_env: "TASKCHAT_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(OpenAIClient::from_config(&config), Err(LlmError::MissingApiKey(_))));
    }
}

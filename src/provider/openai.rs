//! OpenAI provider using the Chat Completions API
//!
//! Sends the rendered prompt with the flow's tools as function tools and the
//! output schema as a `json_schema` response format. Works against any
//! OpenAI-compatible endpoint through `base_url`.

use super::{
    http_client, ChatRequest, ChatResponse, Message, MessageRole, Provider, TokenUsage, ToolCall,
};
use crate::config::ChefConfig;
use crate::error::{ChefError, Result as ChefResult};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default API base
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI provider
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    /// Tool rounds before calls are switched off
    max_tool_rounds: u32,
}

impl OpenAIProvider {
    /// Create from configuration; the API key is required
    pub fn from_config(config: &ChefConfig) -> ChefResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ChefError::ConfigError {
                reason: "OPENAI_API_KEY is not set".to_string(),
            })?;

        Ok(Self {
            client: http_client(config)?,
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            max_tool_rounds: config.max_tool_rounds,
        })
    }

    /// Create with a specific API key and default settings
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: OPENAI_DEFAULT_MODEL.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
            max_tool_rounds: ChefConfig::default().max_tool_rounds,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Build the request payload
    fn build_body(&self, request: &ChatRequest) -> CompletionRequest {
        let tools: Vec<WireTool> = request
            .tools
            .iter()
            .map(|t| WireTool {
                kind: "function",
                function: WireFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect();

        // Past the cap the model keeps seeing the tools but may no longer call them
        let tool_choice = if !tools.is_empty() && request.tool_rounds() >= self.max_tool_rounds {
            Some("none")
        } else {
            None
        };

        CompletionRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools,
            tool_choice,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: request.flow.clone(),
                    schema: request.output_schema.clone(),
                    strict: false,
                },
            },
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_body(request);

        tracing::debug!(
            provider = "openai",
            model = %payload.model,
            messages_count = payload.messages.len(),
            tools = payload.tools.len(),
            "Sending request to OpenAI API"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                provider = "openai",
                status = %status,
                error = %error_text,
                "OpenAI API error"
            );
            bail!("OpenAI API error ({}): {}", status, error_text);
        }

        let api_response: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        let Some(choice) = api_response.choices.into_iter().next() else {
            bail!("OpenAI API returned no choices");
        };

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| {
                ToolCall::new(
                    call.id,
                    call.function.name,
                    parse_arguments(call.function.arguments),
                )
            })
            .collect();

        let content = choice.message.content;
        let usage = match api_response.usage {
            Some(u) => TokenUsage::new(u.prompt_tokens, u.completion_tokens),
            None => TokenUsage::estimate(
                request.prompt_len(),
                content.as_deref().map(str::len).unwrap_or(0),
            ),
        };

        tracing::debug!(
            provider = "openai",
            tokens = usage.total_tokens,
            tool_calls = tool_calls.len(),
            "OpenAI API response received"
        );

        Ok(ChatResponse {
            content,
            tool_calls,
            usage,
        })
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Function arguments arrive as a JSON string; unparsable ones are passed
/// through as a string so tool input validation rejects them
fn parse_arguments(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: MessageRole,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: WireCallFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireCallFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireCallFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: Value,
    strict: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ============================================================================
// TESTS
// ============================================================================

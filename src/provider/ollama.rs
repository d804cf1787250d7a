//! Ollama provider for local models
//!
//! Uses `/api/chat` with native tool calling and the output schema passed as
//! `format`. Ollama does not return tool call IDs, so they are numbered here.

use super::{
    http_client, ChatRequest, ChatResponse, Message, MessageRole, Provider, TokenUsage, ToolCall,
};
use crate::config::ChefConfig;
use crate::error::Result as ChefResult;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default local endpoint
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.1";

/// Ollama provider
pub struct OllamaProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
    max_tool_rounds: u32,
}

impl OllamaProvider {
    pub fn from_config(config: &ChefConfig) -> ChefResult<Self> {
        Ok(Self {
            client: http_client(config)?,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_MODEL.to_string()),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            max_tool_rounds: config.max_tool_rounds,
        })
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: OLLAMA_DEFAULT_MODEL.to_string(),
            base_url: base_url.into(),
            max_tool_rounds: ChefConfig::default().max_tool_rounds,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    fn build_body(&self, request: &ChatRequest) -> OllamaChatRequest {
        // No tool_choice here: past the cap, tools are simply withheld
        let tools = if request.tool_rounds() >= self.max_tool_rounds {
            vec![]
        } else {
            request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect()
        };

        OllamaChatRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(OllamaMessage::from).collect(),
            tools,
            format: request.output_schema.clone(),
            stream: false,
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_body(request);
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));

        tracing::debug!(
            provider = "ollama",
            model = %payload.model,
            messages_count = payload.messages.len(),
            "Sending request to Ollama"
        );

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Ollama error ({}): {}", status, error_text);
        }

        let api_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        let tool_calls: Vec<ToolCall> = api_response
            .message
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(i, call)| ToolCall::new(format!("call_{}", i), call.function.name, call.function.arguments))
            .collect();

        let content = Some(api_response.message.content).filter(|c| !c.is_empty());
        let usage = match (api_response.prompt_eval_count, api_response.eval_count) {
            (Some(prompt), Some(completion)) => TokenUsage::new(prompt, completion),
            _ => TokenUsage::estimate(
                request.prompt_len(),
                content.as_deref().map(str::len).unwrap_or(0),
            ),
        };

        Ok(ChatResponse {
            content,
            tool_calls,
            usage,
        })
    }
}

// ============================================================================
// API TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    format: Value,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: MessageRole,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
}

impl From<&Message> for OllamaMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| OllamaToolCall {
                    function: OllamaFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<OllamaToolCall>,
}

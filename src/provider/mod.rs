//! # Model-Invocation Boundary
//!
//! Trait and implementations for LLM providers.
//!
//! ## Overview
//!
//! The flow executor talks to the model only through [`Provider::chat`]:
//!
//! - [`Provider`] - Core trait: one model turn per call
//! - [`OpenAIProvider`] - Chat Completions with function tools and JSON-schema output
//! - [`OllamaProvider`] - Local Ollama `/api/chat`
//! - [`MockProvider`] - Scripted turns for tests
//!
//! A turn either answers (text content) or asks for tool calls. The executor
//! runs the tools and calls `chat` again with the results appended; the
//! provider decides when the loop ends (HTTP providers stop offering tools
//! after `max_tool_rounds`).
//!
//! ## Creating Providers
//!
//! ```rust
//! use fridge_chef::config::ChefConfig;
//! use fridge_chef::provider::create_provider;
//!
//! let config = ChefConfig { provider: "mock".to_string(), ..Default::default() };
//! let mock = create_provider(&config).unwrap();
//! assert_eq!(mock.name(), "mock");
//!
//! let config = ChefConfig { provider: "invalid".to_string(), ..Default::default() };
//! assert!(create_provider(&config).is_err());
//! ```

mod mock;
mod ollama;
mod openai;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;

use crate::config::ChefConfig;
use crate::error::{ChefError, Result as ChefResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Average characters per token for mixed content
const CHARS_PER_TOKEN_MIXED: f32 = 3.0;

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// Core trait that all model providers implement
///
/// Errors are opaque: the executor absorbs them into the flow's fallback.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g. "openai", "ollama", "mock")
    fn name(&self) -> &str;

    /// Run one model turn
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Check if this provider is usable (API key set, etc.)
    fn is_available(&self) -> bool {
        true
    }
}

// ============================================================================
// REQUEST/RESPONSE TYPES
// ============================================================================

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the conversation with the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Tool calls requested by the assistant in this message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool call ID (for tool results only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    /// Assistant turn that asked for tool calls
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            tool_calls: calls,
            ..Self::user(content)
        }
    }

    /// Result of a tool call, fed back to the model
    pub fn tool_result(tool_call_id: impl Into<String>, result: &Value) -> Self {
        Self {
            role: MessageRole::Tool,
            tool_call_id: Some(tool_call_id.into()),
            ..Self::user(result.to_string())
        }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique ID of this tool call
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// Proposed tool input
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Tool as advertised to the model
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the tool's input
    pub parameters: Value,
}

/// One model turn request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Flow being executed (used as the structured-output name)
    pub flow: String,
    /// Conversation so far: the rendered prompt plus tool round trips
    pub messages: Vec<Message>,
    /// Tools the model may call
    pub tools: Vec<ToolSpec>,
    /// JSON Schema the final answer must satisfy
    pub output_schema: Value,
}

impl ChatRequest {
    /// Completed tool rounds so far
    pub fn tool_rounds(&self) -> u32 {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant && !m.tool_calls.is_empty())
            .count() as u32
    }

    /// Characters of prompt text, for usage estimates
    pub fn prompt_len(&self) -> usize {
        self.messages.iter().map(|m| m.content.len()).sum()
    }
}

/// Response from one model turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    /// Text content (the candidate answer when there are no tool calls)
    pub content: Option<String>,
    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }

    /// Estimate usage when the provider reports none
    pub fn estimate(prompt_len: usize, response_len: usize) -> Self {
        let prompt_tokens = (prompt_len as f32 / CHARS_PER_TOKEN_MIXED).ceil() as u32;
        let completion_tokens = (response_len as f32 / CHARS_PER_TOKEN_MIXED).ceil() as u32;
        Self::new(prompt_tokens, completion_tokens)
    }
}

// ============================================================================
// PROVIDER FACTORY
// ============================================================================

/// Create a provider from configuration
///
/// | Name | Description | Requires |
/// |------|-------------|----------|
/// | `openai` | OpenAI-compatible API | `api_key` / `OPENAI_API_KEY` |
/// | `ollama` | Local Ollama | Ollama running |
/// | `mock` | Testing | Nothing |
pub fn create_provider(config: &ChefConfig) -> ChefResult<Arc<dyn Provider>> {
    match config.provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAIProvider::from_config(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::from_config(config)?)),
        "mock" => Ok(Arc::new(MockProvider::new())),
        _ => Err(ChefError::UnknownProvider {
            name: config.provider.clone(),
        }),
    }
}

pub(crate) fn http_client(config: &ChefConfig) -> ChefResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .map_err(|e| ChefError::ConfigError {
            reason: format!("Failed to build HTTP client: {}", e),
        })
}

// ============================================================================
// TESTS
// ============================================================================

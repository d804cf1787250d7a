//! Mock provider for testing
//!
//! Returns scripted turns without making real API calls.
//! Essential for unit tests and CI pipelines.

use super::{ChatRequest, ChatResponse, Provider, TokenUsage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// One scripted model turn
#[derive(Debug, Clone)]
enum Turn {
    Respond(ChatResponse),
    Fail(String),
}

/// Mock provider that replays predefined turns
pub struct MockProvider {
    /// Turns to play back (FIFO)
    turns: Arc<Mutex<VecDeque<Turn>>>,
    /// Default answer when the queue is empty
    default_response: String,
    /// Fail every call once the queue is empty
    failing: bool,
    /// Artificial latency per call
    delay: Option<Duration>,
    /// Track all requests made (for assertions)
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider answering "Mock response"
    pub fn new() -> Self {
        Self {
            turns: Arc::new(Mutex::new(VecDeque::new())),
            default_response: "Mock response".to_string(),
            failing: false,
            delay: None,
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Create with a queue of text answers
    pub fn with_responses(responses: Vec<String>) -> Self {
        let provider = Self::new();
        for response in responses {
            provider.queue_response(ChatResponse::text(response));
        }
        provider
    }

    /// A provider whose every call fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    /// Set the default answer when the queue is empty
    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Sleep before every turn (for cancellation and concurrency tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add a turn to the queue
    pub fn queue_response(&self, response: ChatResponse) {
        self.turns.lock().push_back(Turn::Respond(response));
    }

    /// Add a failing turn to the queue
    pub fn queue_failure(&self, reason: impl Into<String>) {
        self.turns.lock().push_back(Turn::Fail(reason.into()));
    }

    /// Get all requests made to this provider
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        // Never hold the lock across .await
        let turn = self.turns.lock().pop_front();
        match turn {
            Some(Turn::Respond(response)) => Ok(response),
            Some(Turn::Fail(reason)) => Err(anyhow!(reason)),
            None if self.failing => Err(anyhow!("mock provider configured to fail")),
            None => {
                let usage =
                    TokenUsage::estimate(request.prompt_len(), self.default_response.len());
                Ok(ChatResponse::text(self.default_response.clone()).with_usage(usage))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Message, ToolCall};
    use serde_json::json;

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            flow: "test".to_string(),
            messages: vec![Message::user(prompt)],
            tools: vec![],
            output_schema: json!({"type": "object"}),
        }
    }

    #[tokio::test]
    async fn test_mock_default_response() {
        let provider = MockProvider::new();
        let response = provider.chat(&request("Hello")).await.unwrap();

        assert_eq!(response.content.as_deref(), Some("Mock response"));
        assert!(!response.has_tool_calls());
    }

    #[tokio::test]
    async fn test_mock_custom_default() {
        let provider = MockProvider::new().with_default(r#"{"recipes": []}"#);
        for _ in 0..2 {
            let response = provider.chat(&request("Hello")).await.unwrap();
            assert_eq!(response.content.as_deref(), Some(r#"{"recipes": []}"#));
        }
    }

    #[tokio::test]
    async fn test_mock_queued_turns() {
        let provider = MockProvider::with_responses(vec!["First".to_string()]);
        provider.queue_response(ChatResponse::tool_calls(vec![ToolCall::new(
            "c1",
            "lookup",
            json!({}),
        )]));

        let first = provider.chat(&request("a")).await.unwrap();
        let second = provider.chat(&request("b")).await.unwrap();
        let third = provider.chat(&request("c")).await.unwrap();

        assert_eq!(first.content.as_deref(), Some("First"));
        assert_eq!(second.tool_calls[0].name, "lookup");
        assert_eq!(third.content.as_deref(), Some("Mock response"));
    }

    #[tokio::test]
    async fn test_mock_failures() {
        let provider = MockProvider::new();
        provider.queue_failure("quota exceeded");
        let err = provider.chat(&request("a")).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");

        let provider = MockProvider::failing();
        assert!(provider.chat(&request("a")).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let provider = MockProvider::new();
        provider.chat(&request("First prompt")).await.unwrap();
        provider.chat(&request("Second prompt")).await.unwrap();

        assert_eq!(provider.call_count(), 2);
        let last = provider.last_request().unwrap();
        assert_eq!(last.messages[0].content, "Second prompt");
    }
}

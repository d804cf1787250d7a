//! Flow executor
//!
//! Runs one request/response cycle of a flow:
//!
//! ```text
//! Idle → InputValidated → PromptRendered → AwaitingModel
//!      → (ToolCallLoop → AwaitingModel)* → OutputReceived
//!      → OutputValidated | OutputFallback → Done
//! ```
//!
//! Caller mistakes (unknown flow, input outside the schema, a template that
//! cannot render) are returned as errors before the model is involved.
//! Anything that goes wrong at the model boundary afterwards is absorbed:
//! the caller gets [`ExecutionResult::Fallback`] and the reason is recorded
//! in the [`EventLog`].

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{format_violations, ChefError, Result};
use crate::event_log::{EventKind, EventLog};
use crate::flow::FlowDefinition;
use crate::provider::{ChatRequest, Message, Provider, ToolCall, ToolSpec};
use crate::registry::FlowRegistry;
use crate::schema::Violation;
use crate::tool::ToolDefinition;

/// Longest excerpt of unparseable model output kept for diagnostics
const EXCERPT_LEN: usize = 200;

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Why a flow answered with its fallback
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelFailure {
    #[error("model provider failed: {0}")]
    Provider(String),

    #[error("model returned no content")]
    EmptyResponse,

    #[error("model output is not JSON: {0}")]
    Unparseable(String),

    #[error("model output breaks the output schema: {}", format_violations(.0))]
    SchemaMismatch(Vec<Violation>),
}

/// Outcome of a flow execution; always carries a value
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// The model's output, validated against the flow's output schema
    Success(Value),
    /// The flow's fallback value and what went wrong
    Fallback { value: Value, reason: ModelFailure },
}

impl ExecutionResult {
    pub fn value(&self) -> &Value {
        match self {
            Self::Success(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Success(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn failure(&self) -> Option<&ModelFailure> {
        match self {
            Self::Success(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }

    /// For callers that treat a fallback as an error
    pub fn into_success(self) -> Result<Value> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Fallback { reason, .. } => Err(ChefError::ModelBoundary {
                reason: reason.to_string(),
            }),
        }
    }
}

/// Executor state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    InputValidated,
    PromptRendered,
    AwaitingModel,
    ToolCallLoop,
    OutputReceived,
    OutputValidated,
    OutputFallback,
    Done,
}

// ============================================================================
// EXECUTOR
// ============================================================================

/// Executes registered flows against a model provider
///
/// Cheap to clone; clones share the registry, provider and event log.
#[derive(Clone)]
pub struct FlowExecutor {
    registry: Arc<FlowRegistry>,
    provider: Arc<dyn Provider>,
    event_log: EventLog,
}

impl FlowExecutor {
    pub fn new(registry: Arc<FlowRegistry>, provider: Arc<dyn Provider>) -> Self {
        Self {
            registry,
            provider,
            event_log: EventLog::new(),
        }
    }

    /// Share an existing event log
    pub fn with_event_log(mut self, event_log: EventLog) -> Self {
        self.event_log = event_log;
        self
    }

    pub fn registry(&self) -> &Arc<FlowRegistry> {
        &self.registry
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Run a flow to completion
    ///
    /// # Errors
    ///
    /// `UnknownFlow`, `InvalidInput` and `TemplateError` only. Model failures
    /// come back as [`ExecutionResult::Fallback`].
    #[instrument(name = "flow", skip(self, input), fields(provider = self.provider.name()))]
    pub async fn execute(&self, flow_name: &str, input: &Value) -> Result<ExecutionResult> {
        let started = Instant::now();
        let flow = self.registry.flow(flow_name)?;
        let mut run = Run::new(&self.event_log, &flow);

        run.emit(EventKind::FlowStarted {
            flow: run.flow_name(),
            input: input.clone(),
        });

        if let Err(violations) = flow.input_schema().validate(input).into_result() {
            run.emit(EventKind::InputRejected {
                flow: run.flow_name(),
                violations: violations.len(),
            });
            return Err(ChefError::InvalidInput {
                flow: flow.name().to_string(),
                violations,
            });
        }
        run.advance(FlowState::InputValidated);

        let prompt = flow.template().render(input)?;
        run.advance(FlowState::PromptRendered);
        run.emit(EventKind::PromptRendered {
            flow: run.flow_name(),
            prompt_len: prompt.len(),
        });

        let result = match self.converse(&mut run, &flow, prompt).await {
            Ok(value) => {
                run.advance(FlowState::OutputValidated);
                ExecutionResult::Success(value)
            }
            Err(reason) => {
                run.advance(FlowState::OutputFallback);
                warn!(
                    flow = %flow.name(),
                    execution_id = %run.id,
                    reason = %reason,
                    "Model output unusable, applying fallback"
                );
                run.emit(EventKind::FallbackApplied {
                    flow: run.flow_name(),
                    reason: reason.to_string(),
                });
                ExecutionResult::Fallback {
                    value: flow.fallback_value(input),
                    reason,
                }
            }
        };

        run.advance(FlowState::Done);
        let duration_ms = started.elapsed().as_millis() as u64;
        run.emit(EventKind::FlowCompleted {
            flow: run.flow_name(),
            fallback: result.is_fallback(),
            duration_ms,
        });
        info!(
            flow = %flow.name(),
            execution_id = %run.id,
            fallback = result.is_fallback(),
            duration_ms,
            "Flow completed"
        );

        Ok(result)
    }

    /// Run a flow unless `token` is cancelled first
    pub async fn execute_cancellable(
        &self,
        flow_name: &str,
        input: &Value,
        token: CancellationToken,
    ) -> Result<ExecutionResult> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(flow = %flow_name, "Flow execution cancelled");
                Err(ChefError::Cancelled { flow: flow_name.to_string() })
            }
            result = self.execute(flow_name, input) => result,
        }
    }

    /// Model conversation with the tool-call sub-loop
    ///
    /// The loop has no round limit of its own: it ends when the model answers
    /// without tool calls or the provider fails.
    async fn converse(
        &self,
        run: &mut Run<'_>,
        flow: &FlowDefinition,
        prompt: String,
    ) -> std::result::Result<Value, ModelFailure> {
        let tools = self.registry.tools_for(flow);
        let mut request = ChatRequest {
            flow: flow.name().to_string(),
            messages: vec![Message::user(prompt)],
            tools: tools
                .iter()
                .map(|tool| ToolSpec {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.input_schema().to_json_schema(),
                })
                .collect(),
            output_schema: flow.output_schema().to_json_schema(),
        };

        let mut round = 0u32;
        loop {
            run.advance(FlowState::AwaitingModel);
            run.emit(EventKind::ModelCalled {
                flow: run.flow_name(),
                provider: self.provider.name().to_string(),
                round,
                tools_offered: request.tools.len(),
            });

            let response = self
                .provider
                .chat(&request)
                .await
                .map_err(|e| ModelFailure::Provider(format!("{:#}", e)))?;

            run.emit(EventKind::ModelResponded {
                flow: run.flow_name(),
                tool_calls: response.tool_calls.len(),
                tokens_used: Some(response.usage.total_tokens).filter(|t| *t > 0),
            });

            if !response.has_tool_calls() {
                run.advance(FlowState::OutputReceived);
                let content = response
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .ok_or(ModelFailure::EmptyResponse)?;
                let candidate = parse_model_output(&content)
                    .ok_or_else(|| ModelFailure::Unparseable(excerpt(&content)))?;
                flow.output_schema()
                    .validate(&candidate)
                    .into_result()
                    .map_err(ModelFailure::SchemaMismatch)?;
                return Ok(candidate);
            }

            run.advance(FlowState::ToolCallLoop);
            let results: Vec<(String, Value)> = response
                .tool_calls
                .iter()
                .map(|call| (call.id.clone(), self.run_tool(&*run, &tools, call)))
                .collect();

            request.messages.push(Message::assistant_tool_calls(
                response.content.unwrap_or_default(),
                response.tool_calls,
            ));
            for (call_id, result) in results {
                request.messages.push(Message::tool_result(call_id, &result));
            }
            round += 1;
        }
    }

    /// Answer one tool call; never fails, the model always gets a result
    fn run_tool(&self, run: &Run<'_>, tools: &[Arc<ToolDefinition>], call: &ToolCall) -> Value {
        let Some(tool) = tools.iter().find(|t| t.name() == call.name) else {
            warn!(
                flow = %run.flow,
                tool = %call.name,
                "Model called a tool this flow does not declare"
            );
            run.emit(EventKind::ToolRejected {
                flow: run.flow_name(),
                tool: call.name.clone(),
                reason: "not declared by this flow".to_string(),
            });
            return json!({
                "error": format!("Tool '{}' is not available in this flow", call.name)
            });
        };

        match tool.invoke(&call.arguments) {
            Ok(output) => {
                debug!(flow = %run.flow, tool = %call.name, "Tool invoked");
                run.emit(EventKind::ToolInvoked {
                    flow: run.flow_name(),
                    tool: call.name.clone(),
                    output: output.clone(),
                });
                output
            }
            Err(e) => {
                warn!(flow = %run.flow, tool = %call.name, error = %e, "Malformed tool call");
                run.emit(EventKind::ToolRejected {
                    flow: run.flow_name(),
                    tool: call.name.clone(),
                    reason: e.to_string(),
                });
                tool.negative_result().clone()
            }
        }
    }
}

impl std::fmt::Debug for FlowExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowExecutor")
            .field("flows", &self.registry.flow_names())
            .field("provider", &self.provider.name())
            .finish()
    }
}

/// Per-execution bookkeeping
struct Run<'a> {
    id: Arc<str>,
    flow: Arc<str>,
    state: FlowState,
    log: &'a EventLog,
}

impl<'a> Run<'a> {
    fn new(log: &'a EventLog, flow: &FlowDefinition) -> Self {
        Self {
            id: Uuid::new_v4().to_string().into(),
            flow: flow.name().into(),
            state: FlowState::Idle,
            log,
        }
    }

    fn flow_name(&self) -> Arc<str> {
        Arc::clone(&self.flow)
    }

    fn advance(&mut self, next: FlowState) {
        debug!(
            flow = %self.flow,
            execution_id = %self.id,
            from = ?self.state,
            to = ?next,
            "Flow state transition"
        );
        self.state = next;
    }

    fn emit(&self, kind: EventKind) {
        self.log.emit(&self.id, kind);
    }
}

// ============================================================================
// OUTPUT PARSING
// ============================================================================

/// Extract the JSON candidate from a model answer
///
/// Accepts plain JSON, JSON inside a Markdown code fence, or the outermost
/// `{...}` embedded in prose.
pub fn parse_model_output(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(fenced) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(fenced) {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

/// Body of the first ``` fence, language tag stripped
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

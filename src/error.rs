//! Error types with fix suggestions
//!
//! Error code ranges:
//! - CHEF-000-009: Registry errors (flows, tools)
//! - CHEF-010-019: Input validation errors
//! - CHEF-020-029: Template errors
//! - CHEF-030-039: Tool and fallback errors
//! - CHEF-040-049: Model boundary errors
//! - CHEF-050-059: Configuration errors
//! - CHEF-090-099: Serialization errors

use crate::schema::Violation;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChefError>;

/// Format schema violations for display
pub(crate) fn format_violations(violations: &[Violation]) -> String {
    match violations {
        [] => "no violations".to_string(),
        [single] => single.to_string(),
        many => format!(
            "{} violations: {}",
            many.len(),
            many.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        ),
    }
}

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum ChefError {
    // ─────────────────────────────────────────────────────────────
    // Registry errors (CHEF-001 to CHEF-004)
    // ─────────────────────────────────────────────────────────────
    #[error("[CHEF-001] Unknown flow: '{name}'")]
    UnknownFlow { name: String },

    #[error("[CHEF-002] Flow '{flow}' references unknown tool '{name}'")]
    UnknownTool { name: String, flow: String },

    #[error("[CHEF-003] Flow '{name}' is already registered")]
    DuplicateFlow { name: String },

    #[error("[CHEF-004] Tool '{name}' is already registered")]
    DuplicateTool { name: String },

    // ─────────────────────────────────────────────────────────────
    // Input errors (CHEF-010)
    // ─────────────────────────────────────────────────────────────
    #[error("[CHEF-010] Invalid input for flow '{flow}': {}", format_violations(.violations))]
    InvalidInput {
        flow: String,
        violations: Vec<Violation>,
    },

    // ─────────────────────────────────────────────────────────────
    // Template errors (CHEF-020 to CHEF-021)
    // ─────────────────────────────────────────────────────────────
    #[error("[CHEF-020] Template parse error at position {position}: {details}")]
    TemplateParse { position: usize, details: String },

    #[error("[CHEF-021] Template error: {details}")]
    TemplateError { details: String },

    // ─────────────────────────────────────────────────────────────
    // Tool and fallback errors (CHEF-030 to CHEF-031)
    // ─────────────────────────────────────────────────────────────
    #[error("[CHEF-030] Invalid input for tool '{tool}': {}", format_violations(.violations))]
    ToolInputInvalid {
        tool: String,
        violations: Vec<Violation>,
    },

    #[error("[CHEF-031] {owner} declares a result that breaks its output schema: {}", format_violations(.violations))]
    InvalidFallback {
        owner: String,
        violations: Vec<Violation>,
    },

    // ─────────────────────────────────────────────────────────────
    // Model boundary errors (CHEF-040 to CHEF-041)
    // ─────────────────────────────────────────────────────────────
    #[error("[CHEF-040] Model boundary failure: {reason}")]
    ModelBoundary { reason: String },

    #[error("[CHEF-041] Flow '{flow}' was cancelled")]
    Cancelled { flow: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration errors (CHEF-050 to CHEF-051)
    // ─────────────────────────────────────────────────────────────
    #[error("[CHEF-050] Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("[CHEF-051] Unknown provider: '{name}'")]
    UnknownProvider { name: String },

    // ─────────────────────────────────────────────────────────────
    // Serialization (CHEF-091)
    // ─────────────────────────────────────────────────────────────
    #[error("[CHEF-091] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChefError {
    /// Stable error code (e.g. `CHEF-010`)
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownFlow { .. } => "CHEF-001",
            Self::UnknownTool { .. } => "CHEF-002",
            Self::DuplicateFlow { .. } => "CHEF-003",
            Self::DuplicateTool { .. } => "CHEF-004",
            Self::InvalidInput { .. } => "CHEF-010",
            Self::TemplateParse { .. } => "CHEF-020",
            Self::TemplateError { .. } => "CHEF-021",
            Self::ToolInputInvalid { .. } => "CHEF-030",
            Self::InvalidFallback { .. } => "CHEF-031",
            Self::ModelBoundary { .. } => "CHEF-040",
            Self::Cancelled { .. } => "CHEF-041",
            Self::ConfigError { .. } => "CHEF-050",
            Self::UnknownProvider { .. } => "CHEF-051",
            Self::Json(_) => "CHEF-091",
        }
    }

    /// Caller errors are reported as-is and never retried
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::Cancelled { .. })
    }
}

impl FixSuggestion for ChefError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ChefError::UnknownFlow { .. } => {
                Some("Run `fridge-chef flows` to list the registered flows")
            }
            ChefError::UnknownTool { .. } => {
                Some("Register the tool before the flow that references it")
            }
            ChefError::DuplicateFlow { .. } | ChefError::DuplicateTool { .. } => {
                Some("Use unique names when building the registry")
            }
            ChefError::InvalidInput { .. } => Some("Fix the input to match the flow's input schema"),
            ChefError::TemplateParse { .. } => Some(
                "Check template syntax: {{field}}, {{#each list}}...{{/each}}, {{#unless @last}}, {{/unless}}",
            ),
            ChefError::TemplateError { .. } => {
                Some("Declare every field the prompt template references in the input schema")
            }
            ChefError::ToolInputInvalid { .. } => {
                Some("Tool calls must match the tool's input schema")
            }
            ChefError::InvalidFallback { .. } => {
                Some("Make the fallback/negative result conform to the output schema")
            }
            ChefError::ModelBoundary { .. } => {
                Some("Check provider availability, API key and timeout settings")
            }
            ChefError::Cancelled { .. } => None,
            ChefError::ConfigError { .. } => Some("Check fridge-chef.yaml and FRIDGE_CHEF_* env vars"),
            ChefError::UnknownProvider { .. } => Some("Available providers: openai, ollama, mock"),
            ChefError::Json(_) => Some("Ensure the value is valid JSON"),
        }
    }
}

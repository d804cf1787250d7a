//! Fridge Chef - recipe suggestions from the ingredients on hand
//!
//! Structured flow-execution engine: validate typed input, render a prompt,
//! let the model call declared tools, validate its answer, and always return
//! a typed value (the flow's fallback when the model fails).

pub mod config;
pub mod display;
pub mod error;
pub mod event_log;
pub mod executor;
pub mod flow;
pub mod flows;
pub mod provider;
pub mod registry;
pub mod schema;
pub mod template;
pub mod tool;

pub use config::ChefConfig;
pub use error::{ChefError, FixSuggestion, Result};
pub use event_log::{Event, EventKind, EventLog};
pub use executor::{ExecutionResult, FlowExecutor, FlowState, ModelFailure};
pub use flow::{FallbackPolicy, FlowDefinition};
pub use flows::{standard_registry, FridgeChef, Recipe, SuggestRecipeOutput};
pub use provider::{create_provider, MockProvider, Provider};
pub use registry::{FlowDescriptor, FlowRegistry};
pub use schema::{Field, Schema, ValidationOutcome, Violation};
pub use template::Template;
pub use tool::ToolDefinition;

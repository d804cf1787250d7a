//! Tool definitions the model may call mid-generation
//!
//! A tool is a named, schema-typed, pure function. The executor runs it
//! synchronously whenever the model asks, so handlers must not touch the
//! network or any shared mutable state: calling twice with the same input
//! must give the same output.

use crate::error::{ChefError, Result};
use crate::schema::Schema;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Deterministic tool body
pub trait ToolHandler: Send + Sync {
    fn call(&self, input: &Value) -> Value;
}

impl<F> ToolHandler for F
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    fn call(&self, input: &Value) -> Value {
        self(input)
    }
}

/// A registered tool
#[derive(Clone)]
pub struct ToolDefinition {
    name: String,
    description: String,
    input_schema: Schema,
    output_schema: Schema,
    handler: Arc<dyn ToolHandler>,
    /// Well-formed "no" answer, returned for rejected calls
    negative: Value,
}

impl ToolDefinition {
    /// Create a tool whose negative result is the output schema's empty value
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Schema,
        output_schema: Schema,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        let negative = output_schema.empty_value();
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            output_schema,
            handler: Arc::new(handler),
            negative,
        }
    }

    /// Override the negative result (must conform to the output schema)
    pub fn with_negative_result(mut self, negative: Value) -> Result<Self> {
        self.output_schema
            .validate(&negative)
            .into_result()
            .map_err(|violations| ChefError::InvalidFallback {
                owner: format!("tool '{}'", self.name),
                violations,
            })?;
        self.negative = negative;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    pub fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    pub fn negative_result(&self) -> &Value {
        &self.negative
    }

    /// Validate the input, run the handler, and guarantee a conforming output
    pub fn invoke(&self, input: &Value) -> Result<Value> {
        self.input_schema
            .validate(input)
            .into_result()
            .map_err(|violations| ChefError::ToolInputInvalid {
                tool: self.name.clone(),
                violations,
            })?;

        let output = self.handler.call(input);
        if let Err(violations) = self.output_schema.validate(&output).into_result() {
            tracing::error!(
                tool = %self.name,
                violations = violations.len(),
                "Tool produced output outside its schema, answering with negative result"
            );
            return Ok(self.negative.clone());
        }
        Ok(output)
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("input_schema", &self.input_schema.shape_name())
            .field("output_schema", &self.output_schema.shape_name())
            .finish()
    }
}

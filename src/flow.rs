//! Flow definitions and fallback policies

use crate::error::{ChefError, Result};
use crate::schema::Schema;
use crate::template::Template;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Derives a fallback from the flow's validated input
pub type FallbackFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// What a flow returns when the model gives nothing usable
#[derive(Clone)]
pub enum FallbackPolicy {
    /// Object with `field` set to `[]`; required siblings empty, optional ones omitted
    EmptyCollection { field: String },
    /// A fixed value
    Fixed(Value),
    /// Computed from the validated input
    Derived(FallbackFn),
}

impl FallbackPolicy {
    /// Default policy for an output schema
    ///
    /// An object output whose fields include an array gets `EmptyCollection`
    /// on the first such field; anything else falls back to its empty value.
    pub fn infer(output: &Schema) -> Self {
        let collection = output.as_object().and_then(|obj| {
            obj.fields
                .iter()
                .find(|f| matches!(f.schema, Schema::Array(_)))
                .map(|f| f.name.clone())
        });
        match collection {
            Some(field) => Self::EmptyCollection { field },
            None => Self::Fixed(output.empty_value()),
        }
    }

    pub fn derived(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self::Derived(Arc::new(f))
    }

    fn produce(&self, output: &Schema, input: &Value) -> Value {
        match self {
            Self::EmptyCollection { field } => {
                let mut value = match output.empty_value() {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                value.insert(field.clone(), Value::Array(vec![]));
                Value::Object(value)
            }
            Self::Fixed(value) => value.clone(),
            Self::Derived(f) => f(input),
        }
    }
}

impl fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCollection { field } => f
                .debug_struct("EmptyCollection")
                .field("field", field)
                .finish(),
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// A named flow: schemas, prompt, tools, fallback
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    name: String,
    description: String,
    input_schema: Schema,
    output_schema: Schema,
    template: Template,
    tools: Vec<String>,
    fallback: FallbackPolicy,
}

impl FlowDefinition {
    /// Start building a flow; the prompt is parsed immediately
    pub fn builder(
        name: impl Into<String>,
        input_schema: Schema,
        output_schema: Schema,
        prompt: &str,
    ) -> Result<FlowBuilder> {
        let template = Template::parse(prompt)?;
        let fallback = FallbackPolicy::infer(&output_schema);
        Ok(FlowBuilder {
            flow: FlowDefinition {
                name: name.into(),
                description: String::new(),
                input_schema,
                output_schema,
                template,
                tools: Vec::new(),
                fallback,
            },
        })
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

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Tool names in declaration order
    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    pub fn fallback_policy(&self) -> &FallbackPolicy {
        &self.fallback
    }

    /// The fallback value for this input, always conforming to the output schema
    pub fn fallback_value(&self, input: &Value) -> Value {
        let value = self.fallback.produce(&self.output_schema, input);
        if self.output_schema.validate(&value).is_valid() {
            return value;
        }
        tracing::error!(
            flow = %self.name,
            "Fallback policy produced a value outside the output schema, using empty value"
        );
        self.output_schema.empty_value()
    }

    /// Static checks run at registration
    pub(crate) fn check(&self) -> Result<()> {
        let declared = self.input_schema.as_object();
        for field in self.template.root_fields() {
            let known = declared.map(|obj| obj.field(&field).is_some()).unwrap_or(false);
            if !known {
                return Err(ChefError::TemplateError {
                    details: format!(
                        "flow '{}' prompt references '{}' which its input schema does not declare",
                        self.name, field
                    ),
                });
            }
        }

        if !matches!(self.fallback, FallbackPolicy::Derived(_)) {
            let sample = self.fallback.produce(&self.output_schema, &Value::Null);
            self.output_schema
                .validate(&sample)
                .into_result()
                .map_err(|violations| ChefError::InvalidFallback {
                    owner: format!("flow '{}'", self.name),
                    violations,
                })?;
        }
        Ok(())
    }
}

/// Builder for [`FlowDefinition`]
pub struct FlowBuilder {
    flow: FlowDefinition,
}

impl FlowBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.flow.description = description.into();
        self
    }

    /// Declare a tool the model may call during this flow
    pub fn tool(mut self, name: impl Into<String>) -> Self {
        self.flow.tools.push(name.into());
        self
    }

    pub fn fallback(mut self, policy: FallbackPolicy) -> Self {
        self.flow.fallback = policy;
        self
    }

    pub fn build(self) -> FlowDefinition {
        self.flow
    }
}

//! Flow Registry
//!
//! Immutable map of flows and tools, built once at startup and shared by
//! `Arc`. Lookups are for discovery and execution; nothing is mutated after
//! [`FlowRegistryBuilder::build`], so concurrent executions need no locking.

use crate::error::{ChefError, Result};
use crate::flow::FlowDefinition;
use crate::tool::ToolDefinition;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registered flows and tools
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: BTreeMap<String, Arc<FlowDefinition>>,
    tools: BTreeMap<String, Arc<ToolDefinition>>,
}

impl FlowRegistry {
    pub fn builder() -> FlowRegistryBuilder {
        FlowRegistryBuilder::default()
    }

    pub fn flow(&self, name: &str) -> Result<Arc<FlowDefinition>> {
        self.flows
            .get(name)
            .cloned()
            .ok_or_else(|| ChefError::UnknownFlow {
                name: name.to_string(),
            })
    }

    pub fn tool(&self, name: &str) -> Option<Arc<ToolDefinition>> {
        self.tools.get(name).cloned()
    }

    /// Tools a flow declared, in declaration order
    pub fn tools_for(&self, flow: &FlowDefinition) -> Vec<Arc<ToolDefinition>> {
        flow.tools()
            .iter()
            .filter_map(|name| self.tool(name))
            .collect()
    }

    /// Registered flow names, sorted
    pub fn flow_names(&self) -> Vec<&str> {
        self.flows.keys().map(String::as_str).collect()
    }

    /// Registered tool names, sorted
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Introspection view of a flow
    pub fn describe(&self, name: &str) -> Result<FlowDescriptor> {
        let flow = self.flow(name)?;
        let tools = self
            .tools_for(&flow)
            .iter()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema().to_json_schema(),
                output_schema: tool.output_schema().to_json_schema(),
            })
            .collect();

        Ok(FlowDescriptor {
            name: flow.name().to_string(),
            description: flow.description().to_string(),
            input_schema: flow.input_schema().to_json_schema(),
            output_schema: flow.output_schema().to_json_schema(),
            tools,
        })
    }

    /// Every flow, described
    pub fn describe_all(&self) -> Vec<FlowDescriptor> {
        self.flows
            .keys()
            .filter_map(|name| self.describe(name).ok())
            .collect()
    }
}

/// Serializable description of a flow
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
    pub tools: Vec<ToolDescriptor>,
}

/// Serializable description of a tool
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
}

/// Collects definitions, checks them, and freezes the registry
#[derive(Debug, Default)]
pub struct FlowRegistryBuilder {
    flows: Vec<FlowDefinition>,
    tools: Vec<ToolDefinition>,
}

impl FlowRegistryBuilder {
    pub fn tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn flow(mut self, flow: FlowDefinition) -> Self {
        self.flows.push(flow);
        self
    }

    /// Check uniqueness, tool references, templates and fallbacks
    pub fn build(self) -> Result<FlowRegistry> {
        let mut registry = FlowRegistry::default();

        for tool in self.tools {
            if registry.tools.contains_key(tool.name()) {
                return Err(ChefError::DuplicateTool {
                    name: tool.name().to_string(),
                });
            }
            registry.tools.insert(tool.name().to_string(), Arc::new(tool));
        }

        for flow in self.flows {
            if registry.flows.contains_key(flow.name()) {
                return Err(ChefError::DuplicateFlow {
                    name: flow.name().to_string(),
                });
            }
            if let Some(missing) = flow.tools().iter().find(|t| !registry.tools.contains_key(*t)) {
                return Err(ChefError::UnknownTool {
                    name: missing.clone(),
                    flow: flow.name().to_string(),
                });
            }
            flow.check()?;
            registry.flows.insert(flow.name().to_string(), Arc::new(flow));
        }

        tracing::debug!(
            flows = registry.flows.len(),
            tools = registry.tools.len(),
            "Flow registry built"
        );
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Schema};
    use serde_json::json;

    fn tool(name: &str) -> ToolDefinition {
        ToolDefinition::new(name, "test tool", Schema::string(), Schema::boolean(), |_: &Value| {
            json!(true)
        })
    }

    fn flow(name: &str, tools: &[&str]) -> FlowDefinition {
        let mut builder = FlowDefinition::builder(
            name,
            Schema::object(vec![Field::required("q", Schema::string(), "question")]),
            Schema::object(vec![Field::required("answers", Schema::array_of(Schema::string()), "")]),
            "Q: {{q}}",
        )
        .unwrap();
        for t in tools {
            builder = builder.tool(*t);
        }
        builder.build()
    }

    #[test]
    fn test_build_and_lookup() {
        let registry = FlowRegistry::builder()
            .tool(tool("lookup"))
            .flow(flow("ask", &["lookup"]))
            .build()
            .unwrap();

        assert_eq!(registry.flow_names(), vec!["ask"]);
        assert_eq!(registry.tool_names(), vec!["lookup"]);
        let ask = registry.flow("ask").unwrap();
        assert_eq!(registry.tools_for(&ask).len(), 1);
    }

    #[test]
    fn test_unknown_flow() {
        let registry = FlowRegistry::builder().build().unwrap();
        assert!(matches!(registry.flow("nope"), Err(ChefError::UnknownFlow { .. })));
    }

    #[test]
    fn test_flow_referencing_unregistered_tool() {
        let err = FlowRegistry::builder()
            .flow(flow("ask", &["ghost"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ChefError::UnknownTool { ref name, .. } if name == "ghost"));
    }

    #[test]
    fn test_duplicates_rejected() {
        let err = FlowRegistry::builder()
            .tool(tool("t"))
            .tool(tool("t"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ChefError::DuplicateTool { .. }));

        let err = FlowRegistry::builder()
            .flow(flow("f", &[]))
            .flow(flow("f", &[]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ChefError::DuplicateFlow { .. }));
    }

    #[test]
    fn test_describe() {
        let registry = FlowRegistry::builder()
            .tool(tool("lookup"))
            .flow(flow("ask", &["lookup"]))
            .build()
            .unwrap();

        let desc = registry.describe("ask").unwrap();
        assert_eq!(desc.input_schema["properties"]["q"]["description"], "question");
        assert_eq!(desc.tools[0].name, "lookup");
        assert_eq!(desc.tools[0].output_schema, json!({"type": "boolean"}));

        let json = serde_json::to_value(&desc).unwrap();
        assert!(json.get("outputSchema").is_some());
    }

    #[test]
    fn test_registries_are_independent() {
        let a = FlowRegistry::builder().flow(flow("a", &[])).build().unwrap();
        let b = FlowRegistry::builder().flow(flow("b", &[])).build().unwrap();
        assert!(a.flow("b").is_err());
        assert!(b.flow("a").is_err());
    }
}

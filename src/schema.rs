//! Schema Validator
//!
//! Declared value shapes for flow and tool I/O, checked at runtime.
//!
//! ## Design
//!
//! - [`Schema`] is a closed tagged enum: primitive, array, object
//! - [`validate`] is a single recursive pass that never short-circuits,
//!   so callers always get the complete list of [`Violation`]s
//! - [`Schema::to_json_schema`] exports the shape for providers that
//!   accept JSON Schema (structured output, tool parameters)
//!
//! ## Usage
//!
//! ```rust
//! use fridge_chef::schema::{validate, Field, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::object(vec![Field::required(
//!     "ingredients",
//!     Schema::array_of(Schema::string()),
//!     "A list of ingredients the user has on hand.",
//! )]);
//!
//! assert!(validate(&json!({"ingredients": ["eggs"]}), &schema).is_valid());
//! assert!(!validate(&json!({"ingredients": "eggs"}), &schema).is_valid());
//! ```

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

/// Path of the value being validated when it is the root
pub const ROOT_PATH: &str = "$";

/// Primitive value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Boolean,
    Number,
}

impl PrimitiveKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Number => "number",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Number => value.is_number(),
        }
    }
}

/// Recursive description of an expected value shape
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Primitive(PrimitiveKind),
    Array(Box<Schema>),
    Object(ObjectSchema),
}

/// Object shape: ordered list of declared fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    pub fields: Vec<Field>,
}

impl ObjectSchema {
    /// Look up a declared field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A declared object field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
    pub description: String,
}

impl Field {
    pub fn required(name: impl Into<String>, schema: Schema, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: impl Into<String>, schema: Schema, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, schema, description)
        }
    }
}

impl Schema {
    pub fn string() -> Self {
        Self::Primitive(PrimitiveKind::String)
    }

    pub fn boolean() -> Self {
        Self::Primitive(PrimitiveKind::Boolean)
    }

    pub fn number() -> Self {
        Self::Primitive(PrimitiveKind::Number)
    }

    pub fn array_of(items: Schema) -> Self {
        Self::Array(Box::new(items))
    }

    pub fn object(fields: Vec<Field>) -> Self {
        Self::Object(ObjectSchema { fields })
    }

    /// Object fields, if this is an object schema
    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Short human-readable shape name (e.g. `array<string>`)
    pub fn shape_name(&self) -> String {
        match self {
            Self::Primitive(kind) => kind.as_str().to_string(),
            Self::Array(items) => format!("array<{}>", items.shape_name()),
            Self::Object(_) => "object".to_string(),
        }
    }

    /// Validate a value against this schema
    pub fn validate(&self, value: &Value) -> ValidationOutcome {
        validate(value, self)
    }

    /// Export as a JSON Schema document
    ///
    /// Optional fields also accept `null`, matching [`validate`](Self::validate).
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::Primitive(kind) => json!({ "type": kind.as_str() }),
            Self::Array(items) => json!({
                "type": "array",
                "items": items.to_json_schema(),
            }),
            Self::Object(obj) => {
                let mut properties = Map::new();
                for field in &obj.fields {
                    let mut prop = field.schema.to_json_schema();
                    // null on an optional field reads as "absent"
                    if !field.required {
                        prop["type"] = json!([prop["type"].clone(), "null"]);
                    }
                    if !field.description.is_empty() {
                        prop["description"] = Value::String(field.description.clone());
                    }
                    properties.insert(field.name.clone(), prop);
                }
                let required: Vec<&str> = obj
                    .fields
                    .iter()
                    .filter(|f| f.required)
                    .map(|f| f.name.as_str())
                    .collect();
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                })
            }
        }
    }

    /// Canonical well-formed empty value
    ///
    /// Required object fields get their own empty value, optional ones are omitted.
    pub fn empty_value(&self) -> Value {
        match self {
            Self::Primitive(PrimitiveKind::String) => Value::String(String::new()),
            Self::Primitive(PrimitiveKind::Boolean) => Value::Bool(false),
            Self::Primitive(PrimitiveKind::Number) => json!(0),
            Self::Array(_) => Value::Array(vec![]),
            Self::Object(obj) => Value::Object(
                obj.fields
                    .iter()
                    .filter(|f| f.required)
                    .map(|f| (f.name.clone(), f.schema.empty_value()))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// What went wrong at a given path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViolationKind {
    /// Value present but of the wrong kind
    TypeMismatch { found: String },
    /// Required object field absent
    MissingRequired,
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Field path (e.g. `recipes[0].title`, `$` for the root)
    pub path: String,
    pub kind: ViolationKind,
    /// Expected shape at this path
    pub expected: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::TypeMismatch { found } => {
                write!(f, "[{}] expected {}, found {}", self.path, self.expected, found)
            }
            ViolationKind::MissingRequired => {
                write!(f, "[{}] missing required field ({})", self.path, self.expected)
            }
        }
    }
}

/// Result of validating a value against a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(Vec<Violation>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Valid => &[],
            Self::Invalid(v) => v,
        }
    }

    /// `Ok(())` when valid, the violations otherwise
    pub fn into_result(self) -> Result<(), Vec<Violation>> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(v) => Err(v),
        }
    }
}

/// Validate `value` against `schema`, collecting every violation
pub fn validate(value: &Value, schema: &Schema) -> ValidationOutcome {
    let mut violations = Vec::new();
    check(value, schema, ROOT_PATH, &mut violations);
    if violations.is_empty() {
        ValidationOutcome::Valid
    } else {
        ValidationOutcome::Invalid(violations)
    }
}

fn check(value: &Value, schema: &Schema, path: &str, out: &mut Vec<Violation>) {
    match schema {
        Schema::Primitive(kind) => {
            if !kind.matches(value) {
                out.push(mismatch(path, schema, value));
            }
        }
        Schema::Array(items) => match value.as_array() {
            Some(elements) => {
                for (i, element) in elements.iter().enumerate() {
                    check(element, items, &index_path(path, i), out);
                }
            }
            None => out.push(mismatch(path, schema, value)),
        },
        Schema::Object(obj) => match value.as_object() {
            Some(map) => {
                for field in &obj.fields {
                    let field_path = child_path(path, &field.name);
                    match map.get(&field.name) {
                        // null on an optional field reads as "absent"
                        None | Some(Value::Null) if !field.required => {}
                        None => out.push(Violation {
                            path: field_path,
                            kind: ViolationKind::MissingRequired,
                            expected: field.schema.shape_name(),
                        }),
                        Some(v) => check(v, &field.schema, &field_path, out),
                    }
                }
            }
            None => out.push(mismatch(path, schema, value)),
        },
    }
}

fn mismatch(path: &str, schema: &Schema, value: &Value) -> Violation {
    Violation {
        path: path.to_string(),
        kind: ViolationKind::TypeMismatch {
            found: kind_name(value).to_string(),
        },
        expected: schema.shape_name(),
    }
}

fn child_path(parent: &str, field: &str) -> String {
    if parent == ROOT_PATH {
        field.to_string()
    } else {
        format!("{}.{}", parent, field)
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Runtime kind of a JSON value
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn recipe_schema() -> Schema {
        Schema::object(vec![
            Field::required("title", Schema::string(), "Recipe name"),
            Field::required("ingredients", Schema::array_of(Schema::string()), ""),
            Field::required("instructions", Schema::array_of(Schema::string()), ""),
        ])
    }

    fn output_schema() -> Schema {
        Schema::object(vec![Field::required(
            "recipes",
            Schema::array_of(recipe_schema()),
            "Suggested recipes",
        )])
    }

    #[test]
    fn test_primitive_kinds() {
        assert!(validate(&json!("x"), &Schema::string()).is_valid());
        assert!(validate(&json!(true), &Schema::boolean()).is_valid());
        assert!(validate(&json!(1.5), &Schema::number()).is_valid());

        let outcome = validate(&json!(3), &Schema::string());
        assert_eq!(
            outcome.violations(),
            &[Violation {
                path: "$".to_string(),
                kind: ViolationKind::TypeMismatch {
                    found: "number".to_string()
                },
                expected: "string".to_string(),
            }]
        );
    }

    #[test]
    fn test_array_accumulates_every_element_violation() {
        let outcome = validate(&json!(["a", 1, "b", false]), &Schema::array_of(Schema::string()));
        let paths: Vec<&str> = outcome.violations().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["$[1]", "$[3]"]);
    }

    #[test]
    fn test_array_rejects_non_sequence() {
        let outcome = validate(&json!("eggs"), &Schema::array_of(Schema::string()));
        assert_eq!(outcome.violations().len(), 1);
        assert_eq!(outcome.violations()[0].expected, "array<string>");
    }

    #[test]
    fn test_object_missing_required_and_nested_paths() {
        let value = json!({
            "recipes": [
                {"title": "Ok", "ingredients": [], "instructions": []},
                {"ingredients": ["x", 2], "instructions": "stir"}
            ]
        });
        let outcome = validate(&value, &output_schema());
        let rendered: Vec<String> = outcome.violations().iter().map(|v| v.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "[recipes[1].title] missing required field (string)",
                "[recipes[1].ingredients[1]] expected string, found number",
                "[recipes[1].instructions] expected array<string>, found string",
            ]
        );
    }

    #[test]
    fn test_missing_collection_field() {
        let outcome = validate(&json!({}), &output_schema());
        assert_eq!(outcome.violations()[0].path, "recipes");
        assert_eq!(outcome.violations()[0].kind, ViolationKind::MissingRequired);
    }

    #[test]
    fn test_optional_field_may_be_absent_or_null() {
        let schema = Schema::object(vec![Field::optional("note", Schema::string(), "")]);
        assert!(validate(&json!({}), &schema).is_valid());
        assert!(validate(&json!({"note": null}), &schema).is_valid());
        assert!(!validate(&json!({"note": 1}), &schema).is_valid());
    }

    #[test]
    fn test_unknown_keys_are_tolerated() {
        let schema = Schema::object(vec![Field::required("a", Schema::string(), "")]);
        assert!(validate(&json!({"a": "x", "extra": [1, 2]}), &schema).is_valid());
    }

    #[test]
    fn test_null_root_is_a_mismatch() {
        let outcome = validate(&Value::Null, &output_schema());
        assert_eq!(outcome.violations()[0].to_string(), "[$] expected object, found null");
    }

    #[test]
    fn test_empty_value_conforms() {
        for schema in [output_schema(), recipe_schema(), Schema::boolean(), Schema::number()] {
            assert!(validate(&schema.empty_value(), &schema).is_valid());
        }
        assert_eq!(output_schema().empty_value(), json!({"recipes": []}));
    }

    #[test]
    fn test_empty_value_omits_optional_fields() {
        let schema = Schema::object(vec![
            Field::required("items", Schema::array_of(Schema::string()), ""),
            Field::optional("note", Schema::string(), ""),
        ]);
        assert_eq!(schema.empty_value(), json!({"items": []}));
    }

    #[test]
    fn test_json_schema_export() {
        let exported = Schema::object(vec![
            Field::required("title", Schema::string(), "Recipe name"),
            Field::optional("tags", Schema::array_of(Schema::string()), ""),
        ])
        .to_json_schema();

        assert_eq!(exported["type"], "object");
        assert_eq!(exported["properties"]["title"]["description"], "Recipe name");
        assert_eq!(exported["properties"]["tags"]["items"]["type"], "string");
        assert!(exported["properties"]["tags"].get("description").is_none());
        assert_eq!(exported["required"], json!(["title"]));

        assert_eq!(exported["properties"]["title"]["type"], "string");
        assert_eq!(exported["properties"]["tags"]["type"], json!(["array", "null"]));
    }

    #[test]
    fn test_into_result() {
        assert!(validate(&json!("a"), &Schema::string()).into_result().is_ok());
        let err = validate(&json!(1), &Schema::string()).into_result().unwrap_err();
        assert_eq!(err.len(), 1);
    }
}

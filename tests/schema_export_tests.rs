//! JSON Schema export checks
//!
//! The exported documents are compiled with an independent JSON Schema
//! implementation and must agree with the built-in validator.

use fridge_chef::flows::{can_substitute_ingredient, standard_registry, SUGGEST_RECIPE_FLOW};
use fridge_chef::{Field, Schema};
use jsonschema::JSONSchema;
use proptest::prelude::*;
use serde_json::{json, Value};

fn compile(schema: &Schema) -> JSONSchema {
    let document = schema.to_json_schema();
    JSONSchema::compile(&document).unwrap()
}

fn suggest_output_schema() -> Schema {
    let registry = standard_registry().unwrap();
    registry
        .flow(SUGGEST_RECIPE_FLOW)
        .unwrap()
        .output_schema()
        .clone()
}

#[test]
fn test_every_flow_exports_a_compilable_schema() {
    let registry = standard_registry().unwrap();
    for name in registry.flow_names() {
        let flow = registry.flow(name).unwrap();
        let input = compile(flow.input_schema());
        let output = compile(flow.output_schema());

        // The canonical empty values are well-formed for both validators
        let empty_in = flow.input_schema().empty_value();
        let empty_out = flow.output_schema().empty_value();
        assert!(input.is_valid(&empty_in), "{} input", name);
        assert!(output.is_valid(&empty_out), "{} output", name);
        assert!(flow.output_schema().validate(&empty_out).is_valid());
    }
}

#[test]
fn test_tool_schemas_accept_negative_result() {
    let tool = can_substitute_ingredient().unwrap();
    let output = compile(tool.output_schema());
    assert!(output.is_valid(tool.negative_result()));

    let input = compile(tool.input_schema());
    assert!(!input.is_valid(&json!({"recipe": "Soup"})));
    assert!(input.is_valid(&json!({
        "recipe": "Soup",
        "ingredientToSubstitute": "cream",
        "availableIngredients": ["milk"]
    })));
}

#[test]
fn test_known_answers_agree() {
    let schema = suggest_output_schema();
    let compiled = compile(&schema);

    let samples = [
        json!({"recipes": []}),
        json!({"recipes": [{"title": "Toast", "ingredients": ["bread"], "instructions": ["Toast it."]}]}),
        json!({"recipes": [{"title": "Toast", "ingredients": ["bread"]}]}),
        json!({"recipes": "Toast"}),
        json!({"recipes": [], "note": "extra keys are tolerated"}),
        json!(["not", "an", "object"]),
        json!(null),
    ];

    for sample in &samples {
        assert_eq!(
            schema.validate(sample).is_valid(),
            compiled.is_valid(sample),
            "disagreement on {}",
            sample
        );
    }
}

#[test]
fn test_optional_null_agrees() {
    let schema = Schema::object(vec![
        Field::required("title", Schema::string(), ""),
        Field::optional("note", Schema::string(), ""),
        Field::optional("tags", Schema::array_of(Schema::string()), ""),
    ]);
    let compiled = compile(&schema);

    let samples = [
        json!({"title": "Soup", "note": null}),
        json!({"title": "Soup", "tags": null}),
        json!({"title": "Soup"}),
        json!({"title": null}),
        json!({"title": "Soup", "note": 3}),
    ];
    for sample in &samples {
        assert_eq!(
            schema.validate(sample).is_valid(),
            compiled.is_valid(sample),
            "disagreement on {}",
            sample
        );
    }
    assert!(schema.validate(&samples[0]).is_valid());
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn leaf() -> BoxedStrategy<Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z ]{0,12}".prop_map(Value::String),
    ]
    .boxed()
}

/// Arbitrary JSON biased towards the recipe answer shape
fn answer_like() -> impl Strategy<Value = Value> {
    let strings = prop::collection::vec(
        prop_oneof![4 => "[a-z ]{1,10}".prop_map(Value::String), 1 => leaf()],
        0..4,
    )
    .boxed();
    let recipe = (
        prop_oneof![3 => "[A-Za-z ]{1,16}".prop_map(Value::String), 1 => leaf()],
        strings.clone(),
        prop_oneof![3 => strings.prop_map(Value::Array), 1 => leaf()],
        any::<bool>(),
    )
        .prop_map(|(title, ingredients, instructions, drop_title)| {
            let mut map = serde_json::Map::new();
            if !drop_title {
                map.insert("title".to_string(), title);
            }
            map.insert("ingredients".to_string(), Value::Array(ingredients));
            map.insert("instructions".to_string(), instructions);
            Value::Object(map)
        });

    prop_oneof![
        4 => prop::collection::vec(recipe, 0..3).prop_map(|r| json!({ "recipes": r })),
        1 => leaf(),
        1 => leaf().prop_map(|v| json!({ "recipes": v })),
    ]
}

/// Arbitrary JSON of bounded depth
fn any_json() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec(("f[0-3]", inner), 0..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// An arbitrary schema together with a value built to conform to it
///
/// Optional fields are randomly omitted, set to null or filled, and every
/// object carries one undeclared key.
fn schema_with_value() -> impl Strategy<Value = (Schema, Value)> {
    let leaf = prop_oneof![
        "[a-z ]{0,8}".prop_map(|s| (Schema::string(), Value::String(s))),
        any::<bool>().prop_map(|b| (Schema::boolean(), Value::Bool(b))),
        any::<i64>().prop_map(|n| (Schema::number(), json!(n))),
    ];

    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            (inner.clone(), 0..4usize).prop_map(|((items, value), len)| {
                (Schema::array_of(items), Value::Array(vec![value; len]))
            }),
            prop::collection::vec((inner, any::<bool>(), 0..3u8), 0..4).prop_map(|members| {
                let mut fields = Vec::new();
                let mut map = serde_json::Map::new();
                for (i, ((schema, value), required, presence)) in members.into_iter().enumerate() {
                    let name = format!("f{}", i);
                    if required {
                        map.insert(name.clone(), value);
                        fields.push(Field::required(name, schema, ""));
                    } else {
                        match presence {
                            0 => {}
                            1 => {
                                map.insert(name.clone(), Value::Null);
                            }
                            _ => {
                                map.insert(name.clone(), value);
                            }
                        }
                        fields.push(Field::optional(name, schema, "field"));
                    }
                }
                map.insert("undeclared".to_string(), json!(true));
                (Schema::object(fields), Value::Object(map))
            }),
        ]
    })
}

proptest! {
    #[test]
    fn prop_constructed_value_is_valid((schema, value) in schema_with_value()) {
        let outcome = schema.validate(&value);
        prop_assert!(outcome.is_valid(), "violations: {:?}", outcome.violations());

        // Re-validating changes nothing
        prop_assert_eq!(schema.validate(&value), outcome);
        prop_assert!(compile(&schema).is_valid(&value));
    }

    #[test]
    fn prop_validate_is_total((schema, _) in schema_with_value(), value in any_json()) {
        let outcome = schema.validate(&value);
        prop_assert_eq!(outcome.is_valid(), outcome.violations().is_empty());
        prop_assert_eq!(outcome.is_valid(), compile(&schema).is_valid(&value));
        prop_assert_eq!(schema.validate(&value), outcome);
    }

    #[test]
    fn prop_empty_value_conforms((schema, _) in schema_with_value()) {
        prop_assert!(schema.validate(&schema.empty_value()).is_valid());
    }

    #[test]
    fn prop_validator_agrees_with_json_schema(value in answer_like()) {
        let schema = suggest_output_schema();
        let compiled = compile(&schema);
        prop_assert_eq!(schema.validate(&value).is_valid(), compiled.is_valid(&value));
    }

    #[test]
    fn prop_every_violation_path_is_rooted(value in answer_like()) {
        let schema = suggest_output_schema();
        for violation in schema.validate(&value).violations() {
            prop_assert!(
                violation.path == "$" || violation.path.starts_with("recipes"),
                "unexpected path {}",
                violation.path
            );
        }
    }
}

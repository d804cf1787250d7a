//! Deterministic tools offered to the model

use crate::error::Result;
use crate::schema::{Field, Schema};
use crate::tool::ToolDefinition;
use serde_json::{json, Value};

pub const CAN_SUBSTITUTE_INGREDIENT: &str = "canSubstituteIngredient";

/// The only ingredient the stub knows a substitute for
pub const SUBSTITUTABLE_INGREDIENT: &str = "some-specific-ingredient";

const NO_ALTERNATIVE: &str = "No suitable alternative found in available ingredients.";

/// Stub substitution check
///
/// There is no substitution knowledge base: only
/// [`SUBSTITUTABLE_INGREDIENT`] is ever substitutable.
pub fn can_substitute_ingredient() -> Result<ToolDefinition> {
    let input = Schema::object(vec![
        Field::required("recipe", Schema::string(), "The recipe to evaluate."),
        Field::required(
            "ingredientToSubstitute",
            Schema::string(),
            "The ingredient in the recipe to consider substituting.",
        ),
        Field::required(
            "availableIngredients",
            Schema::array_of(Schema::string()),
            "A list of ingredients currently available.",
        ),
    ]);
    let output = Schema::object(vec![
        Field::required(
            "canSubstitute",
            Schema::boolean(),
            "Whether the ingredient can be substituted.",
        ),
        Field::required(
            "substitutionSuggestion",
            Schema::string(),
            "What to use instead when substitutable, otherwise empty.",
        ),
        Field::required(
            "reason",
            Schema::string(),
            "Why the substitution is or is not possible.",
        ),
    ]);

    ToolDefinition::new(
        CAN_SUBSTITUTE_INGREDIENT,
        "Determines if an ingredient in a recipe can be substituted based on available ingredients.",
        input,
        output,
        substitution_answer,
    )
    .with_negative_result(not_substitutable())
}

fn substitution_answer(input: &Value) -> Value {
    if input["ingredientToSubstitute"] == SUBSTITUTABLE_INGREDIENT {
        return json!({
            "canSubstitute": true,
            "substitutionSuggestion": "alternative-ingredient",
            "reason": "Because it is similar.",
        });
    }
    not_substitutable()
}

fn not_substitutable() -> Value {
    json!({
        "canSubstitute": false,
        "substitutionSuggestion": "",
        "reason": NO_ALTERNATIVE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChefError;

    fn call(ingredient: &str) -> Value {
        can_substitute_ingredient()
            .unwrap()
            .invoke(&json!({
                "recipe": "Pancakes",
                "ingredientToSubstitute": ingredient,
                "availableIngredients": ["oat flour", "milk"],
            }))
            .unwrap()
    }

    #[test]
    fn test_sentinel_is_substitutable() {
        let out = call(SUBSTITUTABLE_INGREDIENT);
        assert_eq!(out["canSubstitute"], true);
        assert_eq!(out["substitutionSuggestion"], "alternative-ingredient");
    }

    #[test]
    fn test_flour_is_not_substitutable() {
        let out = call("flour");
        assert_eq!(out["canSubstitute"], false);
        assert_eq!(out["substitutionSuggestion"], "");
        assert_eq!(out["reason"], NO_ALTERNATIVE);
    }

    #[test]
    fn test_same_input_same_output() {
        assert_eq!(call("butter"), call("butter"));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let tool = can_substitute_ingredient().unwrap();
        let err = tool.invoke(&json!({"recipe": "Pancakes"})).unwrap_err();
        assert!(matches!(err, ChefError::ToolInputInvalid { ref violations, .. } if violations.len() == 2));
        assert_eq!(tool.negative_result(), &not_substitutable());
    }
}

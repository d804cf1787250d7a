//! Ingredient substitution flow

use super::tools::CAN_SUBSTITUTE_INGREDIENT;
use crate::error::Result;
use crate::flow::{FallbackPolicy, FlowDefinition};
use crate::schema::{Field, Schema};
use serde_json::{json, Value};

pub const HANDLE_INGREDIENT_SUBSTITUTION_FLOW: &str = "handleIngredientSubstitutionFlow";

/// Explanation used when the model gives nothing usable
pub const UNCHANGED_EXPLANATION: &str =
    "No substitutions could be determined, so the original recipe is unchanged.";

const SUBSTITUTION_PROMPT: &str = "\
You are a recipe assistant. Given a recipe and a list of available ingredients, determine if any ingredients in the recipe can be substituted based on the available ingredients. Use the canSubstituteIngredient tool to determine if a substitution can be made.

Recipe: {{{recipe}}}
Available Ingredients: {{#each availableIngredients}}{{{this}}}{{#unless @last}}, {{/unless}}{{/each}}

Output the recipe with substitutions made, and explain why those substitutions were made. If no substitutions were necessary, output the original recipe and explain that no substitutions were needed.";

pub fn handle_ingredient_substitution_flow() -> Result<FlowDefinition> {
    let input = Schema::object(vec![
        Field::required(
            "recipe",
            Schema::string(),
            "The recipe for which to suggest ingredient substitutions.",
        ),
        Field::required(
            "availableIngredients",
            Schema::array_of(Schema::string()),
            "A list of ingredients currently available.",
        ),
    ]);
    let output = Schema::object(vec![
        Field::required(
            "substitutedRecipe",
            Schema::string(),
            "The recipe with suggested ingredient substitutions.",
        ),
        Field::required(
            "explanation",
            Schema::string(),
            "Why the substitutions were made.",
        ),
    ]);

    Ok(FlowDefinition::builder(
        HANDLE_INGREDIENT_SUBSTITUTION_FLOW,
        input,
        output,
        SUBSTITUTION_PROMPT,
    )?
    .description("Rewrites a recipe using the ingredients on hand")
    .tool(CAN_SUBSTITUTE_INGREDIENT)
    .fallback(FallbackPolicy::derived(unchanged_recipe))
    .build())
}

/// The recipe as given, with an explanation
fn unchanged_recipe(input: &Value) -> Value {
    json!({
        "substitutedRecipe": input["recipe"].as_str().unwrap_or_default(),
        "explanation": UNCHANGED_EXPLANATION,
    })
}

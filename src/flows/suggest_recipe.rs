//! Recipe suggestion flows
//!
//! `suggestRecipeFlow` returns structured recipes and is the one callers
//! should use. `suggestRecipeTextFlow` is the older variant where each recipe
//! is a single free-form string.

use super::tools::CAN_SUBSTITUTE_INGREDIENT;
use crate::error::Result;
use crate::flow::FlowDefinition;
use crate::schema::{Field, Schema};

pub const SUGGEST_RECIPE_FLOW: &str = "suggestRecipeFlow";
pub const SUGGEST_RECIPE_TEXT_FLOW: &str = "suggestRecipeTextFlow";

const SUGGEST_RECIPE_PROMPT: &str = "\
You are a helpful chef that suggests recipes based on the ingredients a user has on hand.
Your goal is to provide clear, structured recipe information.

For each recipe suggestion, you MUST provide:
1. `title`: A concise and appealing name for the recipe.
2. `ingredients`: A list of all necessary ingredients. Include quantities if natural (e.g., \"1 cup of flour\", \"2 chicken breasts\"). Each ingredient should be a separate string in the array.
3. `instructions`: A list of step-by-step cooking instructions. Each step should be a separate string in the array, detailing a clear and actionable part of the cooking process.

The user has the following ingredients:
{{#each ingredients}}- {{{this}}}
{{/each}}
Please suggest one or more recipes using these ingredients. Answer with a JSON object holding a `recipes` array whose entries each have `title`, `ingredients` and `instructions`.

If relevant, you can use the `canSubstituteIngredient` tool to check for ingredient substitutions, but prioritize providing complete recipes as described.";

const SUGGEST_RECIPE_TEXT_PROMPT: &str = "\
You are a helpful chef that suggests recipes based on the ingredients a user has on hand.

Ingredients: {{#each ingredients}}{{{this}}}{{#unless @last}}, {{/unless}}{{/each}}

Suggest one or more recipes using these ingredients. Answer with a JSON object holding a `recipes` array; each entry is one recipe written as a single string with its name, ingredients and steps.";

fn ingredients_input() -> Schema {
    Schema::object(vec![Field::required(
        "ingredients",
        Schema::array_of(Schema::string()),
        "A list of ingredients the user has on hand.",
    )])
}

/// Shape of one structured recipe
pub fn recipe_schema() -> Schema {
    Schema::object(vec![
        Field::required(
            "title",
            Schema::string(),
            "The name or title of the suggested recipe.",
        ),
        Field::required(
            "ingredients",
            Schema::array_of(Schema::string()),
            "Every ingredient needed, with quantities where appropriate (e.g. \"1 cup of flour\").",
        ),
        Field::required(
            "instructions",
            Schema::array_of(Schema::string()),
            "Step-by-step cooking instructions, one step per entry.",
        ),
    ])
}

pub fn suggest_recipe_flow() -> Result<FlowDefinition> {
    let output = Schema::object(vec![Field::required(
        "recipes",
        Schema::array_of(recipe_schema()),
        "Suggested recipes, each with a title, ingredients and instructions.",
    )]);

    Ok(
        FlowDefinition::builder(SUGGEST_RECIPE_FLOW, ingredients_input(), output, SUGGEST_RECIPE_PROMPT)?
            .description("Suggests structured recipes from the ingredients on hand")
            .tool(CAN_SUBSTITUTE_INGREDIENT)
            .build(),
    )
}

pub fn suggest_recipe_text_flow() -> Result<FlowDefinition> {
    let output = Schema::object(vec![Field::required(
        "recipes",
        Schema::array_of(Schema::string()),
        "Suggested recipes, one free-form string each.",
    )]);

    Ok(FlowDefinition::builder(
        SUGGEST_RECIPE_TEXT_FLOW,
        ingredients_input(),
        output,
        SUGGEST_RECIPE_TEXT_PROMPT,
    )?
    .description("Suggests recipes as plain text (legacy)")
    .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FallbackPolicy;
    use serde_json::json;

    #[test]
    fn test_prompt_lists_each_ingredient() {
        let flow = suggest_recipe_flow().unwrap();
        let prompt = flow
            .template()
            .render(&json!({"ingredients": ["chicken", "rice"]}))
            .unwrap();
        assert!(prompt.contains("ingredients:\n- chicken\n- rice\n\nPlease suggest"));
    }

    #[test]
    fn test_prompt_with_no_ingredients() {
        let flow = suggest_recipe_flow().unwrap();
        let prompt = flow.template().render(&json!({"ingredients": []})).unwrap();
        assert!(prompt.contains("ingredients:\n\nPlease suggest"));
    }

    #[test]
    fn test_text_prompt_joins_with_commas() {
        let flow = suggest_recipe_text_flow().unwrap();
        let prompt = flow
            .template()
            .render(&json!({"ingredients": ["eggs", "milk", "flour"]}))
            .unwrap();
        assert!(prompt.contains("Ingredients: eggs, milk, flour\n"));
    }

    #[test]
    fn test_fallback_is_empty_recipes() {
        for flow in [suggest_recipe_flow().unwrap(), suggest_recipe_text_flow().unwrap()] {
            assert!(matches!(
                flow.fallback_policy(),
                FallbackPolicy::EmptyCollection { field } if field == "recipes"
            ));
            assert_eq!(flow.fallback_value(&json!({})), json!({"recipes": []}));
        }
    }
}

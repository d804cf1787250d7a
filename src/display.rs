//! Terminal rendering of flow results

use crate::flows::{HandleIngredientSubstitutionOutput, SuggestRecipeOutput, SuggestRecipeTextOutput};
use colored::Colorize;

pub const NO_INGREDIENTS: &str = "Please add some ingredients first.";
pub const NO_RECIPES: &str = "No recipes found for the given ingredients.";
pub const NO_RECIPES_HINT: &str = "Try adding more or different ingredients!";

/// Recipe cards, or the empty state
pub fn recipe_cards(output: &SuggestRecipeOutput) -> String {
    if output.recipes.is_empty() {
        return empty_state();
    }

    let mut lines = vec!["Recipe Suggestions".green().bold().to_string()];
    for (index, recipe) in output.recipes.iter().enumerate() {
        let title = if recipe.title.trim().is_empty() {
            format!("Recipe Idea {}", index + 1)
        } else {
            recipe.title.clone()
        };
        lines.push(String::new());
        lines.push(title.cyan().bold().to_string());

        lines.push("Ingredients:".bold().to_string());
        if recipe.ingredients.is_empty() {
            lines.push(format!("  {}", "No ingredients listed.".dimmed()));
        }
        lines.extend(recipe.ingredients.iter().map(|i| format!("  • {}", i)));

        lines.push("Instructions:".bold().to_string());
        if recipe.instructions.is_empty() {
            lines.push(format!("  {}", "No instructions provided.".dimmed()));
        }
        lines.extend(
            recipe
                .instructions
                .iter()
                .enumerate()
                .map(|(step, instruction)| format!("  {}. {}", step + 1, instruction)),
        );
    }
    lines.join("\n") + "\n"
}

/// Legacy plain-text recipes
pub fn recipe_texts(output: &SuggestRecipeTextOutput) -> String {
    if output.recipes.is_empty() {
        return empty_state();
    }

    let mut out = format!("{}\n", "Recipe Suggestions".green().bold());
    for (index, recipe) in output.recipes.iter().enumerate() {
        out.push_str(&format!(
            "\n{} {}\n",
            format!("{}.", index + 1).cyan().bold(),
            recipe.trim()
        ));
    }
    out
}

pub fn substitution_report(output: &HandleIngredientSubstitutionOutput) -> String {
    format!(
        "{}\n{}\n\n{}\n{}\n",
        "Recipe:".bold(),
        output.substituted_recipe,
        "Explanation:".bold(),
        output.explanation
    )
}

fn empty_state() -> String {
    format!("{}\n{}\n", NO_RECIPES, NO_RECIPES_HINT.dimmed())
}

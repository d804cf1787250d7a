//! Fridge Chef flows and the typed caller API
//!
//! [`standard_registry`] registers every flow and tool the application
//! ships. [`FridgeChef`] wraps a [`FlowExecutor`] over that registry and
//! exchanges typed values instead of raw JSON.

mod substitution;
mod suggest_recipe;
mod tools;

pub use substitution::{
    handle_ingredient_substitution_flow, HANDLE_INGREDIENT_SUBSTITUTION_FLOW,
    UNCHANGED_EXPLANATION,
};
pub use suggest_recipe::{
    recipe_schema, suggest_recipe_flow, suggest_recipe_text_flow, SUGGEST_RECIPE_FLOW,
    SUGGEST_RECIPE_TEXT_FLOW,
};
pub use tools::{can_substitute_ingredient, CAN_SUBSTITUTE_INGREDIENT, SUBSTITUTABLE_INGREDIENT};

use crate::error::Result;
use crate::executor::{ExecutionResult, FlowExecutor};
use crate::provider::Provider;
use crate::registry::FlowRegistry;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Registry with every shipped flow and tool
pub fn standard_registry() -> Result<FlowRegistry> {
    FlowRegistry::builder()
        .tool(can_substitute_ingredient()?)
        .flow(suggest_recipe_flow()?)
        .flow(suggest_recipe_text_flow()?)
        .flow(handle_ingredient_substitution_flow()?)
        .build()
}

/// Clean up user-typed ingredients
///
/// Trims and lower-cases each entry, drops blanks and repeats, keeps order.
pub fn normalize_ingredients<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    IngredientList::parse(raw).items
}

/// Normalized ingredients plus the entries dropped as repeats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientList {
    pub items: Vec<String>,
    /// Entries already in the list, in the order they were typed
    pub repeated: Vec<String>,
}

impl IngredientList {
    pub fn parse<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut list = Self::default();
        for item in raw {
            let item = item.as_ref().trim().to_lowercase();
            if item.is_empty() {
                continue;
            }
            if seen.insert(item.clone()) {
                list.items.push(item);
            } else {
                list.repeated.push(item);
            }
        }
        list
    }
}

// ============================================================================
// TYPED VALUES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestRecipeInput {
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestRecipeOutput {
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestRecipeTextOutput {
    pub recipes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleIngredientSubstitutionInput {
    pub recipe: String,
    pub available_ingredients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleIngredientSubstitutionOutput {
    pub substituted_recipe: String,
    pub explanation: String,
}

// ============================================================================
// CALLER API
// ============================================================================

/// Typed entry point for the presentation layer
#[derive(Debug, Clone)]
pub struct FridgeChef {
    executor: FlowExecutor,
}

impl FridgeChef {
    /// Build over the standard registry
    pub fn new(provider: Arc<dyn Provider>) -> Result<Self> {
        let registry = Arc::new(standard_registry()?);
        Ok(Self::with_executor(FlowExecutor::new(registry, provider)))
    }

    pub fn with_executor(executor: FlowExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &FlowExecutor {
        &self.executor
    }

    /// Structured recipes for the given ingredients
    ///
    /// An empty `recipes` list means the model found nothing (or failed);
    /// it is not an error.
    pub async fn suggest_recipe(&self, ingredients: &[String]) -> Result<SuggestRecipeOutput> {
        let input = SuggestRecipeInput {
            ingredients: ingredients.to_vec(),
        };
        self.run(SUGGEST_RECIPE_FLOW, &input).await
    }

    /// Legacy variant returning one string per recipe
    pub async fn suggest_recipe_text(
        &self,
        ingredients: &[String],
    ) -> Result<SuggestRecipeTextOutput> {
        let input = SuggestRecipeInput {
            ingredients: ingredients.to_vec(),
        };
        self.run(SUGGEST_RECIPE_TEXT_FLOW, &input).await
    }

    pub async fn handle_ingredient_substitution(
        &self,
        recipe: &str,
        available_ingredients: &[String],
    ) -> Result<HandleIngredientSubstitutionOutput> {
        let input = HandleIngredientSubstitutionInput {
            recipe: recipe.to_string(),
            available_ingredients: available_ingredients.to_vec(),
        };
        self.run(HANDLE_INGREDIENT_SUBSTITUTION_FLOW, &input).await
    }

    async fn run<I, O>(&self, flow: &str, input: &I) -> Result<O>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let input = serde_json::to_value(input)?;
        let result: ExecutionResult = self.executor.execute(flow, &input).await?;
        Ok(serde_json::from_value(result.into_value())?)
    }
}

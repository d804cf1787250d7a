//! Quick benchmark for prompt template parsing, rendering and validation

use fridge_chef::flows::{standard_registry, SUGGEST_RECIPE_FLOW, SUGGEST_RECIPE_TEXT_FLOW};
use fridge_chef::Template;
use serde_json::json;
use std::time::Instant;

fn main() {
    let registry = standard_registry().expect("standard registry");

    let small = json!({"ingredients": ["eggs", "milk", "flour"]});
    let large = json!({
        "ingredients": (0..200).map(|i| format!("ingredient {}", i)).collect::<Vec<_>>()
    });

    println!("Template Rendering Performance Test");
    println!("==================================\n");

    for flow_name in [SUGGEST_RECIPE_FLOW, SUGGEST_RECIPE_TEXT_FLOW] {
        let flow = registry.flow(flow_name).expect("flow");
        for (label, input) in [("3 ingredients", &small), ("200 ingredients", &large)] {
            let iterations = 50_000;

            // Warm up
            let _ = flow.template().render(input);

            let start = Instant::now();
            for _ in 0..iterations {
                let _ = flow.template().render(input);
            }
            let elapsed = start.elapsed();

            println!("Flow: {} ({})", flow_name, label);
            println!("  Time for {} iterations: {:?}", iterations, elapsed);
            println!("  Per operation: {:?}\n", elapsed / iterations);
        }
    }

    println!("Parse vs Render");
    println!("===============\n");

    let source = "{{#each ingredients}}- {{{this}}}\n{{/each}}";
    let iterations = 100_000;

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = Template::parse(source);
    }
    let parse_elapsed = start.elapsed();

    let template = Template::parse(source).expect("template");
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = template.render(&small);
    }
    let render_elapsed = start.elapsed();

    println!("  Parse:  {:?} per op", parse_elapsed / iterations);
    println!("  Render: {:?} per op\n", render_elapsed / iterations);

    println!("Output Validation");
    println!("=================\n");

    let flow = registry.flow(SUGGEST_RECIPE_FLOW).expect("flow");
    let answer = json!({
        "recipes": (0..10).map(|i| json!({
            "title": format!("Recipe {}", i),
            "ingredients": ["1 cup rice", "2 eggs", "1 tbsp soy sauce"],
            "instructions": ["Cook the rice.", "Scramble the eggs.", "Combine."]
        })).collect::<Vec<_>>()
    });

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = flow.output_schema().validate(&answer);
    }
    let elapsed = start.elapsed();
    println!("  10 recipes: {:?} per op", elapsed / iterations);
}

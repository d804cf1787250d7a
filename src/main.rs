//! Fridge Chef CLI - recipe ideas from what's in the fridge

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use fridge_chef::config::{mask_api_key, ChefConfig};
use fridge_chef::display;
use fridge_chef::error::{ChefError, FixSuggestion};
use fridge_chef::flows::{normalize_ingredients, standard_registry, FridgeChef, IngredientList};
use fridge_chef::provider::create_provider;

#[derive(Parser)]
#[command(name = "fridge-chef")]
#[command(about = "Fridge Chef - recipe suggestions from the ingredients on hand")]
#[command(version)]
struct Cli {
    /// Config file (default: ./fridge-chef.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override provider (openai, ollama, mock)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Override model
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Suggest recipes for a list of ingredients
    Suggest {
        /// Ingredients on hand
        ingredients: Vec<String>,

        /// Use the plain-text recipe flow
        #[arg(long)]
        text: bool,

        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Adapt a recipe to the ingredients available
    Substitute {
        /// Recipe text
        #[arg(long)]
        recipe: String,

        /// Ingredients available
        #[arg(long, num_args = 1..)]
        available: Vec<String>,

        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered flows with their schemas (JSON)
    Flows,

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Flows => show_flows(),
        Commands::Config => load_config(cli.config, cli.provider, cli.model).map(|c| show_config(&c)),
        Commands::Suggest {
            ingredients,
            text,
            json,
        } => suggest(cli.config, cli.provider, cli.model, ingredients, text, json).await,
        Commands::Substitute {
            recipe,
            available,
            json,
        } => substitute(cli.config, cli.provider, cli.model, &recipe, available, json).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn load_config(
    path: Option<PathBuf>,
    provider: Option<String>,
    model: Option<String>,
) -> Result<ChefConfig, ChefError> {
    let config = ChefConfig::load(path.as_deref())?.with_overrides(provider, model);
    config.validate()?;
    Ok(config)
}

fn chef(config: &ChefConfig) -> Result<FridgeChef, ChefError> {
    let provider = create_provider(config)?;
    if !provider.is_available() {
        eprintln!(
            "{} provider '{}' is not available",
            "Warning:".yellow().bold(),
            provider.name()
        );
    }
    FridgeChef::new(provider)
}

async fn suggest(
    config_path: Option<PathBuf>,
    provider: Option<String>,
    model: Option<String>,
    raw: Vec<String>,
    text: bool,
    json: bool,
) -> Result<(), ChefError> {
    let IngredientList { items: ingredients, repeated } = IngredientList::parse(&raw);
    for item in &repeated {
        eprintln!("{} {} is already in your list.", "Warning:".yellow().bold(), item);
    }
    if ingredients.is_empty() {
        eprintln!("{} {}", "No Ingredients:".yellow().bold(), display::NO_INGREDIENTS);
        std::process::exit(2);
    }

    let config = load_config(config_path, provider, model)?;
    let chef = chef(&config)?;

    eprintln!(
        "{} Finding recipes for: {}",
        "→".cyan(),
        ingredients.join(", ").cyan()
    );

    if text {
        let output = chef.suggest_recipe_text(&ingredients).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print!("{}", display::recipe_texts(&output));
        }
    } else {
        let output = chef.suggest_recipe(&ingredients).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print!("{}", display::recipe_cards(&output));
        }
    }

    Ok(())
}

async fn substitute(
    config_path: Option<PathBuf>,
    provider: Option<String>,
    model: Option<String>,
    recipe: &str,
    available: Vec<String>,
    json: bool,
) -> Result<(), ChefError> {
    let config = load_config(config_path, provider, model)?;
    let chef = chef(&config)?;

    let available = normalize_ingredients(&available);
    let output = chef.handle_ingredient_substitution(recipe, &available).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", display::substitution_report(&output));
    }
    Ok(())
}

fn show_flows() -> Result<(), ChefError> {
    let registry = standard_registry()?;
    println!("{}", serde_json::to_string_pretty(&registry.describe_all())?);
    Ok(())
}

fn show_config(config: &ChefConfig) {
    println!("{}", "Fridge Chef configuration".cyan().bold());
    println!("  Provider:        {}", config.provider);
    println!("  Model:           {}", config.model.as_deref().unwrap_or("(default)"));
    println!("  Base URL:        {}", config.base_url.as_deref().unwrap_or("(default)"));
    println!(
        "  API key:         {}",
        config
            .api_key
            .as_deref()
            .map(|k| mask_api_key(k, 8))
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!("  Timeout:         {}s", config.timeout_secs);
    println!("  Max tool rounds: {}", config.max_tool_rounds);
}

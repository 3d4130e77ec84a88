use std::io;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pantry_app::terminal::{self, CalorieChoice, Terminal};
use pantry_app::wizard::Wizard;
use pantry_core::settings;
use pantry_core::share::format_recipe_for_share;
use pantry_core::store::Store;
use pantry_core::{DietType, ServingSize};
use pantry_generate::{prompt, RecipeGenerator};

#[derive(Parser)]
#[command(name = "pantry-chef", version, about = "Turn what's in your kitchen into a recipe")]
struct Cli {
    /// Log debug output from pantry crates to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Keep favorites and the last recipe in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Step through ingredients, diet, calories and servings interactively (default)
    Wizard,
    /// Generate a recipe in one shot
    Generate {
        /// Ingredients, comma separated or repeated
        #[arg(short, long, required = true, value_delimiter = ',')]
        ingredients: Vec<String>,
        /// veg, non-veg, vegan or eggetarian
        #[arg(short, long, default_value = "veg")]
        diet: DietType,
        /// low, medium, high, or a per-serving number
        #[arg(short, long, default_value = "medium")]
        calories: CalorieChoice,
        /// 1, 2, 4 or 6
        #[arg(short, long, default_value = "2")]
        servings: ServingSize,
        /// Print the recipe as JSON
        #[arg(long)]
        json: bool,
        /// Print the prompt instead of calling the API
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the last generated recipe
    Last {
        #[arg(long)]
        json: bool,
    },
    /// Manage saved recipes
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Print the last recipe as shareable text
    Share,
    /// Show or change API settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Check that the API key and endpoint work
    Ping,
    /// Delete favorites and the last recipe
    Clear,
}

#[derive(Subcommand)]
enum FavoritesAction {
    List,
    Show { id: String },
    Remove { id: String },
    /// Save the last generated recipe
    Add,
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set {
        /// Empty keeps the existing key
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        structured_output: Option<bool>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "warn,pantry_core=debug,pantry_generate=debug,pantry_app=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Commands::Wizard) {
        Commands::Wizard => run_wizard(cli.ephemeral).await,
        Commands::Generate {
            ingredients,
            diet,
            calories,
            servings,
            json,
            dry_run,
        } => {
            let mut store = pantry_app::open_store(cli.ephemeral);
            store.set_ingredients(ingredients);
            store.set_diet_type(diet);
            calories.apply(&mut store);
            store.set_serving_size(servings);

            if dry_run {
                let input = store.state().recipe_input();
                println!("--- system ---\n{}\n", prompt::system_prompt());
                println!("--- user ---\n{}", prompt::user_message(&input));
                return Ok(());
            }
            generate_once(&mut store, json).await
        }
        Commands::Last { json } => {
            let store = pantry_app::open_store(cli.ephemeral);
            let Some(recipe) = &store.state().current_recipe else {
                bail!("no recipe generated yet");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(recipe)?);
            } else {
                let favorite = store.state().is_favorite(&recipe.id);
                print!("{}", terminal::render_recipe(recipe, favorite));
            }
            Ok(())
        }
        Commands::Favorites { action } => favorites(cli.ephemeral, action),
        Commands::Share => {
            let store = pantry_app::open_store(cli.ephemeral);
            let recipe = store
                .state()
                .current_recipe
                .as_ref()
                .context("no recipe generated yet")?;
            println!("{}", format_recipe_for_share(recipe));
            Ok(())
        }
        Commands::Config { action } => config(action),
        Commands::Ping => {
            let generator = RecipeGenerator::from_config();
            generator.ping().await?;
            println!("API connection OK ({})", generator.settings().model);
            Ok(())
        }
        Commands::Clear => {
            let mut store = pantry_app::open_store(cli.ephemeral);
            let freed = store.persistence().storage_size();
            store.persistence().clear_all();
            store.clear_current_recipe();
            println!("Cleared saved recipes ({freed} bytes).");
            Ok(())
        }
    }
}

async fn run_wizard(ephemeral: bool) -> Result<()> {
    let mut store = pantry_app::open_store(ephemeral);
    terminal::attach_status_view(&mut store);
    let generator = RecipeGenerator::from_config();
    if !settings::ai_configured(&generator.settings()) {
        eprintln!(
            "Note: no API key configured; set OPENROUTER_API_KEY \
             or run `pantry-chef config set --api-key ...`"
        );
    }

    let stdin = io::stdin();
    let mut term = Terminal::new(stdin.lock(), io::stdout());
    let mut wizard = Wizard::new();
    term.run_wizard(&mut store, &generator, &mut wizard).await
}

async fn generate_once(store: &mut Store, json: bool) -> Result<()> {
    let generator = RecipeGenerator::from_config();
    let mut wizard = Wizard::new();
    wizard.advance_to_generate(store.state())?;
    let recipe = wizard.generate(store, &generator).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        print!("{}", terminal::render_recipe(&recipe, false));
    }
    Ok(())
}

fn favorites(ephemeral: bool, action: FavoritesAction) -> Result<()> {
    let mut store = pantry_app::open_store(ephemeral);
    match action {
        FavoritesAction::List => {
            print!("{}", terminal::render_favorites(&store.state().favorites))
        }
        FavoritesAction::Show { id } => {
            let recipe = store
                .state()
                .favorites
                .iter()
                .find(|f| f.id() == id)
                .map(|f| f.recipe.clone())
                .with_context(|| format!("no favorite with id {id}"))?;
            print!("{}", terminal::render_recipe(&recipe, true));
            // An opened favorite becomes the recipe `last` and `share` work on.
            store.persistence().save_last_recipe(&recipe);
            store.set_current_recipe(recipe);
        }
        FavoritesAction::Remove { id } => {
            store.remove_favorite(&id);
            println!("Removed {id} (if it was saved).");
        }
        FavoritesAction::Add => {
            let recipe = store
                .state()
                .current_recipe
                .clone()
                .context("no recipe generated yet")?;
            println!("Saved {} to favorites.", recipe.name);
            store.add_favorite(recipe);
        }
    }
    Ok(())
}

fn config(action: ConfigAction) -> Result<()> {
    let mut current = settings::read_settings();
    match action {
        ConfigAction::Show => {
            let effective = current.with_env_overrides();
            println!("model:             {}", effective.model);
            println!("endpoint:          {}", effective.endpoint);
            println!("api key:           {}", effective.masked_key());
            println!("structured output: {}", effective.structured_output);
            println!("configured:        {}", settings::ai_configured(&effective));
        }
        ConfigAction::Set {
            api_key,
            model,
            endpoint,
            structured_output,
        } => {
            if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
                current.api_key = key;
            }
            if let Some(model) = model {
                current.model = model;
            }
            if let Some(endpoint) = endpoint {
                current.endpoint = endpoint;
            }
            if let Some(flag) = structured_output {
                current.structured_output = flag;
            }
            settings::write_settings(&current).map_err(anyhow::Error::msg)?;
            println!("Settings saved.");
        }
    }
    Ok(())
}

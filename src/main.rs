//! CLI entry point for the wardrobe index.
//!
//! Drives the library the way a service layer would: ingest items, run
//! recommendations, and maintain the index.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use serde::Serialize;

use stylevec::display::{
    create_compaction_table, create_hits_table, create_outfit_tables, create_stats_table,
};
use stylevec::io::{ExitCode, JsonResponse, OutputFormat};
use stylevec::{AppContext, IndexError, ItemUpload, RecommendRequest, Settings, TextQuery};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Wardrobe similarity search and outfit recommendations
#[derive(Parser)]
#[command(
    name = "stylevec",
    version = env!("CARGO_PKG_VERSION"),
    about = "Similarity search and outfit recommendations for clothing items",
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .stylevec directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Embed an image and add the item to the index
    Add {
        item_id: String,

        /// Path to the item image
        image: String,

        #[arg(long)]
        owner: String,

        #[arg(long)]
        category: String,

        /// Display name (defaults to "<category> item")
        #[arg(long)]
        name: Option<String>,

        /// Extra attribute as key=value; values are parsed as JSON when possible
        #[arg(long = "attr", value_name = "KEY=VALUE")]
        attributes: Vec<String>,
    },

    /// Find items matching a text description
    Search {
        text: String,

        #[arg(long)]
        owner: Option<String>,

        #[arg(short, long)]
        k: Option<usize>,

        /// Restrict to these categories (repeatable or comma separated)
        #[arg(long = "category", value_delimiter = ',')]
        categories: Vec<String>,

        #[arg(long)]
        min_similarity: Option<f32>,
    },

    /// Items from the owner's wardrobe similar to an item
    Recommend {
        item_id: String,

        #[arg(long)]
        owner: String,

        #[arg(short, long)]
        k: Option<usize>,

        /// Restrict to these categories (repeatable or comma separated)
        #[arg(long = "category", value_delimiter = ',')]
        categories: Vec<String>,

        #[arg(long)]
        min_similarity: Option<f32>,

        /// Image to embed when the catalog has none for the item
        #[arg(long)]
        image_ref: Option<String>,
    },

    /// Complete an outfit around one or more base items
    Outfit {
        #[arg(required = true)]
        item_ids: Vec<String>,

        #[arg(long)]
        owner: String,

        #[arg(short, long)]
        k_per_category: Option<usize>,
    },

    /// Remove an item from the index
    Remove { item_id: String },

    /// Show index statistics
    Stats,

    /// Rebuild the index without orphaned slots
    Compact,

    /// Rebuild the index from the item catalog
    Reindex,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let format = OutputFormat::from_json_flag(cli.json);

    if let Commands::Init { force } = &cli.command {
        return run_init(*force, format).into();
    }

    let settings = match load_settings(cli.config.as_ref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return ExitCode::ConfigError.into();
        }
    };
    stylevec::logging::init(&settings.logging, cli.verbose);

    match run(cli.command, &settings, format) {
        Ok(()) => ExitCode::Success.into(),
        Err(e) => report_error(&e, format).into(),
    }
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    let settings = match path {
        Some(path) => {
            let mut settings =
                Settings::load_from(path).map_err(|e| anyhow::anyhow!(e.to_string()))?;
            if settings.workspace_root.is_none() {
                settings.workspace_root = path
                    .parent()
                    .and_then(|dir| dir.parent())
                    .map(PathBuf::from);
            }
            settings
        }
        None => Settings::load().map_err(|e| anyhow::anyhow!(e.to_string()))?,
    };
    Ok(settings)
}

fn run_init(force: bool, format: OutputFormat) -> ExitCode {
    match Settings::init_config_file(force) {
        Ok(path) => {
            if format.is_json() {
                print_json(&JsonResponse::success(path.display().to_string()));
            } else if force {
                println!("Overwrote configuration at: {}", path.display());
            } else {
                println!("Created default configuration at: {}", path.display());
            }
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::ConfigError
        }
    }
}

fn run(command: Commands, settings: &Settings, format: OutputFormat) -> Result<(), IndexError> {
    let context = AppContext::from_settings(settings)?;

    match command {
        Commands::Init { .. } => {}
        Commands::Add {
            item_id,
            image,
            owner,
            category,
            name,
            attributes,
        } => {
            let mut upload = ItemUpload::new(item_id, owner, category, image);
            upload.name = name;
            upload.attributes = parse_attributes(&attributes)?;
            let outcome = context.ingest(upload)?;
            if format.is_json() {
                print_json(&JsonResponse::success(&outcome));
            } else {
                println!(
                    "Added {} ({}) at slot {}",
                    outcome.item_id, outcome.metadata.name, outcome.slot
                );
            }
        }
        Commands::Search {
            text,
            owner,
            k,
            categories,
            min_similarity,
        } => {
            let query = TextQuery {
                text,
                owner,
                k,
                categories: non_empty(categories),
                min_similarity,
            };
            let hits = context.search_by_text(&query)?;
            emit_hits(&hits, format);
        }
        Commands::Recommend {
            item_id,
            owner,
            k,
            categories,
            min_similarity,
            image_ref,
        } => {
            let request = RecommendRequest {
                item_id,
                owner,
                k,
                target_categories: non_empty(categories),
                min_similarity,
                image_ref,
            };
            let hits = context.recommend(&request)?;
            emit_hits(&hits, format);
        }
        Commands::Outfit {
            item_ids,
            owner,
            k_per_category,
        } => {
            let k = k_per_category.unwrap_or(settings.outfit.k_per_category);
            let outfit = context.recommend_outfit(&item_ids, &owner, k)?;
            if format.is_json() {
                print_json(&JsonResponse::success(&outfit));
            } else {
                print!("{}", create_outfit_tables(&outfit));
            }
        }
        Commands::Remove { item_id } => {
            let removed = context.remove(&item_id)?;
            if format.is_json() {
                print_json(&JsonResponse::success(serde_json::json!({
                    "item_id": item_id,
                    "removed": removed,
                })));
            } else if removed {
                println!("Removed {item_id}");
            } else {
                println!("{item_id} is not in the index");
            }
        }
        Commands::Stats => {
            let stats = context.stats();
            if format.is_json() {
                print_json(&JsonResponse::success(&stats));
            } else {
                println!("{}", create_stats_table(&stats));
            }
        }
        Commands::Compact => {
            let report = context.compact()?;
            if format.is_json() {
                print_json(&JsonResponse::success(&report));
            } else {
                println!("{}", create_compaction_table(&report));
            }
        }
        Commands::Reindex => {
            let report = context.reindex_from_records()?;
            if format.is_json() {
                print_json(&JsonResponse::success(&report));
            } else {
                println!(
                    "Reindexed {} of {} records ({} skipped, {} failed)",
                    report.processed, report.total, report.skipped, report.failed
                );
            }
        }
    }

    Ok(())
}

fn parse_attributes(pairs: &[String]) -> Result<BTreeMap<String, serde_json::Value>, IndexError> {
    let mut attributes = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            IndexError::invalid_input(format!("attribute '{pair}' must look like key=value"))
        })?;
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        attributes.insert(key.trim().to_string(), value);
    }
    Ok(attributes)
}

fn non_empty(categories: Vec<String>) -> Option<Vec<String>> {
    if categories.is_empty() {
        None
    } else {
        Some(categories)
    }
}

fn emit_hits(hits: &[stylevec::SearchHit], format: OutputFormat) {
    if format.is_json() {
        print_json(&JsonResponse::success(hits));
    } else if hits.is_empty() {
        println!("No matching items");
    } else {
        println!("{}", create_hits_table(hits));
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}

fn report_error(error: &IndexError, format: OutputFormat) -> ExitCode {
    if format.is_json() {
        print_json(&JsonResponse::from_error(error));
    } else {
        eprintln!("Error: {error}");
        for suggestion in error.recovery_suggestions() {
            eprintln!("  - {suggestion}");
        }
    }
    ExitCode::from_error(error)
}

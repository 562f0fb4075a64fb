//! Binary entry point for linkwise.
//!
//! This binary provides a JSON-speaking CLI over the suggestion engine.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Args, Parser, Subcommand};
use linkwise::config::LinkwiseConfig;
use linkwise::models::GraphFixture;
use linkwise::observability;
use linkwise::storage::GraphWriter;
use linkwise::storage::graph::SqliteGraphStore;
use linkwise::{
    ConnectionSuggestion, GraphReader, NodeId, SuggestionEngine, SuggestionOptions, SuggestionType,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Linkwise - connection suggestions for personal knowledge graphs.
#[derive(Parser)]
#[command(name = "linkwise")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the graph database (overrides config and `LINKWISE_DB`).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Suggest connections for one node.
    Suggest {
        /// Target node ID.
        node_id: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Include each candidate's display name in the output.
        #[arg(long)]
        with_names: bool,
    },

    /// Suggest connections for several nodes.
    Batch {
        /// Target node IDs.
        #[arg(required = true)]
        node_ids: Vec<String>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Print graph-wide statistics.
    Metrics,

    /// Load nodes and edges from a JSON fixture file.
    Seed {
        /// Fixture path: `{"nodes": [...], "edges": [...]}`.
        file: PathBuf,
    },
}

/// Options shared by `suggest` and `batch`.
#[derive(Args)]
struct FilterArgs {
    /// Maximum suggestions per node.
    #[arg(short, long)]
    limit: Option<usize>,

    /// Minimum confidence (0.0 - 1.0).
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Heuristics to run (comma-separated, e.g. `sharedTags,sameCommunity`).
    #[arg(short, long, value_delimiter = ',')]
    types: Option<Vec<String>>,

    /// Keep candidates the node is already connected to.
    #[arg(long)]
    include_existing: bool,
}

impl FilterArgs {
    fn apply(&self, defaults: &SuggestionOptions) -> linkwise::Result<SuggestionOptions> {
        let mut options = defaults.clone();
        if let Some(limit) = self.limit {
            options.max_suggestions = limit;
        }
        if let Some(min) = self.min_confidence {
            options.min_confidence = min;
        }
        if let Some(types) = &self.types {
            options.include_types = types
                .iter()
                .map(|t| t.parse::<SuggestionType>())
                .collect::<linkwise::Result<_>>()?;
        }
        if self.include_existing {
            options.exclude_existing_connections = false;
        }
        options.validate()?;
        Ok(options)
    }
}

/// A suggestion with the candidate's display name attached.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NamedSuggestion {
    #[serde(flatten)]
    suggestion: ConnectionSuggestion,
    name: Option<String>,
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.db.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_logging(&config.logging.clone().with_verbose(cli.verbose)) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration: explicit file, else default location, then env, then `--db`.
fn load_config(path: Option<&Path>, db: Option<&Path>) -> linkwise::Result<LinkwiseConfig> {
    let config = match path {
        Some(path) => LinkwiseConfig::load_from_file(path)?,
        None => LinkwiseConfig::load_default(),
    };
    let config = match db {
        Some(db) => config.apply_env_overrides().with_database_path(db),
        None => config.apply_env_overrides(),
    };
    config.validate()?;
    Ok(config)
}

/// Runs the selected command.
async fn run_command(
    command: Commands,
    config: LinkwiseConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteGraphStore::new(&config.database_path)?;

    if let Commands::Seed { file } = &command {
        return cmd_seed(&store, file);
    }

    let engine = SuggestionEngine::from_config(store, &config)?;
    match command {
        Commands::Suggest {
            node_id,
            filter,
            with_names,
        } => {
            let options = filter.apply(&config.defaults)?;
            let suggestions = engine.suggest_connections(&NodeId::new(node_id), &options)?;
            if with_names {
                print_json(&attach_names(engine.backend(), suggestions)?)
            } else {
                print_json(&suggestions)
            }
        },
        Commands::Batch { node_ids, filter } => {
            let options = filter.apply(&config.defaults)?;
            let ids: Vec<NodeId> = node_ids.into_iter().map(NodeId::new).collect();
            let results = engine
                .batch_suggest_connections_concurrent(&ids, &options)
                .await?;
            print_json(&sorted(results))
        },
        Commands::Metrics => print_json(&engine.get_suggestion_metrics()?),
        Commands::Seed { .. } => Ok(()),
    }
}

/// Loads a fixture file into the store.
fn cmd_seed(store: &SqliteGraphStore, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(file)?;
    let fixture: GraphFixture = serde_json::from_str(&contents)?;
    store.load_fixture(&fixture)?;
    tracing::info!(
        nodes = fixture.nodes.len(),
        edges = fixture.edges.len(),
        "Fixture loaded"
    );
    print_json(&serde_json::json!({
        "nodes": fixture.nodes.len(),
        "edges": fixture.edges.len(),
    }))
}

fn attach_names(
    reader: &dyn GraphReader,
    suggestions: Vec<ConnectionSuggestion>,
) -> linkwise::Result<Vec<NamedSuggestion>> {
    let ids: Vec<NodeId> = suggestions.iter().map(|s| s.node_id.clone()).collect();
    let names: HashMap<NodeId, String> = reader
        .nodes(&ids)?
        .into_iter()
        .map(|node| (node.id, node.name))
        .collect();

    Ok(suggestions
        .into_iter()
        .map(|suggestion| NamedSuggestion {
            name: names.get(&suggestion.node_id).cloned(),
            suggestion,
        })
        .collect())
}

fn sorted(
    results: HashMap<NodeId, Vec<ConnectionSuggestion>>,
) -> BTreeMap<NodeId, Vec<ConnectionSuggestion>> {
    results.into_iter().collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! Binary entry point for semnote.
//!
//! Every command prints a JSON document on stdout; logs go to stderr.

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

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use semnote::api::{self, ApiError, NoteRequest, RemoveRequest, SearchQuery};
use semnote::embedding::FastEmbedEmbedder;
use semnote::observability::{self, InitOptions};
use semnote::storage::SqliteEmbeddingStore;
use semnote::{NoteIndex, SemnoteConfig};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Semnote - embedding cache and semantic search for notes.
#[derive(Parser)]
#[command(name = "semnote")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Serve the boundary operations over HTTP.
    Serve {
        /// Bind host (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Rank notes by similarity to a query.
    Search {
        /// The search query.
        query: String,

        /// Minimum similarity (overrides config).
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Maximum number of results (overrides config).
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Index a newly created note.
    Add {
        /// Note id.
        id: i64,
        /// Note title.
        title: String,
        /// Note content.
        content: String,
    },

    /// Re-index an edited note.
    Update {
        /// Note id.
        id: i64,
        /// Note title.
        title: String,
        /// Note content.
        content: String,
    },

    /// Remove a note from the index.
    Remove {
        /// Note id.
        id: i64,
    },

    /// Show cache and store statistics.
    Status,

    /// Drop every persisted embedding and recompute all of them.
    Reindex,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "semnote", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let expose_metrics = matches!(cli.command, Commands::Serve { .. });
    let _observability = match observability::init_from_config(
        &config,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: expose_metrics,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(command: Commands, config: SemnoteConfig) -> CliResult {
    let index = open_index(&config)?;

    match command {
        Commands::Serve { host, port } => cmd_serve(index, &config, host, port).await,

        Commands::Search {
            query,
            threshold,
            limit,
        } => respond(api::semantic_search(
            &index,
            &SearchQuery {
                q: Some(query),
                threshold,
                limit,
            },
        )),

        Commands::Add { id, title, content } => respond(api::add_note_embedding(
            &index,
            &note_request(id, title, content),
        )),

        Commands::Update { id, title, content } => respond(api::update_note_embedding(
            &index,
            &note_request(id, title, content),
        )),

        Commands::Remove { id } => respond(api::remove_note_embedding(
            &index,
            &RemoveRequest { note_id: Some(id) },
        )),

        Commands::Status => print_json(&index.status()?),

        Commands::Reindex => print_json(&index.reindex()?),

        Commands::Completions { .. } => Ok(()),
    }
}

/// Opens the note database, builds the encoder and loads the cache.
fn open_index(config: &SemnoteConfig) -> CliResult<Arc<NoteIndex>> {
    let store = Arc::new(SqliteEmbeddingStore::new(&config.db_path)?);
    let embedder = Arc::new(FastEmbedEmbedder::with_dimensions(config.dimensions));
    tracing::debug!(
        db_path = %config.db_path.display(),
        model = embedder.model_name(),
        "Opening index"
    );

    let index =
        NoteIndex::with_dimensions(embedder, store, config.search_options(), config.dimensions)?;
    index.initialize()?;
    Ok(Arc::new(index))
}

#[cfg(feature = "http")]
async fn cmd_serve(
    index: Arc<NoteIndex>,
    config: &SemnoteConfig,
    host: Option<String>,
    port: Option<u16>,
) -> CliResult {
    let mut http = config.http.clone();
    if let Some(host) = host {
        http.host = host;
    }
    if let Some(port) = port {
        http.port = port;
    }
    semnote::http::serve(index, &http.bind_addr()).await?;
    Ok(())
}

#[cfg(not(feature = "http"))]
#[allow(clippy::unused_async)]
async fn cmd_serve(
    _index: Arc<NoteIndex>,
    _config: &SemnoteConfig,
    _host: Option<String>,
    _port: Option<u16>,
) -> CliResult {
    Err(semnote::Error::FeatureNotEnabled("http".to_string()).into())
}

fn note_request(id: i64, title: String, content: String) -> NoteRequest {
    NoteRequest {
        note_id: Some(id),
        title: Some(title),
        content: Some(content),
    }
}

/// Prints the boundary response and maps failures to a non-zero exit.
fn respond<T: Serialize>(result: Result<T, ApiError>) -> CliResult {
    match result {
        Ok(body) => print_json(&body),
        Err(err) => {
            print_json(&err.response())?;
            Err(err.message.into())
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Loads configuration, then applies environment overrides.
fn load_config(path: Option<&str>) -> CliResult<SemnoteConfig> {
    let config = if let Some(config_path) = path {
        SemnoteConfig::load_from_file(Path::new(config_path))?
    } else if let Some(config_path) = std::env::var("SEMNOTE_CONFIG_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
    {
        SemnoteConfig::load_from_file(Path::new(&config_path))?
    } else {
        SemnoteConfig::load_default()
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

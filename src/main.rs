use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use storyshelf::config::{ServerConfig, DEFAULT_DATABASE, DEFAULT_STAGING_DIR};
use storyshelf::database::connection::{establish_connection, get_database_url, setup_database};
use storyshelf::exchange::{serializer, Decision, ExchangeService, FileStagingArea};
use storyshelf::server;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve(ServerConfig),
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    /// Write the whole dataset to a JSON file
    Export {
        #[clap(short, long, default_value = DEFAULT_DATABASE)]
        database: String,
        /// Defaults to a timestamped file in the current directory
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a JSON export without review
    Import {
        #[clap(short, long, default_value = DEFAULT_DATABASE)]
        database: String,
        file: PathBuf,
        /// Replace existing stories that collide with imported ones
        #[clap(long, conflicts_with = "skip_duplicates")]
        overwrite_duplicates: bool,
        /// Leave colliding stories alone (the default)
        #[clap(long)]
        skip_duplicates: bool,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init {
        #[clap(short, long, default_value = DEFAULT_DATABASE)]
        database: String,
    },
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
        #[clap(short, long, default_value = DEFAULT_DATABASE)]
        database: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match args.command {
        Commands::Serve(config) => {
            info!("Starting server on port {}", config.port);
            server::start_server(config).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Init { database } => {
                info!("Initializing database: {}", database);
                server::migrate_database(&database, server::MigrateDirection::Up).await?;
            }
            DbCommands::Migrate {
                direction,
                database,
            } => {
                info!("Running database migration: {:?}", direction);
                server::migrate_database(&database, direction).await?;
            }
        },
        Commands::Export { database, output } => {
            let exchange = open_exchange(&database).await?;
            let document = exchange.export().await?;
            let output =
                output.unwrap_or_else(|| PathBuf::from(serializer::export_filename(Utc::now())));
            tokio::fs::write(&output, serializer::to_json_bytes(&document)?).await?;
            info!(
                "Exported {} stories to {}",
                document.stories.len(),
                output.display()
            );
        }
        Commands::Import {
            database,
            file,
            overwrite_duplicates,
            skip_duplicates: _,
        } => {
            let on_duplicate = if overwrite_duplicates {
                Decision::Overwrite
            } else {
                Decision::Skip
            };

            let exchange = open_exchange(&database).await?;
            let bytes = tokio::fs::read(&file).await?;
            let (outcome, report) = exchange.import_with_policy(&bytes, on_duplicate).await?;

            for duplicate in &report.duplicates {
                warn!(
                    "Duplicate '{}' (incoming {}, existing {}) resolved as {:?}",
                    duplicate.title, duplicate.incoming_id, duplicate.existing_id, on_duplicate
                );
            }
            info!(
                "Import finished: {} imported, {} overwritten, {} skipped",
                outcome.imported, outcome.overwritten, outcome.skipped
            );
        }
    }

    Ok(())
}

async fn open_exchange(database: &str) -> Result<ExchangeService> {
    let db = establish_connection(&get_database_url(Some(database))).await?;
    setup_database(&db).await?;
    Ok(ExchangeService::new(
        db,
        Arc::new(FileStagingArea::new(DEFAULT_STAGING_DIR)),
        Default::default(),
    ))
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}

pub mod app;
pub mod error;
pub mod handlers;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

use crate::config::ServerConfig;
use crate::database::{connection::*, migrations::Migrator};
use crate::exchange::{FileStagingArea, StagingArea};
use anyhow::Result;
use sea_orm_migration::prelude::*;
use tracing::{info, warn};

pub async fn start_server(config: ServerConfig) -> Result<()> {
    let database_url = get_database_url(Some(&config.database));
    let db = establish_connection(&database_url).await?;

    // Run migrations
    setup_database(&db).await?;
    info!("Database migrations completed");

    let pending = FileStagingArea::new(config.staging_dir.clone()).pending().await?;
    if !pending.is_empty() {
        warn!(
            "{} staged imports in {} are still waiting for a decision",
            pending.len(),
            config.staging_dir.display()
        );
    }

    let app = app::create_app(db, &config).await?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server running on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                     - Health check");
    info!("  /api-docs/openapi.json      - OpenAPI document");
    info!("  /api/v1/*                   - Reader API (home, stories, categories, search)");
    info!("  /api/v1/admin/*             - Admin API (editing, export, staged import)");
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}

//! Admin Service Library
//!
//! User approval and unit administration over HTTP. The interesting part is
//! [`assignment`]: at most one approved user may hold any DO unit, across
//! single edits, single approvals and bulk approvals.

pub mod api;
pub mod assignment;
pub mod config;
pub mod infra;
pub mod repository;
pub mod service;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::api::{create_router, AppState};
use crate::config::AdminServiceConfig;
use crate::infra::Database;

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Connect, migrate and serve HTTP until shutdown.
pub async fn run_server(config: AdminServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let database = Arc::new(Database::connect(&config.database).await?);
    let app = create_router(AppState::from_database(database));

    let addr: SocketAddr = config.service.addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("{} listening on {}", config.service.service_name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(
    config: AdminServiceConfig,
    action: MigrateAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

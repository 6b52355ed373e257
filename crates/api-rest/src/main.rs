//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging when you only want the REST server (with OpenAPI/Swagger
//! UI). The workspace's main `medassist-run` binary serves the same router with graceful shutdown.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use medassist_core::config::{busy_timeout_from_env_value, database_path_from_env_value};
use medassist_core::{CoreConfig, SqliteStore};

/// Main entry point for the REST API server
///
/// # Environment Variables
/// - `MEDASSIST_REST_ADDR`: listen address (default: "0.0.0.0:3000")
/// - `MEDASSIST_DATABASE_PATH`: SQLite database file (default: "medassist.db")
/// - `MEDASSIST_BUSY_TIMEOUT_MS`: how long a writer waits for the database lock
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("medassist_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("MEDASSIST_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::new(
        database_path_from_env_value(std::env::var("MEDASSIST_DATABASE_PATH").ok()),
        busy_timeout_from_env_value(std::env::var("MEDASSIST_BUSY_TIMEOUT_MS").ok())?,
    )?);
    let store = Arc::new(SqliteStore::open(&cfg)?);

    tracing::info!(
        "-- Starting MedAssist REST API on {} (database {})",
        addr,
        cfg.database_path().display()
    );

    let app = router(AppState::new(store));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use medassist_core::config::{busy_timeout_from_env_value, database_path_from_env_value};
use medassist_core::{CoreConfig, SqliteStore};

/// Main entry point for the MedAssist application
///
/// Opens (and migrates) the SQLite database, then serves the REST API until Ctrl-C or SIGTERM.
///
/// # Environment Variables
/// - `MEDASSIST_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MEDASSIST_DATABASE_PATH`: SQLite database file (default: "medassist.db")
/// - `MEDASSIST_BUSY_TIMEOUT_MS`: writer lock wait in milliseconds (default: 5000)
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, database startup or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medassist_run=info".parse()?)
                .add_directive("medassist_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("MEDASSIST_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = Arc::new(CoreConfig::new(
        database_path_from_env_value(std::env::var("MEDASSIST_DATABASE_PATH").ok()),
        busy_timeout_from_env_value(std::env::var("MEDASSIST_BUSY_TIMEOUT_MS").ok())?,
    )?);

    tracing::info!("++ Opening database {}", cfg.database_path().display());
    let store = Arc::new(SqliteStore::open(&cfg)?);

    tracing::info!("++ Starting MedAssist REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(AppState::new(store)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("++ MedAssist stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!("failed to listen for SIGTERM: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! Lectern Server — application entry point.

use lectern_db::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("lectern=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Lectern server...");

    let config = DbConfig::from_env();
    let manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(err) => {
            tracing::error!(%err, "failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(err) = lectern_db::run_migrations(manager.client()).await {
        tracing::error!(%err, "failed to run migrations");
        std::process::exit(1);
    }

    // TODO: Start REST API server (request handlers live outside this
    // core; see the access crate for the service entry points).

    tracing::info!("Lectern server stopped.");
}

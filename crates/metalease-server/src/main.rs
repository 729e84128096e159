//! Metalease Server — Application entry point.

use std::env;

use metalease_db::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

fn db_config_from_env() -> DbConfig {
    let defaults = DbConfig::default();
    DbConfig {
        url: env::var("METALEASE_DB_URL").unwrap_or(defaults.url),
        namespace: env::var("METALEASE_DB_NAMESPACE").unwrap_or(defaults.namespace),
        database: env::var("METALEASE_DB_DATABASE").unwrap_or(defaults.database),
        username: env::var("METALEASE_DB_USERNAME").unwrap_or(defaults.username),
        password: env::var("METALEASE_DB_PASSWORD").unwrap_or(defaults.password),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("metalease=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Metalease server...");

    let config = db_config_from_env();
    let manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(e) = metalease_db::run_migrations(manager.client()).await {
        tracing::error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }

    // TODO: Start REST API server

    tracing::info!("Metalease server stopped.");
}

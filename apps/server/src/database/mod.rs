/// Database layer
///
/// This module provides the libsql-backed member store used by the server,
/// together with its versioned schema migrations.

pub mod migrations;
pub mod repository;

pub use repository::LibsqlStore;

use anyhow::Result;

use crate::config;
use crate::pool::{self, LibsqlPool};

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}

/// Open the configured database and bring its schema up to date
pub async fn connect(config: &config::Database) -> Result<LibsqlPool> {
    tracing::info!("Opening database at {}", config.path.display());
    let pool = pool::open(&config.path, config.max_connections).await?;

    let conn = pool.get().await.map_err(|e| anyhow::anyhow!("Failed to get connection: {e}"))?;
    initialize_database(&conn).await?;

    Ok(pool)
}

use anyhow::Result;
use libsql::Connection;

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 2;

/// Run database migrations
pub async fn run_migrations(conn: &Connection) -> Result<()> {
    // Create schema_migrations table first (tracks applied migrations)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL,
            description TEXT
        )",
        (),
    )
    .await?;

    let current_version = get_current_version(conn).await?;

    if current_version >= SCHEMA_VERSION {
        tracing::info!("Database schema is up to date (version {})", current_version);
        return Ok(());
    }

    tracing::info!("Running migrations from version {} to {}", current_version, SCHEMA_VERSION);

    if current_version < 1 {
        run_migration_v1(conn).await?;
        record_migration(conn, 1, "Initial members schema").await?;
    }

    if current_version < 2 {
        run_migration_v2(conn).await?;
        record_migration(conn, 2, "Add ring order index").await?;
    }

    tracing::info!("Database migrations completed successfully (now at version {})", SCHEMA_VERSION);
    Ok(())
}

/// Get current schema version from database
pub async fn get_current_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn.query("SELECT MAX(version) FROM schema_migrations", ()).await?;

    if let Some(row) = rows.next().await? {
        let version: Option<i32> = row.get(0)?;
        Ok(version.unwrap_or(0))
    } else {
        Ok(0)
    }
}

/// Record that a migration was applied
async fn record_migration(conn: &Connection, version: i32, description: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?, ?, ?)",
        libsql::params![version, now, description],
    )
    .await?;

    tracing::info!("Applied migration v{}: {}", version, description);
    Ok(())
}

/// Migration v1: members table
/// Name and domain are unique; created_at is stored in milliseconds
async fn run_migration_v1(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            domain TEXT NOT NULL UNIQUE,
            path TEXT NOT NULL DEFAULT '/',
            https INTEGER NOT NULL DEFAULT 1,
            author TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            disable_checks INTEGER NOT NULL DEFAULT 0,
            dead_end INTEGER NOT NULL DEFAULT 0
        )",
        (),
    )
    .await?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_members_enabled ON members(enabled)", ()).await?;

    Ok(())
}

/// Migration v2: covering index for the eligible-member scan in ring order
async fn run_migration_v2(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_members_ring_order ON members(enabled, dead_end, created_at, id)",
        (),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_migrations_are_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let db = libsql::Builder::new_local(dir.path().join("test.db")).build().await?;
        let conn = db.connect()?;

        run_migrations(&conn).await?;
        assert_eq!(get_current_version(&conn).await?, SCHEMA_VERSION);

        run_migrations(&conn).await?;
        assert_eq!(get_current_version(&conn).await?, SCHEMA_VERSION);

        Ok(())
    }
}

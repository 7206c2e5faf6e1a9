use std::sync::atomic::{AtomicUsize, Ordering};

use deadpool::managed::{self, Pool, RecycleError, RecycleResult};
use libsql::{Connection, Database, Error as LibsqlError, params};

/// deadpool manager handing out connections to one local libsql database
pub struct LibsqlManager {
    database: Database,
    recycle_count: AtomicUsize,
}

impl LibsqlManager {
    pub fn new(database: Database) -> Self {
        Self { database, recycle_count: AtomicUsize::new(0) }
    }
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let conn = self.database.connect()?;
        // Concurrent check-run writes and admin edits share the file
        conn.query("PRAGMA busy_timeout = 5000", ()).await?;
        Ok(conn)
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> RecycleResult<Self::Error> {
        let recycle_count = self.recycle_count.fetch_add(1, Ordering::Relaxed) as u64;
        let row = conn
            .query("SELECT ?1", params![recycle_count])
            .await?
            .next()
            .await?
            .ok_or(LibsqlError::QueryReturnedNoRows)?;
        if row.get::<u64>(0)? != recycle_count {
            return Err(RecycleError::Message("Connection echoed a stale value".into()));
        }
        Ok(())
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;

/// Open (or create) the database file and build a pool over it
pub async fn open(path: &std::path::Path, max_size: usize) -> anyhow::Result<LibsqlPool> {
    let database = libsql::Builder::new_local(path).build().await?;
    let pool = Pool::builder(LibsqlManager::new(database)).max_size(max_size.max(1)).build()?;
    Ok(pool)
}

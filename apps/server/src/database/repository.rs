use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Row, params};
use webring::{Member, MemberId, MemberStore, NewMember, StoreError};

use crate::pool::{LibsqlManager, LibsqlPool};

const MEMBER_COLUMNS: &str =
    "id, name, domain, path, https, author, created_at, enabled, disable_checks, dead_end";

/// libsql-backed member store
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    pub fn new(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to get connection: {e}").into()))
    }

    async fn find_one(&self, filter: &str, value: libsql::Value) -> Result<Option<Member>, StoreError> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE {filter} = ?");
        let mut rows = conn.query(&sql, params![value]).await.map_err(query_error)?;

        match rows.next().await.map_err(query_error)? {
            Some(row) => Ok(Some(member_from_row(&row)?)),
            None => Ok(None),
        }
    }
}

fn flag(value: bool) -> i64 {
    i64::from(value)
}

fn query_error(error: libsql::Error) -> StoreError {
    StoreError::backend(error)
}

/// Map unique-index violations to a conflict on the offending column
fn write_error(error: libsql::Error, member: (&str, &str)) -> StoreError {
    let message = error.to_string();
    let (name, domain) = member;
    if message.contains("UNIQUE constraint failed: members.name") {
        StoreError::Conflict { field: "name", value: name.to_string() }
    } else if message.contains("UNIQUE constraint failed: members.domain") {
        StoreError::Conflict { field: "domain", value: domain.to_string() }
    } else {
        StoreError::backend(error)
    }
}

fn member_from_row(row: &Row) -> Result<Member, StoreError> {
    let id: MemberId = row.get(0).map_err(query_error)?;
    let millis: i64 = row.get(6).map_err(query_error)?;
    // Ring order depends on created_at, so an unreadable value must not default
    let created_at = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        StoreError::Backend(format!("Member {id} has an out-of-range created_at: {millis}").into())
    })?;

    let read = || -> Result<Member, libsql::Error> {
        Ok(Member {
            id,
            name: row.get(1)?,
            domain: row.get(2)?,
            path: row.get(3)?,
            use_https: row.get::<i64>(4)? != 0,
            author: row.get(5)?,
            created_at,
            enabled: row.get::<i64>(7)? != 0,
            checks_disabled: row.get::<i64>(8)? != 0,
            dead_end: row.get::<i64>(9)? != 0,
        })
    };
    read().map_err(query_error)
}

async fn collect_members(mut rows: libsql::Rows) -> Result<Vec<Member>, StoreError> {
    let mut members = Vec::new();
    while let Some(row) = rows.next().await.map_err(query_error)? {
        members.push(member_from_row(&row)?);
    }
    Ok(members)
}

#[async_trait]
impl MemberStore for LibsqlStore {
    async fn create(&self, member: NewMember) -> Result<Member, StoreError> {
        let conn = self.get_conn().await?;
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO members (name, domain, path, https, author, created_at, enabled, disable_checks, dead_end) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)",
            params![
                member.name.clone(),
                member.domain.clone(),
                if member.path.is_empty() { "/".to_string() } else { member.path.clone() },
                flag(member.use_https),
                member.author.clone(),
                created_at.timestamp_millis(),
                flag(member.enabled),
                flag(member.checks_disabled)
            ],
        )
        .await
        .map_err(|e| write_error(e, (&member.name, &member.domain)))?;

        let id = conn.last_insert_rowid();
        // Round-trip through millisecond storage so callers see the persisted value
        let created_at =
            DateTime::<Utc>::from_timestamp_millis(created_at.timestamp_millis()).unwrap_or(created_at);
        Ok(member.into_member(id, created_at))
    }

    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, StoreError> {
        self.find_one("id", id.into()).await
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Member>, StoreError> {
        self.find_one("domain", domain.to_string().into()).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Member>, StoreError> {
        self.find_one("name", name.to_string().into()).await
    }

    async fn update(&self, member: &Member) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;

        // Unchecked members are pinned healthy; otherwise dead_end is left alone
        let affected = conn
            .execute(
                "UPDATE members SET name = ?, domain = ?, path = ?, https = ?, author = ?, enabled = ?, disable_checks = ?, dead_end = CASE WHEN ? = 1 THEN 0 ELSE dead_end END WHERE id = ?",
                params![
                    member.name.clone(),
                    member.domain.clone(),
                    member.path.clone(),
                    flag(member.use_https),
                    member.author.clone(),
                    flag(member.enabled),
                    flag(member.checks_disabled),
                    flag(member.checks_disabled),
                    member.id
                ],
            )
            .await
            .map_err(|e| write_error(e, (&member.name, &member.domain)))?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_dead_end(&self, id: MemberId, dead_end: bool) -> Result<bool, StoreError> {
        let conn = self.get_conn().await?;
        // Judged against the row as it is now, not the snapshot the check started from
        let affected = conn
            .execute(
                "UPDATE members SET dead_end = ?1 WHERE id = ?2 AND enabled = 1 AND (disable_checks = 0 OR ?1 = 0)",
                params![flag(dead_end), id],
            )
            .await
            .map_err(query_error)?;

        Ok(affected > 0)
    }

    async fn delete(&self, id: MemberId) -> Result<bool, StoreError> {
        let conn = self.get_conn().await?;
        let affected = conn
            .execute("DELETE FROM members WHERE id = ?", params![id])
            .await
            .map_err(query_error)?;
        Ok(affected > 0)
    }

    async fn list_all(&self) -> Result<Vec<Member>, StoreError> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members ORDER BY id");
        let rows = conn.query(&sql, ()).await.map_err(query_error)?;
        collect_members(rows).await
    }

    async fn list_eligible(&self) -> Result<Vec<Member>, StoreError> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE enabled = 1 AND dead_end = 0 ORDER BY created_at, id"
        );
        let rows = conn.query(&sql, ()).await.map_err(query_error)?;
        collect_members(rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use crate::pool;
    use anyhow::Result;
    use tempfile::{TempDir, tempdir};
    use webring::{MemberDirectory, MemberUpdate};

    /// Helper to create test database pool
    async fn create_test_store() -> Result<(LibsqlStore, TempDir)> {
        let temp_dir = tempdir()?;
        let pool = pool::open(&temp_dir.path().join("test.db"), 4).await?;

        let conn = pool.get().await.map_err(|e| anyhow::anyhow!("{e}"))?;
        initialize_database(&conn).await?;

        Ok((LibsqlStore::new(pool), temp_dir))
    }

    #[tokio::test]
    async fn test_create_and_find() -> Result<()> {
        let (store, _dir) = create_test_store().await?;

        let created = store
            .create(NewMember::new("Site A", "a.example", "Alice").with_path("/blog/").with_https(false))
            .await?;

        let by_id = store.find_by_id(created.id).await?.expect("member by id");
        assert_eq!(by_id, created);
        assert_eq!(store.find_by_domain("a.example").await?, Some(created.clone()));
        assert_eq!(store.find_by_name("Site A").await?, Some(created.clone()));
        assert_eq!(by_id.url(), "http://a.example/blog/");
        assert!(store.find_by_domain("missing.example").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_unique_columns_conflict() -> Result<()> {
        let (store, _dir) = create_test_store().await?;
        store.create(NewMember::new("Site A", "a.example", "Alice")).await?;

        let by_domain = store.create(NewMember::new("Other", "a.example", "Eve")).await.unwrap_err();
        assert!(matches!(by_domain, StoreError::Conflict { field: "domain", .. }));

        let by_name = store.create(NewMember::new("Site A", "other.example", "Eve")).await.unwrap_err();
        assert!(matches!(by_name, StoreError::Conflict { field: "name", .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_preserves_dead_end() -> Result<()> {
        let (store, _dir) = create_test_store().await?;
        let mut member = store.create(NewMember::new("Site A", "a.example", "Alice")).await?;
        store.set_dead_end(member.id, true).await?;

        MemberUpdate { author: Some("Alicia".into()), ..MemberUpdate::default() }.apply(&mut member);
        store.update(&member).await?;

        let stored = store.find_by_id(member.id).await?.expect("member");
        assert_eq!(stored.author, "Alicia");
        assert!(stored.dead_end);

        MemberUpdate { checks_disabled: Some(true), ..MemberUpdate::default() }.apply(&mut member);
        store.update(&member).await?;
        assert!(!store.find_by_id(member.id).await?.expect("member").dead_end);

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_rows() -> Result<()> {
        let (store, _dir) = create_test_store().await?;

        assert!(!store.set_dead_end(99, true).await?);
        assert!(!store.delete(99).await?);

        let ghost = NewMember::new("Ghost", "ghost.example", "Nobody").into_member(99, Utc::now());
        assert!(matches!(store.update(&ghost).await, Err(StoreError::NotFound)));

        Ok(())
    }

    #[tokio::test]
    async fn test_set_dead_end_checks_stored_state() -> Result<()> {
        let (store, _dir) = create_test_store().await?;
        let mut member = store.create(NewMember::new("Site A", "a.example", "Alice")).await?;
        assert!(store.set_dead_end(member.id, true).await?);

        // Checks switched off after the run read the member
        MemberUpdate { checks_disabled: Some(true), ..MemberUpdate::default() }.apply(&mut member);
        store.update(&member).await?;
        assert!(!store.set_dead_end(member.id, true).await?);
        assert!(!store.find_by_id(member.id).await?.expect("member").dead_end);
        assert!(store.set_dead_end(member.id, false).await?);

        let mut other = store.create(NewMember::new("Site B", "b.example", "Bob")).await?;
        MemberUpdate::set_enabled(false).apply(&mut other);
        store.update(&other).await?;
        assert!(!store.set_dead_end(other.id, true).await?);
        assert!(!store.find_by_id(other.id).await?.expect("member").dead_end);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_eligible_in_ring_order() -> Result<()> {
        let (store, _dir) = create_test_store().await?;
        let late = NewMember::new("Late", "late.example", "L").into_member(1, at_millis(3_000));
        let early = NewMember::new("Early", "early.example", "E").into_member(2, at_millis(1_000));
        let mut dead = NewMember::new("Dead", "dead.example", "D").into_member(3, at_millis(2_000));
        dead.dead_end = true;
        let hidden = NewMember::new("Hidden", "hidden.example", "H").disabled().into_member(4, at_millis(500));
        for member in [&late, &early, &dead, &hidden] {
            insert_row(&store, member).await?;
        }

        let domains: Vec<String> = store.list_eligible().await?.into_iter().map(|m| m.domain).collect();
        assert_eq!(domains, ["early.example", "late.example"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_created_at_is_an_error() -> Result<()> {
        let (store, _dir) = create_test_store().await?;
        let member = store.create(NewMember::new("Site A", "a.example", "Alice")).await?;

        let conn = store.get_conn().await?;
        conn.execute("UPDATE members SET created_at = ? WHERE id = ?", params![i64::MAX, member.id]).await?;

        assert!(matches!(store.find_by_id(member.id).await, Err(StoreError::Backend(_))));
        assert!(matches!(store.list_all().await, Err(StoreError::Backend(_))));

        Ok(())
    }

    fn at_millis(millis: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(millis).expect("valid timestamp")
    }

    /// Insert a fully formed row, keeping its id and creation time
    async fn insert_row(store: &LibsqlStore, member: &Member) -> Result<()> {
        let conn = store.get_conn().await?;
        conn.execute(
            "INSERT INTO members (id, name, domain, path, https, author, created_at, enabled, disable_checks, dead_end) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                member.id,
                member.name.clone(),
                member.domain.clone(),
                member.path.clone(),
                flag(member.use_https),
                member.author.clone(),
                member.created_at.timestamp_millis(),
                flag(member.enabled),
                flag(member.checks_disabled),
                flag(member.dead_end)
            ],
        )
        .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_directory_over_libsql() -> Result<()> {
        let (store, _dir) = create_test_store().await?;
        let a = store.create(NewMember::new("A", "a.example", "Alice")).await?;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.create(NewMember::new("B", "b.example", "Bob")).await?;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.create(NewMember::new("C", "c.example", "Carol").disabled()).await?;

        let directory = MemberDirectory::new(std::sync::Arc::new(store));
        assert_eq!(directory.next("b.example").await?.domain, "a.example");
        assert_eq!(directory.previous("a.example").await?.domain, "b.example");

        directory.store().delete(a.id).await?;
        assert_eq!(directory.next("b.example").await?.domain, "b.example");

        Ok(())
    }
}

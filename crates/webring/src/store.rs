//! Storage collaborator for ring members.
//!
//! The ring logic never caches member state: every traversal and every check
//! run reads through a [`MemberStore`]. [`MemoryStore`] backs tests and
//! ephemeral deployments; persistent backends live with the binary.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::member::{Member, MemberId, NewMember};

/// Storage trait for abstracting member persistence
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Insert a new member, assigning its id and creation time
    async fn create(&self, member: NewMember) -> Result<Member, StoreError>;

    /// Get a member by id
    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, StoreError>;

    /// Get a member by domain
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Member>, StoreError>;

    /// Get a member by display name
    async fn find_by_name(&self, name: &str) -> Result<Option<Member>, StoreError>;

    /// Persist the administrative fields of an existing member.
    /// `dead_end` is not written here, see [`MemberStore::set_dead_end`].
    async fn update(&self, member: &Member) -> Result<(), StoreError>;

    /// Atomically set the health flag of a single member, judged against its
    /// current stored state.
    ///
    /// The write only lands on an enabled member, and a checks-disabled member
    /// can only be cleared. Returns `false` when nothing was written, which
    /// includes a member deleted since it was read.
    async fn set_dead_end(&self, id: MemberId, dead_end: bool) -> Result<bool, StoreError>;

    /// Hard-delete a member, returning whether it existed
    async fn delete(&self, id: MemberId) -> Result<bool, StoreError>;

    /// All members in storage iteration order
    async fn list_all(&self) -> Result<Vec<Member>, StoreError>;

    /// Enabled members without a dead end, in any order
    async fn list_eligible(&self) -> Result<Vec<Member>, StoreError> {
        Ok(self.list_all().await?.into_iter().filter(Member::is_eligible).collect())
    }
}

/// In-memory member store
pub struct MemoryStore {
    members: RwLock<BTreeMap<MemberId, Member>>,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { members: RwLock::new(BTreeMap::new()), next_id: AtomicI64::new(1) }
    }

    /// Insert a fully formed record, keeping its id and creation time
    pub async fn insert(&self, member: Member) -> Result<(), StoreError> {
        let mut members = self.members.write().await;
        ensure_unique(&members, &member)?;
        self.next_id.fetch_max(member.id + 1, Ordering::Relaxed);
        members.insert(member.id, member);
        Ok(())
    }
}

fn ensure_unique(members: &BTreeMap<MemberId, Member>, candidate: &Member) -> Result<(), StoreError> {
    for other in members.values().filter(|m| m.id != candidate.id) {
        if other.name == candidate.name {
            return Err(StoreError::Conflict { field: "name", value: candidate.name.clone() });
        }
        if other.domain == candidate.domain {
            return Err(StoreError::Conflict { field: "domain", value: candidate.domain.clone() });
        }
    }
    Ok(())
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn create(&self, member: NewMember) -> Result<Member, StoreError> {
        let mut members = self.members.write().await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let member = member.into_member(id, Utc::now());
        ensure_unique(&members, &member)?;
        members.insert(id, member.clone());
        Ok(member)
    }

    async fn find_by_id(&self, id: MemberId) -> Result<Option<Member>, StoreError> {
        Ok(self.members.read().await.get(&id).cloned())
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Member>, StoreError> {
        Ok(self.members.read().await.values().find(|m| m.domain == domain).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Member>, StoreError> {
        Ok(self.members.read().await.values().find(|m| m.name == name).cloned())
    }

    async fn update(&self, member: &Member) -> Result<(), StoreError> {
        let mut members = self.members.write().await;
        ensure_unique(&members, member)?;
        let stored = members.get_mut(&member.id).ok_or(StoreError::NotFound)?;
        let dead_end = stored.dead_end;
        *stored = Member { dead_end, created_at: stored.created_at, ..member.clone() };
        // Unchecked members are pinned healthy
        if stored.checks_disabled {
            stored.dead_end = false;
        }
        Ok(())
    }

    async fn set_dead_end(&self, id: MemberId, dead_end: bool) -> Result<bool, StoreError> {
        let mut members = self.members.write().await;
        match members.get_mut(&id) {
            Some(stored) if stored.enabled && !(dead_end && stored.checks_disabled) => {
                stored.dead_end = dead_end;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: MemberId) -> Result<bool, StoreError> {
        Ok(self.members.write().await.remove(&id).is_some())
    }

    async fn list_all(&self) -> Result<Vec<Member>, StoreError> {
        Ok(self.members.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.create(NewMember::new("A", "a.example.com", "Alice")).await.unwrap();
        let b = store.create(NewMember::new("B", "b.example.com", "Bob")).await.unwrap();

        assert!(b.id > a.id);
        assert!(b.created_at >= a.created_at);
        assert!(!a.dead_end);
    }

    #[tokio::test]
    async fn test_duplicate_domain_is_a_conflict() {
        let store = MemoryStore::new();
        store.create(NewMember::new("A", "a.example.com", "Alice")).await.unwrap();

        let err = store.create(NewMember::new("Other", "a.example.com", "Eve")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { field: "domain", .. }));
    }

    #[tokio::test]
    async fn test_update_does_not_touch_dead_end() {
        let store = MemoryStore::new();
        let mut a = store.create(NewMember::new("A", "a.example.com", "Alice")).await.unwrap();
        store.set_dead_end(a.id, true).await.unwrap();

        a.author = "Alicia".to_string();
        a.dead_end = false;
        store.update(&a).await.unwrap();

        let stored = store.find_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(stored.author, "Alicia");
        assert!(stored.dead_end);
    }

    #[tokio::test]
    async fn test_delete_is_hard_removal() {
        let store = MemoryStore::new();
        let a = store.create(NewMember::new("A", "a.example.com", "Alice")).await.unwrap();

        assert!(store.delete(a.id).await.unwrap());
        assert!(!store.delete(a.id).await.unwrap());
        assert!(store.find_by_domain("a.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_dead_end_respects_current_state() {
        let store = MemoryStore::new();
        assert!(!store.set_dead_end(42, true).await.unwrap());

        let disabled = store.create(NewMember::new("D", "d.example.com", "Dee").disabled()).await.unwrap();
        assert!(!store.set_dead_end(disabled.id, true).await.unwrap());
        assert!(!store.find_by_id(disabled.id).await.unwrap().unwrap().dead_end);

        let unchecked = store.create(NewMember::new("U", "u.example.com", "Uma").without_checks()).await.unwrap();
        assert!(!store.set_dead_end(unchecked.id, true).await.unwrap());
        assert!(store.set_dead_end(unchecked.id, false).await.unwrap());
        assert!(!store.find_by_id(unchecked.id).await.unwrap().unwrap().dead_end);
    }
}

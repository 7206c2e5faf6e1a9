use std::sync::Arc;

use tracing::debug;

use crate::Result;
use crate::member::Member;
use crate::ring::Ring;
use crate::store::MemberStore;

/// Member directory - answers membership, traversal and listing queries.
///
/// Nothing is cached: every call re-reads the store, so enabling, disabling
/// or a health change is visible to the very next lookup.
#[derive(Clone)]
pub struct MemberDirectory {
    store: Arc<dyn MemberStore>,
}

impl MemberDirectory {
    pub fn new(store: Arc<dyn MemberStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn MemberStore> {
        &self.store
    }

    /// Current ring snapshot
    pub async fn ring(&self) -> Result<Ring> {
        Ok(Ring::from_members(self.store.list_eligible().await?))
    }

    /// Enabled, healthy members in ring order
    pub async fn list_eligible(&self) -> Result<Vec<Member>> {
        Ok(self.ring().await?.into_members())
    }

    /// Member following `domain` in the ring
    pub async fn next(&self, domain: &str) -> Result<Member> {
        let ring = self.ring().await?;
        let next = ring.next(domain)?;
        debug!(source = domain, target = %next.domain, "Resolved next member");
        Ok(next.clone())
    }

    /// Member preceding `domain` in the ring
    pub async fn previous(&self, domain: &str) -> Result<Member> {
        let ring = self.ring().await?;
        let previous = ring.previous(domain)?;
        debug!(source = domain, target = %previous.domain, "Resolved previous member");
        Ok(previous.clone())
    }

    /// Every member, in store order
    pub async fn list_all(&self) -> Result<Vec<Member>> {
        Ok(self.store.list_all().await?)
    }

    /// Members matching `predicate`, in store order
    pub async fn list_by_status<F>(&self, predicate: F) -> Result<Vec<Member>>
    where
        F: Fn(&Member) -> bool + Send,
    {
        Ok(self.store.list_all().await?.into_iter().filter(|m| predicate(m)).collect())
    }
}

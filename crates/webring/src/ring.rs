//! Circular navigation over a snapshot of eligible members.

use crate::error::RingError;
use crate::member::Member;

/// Ordered snapshot of the eligible members.
///
/// Built fresh for every lookup; it never outlives the request that built it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ring {
    members: Vec<Member>,
}

impl Ring {
    /// Keep eligible members and order them by creation time, then id
    pub fn from_members(members: impl IntoIterator<Item = Member>) -> Self {
        let mut members: Vec<Member> = members.into_iter().filter(Member::is_eligible).collect();
        members.sort_by_key(Member::ring_order);
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn into_members(self) -> Vec<Member> {
        self.members
    }

    /// Position of the member owning `domain`
    pub fn position(&self, domain: &str) -> Result<usize, RingError> {
        if self.members.is_empty() {
            return Err(RingError::EmptyRing);
        }
        self.members
            .iter()
            .position(|m| m.domain == domain)
            .ok_or_else(|| RingError::NotFound(domain.to_string()))
    }

    /// Successor of `domain`; the last member wraps to the first
    pub fn next(&self, domain: &str) -> Result<&Member, RingError> {
        let index = self.position(domain)?;
        Ok(&self.members[(index + 1) % self.members.len()])
    }

    /// Predecessor of `domain`; the first member wraps to the last
    pub fn previous(&self, domain: &str) -> Result<&Member, RingError> {
        let index = self.position(domain)?;
        let n = self.members.len();
        Ok(&self.members[(index + n - 1) % n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::NewMember;
    use chrono::{TimeZone, Utc};

    fn member(id: i64, created: i64, domain: &str) -> Member {
        NewMember::new(domain, domain, "author")
            .into_member(id, Utc.timestamp_opt(created, 0).unwrap())
    }

    fn ring_of(domains: &[&str]) -> Ring {
        Ring::from_members(
            domains.iter().enumerate().map(|(i, d)| member(i as i64 + 1, i as i64 + 1, d)),
        )
    }

    #[test]
    fn test_orders_by_creation_then_id() {
        let ring = Ring::from_members(vec![
            member(3, 20, "c"),
            member(2, 10, "b"),
            member(1, 10, "a"),
        ]);
        let order: Vec<&str> = ring.members().iter().map(|m| m.domain.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn test_filters_disabled_and_dead_ends() {
        let mut disabled = member(2, 2, "b");
        disabled.enabled = false;
        let mut dead = member(3, 3, "c");
        dead.dead_end = true;

        let ring = Ring::from_members(vec![member(1, 1, "a"), disabled, dead]);
        assert_eq!(ring.len(), 1);
        assert!(matches!(ring.next("b"), Err(RingError::NotFound(_))));
        assert!(matches!(ring.previous("c"), Err(RingError::NotFound(_))));
    }

    #[test]
    fn test_wraps_around() {
        let ring = ring_of(&["a", "b", "c"]);
        assert_eq!(ring.next("c").unwrap().domain, "a");
        assert_eq!(ring.previous("a").unwrap().domain, "c");
    }

    #[test]
    fn test_single_member_points_to_itself() {
        let ring = ring_of(&["solo"]);
        assert_eq!(ring.next("solo").unwrap().domain, "solo");
        assert_eq!(ring.previous("solo").unwrap().domain, "solo");
    }

    #[test]
    fn test_round_trip_and_cycle_closure() {
        for n in 1..=7 {
            let domains: Vec<String> = (0..n).map(|i| format!("site-{i}.example")).collect();
            let refs: Vec<&str> = domains.iter().map(String::as_str).collect();
            let ring = ring_of(&refs);

            for domain in &refs {
                let next = ring.next(domain).unwrap();
                assert_eq!(ring.previous(&next.domain).unwrap().domain, *domain);

                let mut cursor = domain.to_string();
                for _ in 0..n {
                    cursor = ring.next(&cursor).unwrap().domain.clone();
                }
                assert_eq!(cursor, *domain, "{n} steps must close the cycle");
            }
        }
    }

    #[test]
    fn test_empty_ring_is_distinct_from_not_found() {
        let ring = Ring::default();
        assert!(matches!(ring.next("a"), Err(RingError::EmptyRing)));
        assert!(matches!(ring.previous("a"), Err(RingError::EmptyRing)));

        let ring = ring_of(&["a"]);
        assert!(matches!(ring.next("zzz"), Err(RingError::NotFound(d)) if d == "zzz"));
    }
}

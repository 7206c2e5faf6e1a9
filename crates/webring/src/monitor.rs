//! Ring monitor - verifies every enabled member and commits its health flag.
//!
//! Runs are serialized by a single run-lock shared by the scheduled trigger
//! and the administrative one. Within a run, members are verified in
//! parallel and each member's flag is written as soon as its own verification
//! completes, so a run interrupted halfway keeps the progress it made.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::error::RingError;
use crate::member::Member;
use crate::store::MemberStore;
use crate::verifier::LinkVerifier;

/// Totals of one check run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Enabled members visited, including those with checks disabled
    pub checked: usize,
    pub healthy: usize,
    pub dead_ends: usize,
    /// Members whose flag was not decided by a fetch: checks disabled (also
    /// counted as healthy) or disabled by an admin while being checked
    pub skipped: usize,
    pub persist_failures: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

enum Outcome {
    Healthy { skipped: bool },
    DeadEnd,
    /// An admin edit landed mid-check and the stored state no longer allows the write
    Superseded,
    PersistFailed,
}

pub struct RingMonitor {
    store: Arc<dyn MemberStore>,
    verifier: Arc<LinkVerifier>,
    concurrency: usize,
    run_lock: Mutex<()>,
}

impl RingMonitor {
    pub fn new(store: Arc<dyn MemberStore>, verifier: Arc<LinkVerifier>, concurrency: usize) -> Self {
        Self { store, verifier, concurrency: concurrency.max(1), run_lock: Mutex::new(()) }
    }

    /// Run a check pass, waiting for any pass already in progress to finish
    pub async fn run_check(&self) -> Result<RunSummary> {
        let _guard = self.run_lock.lock().await;
        self.run_locked().await
    }

    /// Run a check pass unless one is already in progress
    pub async fn try_run_check(&self) -> Result<RunSummary> {
        let _guard = self.run_lock.try_lock().map_err(|_| RingError::RunInProgress)?;
        self.run_locked().await
    }

    async fn run_locked(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let start = Instant::now();

        let members: Vec<Member> =
            self.store.list_all().await?.into_iter().filter(|m| m.enabled).collect();
        info!("Checking {} enabled members", members.len());

        let outcomes: Vec<Outcome> = stream::iter(members)
            .map(|member| check_member(self.store.clone(), self.verifier.clone(), member))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = RunSummary {
            checked: outcomes.len(),
            started_at: Some(started_at),
            ..RunSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Healthy { skipped } => {
                    summary.healthy += 1;
                    if skipped {
                        summary.skipped += 1;
                    }
                }
                Outcome::DeadEnd => summary.dead_ends += 1,
                Outcome::Superseded => summary.skipped += 1,
                Outcome::PersistFailed => summary.persist_failures += 1,
            }
        }
        summary.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            checked = summary.checked,
            healthy = summary.healthy,
            dead_ends = summary.dead_ends,
            skipped = summary.skipped,
            persist_failures = summary.persist_failures,
            duration_ms = summary.duration_ms,
            "Check run completed"
        );

        Ok(summary)
    }
}

/// Verify one member and commit its flag on its own
async fn check_member(store: Arc<dyn MemberStore>, verifier: Arc<LinkVerifier>, member: Member) -> Outcome {
    let result = verifier.verify(&member).await;
    let dead_end = !result.passed;

    match &result.error {
        Some(cause) => warn!(
            domain = %member.domain,
            status = ?result.observed_status,
            "Member failed verification: {}", cause
        ),
        None if result.skipped => debug!(domain = %member.domain, "Checks disabled, skipping"),
        None => debug!(domain = %member.domain, "Member links back into the ring"),
    }

    match store.set_dead_end(member.id, dead_end).await {
        Ok(true) => {}
        Ok(false) => {
            info!(domain = %member.domain, "Member changed during the check, leaving its flag alone");
            return Outcome::Superseded;
        }
        Err(e) => {
            error!(domain = %member.domain, "Failed to persist health flag: {}", e);
            return Outcome::PersistFailed;
        }
    }

    if member.dead_end != dead_end {
        info!(domain = %member.domain, dead_end, "Member health changed");
    }

    if dead_end { Outcome::DeadEnd } else { Outcome::Healthy { skipped: result.skipped } }
}

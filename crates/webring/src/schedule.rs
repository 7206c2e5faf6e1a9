//! Time-based trigger for check runs.
//!
//! Accepts either a fixed interval or a cron expression. Scheduled ticks use
//! [`RingMonitor::try_run_check`], so a tick landing while another run (for
//! example a manual recheck) is in progress is dropped rather than queued.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use crate::error::RingError;
use crate::monitor::RingMonitor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("Check interval must be at least one second")]
    ZeroInterval,
}

#[derive(Debug, Clone)]
pub enum CheckSchedule {
    Interval(Duration),
    Cron { expr: String, schedule: Box<cron::Schedule> },
}

impl CheckSchedule {
    pub fn every(interval: Duration) -> Result<Self, ScheduleError> {
        if interval.as_secs() == 0 {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(CheckSchedule::Interval(interval))
    }

    /// Parse a cron expression. Five-field expressions get a leading seconds
    /// field of `0`; `@hourly`-style shorthands are passed through.
    pub fn cron(expr: &str) -> Result<Self, ScheduleError> {
        let expr = expr.trim();
        let normalized = if !expr.starts_with('@') && expr.split_whitespace().count() == 5 {
            format!("0 {expr}")
        } else {
            expr.to_string()
        };

        cron::Schedule::from_str(&normalized)
            .map(|schedule| CheckSchedule::Cron { expr: expr.to_string(), schedule: Box::new(schedule) })
            .map_err(|e| ScheduleError::InvalidCron { expr: expr.to_string(), reason: e.to_string() })
    }

    /// Delay from `now` until the next run, `None` when nothing is upcoming
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            CheckSchedule::Interval(interval) => Some(*interval),
            CheckSchedule::Cron { schedule, .. } => {
                let next = schedule.after(&now).next()?;
                Some((next - now).to_std().unwrap_or_default())
            }
        }
    }

    /// Start the scheduler loop as a background task
    pub fn spawn(self, monitor: Arc<RingMonitor>, run_on_start: bool) -> JoinHandle<()> {
        info!("Scheduling check runs: {}", self);

        tokio::spawn(async move {
            if run_on_start {
                trigger(&monitor).await;
            }

            match &self {
                CheckSchedule::Interval(period) => {
                    let mut timer = interval(*period);
                    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    // The first tick completes immediately
                    timer.tick().await;

                    loop {
                        timer.tick().await;
                        trigger(&monitor).await;
                    }
                }
                CheckSchedule::Cron { .. } => loop {
                    let Some(delay) = self.next_delay(Utc::now()) else {
                        warn!("Cron schedule has no upcoming run, stopping scheduler");
                        break;
                    };
                    tokio::time::sleep(delay).await;
                    trigger(&monitor).await;
                },
            }
        })
    }
}

impl fmt::Display for CheckSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckSchedule::Interval(interval) => write!(f, "every {}s", interval.as_secs()),
            CheckSchedule::Cron { expr, .. } => write!(f, "cron '{expr}'"),
        }
    }
}

async fn trigger(monitor: &RingMonitor) {
    match monitor.try_run_check().await {
        Ok(_) => {}
        Err(RingError::RunInProgress) => {
            info!("Skipping scheduled check: a run is already in progress");
        }
        Err(e) => error!("Scheduled check run failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_five_field_cron() {
        let schedule = CheckSchedule::cron("*/30 * * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 10, 0).unwrap();

        assert_eq!(schedule.next_delay(now), Some(Duration::from_secs(20 * 60)));
    }

    #[test]
    fn test_parse_six_field_cron() {
        let schedule = CheckSchedule::cron("0 0 * * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 59, 30).unwrap();

        assert_eq!(schedule.next_delay(now), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_cron_is_rejected() {
        assert!(matches!(
            CheckSchedule::cron("every now and then"),
            Err(ScheduleError::InvalidCron { .. })
        ));
    }

    #[test]
    fn test_interval_schedule() {
        let schedule = CheckSchedule::every(Duration::from_secs(90)).unwrap();
        assert_eq!(schedule.next_delay(Utc::now()), Some(Duration::from_secs(90)));
        assert_eq!(CheckSchedule::every(Duration::ZERO).unwrap_err(), ScheduleError::ZeroInterval);
    }
}

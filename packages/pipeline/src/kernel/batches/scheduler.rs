//! Periodic scheduler: a fixed (target, cron-pattern) table evaluated once
//! per minute.
//!
//! Only a strict subset of cron is honored:
//! - `* * * * *` fires every minute
//! - `*/N * * * *` fires when `minute % N == 0`
//! - `M * * * *` (leading digits) fires at exactly minute M
//! - anything else never fires
//!
//! Matching targets are invoked fire-and-forget over the internal HTTP
//! transport; a failed invocation is logged and the next matching tick is
//! its retry.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::kernel::Invoker;

#[derive(Debug, Clone, Copy)]
pub struct ScheduleEntry {
    pub target: &'static str,
    pub pattern: &'static str,
}

/// The default control-plane schedule.
pub fn default_schedule() -> Vec<ScheduleEntry> {
    vec![
        ScheduleEntry { target: "discover-artists", pattern: "0 * * * *" },
        ScheduleEntry { target: "worker", pattern: "*/2 * * * *" },
        ScheduleEntry { target: "maintenance", pattern: "*/15 * * * *" },
        ScheduleEntry { target: "monitor", pattern: "*/30 * * * *" },
    ]
}

/// Whether a pattern fires at the given wall-clock minute.
pub fn minute_matches(pattern: &str, minute: u32) -> bool {
    let fields: Vec<&str> = pattern.split_whitespace().collect();
    if fields.len() != 5 || fields[1..].iter().any(|f| *f != "*") {
        return false;
    }

    let minute_field = fields[0];
    if minute_field == "*" {
        return true;
    }
    if let Some(step) = minute_field.strip_prefix("*/") {
        return match step.parse::<u32>() {
            Ok(n) if n > 0 => minute % n == 0,
            _ => false,
        };
    }
    if minute_field.chars().all(|c| c.is_ascii_digit()) {
        return minute_field.parse::<u32>() == Ok(minute);
    }

    false
}

#[derive(Debug, Serialize)]
pub struct SchedulerTick {
    pub timestamp: DateTime<Utc>,
    pub fired: Vec<String>,
}

pub struct Scheduler {
    invoker: Arc<Invoker>,
    entries: Vec<ScheduleEntry>,
}

impl Scheduler {
    pub fn new(invoker: Arc<Invoker>) -> Self {
        Self {
            invoker,
            entries: default_schedule(),
        }
    }

    pub fn with_entries(invoker: Arc<Invoker>, entries: Vec<ScheduleEntry>) -> Self {
        Self { invoker, entries }
    }

    /// Evaluate the schedule for one wall-clock instant and invoke every
    /// matching target. Invocations are fire-and-forget.
    pub async fn tick(&self, now: DateTime<Utc>) -> SchedulerTick {
        let minute = now.minute();
        let mut fired = Vec::new();

        for entry in &self.entries {
            if !minute_matches(entry.pattern, minute) {
                continue;
            }

            fired.push(entry.target.to_string());
            let invoker = self.invoker.clone();
            let target = entry.target;
            tokio::spawn(async move {
                if let Err(e) = invoker.invoke(target).await {
                    error!(target, error = %e, "scheduled invocation failed");
                }
            });
        }

        if !fired.is_empty() {
            info!(minute, targets = ?fired, "scheduler tick fired");
        }

        SchedulerTick {
            timestamp: now,
            fired,
        }
    }
}

/// Drive the scheduler from an in-process minute ticker.
///
/// Deployments that prefer an external clock (curl in cron, a platform
/// scheduler) can skip this and POST /scheduler themselves.
pub async fn start_minute_ticker(scheduler: Arc<Scheduler>) -> Result<JobScheduler> {
    let runner = JobScheduler::new().await?;

    let tick_job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let scheduler = scheduler.clone();
        Box::pin(async move {
            scheduler.tick(Utc::now()).await;
        })
    })?;

    runner.add(tick_job).await?;
    runner.start().await?;

    info!("scheduler minute ticker started");
    Ok(runner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_fires_every_minute() {
        assert!((0..60).all(|m| minute_matches("* * * * *", m)));
    }

    #[test]
    fn step_pattern_fires_on_multiples() {
        let fired: Vec<u32> = (0..60).filter(|m| minute_matches("*/2 * * * *", *m)).collect();
        assert_eq!(fired, (0..60).step_by(2).collect::<Vec<_>>());

        let quarter: Vec<u32> = (0..60).filter(|m| minute_matches("*/15 * * * *", *m)).collect();
        assert_eq!(quarter, vec![0, 15, 30, 45]);
    }

    #[test]
    fn exact_minute_fires_once_per_hour() {
        assert!(minute_matches("0 * * * *", 0));
        assert!((1..60).all(|m| !minute_matches("0 * * * *", m)));
        assert!(minute_matches("37 * * * *", 37));
        assert!(!minute_matches("37 * * * *", 38));
    }

    #[test]
    fn unsupported_patterns_never_fire() {
        assert!((0..60).all(|m| !minute_matches("xyz", m)));
        assert!((0..60).all(|m| !minute_matches("*/0 * * * *", m)));
        assert!((0..60).all(|m| !minute_matches("1,2 * * * *", m)));
        // Non-wildcard hour fields are outside the supported subset.
        assert!((0..60).all(|m| !minute_matches("0 12 * * *", m)));
    }

    #[test]
    fn default_schedule_covers_the_control_plane() {
        let targets: Vec<&str> = default_schedule().iter().map(|e| e.target).collect();
        assert_eq!(
            targets,
            vec!["discover-artists", "worker", "maintenance", "monitor"]
        );
    }
}

//! Worker dispatcher: one tick claims pending batches and runs their
//! handlers concurrently.
//!
//! ```text
//! Worker::tick
//!     │
//!     ├─► processing count gate (MAX_CONCURRENT_JOBS)
//!     ├─► Batch::claim(want)
//!     ├─► dispatch each claimed batch (all-settle, no sibling cancellation)
//!     └─► per-tick summary {claimed, completed, failed}
//! ```
//!
//! A handler failure feeds the retry policy: geometric backoff up to the
//! per-type limit, then terminal error plus a dead-letter row.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::batch::Batch;
use super::dead_letter::DeadLetterItem;
use super::registry::HandlerRegistry;
use crate::kernel::PipelineDeps;

/// Engine-wide cap on batches in flight. The count-then-claim sequence is
/// not atomic, so a burst of workers can briefly exceed this; it is a
/// best-effort throttle, not a hard limit.
pub const MAX_CONCURRENT_JOBS: i64 = 3;

const DEFAULT_RETRY_LIMIT: i32 = 3;

/// Per-type retry limits; paging jobs get more attempts because a single
/// flaky upstream page should not park a whole discography.
pub fn retry_limit(batch_type: &str) -> i32 {
    match batch_type {
        "discover-artists" => 3,
        "album_page" => 5,
        "track_page" => 5,
        "producer_discovery" => 3,
        _ => DEFAULT_RETRY_LIMIT,
    }
}

/// Geometric backoff for the nth retry: 500, 1000, 2000, 4000, 8000 ms.
pub fn backoff_ms(attempt: i32) -> i64 {
    500 * 2i64.pow((attempt - 1).max(0) as u32)
}

/// Per-tick summary returned to the invoker.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TickSummary {
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
}

/// A short-lived, stateless dispatcher. One instance serves one tick; no
/// state survives between ticks except what is in the store.
pub struct Worker {
    deps: Arc<PipelineDeps>,
    registry: Arc<HandlerRegistry>,
    worker_id: String,
}

impl Worker {
    pub fn new(deps: Arc<PipelineDeps>, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            deps,
            registry,
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }

    pub fn with_worker_id(
        deps: Arc<PipelineDeps>,
        registry: Arc<HandlerRegistry>,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            deps,
            registry,
            worker_id: worker_id.into(),
        }
    }

    /// Run one tick over every batch type.
    pub async fn tick(&self) -> Result<TickSummary> {
        self.tick_for(None).await
    }

    /// Run one tick, optionally restricted to a single batch type (the
    /// per-kind HTTP endpoints use this).
    pub async fn tick_for(&self, batch_type: Option<&str>) -> Result<TickSummary> {
        let processing = Batch::processing_count(&self.deps.db_pool).await?;
        if processing >= MAX_CONCURRENT_JOBS {
            info!(
                processing,
                max = MAX_CONCURRENT_JOBS,
                "max_concurrent_jobs_reached"
            );
            return Ok(TickSummary::default());
        }

        let want = MAX_CONCURRENT_JOBS - processing;
        let claimed =
            Batch::claim(&self.deps.db_pool, &self.worker_id, want, batch_type).await?;

        if claimed.is_empty() {
            return Ok(TickSummary::default());
        }

        // All-settle: every dispatch reports back, one failure never
        // cancels its siblings.
        let worker = &self;
        let results = futures::future::join_all(
            claimed.iter().map(|batch| worker.dispatch(batch)),
        )
        .await;

        let completed = results.iter().filter(|ok| **ok).count();
        let summary = TickSummary {
            claimed: claimed.len(),
            completed,
            failed: claimed.len() - completed,
        };

        info!(
            worker_id = %self.worker_id,
            claimed = summary.claimed,
            completed = summary.completed,
            failed = summary.failed,
            "worker tick complete"
        );

        Ok(summary)
    }

    /// Execute one claimed batch; returns whether the handler succeeded.
    async fn dispatch(&self, batch: &Batch) -> bool {
        let started = Instant::now();
        let result = self
            .registry
            .execute(&batch.batch_type, batch.metadata.clone(), self.deps.clone())
            .await;

        match result {
            Ok(()) => {
                info!(
                    batch_id = %batch.id,
                    batch_type = %batch.batch_type,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "batch_completed"
                );
                if let Err(e) = Batch::mark_completed(&self.deps.db_pool, batch.id).await {
                    // Lease recovery will return the row eventually.
                    error!(batch_id = %batch.id, error = %e, "failed to mark batch completed");
                }
                true
            }
            Err(e) => {
                warn!(
                    batch_id = %batch.id,
                    batch_type = %batch.batch_type,
                    error = %e,
                    "batch handler failed"
                );
                self.handle_failure(batch, &e).await;
                false
            }
        }
    }

    /// Apply the retry policy to a failed batch. Store errors here are
    /// logged and swallowed; the tick never fails because of one batch.
    async fn handle_failure(&self, batch: &Batch, err: &anyhow::Error) {
        let next = batch.retry_count + 1;
        let limit = retry_limit(&batch.batch_type);
        let message = err.to_string();

        if next < limit {
            let backoff = backoff_ms(next);
            if let Err(e) =
                Batch::mark_retry(&self.deps.db_pool, batch.id, next, &message, backoff).await
            {
                error!(batch_id = %batch.id, error = %e, "failed to schedule batch retry");
            }
            return;
        }

        if let Err(e) = Batch::mark_error(&self.deps.db_pool, batch.id, next, &message).await {
            error!(batch_id = %batch.id, error = %e, "failed to mark batch errored");
            return;
        }

        // The batch stays terminal even if parking it fails; that gap is
        // surfaced by the monitor's error-batch metric.
        if let Err(e) = DeadLetterItem::insert(
            &self.deps.db_pool,
            &batch.batch_type,
            &message,
            batch.id,
            &batch.metadata,
        )
        .await
        {
            error!(batch_id = %batch.id, error = %e, "failed to insert dead-letter item");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_500ms() {
        let series: Vec<i64> = (1..=5).map(backoff_ms).collect();
        assert_eq!(series, vec![500, 1000, 2000, 4000, 8000]);
    }

    #[test]
    fn retry_limits_match_policy_table() {
        assert_eq!(retry_limit("discover-artists"), 3);
        assert_eq!(retry_limit("album_page"), 5);
        assert_eq!(retry_limit("track_page"), 5);
        assert_eq!(retry_limit("producer_discovery"), 3);
        assert_eq!(retry_limit("anything_else"), 3);
    }

    #[test]
    fn tick_summary_serializes_counts() {
        let summary = TickSummary {
            claimed: 3,
            completed: 2,
            failed: 1,
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["claimed"], 3);
        assert_eq!(json["completed"], 2);
        assert_eq!(json["failed"], 1);
    }
}

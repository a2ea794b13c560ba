//! Maintenance loop: lease recovery, dead-letter requeue, history cleanup.
//!
//! Steps run in order and the first failure aborts the invocation; the
//! scheduler fires the loop again on its next tick, which is retry enough.

use anyhow::Result;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;

use super::batch::Batch;
use super::dead_letter::DeadLetterItem;

/// Leases older than this (past their own expiry) are reclaimed. Exceeds
/// the 5-minute claim lease to leave slow workers a cushion.
pub const LEASE_EXPIRY_MINUTES: i64 = 30;

/// Dead-letter items requeued per invocation.
pub const DLQ_REQUEUE_LIMIT: i64 = 100;

/// Completed batches are kept this many days.
pub const CLEANUP_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MaintenanceSummary {
    pub expired_reset: u64,
    pub dlq_requeued: u64,
    pub completed_cleaned: u64,
}

/// Run one maintenance invocation.
pub async fn run(pool: &PgPool) -> Result<MaintenanceSummary> {
    let expired_reset = Batch::reset_expired(pool, LEASE_EXPIRY_MINUTES).await?;
    let dlq_requeued = DeadLetterItem::requeue(pool, DLQ_REQUEUE_LIMIT).await?;
    let completed_cleaned = Batch::cleanup(pool, CLEANUP_RETENTION_DAYS).await?;

    let summary = MaintenanceSummary {
        expired_reset,
        dlq_requeued,
        completed_cleaned,
    };

    info!(
        expired_reset = summary.expired_reset,
        dlq_requeued = summary.dlq_requeued,
        completed_cleaned = summary.completed_cleaned,
        "maintenance tick complete"
    );

    Ok(summary)
}

//! Batch model: the durable unit of pending work and its lease protocol.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use super::metadata::{metadata_hash, BatchPayload};

/// Lease length written by `claim`. Expired leases are reclaimed by
/// `reset_expired`, which runs on a longer cushion.
pub const CLAIM_LEASE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "batch_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

/// Result type for enqueue operations that handles idempotency.
#[derive(Debug, Clone)]
pub enum EnqueueResult {
    /// A new batch was inserted, returns its ID
    Created(Uuid),
    /// An active batch with the same payload exists, returns its ID
    Duplicate(Uuid),
}

impl EnqueueResult {
    pub fn batch_id(&self) -> Uuid {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Batch {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,
    pub batch_type: String,

    #[builder(default)]
    pub status: BatchStatus,
    /// Reserved. Claim ordering is (retry_count, created_at); see `claim`.
    #[builder(default = 5)]
    pub priority: i32,
    #[builder(default = 0)]
    pub retry_count: i32,

    #[builder(default = 0)]
    pub items_total: i32,
    #[builder(default = 0)]
    pub items_processed: i32,
    #[builder(default = 0)]
    pub items_failed: i32,

    // Lease management
    #[builder(default, setter(strip_option))]
    pub claimed_by: Option<String>,
    #[builder(default, setter(strip_option))]
    pub claim_expires_at: Option<DateTime<Utc>>,

    #[builder(default, setter(strip_option))]
    pub started_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub completed_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,

    // Payload
    pub metadata: serde_json::Value,
    pub metadata_hash: String,

    /// Retry backoff: the batch is invisible to `claim` until this passes.
    #[builder(default, setter(strip_option))]
    pub next_visible_at: Option<DateTime<Utc>>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Create a pending batch for a payload, hashing the metadata for the
    /// active-uniqueness constraint.
    pub fn new(batch_type: impl Into<String>, metadata: serde_json::Value) -> Self {
        let hash = metadata_hash(&metadata);
        Self::builder()
            .batch_type(batch_type.into())
            .metadata_hash(hash)
            .metadata(metadata)
            .build()
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Self> {
        let batch = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, batch_type, status, priority, retry_count,
                   items_total, items_processed, items_failed,
                   claimed_by, claim_expires_at, started_at, completed_at,
                   error_message, metadata, metadata_hash, next_visible_at,
                   created_at, updated_at
            FROM batches
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(batch)
    }

    /// Find the active (pending or processing) batch carrying a payload hash.
    pub async fn find_active_by_hash(
        pool: &PgPool,
        batch_type: &str,
        hash: &str,
    ) -> Result<Option<Self>> {
        let batch = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, batch_type, status, priority, retry_count,
                   items_total, items_processed, items_failed,
                   claimed_by, claim_expires_at, started_at, completed_at,
                   error_message, metadata, metadata_hash, next_visible_at,
                   created_at, updated_at
            FROM batches
            WHERE batch_type = $1
              AND metadata_hash = $2
              AND status IN ('pending', 'processing')
            LIMIT 1
            "#,
        )
        .bind(batch_type)
        .bind(hash)
        .fetch_optional(pool)
        .await?;

        Ok(batch)
    }

    /// Enqueue a batch, deduplicating against active batches with the same
    /// payload. A completed or errored batch never blocks a fresh one.
    pub async fn enqueue(
        pool: &PgPool,
        batch_type: &str,
        metadata: serde_json::Value,
    ) -> Result<EnqueueResult> {
        let hash = metadata_hash(&metadata);
        if let Some(existing) = Self::find_active_by_hash(pool, batch_type, &hash).await? {
            return Ok(EnqueueResult::Duplicate(existing.id));
        }

        let batch = Self::new(batch_type, metadata);

        // The partial unique index backstops the check above under races.
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO batches (id, batch_type, status, priority, retry_count, metadata, metadata_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (batch_type, metadata_hash)
                WHERE status IN ('pending', 'processing')
                DO NOTHING
            RETURNING id
            "#,
        )
        .bind(batch.id)
        .bind(&batch.batch_type)
        .bind(batch.status)
        .bind(batch.priority)
        .bind(batch.retry_count)
        .bind(&batch.metadata)
        .bind(&batch.metadata_hash)
        .fetch_optional(pool)
        .await?;

        match inserted {
            Some(id) => Ok(EnqueueResult::Created(id)),
            None => {
                let existing = Self::find_active_by_hash(pool, batch_type, &hash)
                    .await?
                    .ok_or_else(|| anyhow!("active batch vanished during enqueue race"))?;
                Ok(EnqueueResult::Duplicate(existing.id))
            }
        }
    }

    /// Enqueue a typed payload under its declared batch type.
    pub async fn enqueue_payload<P: BatchPayload>(
        pool: &PgPool,
        payload: &P,
    ) -> Result<EnqueueResult> {
        Self::enqueue(pool, P::BATCH_TYPE, payload.to_metadata()?).await
    }

    /// Lease up to `limit` batches atomically using FOR UPDATE SKIP LOCKED.
    ///
    /// Ordering is `retry_count ASC, created_at ASC`: fresh work first, so
    /// previously-failing batches cannot monopolize capacity. Pass a
    /// `batch_type` to restrict the claim to one job kind.
    pub async fn claim(
        pool: &PgPool,
        worker_id: &str,
        limit: i64,
        batch_type: Option<&str>,
    ) -> Result<Vec<Self>> {
        let batches = sqlx::query_as::<_, Self>(
            r#"
            WITH next_batches AS (
                SELECT id
                FROM batches
                WHERE status = 'pending'
                  AND (claim_expires_at IS NULL OR claim_expires_at < NOW())
                  AND (next_visible_at IS NULL OR next_visible_at <= NOW())
                  AND ($3::TEXT IS NULL OR batch_type = $3)
                ORDER BY retry_count ASC, created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE batches
            SET status = 'processing',
                claimed_by = $2,
                claim_expires_at = NOW() + ($4 || ' minutes')::INTERVAL,
                started_at = COALESCE(started_at, NOW()),
                updated_at = NOW()
            WHERE id IN (SELECT id FROM next_batches)
            RETURNING id, batch_type, status, priority, retry_count,
                      items_total, items_processed, items_failed,
                      claimed_by, claim_expires_at, started_at, completed_at,
                      error_message, metadata, metadata_hash, next_visible_at,
                      created_at, updated_at
            "#,
        )
        .bind(limit)
        .bind(worker_id)
        .bind(batch_type)
        .bind(CLAIM_LEASE_MINUTES.to_string())
        .fetch_all(pool)
        .await?;

        Ok(batches)
    }

    /// Count batches currently being processed.
    pub async fn processing_count(pool: &PgPool) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM batches WHERE status = 'processing'",
        )
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Mark a batch successfully completed.
    pub async fn mark_completed(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE batches
            SET status = 'completed',
                completed_at = NOW(),
                items_total = 1,
                items_processed = 1,
                claim_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Return a failed batch to pending with its backoff encoded in
    /// `next_visible_at`.
    pub async fn mark_retry(
        pool: &PgPool,
        id: Uuid,
        retry_count: i32,
        error: &str,
        backoff_ms: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE batches
            SET status = 'pending',
                retry_count = $2,
                error_message = $3,
                claimed_by = NULL,
                claim_expires_at = NULL,
                next_visible_at = NOW() + ($4 || ' milliseconds')::INTERVAL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(retry_count)
        .bind(error)
        .bind(backoff_ms.to_string())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Park a batch in terminal error state after retry exhaustion.
    pub async fn mark_error(pool: &PgPool, id: Uuid, retry_count: i32, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE batches
            SET status = 'error',
                retry_count = $2,
                completed_at = NOW(),
                error_message = $3,
                items_failed = 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(retry_count)
        .bind(error)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Lease recovery: return batches stranded in `processing` to `pending`.
    ///
    /// The expiry cushion exceeds the claim lease so a slow-but-alive worker
    /// is not raced by reclamation.
    pub async fn reset_expired(pool: &PgPool, expiry_minutes: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE batches
            SET status = 'pending',
                claimed_by = NULL,
                claim_expires_at = NULL,
                error_message = COALESCE(error_message || ' | ', '') || 'Batch expired and was reset.',
                updated_at = NOW()
            WHERE status = 'processing'
              AND claim_expires_at < NOW() - ($1 || ' minutes')::INTERVAL
            "#,
        )
        .bind(expiry_minutes.to_string())
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete completed batches older than the retention window.
    pub async fn cleanup(pool: &PgPool, days: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM batches
            WHERE status = 'completed'
              AND completed_at < NOW() - ($1 || ' days')::INTERVAL
            "#,
        )
        .bind(days.to_string())
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Per-type status breakdown, including a pending-for-over-an-hour
    /// bucket the monitor watches.
    pub async fn queue_depths(pool: &PgPool) -> Result<Vec<QueueDepth>> {
        let depths = sqlx::query_as::<_, QueueDepth>(
            r#"
            SELECT batch_type,
                   COUNT(*) FILTER (WHERE status = 'pending')    AS pending,
                   COUNT(*) FILTER (WHERE status = 'processing') AS processing,
                   COUNT(*) FILTER (WHERE status = 'completed')  AS completed,
                   COUNT(*) FILTER (WHERE status = 'error')      AS error,
                   COUNT(*) FILTER (WHERE status = 'pending'
                                      AND created_at < NOW() - INTERVAL '1 hour')
                       AS pending_over_one_hour
            FROM batches
            GROUP BY batch_type
            ORDER BY batch_type
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(depths)
    }
}

/// One row of the per-type queue breakdown.
#[derive(FromRow, Debug, Clone, Serialize)]
pub struct QueueDepth {
    pub batch_type: String,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub error: i64,
    pub pending_over_one_hour: i64,
}

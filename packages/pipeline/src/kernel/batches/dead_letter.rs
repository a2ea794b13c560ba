//! Dead-letter items: batches parked after retry exhaustion.
//!
//! Requeuing creates a fresh pending batch and bumps the item's own
//! counter; the row itself is never deleted. Once the counter reaches
//! `DLQ_MAX_REQUEUES` the item simply stops being selected.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::metadata::metadata_hash;

/// A dead-letter item is requeued at most this many times.
pub const DLQ_MAX_REQUEUES: i32 = 3;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterItem {
    pub id: Uuid,
    /// The original batch_type.
    pub item_type: String,
    pub error_message: Option<String>,
    pub original_batch_id: Option<Uuid>,
    pub original_item_id: Option<Uuid>,
    /// Requeue counter, independent of the batch's retry_count.
    pub retry_count: i32,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeadLetterItem {
    /// Park a failed batch.
    pub async fn insert(
        pool: &PgPool,
        item_type: &str,
        error_message: &str,
        original_batch_id: Uuid,
        metadata: &serde_json::Value,
    ) -> Result<Self> {
        let item = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO dead_letter_items (id, item_type, error_message, original_batch_id, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, item_type, error_message, original_batch_id, original_item_id,
                      retry_count, metadata, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item_type)
        .bind(error_message)
        .bind(original_batch_id)
        .bind(metadata)
        .fetch_one(pool)
        .await?;

        Ok(item)
    }

    /// Count items newer than 24 hours (monitor metric).
    pub async fn count_last_24h(pool: &PgPool) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM dead_letter_items WHERE created_at > NOW() - INTERVAL '24 hours'",
        )
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Requeue up to `limit` items whose counter is under the cap, oldest
    /// first. Each requeue inserts a fresh pending batch carrying the same
    /// `(item_type, metadata)` and increments the item's counter. Returns
    /// the number of items requeued.
    pub async fn requeue(pool: &PgPool, limit: i64) -> Result<u64> {
        let mut tx = pool.begin().await?;

        let candidates = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, item_type, error_message, original_batch_id, original_item_id,
                   retry_count, metadata, created_at, updated_at
            FROM dead_letter_items
            WHERE retry_count < $1
            ORDER BY created_at ASC
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(DLQ_MAX_REQUEUES)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        let mut requeued = 0u64;
        for item in &candidates {
            // The new batch inherits the requeue generation as retry_count
            // so claim fairness deprioritizes repeat offenders. A live
            // duplicate with the same payload suppresses the insert.
            sqlx::query(
                r#"
                INSERT INTO batches (id, batch_type, status, retry_count, metadata, metadata_hash)
                VALUES ($1, $2, 'pending', $3, $4, $5)
                ON CONFLICT (batch_type, metadata_hash)
                    WHERE status IN ('pending', 'processing')
                    DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&item.item_type)
            .bind(item.retry_count + 1)
            .bind(&item.metadata)
            .bind(metadata_hash(&item.metadata))
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE dead_letter_items
                SET retry_count = retry_count + 1,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(item.id)
            .execute(&mut *tx)
            .await?;

            requeued += 1;
        }

        tx.commit().await?;

        if requeued > 0 {
            tracing::info!(count = requeued, "requeued dead-letter items");
        }

        Ok(requeued)
    }
}

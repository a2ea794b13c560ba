//! Integration tests for the maintenance loop: lease recovery, dead-letter
//! requeue, and completed-history cleanup.

mod common;

use common::TestHarness;
use pipeline_core::kernel::batches::{maintenance, Batch, BatchStatus, DeadLetterItem};
use serde_json::json;
use uuid::Uuid;

/// Insert a dead-letter row with a chosen requeue counter.
async fn park_item(ctx: &TestHarness, retry_count: i32, marker: i32) -> Uuid {
    let item = DeadLetterItem::insert(
        &ctx.db_pool,
        "album_page",
        "handler failed",
        Uuid::new_v4(),
        &json!({"artist_id": "A", "offset": marker}),
    )
    .await
    .expect("insert dlq item");

    sqlx::query("UPDATE dead_letter_items SET retry_count = $1 WHERE id = $2")
        .bind(retry_count)
        .bind(item.id)
        .execute(&ctx.db_pool)
        .await
        .expect("set retry_count");

    item.id
}

async fn dlq_retry_count(ctx: &TestHarness, id: Uuid) -> i32 {
    sqlx::query_scalar::<_, i32>("SELECT retry_count FROM dead_letter_items WHERE id = $1")
        .bind(id)
        .fetch_one(&ctx.db_pool)
        .await
        .expect("dlq retry_count")
}

#[tokio::test]
async fn expired_lease_is_reset_to_pending() {
    let ctx = TestHarness::new().await;
    let enqueued = Batch::enqueue(&ctx.db_pool, "album_page", json!({"offset": 0}))
        .await
        .expect("enqueue");

    // Stranded by a crashed worker 31 minutes past its lease.
    sqlx::query(
        "UPDATE batches SET status = 'processing', claimed_by = 'worker-dead', \
         claim_expires_at = NOW() - INTERVAL '31 minutes', \
         started_at = NOW() - INTERVAL '36 minutes' WHERE id = $1",
    )
    .bind(enqueued.batch_id())
    .execute(&ctx.db_pool)
    .await
    .expect("strand batch");

    let summary = maintenance::run(&ctx.db_pool).await.expect("maintenance");
    assert_eq!(summary.expired_reset, 1);

    let row = Batch::find_by_id(&ctx.db_pool, enqueued.batch_id())
        .await
        .expect("batch");
    assert_eq!(row.status, BatchStatus::Pending);
    assert!(row.claimed_by.is_none());
    assert!(row.claim_expires_at.is_none());
    assert!(row
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("Batch expired and was reset."));
}

#[tokio::test]
async fn fresh_lease_is_left_alone() {
    let ctx = TestHarness::new().await;
    let enqueued = Batch::enqueue(&ctx.db_pool, "album_page", json!({"offset": 0}))
        .await
        .expect("enqueue");
    sqlx::query(
        "UPDATE batches SET status = 'processing', claimed_by = 'worker-live', \
         claim_expires_at = NOW() + INTERVAL '4 minutes' WHERE id = $1",
    )
    .bind(enqueued.batch_id())
    .execute(&ctx.db_pool)
    .await
    .expect("claim batch");

    let summary = maintenance::run(&ctx.db_pool).await.expect("maintenance");
    assert_eq!(summary.expired_reset, 0);

    let row = Batch::find_by_id(&ctx.db_pool, enqueued.batch_id())
        .await
        .expect("batch");
    assert_eq!(row.status, BatchStatus::Processing);
}

#[tokio::test]
async fn requeue_respects_the_dlq_counter_cap() {
    let ctx = TestHarness::new().await;
    let fresh_0 = park_item(&ctx, 0, 0).await;
    let fresh_1 = park_item(&ctx, 1, 1).await;
    let fresh_2 = park_item(&ctx, 2, 2).await;
    let exhausted = park_item(&ctx, 3, 3).await;

    let requeued = DeadLetterItem::requeue(&ctx.db_pool, 100)
        .await
        .expect("requeue");
    assert_eq!(requeued, 3);

    let pending = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM batches WHERE status = 'pending'",
    )
    .fetch_one(&ctx.db_pool)
    .await
    .expect("count");
    assert_eq!(pending, 3);

    assert_eq!(dlq_retry_count(&ctx, fresh_0).await, 1);
    assert_eq!(dlq_retry_count(&ctx, fresh_1).await, 2);
    assert_eq!(dlq_retry_count(&ctx, fresh_2).await, 3);
    assert_eq!(dlq_retry_count(&ctx, exhausted).await, 3);

    // Requeuing never deletes the parked rows.
    let dlq_total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM dead_letter_items")
        .fetch_one(&ctx.db_pool)
        .await
        .expect("count");
    assert_eq!(dlq_total, 4);
}

#[tokio::test]
async fn requeued_batch_carries_payload_and_generation() {
    let ctx = TestHarness::new().await;
    park_item(&ctx, 1, 7).await;

    DeadLetterItem::requeue(&ctx.db_pool, 100)
        .await
        .expect("requeue");

    let batch = sqlx::query_as::<_, Batch>(
        "SELECT id, batch_type, status, priority, retry_count, items_total, items_processed, \
         items_failed, claimed_by, claim_expires_at, started_at, completed_at, error_message, \
         metadata, metadata_hash, next_visible_at, created_at, updated_at \
         FROM batches WHERE status = 'pending'",
    )
    .fetch_one(&ctx.db_pool)
    .await
    .expect("requeued batch");

    assert_eq!(batch.batch_type, "album_page");
    assert_eq!(batch.metadata, json!({"artist_id": "A", "offset": 7}));
    assert_eq!(batch.retry_count, 2);
}

#[tokio::test]
async fn cleanup_deletes_only_old_completed_batches() {
    let ctx = TestHarness::new().await;

    let old = Batch::enqueue(&ctx.db_pool, "album_page", json!({"offset": 0}))
        .await
        .expect("enqueue");
    sqlx::query(
        "UPDATE batches SET status = 'completed', completed_at = NOW() - INTERVAL '8 days' \
         WHERE id = $1",
    )
    .bind(old.batch_id())
    .execute(&ctx.db_pool)
    .await
    .expect("age batch");

    let recent = Batch::enqueue(&ctx.db_pool, "album_page", json!({"offset": 1}))
        .await
        .expect("enqueue");
    Batch::mark_completed(&ctx.db_pool, recent.batch_id())
        .await
        .expect("complete");

    let errored = Batch::enqueue(&ctx.db_pool, "album_page", json!({"offset": 2}))
        .await
        .expect("enqueue");
    sqlx::query(
        "UPDATE batches SET status = 'error', completed_at = NOW() - INTERVAL '30 days' \
         WHERE id = $1",
    )
    .bind(errored.batch_id())
    .execute(&ctx.db_pool)
    .await
    .expect("age error batch");

    let summary = maintenance::run(&ctx.db_pool).await.expect("maintenance");
    assert_eq!(summary.completed_cleaned, 1);

    let remaining = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM batches")
        .fetch_one(&ctx.db_pool)
        .await
        .expect("count");
    // The recent completed batch and the error batch survive.
    assert_eq!(remaining, 2);
}

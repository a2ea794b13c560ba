//! Integration tests for the health monitor: metrics, alert thresholds,
//! and the stalled-batch auto-remediation.

mod common;

use std::sync::Arc;

use common::TestHarness;
use pipeline_core::kernel::batches::{AlertLevel, Batch, LogAlertSink, Monitor, RateLimit};
use serde_json::json;

fn monitor_for(ctx: &TestHarness) -> Monitor {
    Monitor::new(ctx.db_pool.clone(), Arc::new(LogAlertSink))
}

/// Strand `count` batches in processing for 40 minutes.
async fn strand_batches(ctx: &TestHarness, count: i32) {
    for i in 0..count {
        let enqueued = Batch::enqueue(&ctx.db_pool, "album_page", json!({"offset": i}))
            .await
            .expect("enqueue");
        sqlx::query(
            "UPDATE batches SET status = 'processing', claimed_by = 'worker-dead', \
             started_at = NOW() - INTERVAL '40 minutes', \
             claim_expires_at = NOW() - INTERVAL '35 minutes' WHERE id = $1",
        )
        .bind(enqueued.batch_id())
        .execute(&ctx.db_pool)
        .await
        .expect("strand");
    }
}

#[tokio::test]
async fn clean_store_reports_no_alerts() {
    let ctx = TestHarness::new().await;
    let report = monitor_for(&ctx).run().await.expect("monitor");

    assert!(report.alerts.is_empty());
    assert!(report.actions.is_empty());
    assert!(!report.alert_sent.sent);
    assert_eq!(report.alert_sent.reason.as_deref(), Some("no alerts"));
    assert_eq!(report.metrics.stalled_batches, 0);
}

#[tokio::test]
async fn stalled_batches_trigger_critical_alert_and_remediation() {
    let ctx = TestHarness::new().await;
    strand_batches(&ctx, 7).await;

    let report = monitor_for(&ctx).run().await.expect("monitor");

    let criticals: Vec<_> = report
        .alerts
        .iter()
        .filter(|a| a.level == AlertLevel::Critical)
        .collect();
    assert_eq!(criticals.len(), 1);
    assert_eq!(criticals[0].metric, "stalled_batches");
    assert_eq!(report.metrics.stalled_batches, 7);

    assert_eq!(report.actions.len(), 1);
    assert_eq!(report.actions[0].action, "reset_stalled_batches");
    assert_eq!(report.actions[0].count, 7);

    assert!(report.alert_sent.sent);
    assert_eq!(report.alert_sent.count, Some(1));

    // Remediation returned every stranded batch to pending.
    let stalled_after = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM batches WHERE status = 'processing' \
         AND started_at < NOW() - INTERVAL '30 minutes'",
    )
    .fetch_one(&ctx.db_pool)
    .await
    .expect("count");
    assert_eq!(stalled_after, 0);
}

#[tokio::test]
async fn few_stalled_batches_stay_below_the_critical_threshold() {
    let ctx = TestHarness::new().await;
    strand_batches(&ctx, 4).await;

    let report = monitor_for(&ctx).run().await.expect("monitor");

    assert!(report.alerts.is_empty());
    // No critical alert means no remediation, even though work is stalled.
    assert!(report.actions.is_empty());
    assert_eq!(report.metrics.stalled_batches, 4);
}

#[tokio::test]
async fn exhausted_rate_limit_raises_scoped_warning() {
    let ctx = TestHarness::new().await;
    RateLimit::track(&ctx.db_pool, "discogs", "search", 5, 60, None, None)
        .await
        .expect("track");

    let report = monitor_for(&ctx).run().await.expect("monitor");

    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].level, AlertLevel::Warning);
    assert_eq!(report.alerts[0].api.as_deref(), Some("discogs"));
    assert_eq!(report.alerts[0].endpoint.as_deref(), Some("search"));
    assert!(report.actions.is_empty());

    let status = &report.metrics.rate_limits[0];
    assert_eq!(status.requests_remaining, 5);
    assert!((status.remaining_percent - 8.33).abs() < 0.1);
}

#[tokio::test]
async fn error_batches_surface_in_metrics_and_alerts() {
    let ctx = TestHarness::new().await;
    for i in 0..21 {
        let enqueued = Batch::enqueue(&ctx.db_pool, "track_page", json!({"offset": i}))
            .await
            .expect("enqueue");
        Batch::mark_error(&ctx.db_pool, enqueued.batch_id(), 5, "exhausted")
            .await
            .expect("mark error");
    }

    let report = monitor_for(&ctx).run().await.expect("monitor");

    assert_eq!(report.metrics.error_batches_24h, 21);
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].metric, "error_batches_24h");

    let depth = report
        .metrics
        .queue_depths
        .iter()
        .find(|d| d.batch_type == "track_page")
        .expect("depth row");
    assert_eq!(depth.error, 21);
}

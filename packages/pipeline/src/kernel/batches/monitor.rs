//! Health monitor: samples queue metrics, raises alerts by threshold, and
//! auto-remediates critical stalls.
//!
//! The alert sink is pluggable; the default only logs. Remediation is
//! deliberately narrow: the sole automatic action is resetting stranded
//! leases, and only when a critical alert is present.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, warn};

use super::batch::{Batch, QueueDepth};
use super::dead_letter::DeadLetterItem;
use super::maintenance::LEASE_EXPIRY_MINUTES;
use super::rate_limit::RateLimit;

/// Warning when more than this many items hit the DLQ in 24h.
const DEAD_LETTER_24H_WARNING: i64 = 10;
/// Warning when more than this many batches errored in 24h.
const ERROR_BATCHES_24H_WARNING: i64 = 20;
/// Critical when more than this many batches have been processing too long.
const STALLED_BATCHES_CRITICAL: i64 = 5;
/// A batch still processing after this long counts as stalled.
const STALLED_AFTER_MINUTES: i64 = 30;
/// Warning when an API's remaining budget drops below this percentage.
const RATE_REMAINING_WARNING_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    pub metric: String,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub api_name: String,
    pub endpoint: String,
    pub requests_remaining: i32,
    pub requests_limit: i32,
    pub remaining_percent: f64,
    pub reset_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthMetrics {
    pub dead_letter_items_24h: i64,
    pub error_batches_24h: i64,
    pub stalled_batches: i64,
    pub queue_depths: Vec<QueueDepth>,
    pub rate_limits: Vec<RateLimitStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemediationAction {
    pub action: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertDispatch {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub alerts: Vec<Alert>,
    pub metrics: HealthMetrics,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<RemediationAction>,
    pub alert_sent: AlertDispatch,
}

/// Destination for raised alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alerts: &[Alert]) -> Result<()>;
}

/// Default sink: structured logs only.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, alerts: &[Alert]) -> Result<()> {
        for alert in alerts {
            match alert.level {
                AlertLevel::Warning => {
                    warn!(metric = %alert.metric, threshold = alert.threshold, "{}", alert.message)
                }
                AlertLevel::Critical => {
                    error!(metric = %alert.metric, threshold = alert.threshold, "{}", alert.message)
                }
            }
        }
        Ok(())
    }
}

/// Evaluate alert thresholds over one metrics sample.
pub fn evaluate_alerts(metrics: &HealthMetrics) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if metrics.dead_letter_items_24h > DEAD_LETTER_24H_WARNING {
        alerts.push(Alert {
            level: AlertLevel::Warning,
            message: format!(
                "{} items entered the dead-letter queue in the last 24h",
                metrics.dead_letter_items_24h
            ),
            metric: "dead_letter_items_24h".into(),
            threshold: DEAD_LETTER_24H_WARNING as f64,
            api: None,
            endpoint: None,
        });
    }

    if metrics.error_batches_24h > ERROR_BATCHES_24H_WARNING {
        alerts.push(Alert {
            level: AlertLevel::Warning,
            message: format!(
                "{} batches errored in the last 24h",
                metrics.error_batches_24h
            ),
            metric: "error_batches_24h".into(),
            threshold: ERROR_BATCHES_24H_WARNING as f64,
            api: None,
            endpoint: None,
        });
    }

    if metrics.stalled_batches > STALLED_BATCHES_CRITICAL {
        alerts.push(Alert {
            level: AlertLevel::Critical,
            message: format!(
                "{} batches stuck processing for over {} minutes",
                metrics.stalled_batches, STALLED_AFTER_MINUTES
            ),
            metric: "stalled_batches".into(),
            threshold: STALLED_BATCHES_CRITICAL as f64,
            api: None,
            endpoint: None,
        });
    }

    for limit in &metrics.rate_limits {
        if limit.remaining_percent < RATE_REMAINING_WARNING_PERCENT {
            alerts.push(Alert {
                level: AlertLevel::Warning,
                message: format!(
                    "{}/{} has {:.0}% of its rate limit remaining",
                    limit.api_name, limit.endpoint, limit.remaining_percent
                ),
                metric: "rate_limit_remaining_percent".into(),
                threshold: RATE_REMAINING_WARNING_PERCENT,
                api: Some(limit.api_name.clone()),
                endpoint: Some(limit.endpoint.clone()),
            });
        }
    }

    alerts
}

pub struct Monitor {
    pool: PgPool,
    sink: Arc<dyn AlertSink>,
}

impl Monitor {
    pub fn new(pool: PgPool, sink: Arc<dyn AlertSink>) -> Self {
        Self { pool, sink }
    }

    async fn sample_metrics(&self) -> Result<HealthMetrics> {
        let dead_letter_items_24h = DeadLetterItem::count_last_24h(&self.pool).await?;

        let error_batches_24h = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM batches
            WHERE status = 'error'
              AND updated_at > NOW() - INTERVAL '24 hours'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let stalled_batches = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM batches
            WHERE status = 'processing'
              AND started_at < NOW() - ($1 || ' minutes')::INTERVAL
            "#,
        )
        .bind(STALLED_AFTER_MINUTES.to_string())
        .fetch_one(&self.pool)
        .await?;

        let queue_depths = Batch::queue_depths(&self.pool).await?;

        let rate_limits = RateLimit::all(&self.pool)
            .await?
            .into_iter()
            .map(|row| RateLimitStatus {
                remaining_percent: row.remaining_percent(),
                api_name: row.api_name,
                endpoint: row.endpoint,
                requests_remaining: row.requests_remaining,
                requests_limit: row.requests_limit,
                reset_at: row.reset_at,
            })
            .collect();

        Ok(HealthMetrics {
            dead_letter_items_24h,
            error_batches_24h,
            stalled_batches,
            queue_depths,
            rate_limits,
        })
    }

    /// Assemble one health report: metrics, alerts, remediation, dispatch.
    pub async fn run(&self) -> Result<HealthReport> {
        let metrics = self.sample_metrics().await?;
        let alerts = evaluate_alerts(&metrics);

        let mut actions = Vec::new();
        let has_critical = alerts.iter().any(|a| a.level == AlertLevel::Critical);
        if has_critical && metrics.stalled_batches > 0 {
            let count = Batch::reset_expired(&self.pool, LEASE_EXPIRY_MINUTES).await?;
            warn!(count, "auto-remediation reset stalled batches");
            actions.push(RemediationAction {
                action: "reset_stalled_batches".into(),
                count,
            });
        }

        let alert_sent = if alerts.is_empty() {
            AlertDispatch {
                sent: false,
                count: None,
                reason: Some("no alerts".into()),
                timestamp: None,
            }
        } else {
            match self.sink.send(&alerts).await {
                Ok(()) => AlertDispatch {
                    sent: true,
                    count: Some(alerts.len()),
                    reason: None,
                    timestamp: Some(Utc::now()),
                },
                Err(e) => AlertDispatch {
                    sent: false,
                    count: None,
                    reason: Some(e.to_string()),
                    timestamp: None,
                },
            }
        };

        Ok(HealthReport {
            timestamp: Utc::now(),
            alerts,
            metrics,
            actions,
            alert_sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_metrics() -> HealthMetrics {
        HealthMetrics {
            dead_letter_items_24h: 0,
            error_batches_24h: 0,
            stalled_batches: 0,
            queue_depths: vec![],
            rate_limits: vec![],
        }
    }

    #[test]
    fn clean_metrics_raise_no_alerts() {
        assert!(evaluate_alerts(&clean_metrics()).is_empty());
    }

    #[test]
    fn dead_letter_threshold_is_exclusive() {
        let mut metrics = clean_metrics();
        metrics.dead_letter_items_24h = 10;
        assert!(evaluate_alerts(&metrics).is_empty());

        metrics.dead_letter_items_24h = 11;
        let alerts = evaluate_alerts(&metrics);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
        assert_eq!(alerts[0].metric, "dead_letter_items_24h");
    }

    #[test]
    fn stalled_batches_go_critical_above_5() {
        let mut metrics = clean_metrics();
        metrics.stalled_batches = 7;
        let alerts = evaluate_alerts(&metrics);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Critical);
    }

    #[test]
    fn low_rate_limit_budget_warns_per_endpoint() {
        let mut metrics = clean_metrics();
        metrics.rate_limits = vec![RateLimitStatus {
            api_name: "discogs".into(),
            endpoint: "search".into(),
            requests_remaining: 5,
            requests_limit: 60,
            remaining_percent: 8.3,
            reset_at: None,
        }];

        let alerts = evaluate_alerts(&metrics);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].api.as_deref(), Some("discogs"));
        assert_eq!(alerts[0].endpoint.as_deref(), Some("search"));
    }

    #[test]
    fn error_batches_warn_above_20() {
        let mut metrics = clean_metrics();
        metrics.error_batches_24h = 21;
        let alerts = evaluate_alerts(&metrics);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric, "error_batches_24h");
    }
}

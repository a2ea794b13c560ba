//! The durable batch queue: model, claim protocol, retry/DLQ policy,
//! rate-limit gate, and the periodic control-plane components built on top.

mod batch;
mod dead_letter;
pub mod maintenance;
mod metadata;
pub mod monitor;
mod rate_limit;
mod registry;
pub mod scheduler;
mod worker;

pub use batch::{Batch, BatchStatus, EnqueueResult, QueueDepth, CLAIM_LEASE_MINUTES};
pub use dead_letter::{DeadLetterItem, DLQ_MAX_REQUEUES};
pub use maintenance::MaintenanceSummary;
pub use metadata::{canonical_json, metadata_hash, BatchPayload};
pub use monitor::{Alert, AlertLevel, AlertSink, HealthReport, LogAlertSink, Monitor};
pub use rate_limit::{RateLimit, RateLimitGate};
pub use registry::HandlerRegistry;
pub use scheduler::{Scheduler, SchedulerTick};
pub use worker::{TickSummary, Worker, MAX_CONCURRENT_JOBS};

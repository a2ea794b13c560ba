//! Kernel-level infrastructure: the batch queue engine and its
//! collaborators.
//!
//! ```text
//! Scheduler tick ──► Invoker ──► POST /worker, /maintenance, /monitor, ...
//!
//! Worker tick
//!     │
//!     ├─► Batch::claim (FOR UPDATE SKIP LOCKED)
//!     ├─► HandlerRegistry::execute (deserialize + call handler)
//!     └─► mark completed / retry with backoff / dead-letter
//!
//! Maintenance tick: reset expired leases → requeue DLQ → clean history
//! Monitor tick: sample metrics → alerts → targeted remediation
//! ```
//!
//! Business logic lives in `domains`; this module only moves batches.

pub mod batches;
pub mod deps;
pub mod invoker;

pub use deps::PipelineDeps;
pub use invoker::Invoker;

//! Durable batch-processing pipeline for music-metadata enrichment.
//!
//! A producer seeds units of work into a Postgres-backed queue; stateless
//! workers atomically lease, execute, and complete them. Failures retry with
//! exponential backoff and park in a dead-letter table on exhaustion, from
//! which a maintenance loop periodically requeues candidates. A monitor
//! samples health metrics and resets stranded leases when things go
//! critical.
//!
//! Modules:
//! - [`kernel`] — the queue engine: batch store, rate-limit gate, handler
//!   registry, worker dispatcher, maintenance, scheduler, monitor.
//! - [`domains`] — the music-catalog models and the ingestion handlers that
//!   chain Spotify, Genius, and Discogs lookups.
//! - [`server`] — the axum control surface every component is invoked
//!   through.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::Config;

//! Business domains: the music catalog and the ingestion handlers that
//! populate it. The queue engine in `kernel` knows nothing about these.

pub mod catalog;
pub mod ingestion;

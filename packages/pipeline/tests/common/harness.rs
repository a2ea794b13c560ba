//! Test harness with testcontainers for integration testing.
//!
//! The Postgres container is started once and shared across every test in
//! the binary; migrations run once. Each `TestHarness::new()` truncates all
//! tables so tests stay independent.

use std::sync::Arc;

use anyhow::{Context, Result};
use pipeline_core::kernel::batches::HandlerRegistry;
use pipeline_core::kernel::PipelineDeps;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let host = postgres.get_host().await?;
        let port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

pub struct TestHarness {
    pub db_pool: PgPool,
    pub deps: Arc<PipelineDeps>,
}

impl TestHarness {
    /// Fresh harness over the shared container with empty tables.
    pub async fn new() -> Self {
        let infra = SharedTestInfra::get().await;
        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::query(
            "TRUNCATE batches, dead_letter_items, rate_limits, \
             track_producers, producers, tracks, albums, artists CASCADE",
        )
        .execute(&db_pool)
        .await
        .expect("Failed to truncate tables");

        let deps = Arc::new(PipelineDeps::for_tests(db_pool.clone()));
        Self { db_pool, deps }
    }

    /// Registry whose handler for `batch_type` always succeeds.
    pub fn succeeding_registry(batch_type: &'static str) -> Arc<HandlerRegistry> {
        let mut registry = HandlerRegistry::new();
        registry.register::<serde_json::Value, _, _>(batch_type, |_, _| async { Ok(()) });
        Arc::new(registry)
    }

    /// Registry whose handler for `batch_type` always fails.
    pub fn failing_registry(batch_type: &'static str, message: &'static str) -> Arc<HandlerRegistry> {
        let mut registry = HandlerRegistry::new();
        registry.register::<serde_json::Value, _, _>(batch_type, move |_, _| async move {
            anyhow::bail!(message)
        });
        Arc::new(registry)
    }

    /// Clear retry backoff so the next claim sees everything pending.
    pub async fn make_all_visible(&self) {
        sqlx::query("UPDATE batches SET next_visible_at = NULL")
            .execute(&self.db_pool)
            .await
            .expect("Failed to clear next_visible_at");
    }
}

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::super::normalize_producer_name;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub id: Uuid,
    pub name: String,
    /// Natural key: see `normalize_producer_name`.
    pub normalized_name: String,
    pub genius_id: Option<i64>,
    pub discogs_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Producer {
    /// Upsert by normalized name, merging source IDs from either side.
    ///
    /// The display name of an existing row is kept; Genius and Discogs
    /// credit the same person with different casings and either may arrive
    /// first.
    pub async fn upsert(
        pool: &PgPool,
        name: &str,
        genius_id: Option<i64>,
        discogs_id: Option<i64>,
    ) -> Result<Self> {
        let normalized = normalize_producer_name(name);

        let producer = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO producers (id, name, normalized_name, genius_id, discogs_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (normalized_name) DO UPDATE SET
                genius_id = COALESCE(producers.genius_id, EXCLUDED.genius_id),
                discogs_id = COALESCE(producers.discogs_id, EXCLUDED.discogs_id),
                updated_at = NOW()
            RETURNING id, name, normalized_name, genius_id, discogs_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name.trim())
        .bind(&normalized)
        .bind(genius_id)
        .bind(discogs_id)
        .fetch_one(pool)
        .await?;

        Ok(producer)
    }

    /// Record a producer credit on a track. Idempotent per source.
    pub async fn link_track(
        pool: &PgPool,
        track_id: Uuid,
        producer_id: Uuid,
        source: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO track_producers (track_id, producer_id, source)
            VALUES ($1, $2, $3)
            ON CONFLICT (track_id, producer_id, source) DO NOTHING
            "#,
        )
        .bind(track_id)
        .bind(producer_id)
        .bind(source)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Producers credited on a track, across all sources.
    pub async fn for_track(pool: &PgPool, track_id: Uuid) -> Result<Vec<Self>> {
        let producers = sqlx::query_as::<_, Self>(
            r#"
            SELECT DISTINCT p.id, p.name, p.normalized_name, p.genius_id, p.discogs_id,
                   p.created_at, p.updated_at
            FROM producers p
            JOIN track_producers tp ON tp.producer_id = p.id
            WHERE tp.track_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(track_id)
        .fetch_all(pool)
        .await?;

        Ok(producers)
    }
}

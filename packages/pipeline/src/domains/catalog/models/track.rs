use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: Uuid,
    pub spotify_id: String,
    pub album_id: Uuid,
    pub name: String,
    pub disc_number: i32,
    pub track_number: i32,
    pub duration_ms: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Track {
    /// Upsert by Spotify ID.
    pub async fn upsert(
        pool: &PgPool,
        spotify_id: &str,
        album_id: Uuid,
        name: &str,
        disc_number: i32,
        track_number: i32,
        duration_ms: i64,
    ) -> Result<Self> {
        let track = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO tracks (id, spotify_id, album_id, name, disc_number, track_number, duration_ms)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (spotify_id) DO UPDATE SET
                album_id = EXCLUDED.album_id,
                name = EXCLUDED.name,
                disc_number = EXCLUDED.disc_number,
                track_number = EXCLUDED.track_number,
                duration_ms = EXCLUDED.duration_ms,
                updated_at = NOW()
            RETURNING id, spotify_id, album_id, name, disc_number, track_number, duration_ms,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(spotify_id)
        .bind(album_id)
        .bind(name)
        .bind(disc_number)
        .bind(track_number)
        .bind(duration_ms)
        .fetch_one(pool)
        .await?;

        Ok(track)
    }

    pub async fn find_by_spotify_id(pool: &PgPool, spotify_id: &str) -> Result<Option<Self>> {
        let track = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, spotify_id, album_id, name, disc_number, track_number, duration_ms,
                   created_at, updated_at
            FROM tracks
            WHERE spotify_id = $1
            "#,
        )
        .bind(spotify_id)
        .fetch_optional(pool)
        .await?;

        Ok(track)
    }
}

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: Uuid,
    pub spotify_id: String,
    pub artist_id: Uuid,
    pub name: String,
    pub album_type: String,
    pub release_date: Option<String>,
    pub total_tracks: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Album {
    /// Upsert by Spotify ID.
    pub async fn upsert(
        pool: &PgPool,
        spotify_id: &str,
        artist_id: Uuid,
        name: &str,
        album_type: &str,
        release_date: Option<&str>,
        total_tracks: Option<i32>,
    ) -> Result<Self> {
        let album = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO albums (id, spotify_id, artist_id, name, album_type, release_date, total_tracks)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (spotify_id) DO UPDATE SET
                artist_id = EXCLUDED.artist_id,
                name = EXCLUDED.name,
                album_type = EXCLUDED.album_type,
                release_date = EXCLUDED.release_date,
                total_tracks = EXCLUDED.total_tracks,
                updated_at = NOW()
            RETURNING id, spotify_id, artist_id, name, album_type, release_date, total_tracks,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(spotify_id)
        .bind(artist_id)
        .bind(name)
        .bind(album_type)
        .bind(release_date)
        .bind(total_tracks)
        .fetch_one(pool)
        .await?;

        Ok(album)
    }

    pub async fn find_by_spotify_id(pool: &PgPool, spotify_id: &str) -> Result<Option<Self>> {
        let album = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, spotify_id, artist_id, name, album_type, release_date, total_tracks,
                   created_at, updated_at
            FROM albums
            WHERE spotify_id = $1
            "#,
        )
        .bind(spotify_id)
        .fetch_optional(pool)
        .await?;

        Ok(album)
    }
}

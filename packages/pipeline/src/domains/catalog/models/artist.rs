use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: Uuid,
    pub spotify_id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub popularity: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artist {
    /// Upsert by Spotify ID.
    pub async fn upsert(
        pool: &PgPool,
        spotify_id: &str,
        name: &str,
        genres: &[String],
        popularity: Option<i32>,
    ) -> Result<Self> {
        let artist = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO artists (id, spotify_id, name, genres, popularity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (spotify_id) DO UPDATE SET
                name = EXCLUDED.name,
                genres = EXCLUDED.genres,
                popularity = EXCLUDED.popularity,
                updated_at = NOW()
            RETURNING id, spotify_id, name, genres, popularity, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(spotify_id)
        .bind(name)
        .bind(genres)
        .bind(popularity)
        .fetch_one(pool)
        .await?;

        Ok(artist)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Self> {
        let artist = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, spotify_id, name, genres, popularity, created_at, updated_at
            FROM artists
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(artist)
    }

    pub async fn find_by_spotify_id(pool: &PgPool, spotify_id: &str) -> Result<Option<Self>> {
        let artist = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, spotify_id, name, genres, popularity, created_at, updated_at
            FROM artists
            WHERE spotify_id = $1
            "#,
        )
        .bind(spotify_id)
        .fetch_optional(pool)
        .await?;

        Ok(artist)
    }
}

use serde::Deserialize;

/// Genius wraps every payload in `{meta, response}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub response: T,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
pub struct Hit {
    pub result: SongSummary,
}

#[derive(Debug, Deserialize)]
pub struct SongSummary {
    pub id: i64,
    pub title: String,
    pub primary_artist: GeniusArtist,
}

#[derive(Debug, Deserialize)]
pub struct SongResponse {
    pub song: Song,
}

#[derive(Debug, Deserialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub producer_artists: Vec<GeniusArtist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeniusArtist {
    pub id: i64,
    pub name: String,
}

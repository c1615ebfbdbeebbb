//! Local cache of the USDB song list
//!
//! Only songs newer than the newest cached one are requested, so a refresh
//! costs a single page in the common case.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{MetadataFetcher, UsdbSong};
use crate::library::SongId;

pub struct SongListCache {
    path: PathBuf,
}

impl SongListCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cached songs; a missing or unreadable cache counts as empty
    pub async fn load(&self) -> Vec<UsdbSong> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                debug!("No song list cache at {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring invalid song list cache {}: {}", self.path.display(), e);
            Vec::new()
        })
    }

    async fn save(&self, songs: &[UsdbSong]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create song list directory")?;
        }
        let content = serde_json::to_string(songs).context("Failed to serialize song list")?;
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .context("Failed to write song list")?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .context("Failed to replace song list")?;
        Ok(())
    }

    /// Fetch songs added since the last refresh and store the merged list
    ///
    /// With `reload` the cache is dropped and the full list is fetched.
    pub async fn refresh(&self, usdb: &dyn MetadataFetcher, reload: bool) -> Result<Vec<UsdbSong>> {
        let cached = if reload { Vec::new() } else { self.load().await };
        let max_skip_id = cached
            .iter()
            .map(|song| song.song_id)
            .max()
            .unwrap_or(SongId::new(0));

        let mut songs = usdb
            .available_songs(max_skip_id)
            .await
            .context("Failed to fetch song list from USDB")?;
        songs.extend(cached);
        songs.sort_by(|a, b| b.song_id.cmp(&a.song_id));
        songs.dedup_by_key(|song| song.song_id);

        self.save(&songs).await?;
        Ok(songs)
    }
}

/// Songs whose artist or title contains `query`, ignoring case
pub fn search<'a>(songs: &'a [UsdbSong], query: &str) -> impl Iterator<Item = &'a UsdbSong> {
    let query = query.to_lowercase();
    songs.iter().filter(move |song| {
        song.artist.to_lowercase().contains(&query) || song.title.to_lowercase().contains(&query)
    })
}

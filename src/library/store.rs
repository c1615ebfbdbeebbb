//! Persistent song library
//!
//! The library is a single JSON document. Every change is applied as one
//! batch: the new document is written next to the old one and renamed over
//! it, so readers never observe a partially applied batch.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Song, SongId};

const LIBRARY_VERSION: u32 = 1;

/// A single change to the library
#[derive(Debug, Clone)]
pub enum LibraryOp {
    Upsert(Song),
    Delete(SongId),
}

/// Storage of songs and their sync records
#[async_trait]
pub trait LibraryStore: Send + Sync {
    async fn get(&self, song_id: SongId) -> Result<Option<Song>>;

    async fn all(&self) -> Result<Vec<Song>>;

    /// Apply all operations atomically
    async fn apply(&self, ops: Vec<LibraryOp>) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LibraryFile {
    version: u32,
    songs: Vec<Song>,
}

/// Library persisted as a JSON file
pub struct JsonLibraryStore {
    path: PathBuf,
    songs: Mutex<BTreeMap<SongId, Song>>,
}

impl JsonLibraryStore {
    /// Open the library at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let songs = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read library {}", path.display()))?;
            let file: LibraryFile = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse library {}", path.display()))?;
            for record in file.songs.iter().filter_map(|s| s.sync_meta.as_ref()) {
                record
                    .check_version()
                    .with_context(|| format!("Library {} has an unsupported song", path.display()))?;
            }
            debug!("Loaded {} songs from {}", file.songs.len(), path.display());
            file.songs.into_iter().map(|s| (s.song_id, s)).collect()
        } else {
            debug!("No library found at {}, starting empty", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path,
            songs: Mutex::new(songs),
        })
    }

    async fn persist(&self, songs: &BTreeMap<SongId, Song>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create library directory")?;
        }
        let file = LibraryFile {
            version: LIBRARY_VERSION,
            songs: songs.values().cloned().collect(),
        };
        let content = serde_json::to_string_pretty(&file).context("Failed to serialize library")?;

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .context("Failed to write library")?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .context("Failed to replace library")?;
        Ok(())
    }
}

#[async_trait]
impl LibraryStore for JsonLibraryStore {
    async fn get(&self, song_id: SongId) -> Result<Option<Song>> {
        Ok(self.songs.lock().await.get(&song_id).cloned())
    }

    async fn all(&self) -> Result<Vec<Song>> {
        Ok(self.songs.lock().await.values().cloned().collect())
    }

    async fn apply(&self, ops: Vec<LibraryOp>) -> Result<()> {
        let mut songs = self.songs.lock().await;
        let mut updated = songs.clone();
        for op in ops {
            match op {
                LibraryOp::Upsert(song) => {
                    updated.insert(song.song_id, song);
                }
                LibraryOp::Delete(song_id) => {
                    updated.remove(&song_id);
                }
            }
        }
        self.persist(&updated).await?;
        *songs = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::sync_record::SYNC_RECORD_VERSION;
    use crate::library::{SyncMetaId, SyncRecord};

    #[tokio::test]
    async fn test_upsert_and_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("library.json");
        let store = JsonLibraryStore::open(&path).unwrap();

        let mut song = Song::new(SongId::new(7));
        song.artist = "Queen".to_string();
        store.apply(vec![LibraryOp::Upsert(song.clone())]).await.unwrap();

        let reopened = JsonLibraryStore::open(&path).unwrap();
        assert_eq!(reopened.get(SongId::new(7)).await.unwrap(), Some(song));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_batch_applies_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let store = JsonLibraryStore::open(temp.path().join("library.json")).unwrap();

        store
            .apply(vec![
                LibraryOp::Upsert(Song::new(SongId::new(1))),
                LibraryOp::Upsert(Song::new(SongId::new(2))),
                LibraryOp::Delete(SongId::new(1)),
            ])
            .await
            .unwrap();

        let ids: Vec<_> = store.all().await.unwrap().iter().map(|s| s.song_id).collect();
        assert_eq!(ids, vec![SongId::new(2)]);
    }

    #[tokio::test]
    async fn test_open_rejects_future_sync_record() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("library.json");
        let mut song = Song::new(SongId::new(8));
        let mut record = SyncRecord::new(SyncMetaId::new(), song.song_id, temp.path(), Default::default());
        record.version = SYNC_RECORD_VERSION + 1;
        song.sync_meta = Some(record);
        JsonLibraryStore::open(&path)
            .unwrap()
            .apply(vec![LibraryOp::Upsert(song)])
            .await
            .unwrap();

        assert!(JsonLibraryStore::open(&path).is_err());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_untouched() {
        let temp = tempfile::tempdir().unwrap();
        // A directory in place of the target file makes the final rename fail
        let path = temp.path().join("library.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();
        let store = JsonLibraryStore {
            path,
            songs: Mutex::new(BTreeMap::new()),
        };

        let result = store.apply(vec![LibraryOp::Upsert(Song::new(SongId::new(3)))]).await;

        assert!(result.is_err());
        assert!(store.all().await.unwrap().is_empty());
    }
}

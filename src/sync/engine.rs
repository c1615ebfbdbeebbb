//! Parallel download of many songs

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::loader::{RunOutcome, SongLoader};
use crate::events::SongEvent;
use crate::library::{DownloadStatus, Song};

/// Tally of finished runs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncResult {
    pub done: usize,
    pub failed: usize,
    pub deleted: usize,
}

impl SyncResult {
    fn record(&mut self, outcome: RunOutcome) {
        match outcome {
            RunOutcome::Done => self.done += 1,
            RunOutcome::Failed => self.failed += 1,
            RunOutcome::Deleted => self.deleted += 1,
        }
    }
}

/// Runs song loaders with bounded parallelism
pub struct SyncEngine {
    loader: Arc<SongLoader>,
    parallel: usize,
}

impl SyncEngine {
    pub fn new(loader: SongLoader, parallel: usize) -> Self {
        Self {
            loader: Arc::new(loader),
            parallel: parallel.max(1),
        }
    }

    pub fn loader(&self) -> &SongLoader {
        &self.loader
    }

    /// Download all songs that are not already in flight
    pub async fn download_songs(&self, songs: Vec<Song>) -> SyncResult {
        let events = self.loader.events();
        let songs: Vec<Song> = songs
            .into_iter()
            .filter(|song| {
                let ok = song.status.can_be_downloaded();
                if !ok {
                    warn!("Skipping song {} ({}).", song.song_id, song.status);
                }
                ok
            })
            .map(|mut song| {
                song.status = DownloadStatus::Pending;
                events.post(SongEvent::SongChanged(song.song_id));
                song
            })
            .collect();

        info!("Downloading {} songs with {} workers", songs.len(), self.parallel);

        let outcomes: Vec<RunOutcome> = stream::iter(songs)
            .map(|song| {
                let loader = self.loader.clone();
                async move { loader.run(song).await }
            })
            .buffer_unordered(self.parallel)
            .collect()
            .await;

        let mut result = SyncResult::default();
        for outcome in outcomes {
            result.record(outcome);
        }
        debug!("Sync finished: {:?}", result);
        result
    }
}

//! Song notifications broadcast to interested observers

use tokio::sync::broadcast;
use tracing::trace;

use crate::library::SongId;

const CAPACITY: usize = 256;

/// Events a single song can post during one sync: pending, downloading,
/// changed or deleted, finished
const EVENTS_PER_SONG: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongEvent {
    /// The song's library row or status changed
    SongChanged(SongId),
    /// The song was removed from the library
    SongDeleted(SongId),
    /// A download run for the song ended, successfully or not
    DownloadFinished(SongId),
}

impl SongEvent {
    pub fn song_id(self) -> SongId {
        match self {
            SongEvent::SongChanged(id) | SongEvent::SongDeleted(id) | SongEvent::DownloadFinished(id) => id,
        }
    }
}

/// Broadcast channel for song events; posting without subscribers is a no-op
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SongEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(CAPACITY)
    }

    /// A bus that holds every event of syncing `songs` songs, so a slow
    /// observer never lags behind
    pub fn for_songs(songs: usize) -> Self {
        Self::with_capacity(CAPACITY.max(songs.saturating_mul(EVENTS_PER_SONG)))
    }

    fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SongEvent> {
        self.tx.subscribe()
    }

    pub fn post(&self, event: SongEvent) {
        trace!("Posting {:?}", event);
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

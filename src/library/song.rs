//! Songs tracked in the local library

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use super::SyncRecord;
use crate::song_txt::Headers;
use crate::usdb::{SongDetails, BASE_URL};

/// Identifier of a song on USDB
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(u32);

impl SongId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Detail page of the song, also used as the resource of the song txt
    pub fn usdb_url(self) -> String {
        format!("{}?link=detail&id={}", BASE_URL, self.0)
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

impl FromStr for SongId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Download state of a song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownloadStatus {
    /// Idle; also the state after a successful download
    #[default]
    None,
    Pending,
    Downloading,
    Failed,
}

impl DownloadStatus {
    pub fn can_be_downloaded(self) -> bool {
        match self {
            DownloadStatus::None | DownloadStatus::Failed => true,
            DownloadStatus::Pending | DownloadStatus::Downloading => false,
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DownloadStatus::None => "",
            DownloadStatus::Pending => "Pending",
            DownloadStatus::Downloading => "Downloading",
            DownloadStatus::Failed => "Failed",
        };
        f.write_str(text)
    }
}

/// A song and its local sync state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub song_id: SongId,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub edition: String,
    #[serde(default)]
    pub golden_notes: bool,
    #[serde(default)]
    pub rating: u32,
    #[serde(default)]
    pub views: u32,
    #[serde(default, skip_serializing)]
    pub status: DownloadStatus,
    #[serde(default)]
    pub sync_meta: Option<SyncRecord>,
}

impl Song {
    /// A song that has never been downloaded
    pub fn new(song_id: SongId) -> Self {
        Self {
            song_id,
            artist: String::new(),
            title: String::new(),
            language: String::new(),
            edition: String::new(),
            golden_notes: false,
            rating: 0,
            views: 0,
            status: DownloadStatus::None,
            sync_meta: None,
        }
    }

    /// Refresh the song's fields from freshly fetched remote data
    pub fn update_from_usdb(&mut self, details: &SongDetails, headers: &Headers) {
        self.artist = if details.artist.is_empty() {
            headers.artist.clone()
        } else {
            details.artist.clone()
        };
        self.title = if details.title.is_empty() {
            headers.title.clone()
        } else {
            details.title.clone()
        };
        self.language = headers.language.clone().unwrap_or_default();
        self.edition = headers.edition.clone().unwrap_or_default();
        self.golden_notes = details.golden_notes;
        self.rating = details.rating;
        self.views = details.views;
    }
}

//! Data shown on a song's USDB page

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::library::SongId;

/// A row of the USDB song list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsdbSong {
    pub song_id: SongId,
    pub artist: String,
    pub title: String,
    pub language: String,
    pub edition: String,
    pub golden_notes: bool,
    pub rating: u32,
    pub views: u32,
}

/// Links found in a comment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentContents {
    pub text: String,
    pub youtube_ids: Vec<String>,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongComment {
    pub date_time: NaiveDateTime,
    pub author: String,
    pub contents: CommentContents,
}

/// Details of a song page, comments ordered latest first
#[derive(Debug, Clone, PartialEq)]
pub struct SongDetails {
    pub song_id: SongId,
    pub artist: String,
    pub title: String,
    /// Small cover hosted by USDB, if the song has one
    pub cover_url: Option<String>,
    pub uploader: String,
    pub golden_notes: bool,
    pub rating: u32,
    pub views: u32,
    pub comments: Vec<SongComment>,
}

impl SongDetails {
    pub fn new(song_id: SongId) -> Self {
        Self {
            song_id,
            artist: String::new(),
            title: String::new(),
            cover_url: None,
            uploader: String::new(),
            golden_notes: false,
            rating: 0,
            views: 0,
            comments: Vec::new(),
        }
    }

    /// Videos posted in comments: per comment YouTube ids first, then other URLs
    pub fn all_comment_videos(&self) -> impl Iterator<Item = &str> {
        self.comments.iter().flat_map(|c| {
            c.contents
                .youtube_ids
                .iter()
                .chain(c.contents.urls.iter())
                .map(String::as_str)
        })
    }
}

//! USDB song database client module

pub mod client;
mod error;
pub mod models;
pub mod parse;
pub mod song_list;

pub use client::{Credentials, UsdbClient};
pub use error::UsdbError;
pub use song_list::SongListCache;
pub use models::*;

use async_trait::async_trait;

use crate::library::SongId;

pub const BASE_URL: &str = "https://usdb.animux.de/";

/// Source of song metadata and song txts
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn song_details(&self, song_id: SongId) -> Result<SongDetails, UsdbError>;

    async fn song_txt(&self, song_id: SongId) -> Result<String, UsdbError>;

    /// All songs on USDB with an id greater than `max_skip_id`, newest first
    async fn available_songs(&self, max_skip_id: SongId) -> Result<Vec<UsdbSong>, UsdbError>;
}

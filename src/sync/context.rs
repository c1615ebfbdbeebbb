//! State of a single download run

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::locations::Locations;
use super::staged::StagedBundle;
use crate::config::DownloadOptions;
use crate::library::Song;
use crate::song_txt::SongTxt;
use crate::usdb::{MetadataFetcher, SongDetails};

/// Everything a run works on; owned by exactly one run
#[derive(Debug)]
pub struct RunContext {
    /// Private copy of the song, written back to the library on success
    pub song: Song,
    pub details: SongDetails,
    pub txt: SongTxt,
    pub locations: Locations,
    pub staged: StagedBundle,
    pub options: Arc<DownloadOptions>,
}

impl RunContext {
    /// Fetch the song's remote data and prepare paths and reusable files
    pub async fn new(
        mut song: Song,
        usdb: &dyn MetadataFetcher,
        options: Arc<DownloadOptions>,
        temp_dir: &Path,
    ) -> Result<Self> {
        let details = usdb.song_details(song.song_id).await?;
        info!("Found '{} - {}' on USDB.", details.artist, details.title);

        let txt = usdb.song_txt(song.song_id).await?;
        let mut txt = SongTxt::parse(&txt).context("Failed to parse song txt")?;
        if txt.headers.creator.is_none() && !details.uploader.is_empty() {
            txt.headers.creator = Some(details.uploader.clone());
        }

        song.update_from_usdb(&details, &txt.headers);
        let locations = Locations::new(&song, &options.song_dir, &txt.headers, temp_dir);
        let staged = StagedBundle::seed_from(song.sync_meta.as_ref(), locations.folder());

        Ok(Self {
            song,
            details,
            txt,
            locations,
            staged,
            options,
        })
    }

    /// The txt names a video file or one is staged or kept
    pub fn has_video(&self) -> bool {
        self.txt.headers.video.is_some() || self.staged.video.path().is_some()
    }
}

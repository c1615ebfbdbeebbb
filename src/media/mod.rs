//! Fetching of audio, video and image resources

mod fetcher;
pub mod image;
pub mod ytdlp;

pub use fetcher::MediaFetcher;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::{AudioOptions, VideoOptions};

/// Role of a downloaded image within the song folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Cover,
    Background,
}

impl ImageKind {
    /// Marker appended to the filename stem
    pub fn marker(self) -> &'static str {
        match self {
            ImageKind::Cover => " [CO]",
            ImageKind::Background => " [BG]",
        }
    }

    /// Path of the image for a filename stem
    pub fn target_path(self, target_stem: &Path) -> PathBuf {
        let mut name = target_stem.as_os_str().to_os_string();
        name.push(self.marker());
        name.push(".jpg");
        PathBuf::from(name)
    }
}

/// Downloads remote resources into staging files
///
/// All methods return `None` on failure after logging the reason.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Download audio to `target_stem.<ext>`, returning the extension
    async fn fetch_audio(
        &self,
        resource: &str,
        options: &AudioOptions,
        target_stem: &Path,
    ) -> Option<String>;

    /// Download video to `target_stem.<ext>`, returning the extension
    async fn fetch_video(
        &self,
        resource: &str,
        options: &VideoOptions,
        target_stem: &Path,
    ) -> Option<String>;

    /// Download an image as JPEG next to `target_stem`, returning its path
    async fn fetch_image(
        &self,
        url: &str,
        kind: ImageKind,
        max_width: Option<u32>,
        target_stem: &Path,
    ) -> Option<PathBuf>;
}

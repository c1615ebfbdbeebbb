//! Production resource fetcher backed by yt-dlp and reqwest

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::image::process_image;
use super::ytdlp::YtDlp;
use super::{ImageKind, ResourceFetcher};
use crate::config::{AudioOptions, VideoOptions};

const IMAGE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MediaFetcher {
    http_client: Client,
    ytdlp: Option<YtDlp>,
}

impl MediaFetcher {
    pub fn new() -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("karaoke-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(IMAGE_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        let ytdlp = match YtDlp::locate() {
            Ok(ytdlp) => Some(ytdlp),
            Err(e) => {
                warn!("{}; audio and video downloads are disabled", e);
                None
            }
        };

        Ok(Self { http_client, ytdlp })
    }

    async fn download_image(
        &self,
        url: &str,
        max_width: Option<u32>,
        target: &Path,
    ) -> Result<()> {
        let url = Url::parse(url).with_context(|| format!("Invalid image URL '{}'", url))?;
        let data = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to fetch image")?
            .error_for_status()
            .context("Image request failed")?
            .bytes()
            .await
            .context("Failed to read image")?;

        let jpeg = tokio::task::spawn_blocking(move || process_image(&data, max_width))
            .await
            .context("Image processing task panicked")??;

        tokio::fs::write(target, jpeg)
            .await
            .with_context(|| format!("Failed to write image to {}", target.display()))
    }
}

#[async_trait]
impl ResourceFetcher for MediaFetcher {
    async fn fetch_audio(
        &self,
        resource: &str,
        options: &AudioOptions,
        target_stem: &Path,
    ) -> Option<String> {
        let ytdlp = self.ytdlp.as_ref()?;
        match ytdlp.download_audio(resource, options, target_stem).await {
            Ok(ext) => Some(ext),
            Err(e) => {
                debug!("Failed to download audio from '{}': {:#}", resource, e);
                None
            }
        }
    }

    async fn fetch_video(
        &self,
        resource: &str,
        options: &VideoOptions,
        target_stem: &Path,
    ) -> Option<String> {
        let ytdlp = self.ytdlp.as_ref()?;
        match ytdlp.download_video(resource, options, target_stem).await {
            Ok(ext) => Some(ext),
            Err(e) => {
                debug!("Failed to download video from '{}': {:#}", resource, e);
                None
            }
        }
    }

    async fn fetch_image(
        &self,
        url: &str,
        kind: ImageKind,
        max_width: Option<u32>,
        target_stem: &Path,
    ) -> Option<PathBuf> {
        let target = kind.target_path(target_stem);
        match self.download_image(url, max_width, &target).await {
            Ok(()) => Some(target),
            Err(e) => {
                debug!("Failed to download image from '{}': {:#}", url, e);
                None
            }
        }
    }
}

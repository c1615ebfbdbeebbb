//! yt-dlp subprocess wrapper

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::config::{AudioOptions, VideoOptions};

/// Located yt-dlp executable
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
}

impl YtDlp {
    pub fn locate() -> Result<Self> {
        let binary = which::which("yt-dlp").context("yt-dlp not found in PATH")?;
        debug!("Using yt-dlp at {}", binary.display());
        Ok(Self { binary })
    }

    /// Download the audio of `resource` to `target_stem.<ext>`, returning the extension
    pub async fn download_audio(
        &self,
        resource: &str,
        options: &AudioOptions,
        target_stem: &Path,
    ) -> Result<String> {
        self.download(audio_args(options), resource, target_stem).await
    }

    /// Download the video of `resource` to `target_stem.<ext>`, returning the extension
    pub async fn download_video(
        &self,
        resource: &str,
        options: &VideoOptions,
        target_stem: &Path,
    ) -> Result<String> {
        self.download(video_args(options), resource, target_stem).await
    }

    async fn download(&self, args: Vec<String>, resource: &str, target_stem: &Path) -> Result<String> {
        let url = resource_url(resource);
        let template = format!("{}.%(ext)s", target_stem.display());
        debug!("Running yt-dlp for {}", url);

        let output = Command::new(&self.binary)
            .args(&args)
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-simulate")
            .arg("--print")
            .arg("after_move:filepath")
            .arg("-o")
            .arg(&template)
            .arg(&url)
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to run yt-dlp")?;

        if !output.status.success() {
            bail!(
                "yt-dlp exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .context("yt-dlp did not report the downloaded file")?;
        Path::new(path)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .context("Downloaded file has no extension")
    }
}

/// URL for a candidate; bare YouTube ids become watch URLs
pub fn resource_url(resource: &str) -> String {
    if resource.contains("://") {
        resource.to_string()
    } else if is_youtube_id(resource) {
        format!("https://www.youtube.com/watch?v={}", resource)
    } else {
        format!("https://{}", resource)
    }
}

fn is_youtube_id(resource: &str) -> bool {
    resource.len() == 11
        && resource
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn audio_args(options: &AudioOptions) -> Vec<String> {
    let ext = options.format.extension();
    vec![
        "-f".to_string(),
        format!("bestaudio[ext={}]/bestaudio", ext),
        "--extract-audio".to_string(),
        "--audio-format".to_string(),
        ext.to_string(),
    ]
}

fn video_args(options: &VideoOptions) -> Vec<String> {
    let ext = options.format.extension();
    let res = options.max_resolution;
    vec![
        "-f".to_string(),
        format!(
            "bestvideo[ext={ext}][height<={res}]/best[ext={ext}][height<={res}]/bestvideo[height<={res}]"
        ),
        "--remux-video".to_string(),
        ext.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AudioFormat, VideoFormat};

    #[test]
    fn test_resource_url() {
        assert_eq!(
            resource_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(resource_url("https://vimeo.com/1"), "https://vimeo.com/1");
        assert_eq!(resource_url("vimeo.com/12345"), "https://vimeo.com/12345");
    }

    #[test]
    fn test_args() {
        let audio = audio_args(&AudioOptions {
            format: AudioFormat::Mp3,
            embed_artwork: false,
        });
        assert_eq!(audio[1], "bestaudio[ext=mp3]/bestaudio");
        assert_eq!(audio.last().map(String::as_str), Some("mp3"));

        let video = video_args(&VideoOptions {
            format: VideoFormat::Mp4,
            max_resolution: 720,
        });
        assert!(video[1].starts_with("bestvideo[ext=mp4][height<=720]"));
    }
}

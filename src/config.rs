//! Download settings persistence
//!
//! Stores download preferences in ~/.config/karaoke-sync/settings.json.
//! A disabled resource kind is represented by its options being `None`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const APP_DIR: &str = "karaoke-sync";

/// Text encoding of written song txts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Utf8,
    Utf8Bom,
}

/// Line separator of written song txts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Newline {
    Lf,
    Crlf,
}

impl Newline {
    pub fn as_str(self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::Crlf => "\r\n",
        }
    }
}

impl Default for Newline {
    fn default() -> Self {
        if cfg!(windows) { Newline::Crlf } else { Newline::Lf }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxtOptions {
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub newline: Newline,
}

/// Container format audio is converted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    #[default]
    M4a,
    Mp3,
    Ogg,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::M4a => "m4a",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioOptions {
    #[serde(default)]
    pub format: AudioFormat,
    /// Embed cover and background into the audio file's tags
    #[serde(default = "default_true")]
    pub embed_artwork: bool,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            embed_artwork: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoFormat {
    #[default]
    Mp4,
    Webm,
}

impl VideoFormat {
    pub fn extension(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Webm => "webm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoOptions {
    #[serde(default)]
    pub format: VideoFormat,
    /// Maximum video height in pixels
    #[serde(default = "default_max_resolution")]
    pub max_resolution: u32,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            format: VideoFormat::default(),
            max_resolution: default_max_resolution(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverOptions {
    /// Maximum cover width in pixels, original size if unset
    #[serde(default)]
    pub max_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackgroundOptions {
    /// Skip the background when the song has a video
    #[serde(default)]
    pub only_if_no_video: bool,
}

/// All settings of a download run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadOptions {
    /// Base directory song folders are created in
    pub song_dir: PathBuf,
    pub txt: Option<TxtOptions>,
    pub audio: Option<AudioOptions>,
    pub video: Option<VideoOptions>,
    pub cover: Option<CoverOptions>,
    pub background: Option<BackgroundOptions>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            song_dir: default_song_dir(),
            txt: Some(TxtOptions::default()),
            audio: Some(AudioOptions::default()),
            video: Some(VideoOptions::default()),
            cover: Some(CoverOptions::default()),
            background: Some(BackgroundOptions::default()),
        }
    }
}

impl DownloadOptions {
    /// Whether a background should be fetched given the song's video state
    pub fn download_background(&self, has_video: bool) -> bool {
        match self.background {
            Some(options) => !options.only_if_no_video || !has_video,
            None => false,
        }
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            debug!("No settings found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;

        let options: Self =
            serde_json::from_str(&contents).with_context(|| "Failed to parse settings")?;

        debug!("Loaded settings from {:?}", path);
        Ok(options)
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;

        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Get the settings file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join(APP_DIR).join("settings.json"))
    }
}

/// Location of the song library file
pub fn library_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join(APP_DIR).join("library.json"))
}

/// Location of the cached USDB song list
pub fn song_list_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join(APP_DIR).join("song_list.json"))
}

fn default_song_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Karaoke")
        .join("songs")
}

fn default_true() -> bool {
    true
}

fn default_max_resolution() -> u32 {
    1080
}

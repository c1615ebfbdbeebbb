//! Sync record tracking which local files belong to a song

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::SongId;
use crate::song_txt::MetaTags;
use crate::utils::mtime_micros;

/// Current on-disk format of sync records
pub const SYNC_RECORD_VERSION: u32 = 1;

const SYNC_RECORD_EXTENSION: &str = "usdb";

#[derive(Debug, Error)]
pub enum SyncRecordError {
    #[error("cannot read sync record written by a future release (version {0})")]
    TooNew(u32),
}

/// The kinds of files a song folder can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Txt,
    Audio,
    Video,
    Cover,
    Background,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Txt,
        ResourceKind::Audio,
        ResourceKind::Video,
        ResourceKind::Cover,
        ResourceKind::Background,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Txt => "txt",
            ResourceKind::Audio => "audio",
            ResourceKind::Video => "video",
            ResourceKind::Cover => "cover",
            ResourceKind::Background => "background",
        };
        f.write_str(name)
    }
}

/// Stable identifier of a sync record, reused across downloads of a song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncMetaId(i64);

impl SyncMetaId {
    pub fn new() -> Self {
        Self(rand::random())
    }

    pub fn to_filename(self) -> String {
        format!("{}.{}", hex::encode(self.0.to_be_bytes()), SYNC_RECORD_EXTENSION)
    }

    /// Inverse of [`SyncMetaId::to_filename`]; `None` for other file names
    pub fn from_filename(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(SYNC_RECORD_EXTENSION)?.strip_suffix('.')?;
        let bytes: [u8; 8] = hex::decode(stem).ok()?.try_into().ok()?;
        Some(Self(i64::from_be_bytes(bytes)))
    }
}

impl Default for SyncMetaId {
    fn default() -> Self {
        Self::new()
    }
}

/// A committed file in the song folder and the remote resource it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFile {
    /// File name inside the song folder
    pub fname: String,
    /// Modification time when the file was committed
    pub mtime: i64,
    /// Remote origin, compared to decide whether a download is needed
    pub resource: String,
}

impl ResourceFile {
    pub fn new(path: &Path, resource: &str) -> std::io::Result<Self> {
        let fname = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            fname,
            mtime: mtime_micros(path)?,
            resource: resource.to_string(),
        })
    }

    /// True if the file exists in `folder` and was not touched since commit
    pub fn is_in_sync(&self, folder: &Path) -> bool {
        mtime_micros(&folder.join(&self.fname)).is_ok_and(|mtime| mtime == self.mtime)
    }
}

/// Durable state of a downloaded song folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub version: u32,
    pub sync_meta_id: SyncMetaId,
    pub song_id: SongId,
    /// Location of the record file; its parent is the song folder
    pub path: PathBuf,
    /// Modification time of the record file after it was last written
    #[serde(default)]
    pub mtime: i64,
    pub meta_tags: MetaTags,
    #[serde(default)]
    pub pinned: bool,
    pub txt: Option<ResourceFile>,
    pub audio: Option<ResourceFile>,
    pub video: Option<ResourceFile>,
    pub cover: Option<ResourceFile>,
    pub background: Option<ResourceFile>,
}

impl SyncRecord {
    pub fn new(sync_meta_id: SyncMetaId, song_id: SongId, folder: &Path, meta_tags: MetaTags) -> Self {
        Self {
            version: SYNC_RECORD_VERSION,
            sync_meta_id,
            song_id,
            path: folder.join(sync_meta_id.to_filename()),
            mtime: 0,
            meta_tags,
            pinned: false,
            txt: None,
            audio: None,
            video: None,
            cover: None,
            background: None,
        }
    }

    /// The song folder
    pub fn folder(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceFile> {
        match kind {
            ResourceKind::Txt => self.txt.as_ref(),
            ResourceKind::Audio => self.audio.as_ref(),
            ResourceKind::Video => self.video.as_ref(),
            ResourceKind::Cover => self.cover.as_ref(),
            ResourceKind::Background => self.background.as_ref(),
        }
    }

    pub fn resource_mut(&mut self, kind: ResourceKind) -> &mut Option<ResourceFile> {
        match kind {
            ResourceKind::Txt => &mut self.txt,
            ResourceKind::Audio => &mut self.audio,
            ResourceKind::Video => &mut self.video,
            ResourceKind::Cover => &mut self.cover,
            ResourceKind::Background => &mut self.background,
        }
    }

    /// Reject records written by a newer release
    pub fn check_version(&self) -> Result<(), SyncRecordError> {
        if self.version > SYNC_RECORD_VERSION {
            return Err(SyncRecordError::TooNew(self.version));
        }
        Ok(())
    }

    /// Load a record file found in a song folder
    ///
    /// The record is re-anchored at `path`, so a folder that was moved keeps
    /// its files.
    pub fn try_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sync record {}", path.display()))?;
        let mut record: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse sync record {}", path.display()))?;
        record.check_version()?;
        record.path = path.to_path_buf();
        record.mtime = mtime_micros(path).context("Failed to stat sync record")?;
        Ok(record)
    }

    /// Write the record into the song folder and remember the file's mtime
    pub fn write_to_file(&mut self) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize sync record")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write sync record {}", self.path.display()))?;
        self.mtime = mtime_micros(&self.path).context("Failed to stat sync record")?;
        debug!("Saved sync record to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(folder: &Path) -> SyncRecord {
        let mut record = SyncRecord::new(
            SyncMetaId::new(),
            SongId::new(1234),
            folder,
            "v=dQw4w9WgXcQ".parse().unwrap(),
        );
        record.audio = Some(ResourceFile {
            fname: "A - B.mp3".to_string(),
            mtime: 5,
            resource: "dQw4w9WgXcQ".to_string(),
        });
        record
    }

    #[test]
    fn test_sync_meta_id_filename() {
        let id = SyncMetaId::new();
        let name = id.to_filename();
        assert!(name.ends_with(".usdb"));
        assert_eq!(name.len(), 16 + 5);
        assert_ne!(SyncMetaId::new().to_filename(), name);
    }

    #[test]
    fn test_sync_meta_id_from_filename() {
        let id = SyncMetaId::new();
        assert_eq!(SyncMetaId::from_filename(&id.to_filename()), Some(id));
        assert_eq!(
            SyncMetaId::from_filename("00000000000004d2.usdb"),
            Some(SyncMetaId(1234))
        );
        assert_eq!(SyncMetaId::from_filename("song.usdb"), None);
        assert_eq!(SyncMetaId::from_filename("00000000000004d2.txt"), None);
        assert_eq!(SyncMetaId::from_filename("04d2.usdb"), None);
    }

    #[test]
    fn test_try_from_file_follows_moved_folder() {
        let temp = tempfile::tempdir().unwrap();
        let old = temp.path().join("old");
        std::fs::create_dir(&old).unwrap();
        let mut original = record(&old);
        original.write_to_file().unwrap();

        let moved = temp.path().join("moved");
        std::fs::rename(&old, &moved).unwrap();
        let path = moved.join(original.sync_meta_id.to_filename());
        let loaded = SyncRecord::try_from_file(&path).unwrap();

        assert_eq!(loaded.path, path);
        assert_eq!(loaded.folder(), moved);
        assert_eq!(loaded.sync_meta_id, original.sync_meta_id);
        assert_eq!(loaded.audio, original.audio);
    }

    #[test]
    fn test_try_from_file_rejects_future_and_garbage() {
        let temp = tempfile::tempdir().unwrap();
        let mut future = record(temp.path());
        future.version = SYNC_RECORD_VERSION + 1;
        future.write_to_file().unwrap();
        let err = SyncRecord::try_from_file(&future.path).unwrap_err();
        assert!(err.downcast_ref::<SyncRecordError>().is_some());

        let garbage = temp.path().join("0000000000000001.usdb");
        std::fs::write(&garbage, "{not json").unwrap();
        assert!(SyncRecord::try_from_file(&garbage).is_err());
    }

    #[test]
    fn test_write_and_load() {
        let temp = tempfile::tempdir().unwrap();
        let mut original = record(temp.path());
        original.write_to_file().unwrap();

        let content = std::fs::read_to_string(&original.path).unwrap();
        let mut loaded: SyncRecord = serde_json::from_str(&content).unwrap();
        loaded.check_version().unwrap();
        loaded.mtime = original.mtime;
        assert_eq!(loaded, original);
        assert_eq!(loaded.folder(), temp.path());
        assert_eq!(loaded.resource(ResourceKind::Audio).unwrap().resource, "dQw4w9WgXcQ");
        assert!(loaded.resource(ResourceKind::Video).is_none());
    }

    #[test]
    fn test_rejects_future_version() {
        let temp = tempfile::tempdir().unwrap();
        let mut future = record(temp.path());
        future.version = SYNC_RECORD_VERSION + 1;
        assert!(matches!(
            future.check_version(),
            Err(SyncRecordError::TooNew(v)) if v == SYNC_RECORD_VERSION + 1
        ));
    }

    #[test]
    fn test_resource_file_sync_state() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("A - B.mp3");
        std::fs::write(&path, "audio").unwrap();

        let file = ResourceFile::new(&path, "url").unwrap();
        assert_eq!(file.fname, "A - B.mp3");
        assert!(file.is_in_sync(temp.path()));

        let stale = ResourceFile { mtime: file.mtime - 1, ..file.clone() };
        assert!(!stale.is_in_sync(temp.path()));

        std::fs::remove_file(&path).unwrap();
        assert!(!file.is_in_sync(temp.path()));
    }
}

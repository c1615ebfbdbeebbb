//! In-memory collaborators for pipeline tests

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use super::loader::{RunOutcome, SongLoader};
use crate::config::{
    AudioOptions, BackgroundOptions, CoverOptions, DownloadOptions, TxtOptions, VideoOptions,
};
use crate::events::EventBus;
use crate::library::{JsonLibraryStore, LibraryStore, Song, SongId};
use crate::media::{ImageKind, ResourceFetcher};
use crate::usdb::{
    CommentContents, MetadataFetcher, SongComment, SongDetails, UsdbError, UsdbSong,
};
use crate::utils::DirTrash;

/// A minimal song txt carrying `meta` in its `#VIDEO` header
pub fn txt(artist: &str, title: &str, meta: &str) -> String {
    format!("#TITLE:{title}\n#ARTIST:{artist}\n#BPM:100\n#VIDEO:{meta}\n: 0 4 60 la\nE\n")
}

pub struct FakeUsdb {
    txt: Mutex<String>,
    cover_url: Mutex<Option<String>>,
    comment_video: Mutex<Option<String>>,
    error: Mutex<Option<UsdbError>>,
}

#[async_trait]
impl MetadataFetcher for FakeUsdb {
    async fn song_details(&self, song_id: SongId) -> Result<SongDetails, UsdbError> {
        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }
        let mut details = SongDetails::new(song_id);
        details.uploader = "tester".to_string();
        details.cover_url = self.cover_url.lock().unwrap().clone();
        if let Some(video) = self.comment_video.lock().unwrap().clone() {
            details.comments.push(SongComment {
                date_time: Default::default(),
                author: "commenter".to_string(),
                contents: CommentContents {
                    youtube_ids: vec![video],
                    ..Default::default()
                },
            });
        }
        Ok(details)
    }

    async fn song_txt(&self, _song_id: SongId) -> Result<String, UsdbError> {
        Ok(self.txt.lock().unwrap().clone())
    }

    async fn available_songs(&self, _max_skip_id: SongId) -> Result<Vec<UsdbSong>, UsdbError> {
        Ok(Vec::new())
    }
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut path = stem.as_os_str().to_os_string();
    path.push(suffix);
    PathBuf::from(path)
}

/// Writes the resource name into `<stem>.mp3`, `<stem>.mp4` or the image
/// path for resources it knows
pub struct FakeFetcher {
    available: HashSet<String>,
    fetched: Mutex<Vec<String>>,
}

#[async_trait]
impl ResourceFetcher for FakeFetcher {
    async fn fetch_audio(
        &self,
        resource: &str,
        _options: &AudioOptions,
        target_stem: &Path,
    ) -> Option<String> {
        self.fetch(resource, &with_suffix(target_stem, ".mp3"))?;
        Some("mp3".to_string())
    }

    async fn fetch_video(
        &self,
        resource: &str,
        _options: &VideoOptions,
        target_stem: &Path,
    ) -> Option<String> {
        self.fetch(resource, &with_suffix(target_stem, ".mp4"))?;
        Some("mp4".to_string())
    }

    async fn fetch_image(
        &self,
        url: &str,
        kind: ImageKind,
        _max_width: Option<u32>,
        target_stem: &Path,
    ) -> Option<PathBuf> {
        let path = kind.target_path(target_stem);
        self.fetch(url, &path)?;
        Some(path)
    }
}

impl FakeFetcher {
    fn fetch(&self, resource: &str, path: &Path) -> Option<()> {
        self.fetched.lock().unwrap().push(resource.to_string());
        if !self.available.contains(resource) {
            return None;
        }
        std::fs::write(path, resource).ok()
    }
}

/// A loader wired to fakes, a library file and a trash dir in a temp dir
pub struct Harness {
    pub loader: SongLoader,
    usdb: Arc<FakeUsdb>,
    fetcher: Arc<FakeFetcher>,
    library: Arc<JsonLibraryStore>,
    trash: DirTrash,
    temp: TempDir,
}

impl Harness {
    pub fn new(txt: &str, available: &[&str]) -> Self {
        Self::with_options(txt, available, |_| {})
    }

    /// Also download video, cover and background
    pub fn with_media(txt: &str, available: &[&str], only_if_no_video: bool) -> Self {
        Self::with_options(txt, available, |options| {
            options.video = Some(VideoOptions::default());
            options.cover = Some(CoverOptions::default());
            options.background = Some(BackgroundOptions { only_if_no_video });
        })
    }

    fn with_options(
        txt: &str,
        available: &[&str],
        configure: impl FnOnce(&mut DownloadOptions),
    ) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let usdb = Arc::new(FakeUsdb {
            txt: Mutex::new(txt.to_string()),
            cover_url: Mutex::new(None),
            comment_video: Mutex::new(None),
            error: Mutex::new(None),
        });
        let fetcher = Arc::new(FakeFetcher {
            available: available.iter().map(|s| s.to_string()).collect(),
            fetched: Mutex::new(Vec::new()),
        });
        let library = Arc::new(JsonLibraryStore::open(temp.path().join("library.json")).unwrap());
        let trash = DirTrash::new(temp.path().join("trash"));
        let mut options = DownloadOptions {
            song_dir: temp.path().join("songs"),
            txt: Some(TxtOptions::default()),
            audio: Some(AudioOptions::default()),
            video: None,
            cover: None,
            background: None,
        };
        configure(&mut options);
        let loader = SongLoader::new(
            usdb.clone(),
            fetcher.clone(),
            library.clone(),
            Arc::new(trash.clone()),
            EventBus::new(),
            Arc::new(options),
        );
        Self {
            loader,
            usdb,
            fetcher,
            library,
            trash,
            temp,
        }
    }

    pub fn song_dir(&self) -> PathBuf {
        self.temp.path().join("songs")
    }

    pub fn set_txt(&self, txt: &str) {
        *self.usdb.txt.lock().unwrap() = txt.to_string();
    }

    /// Small cover USDB reports on the song page
    pub fn set_usdb_cover(&self, url: &str) {
        *self.usdb.cover_url.lock().unwrap() = Some(url.to_string());
    }

    /// Video posted in a comment on the song page
    pub fn set_comment_video(&self, video: &str) {
        *self.usdb.comment_video.lock().unwrap() = Some(video.to_string());
    }

    /// Fail the next details request
    pub fn set_error(&self, error: UsdbError) {
        *self.usdb.error.lock().unwrap() = Some(error);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetcher.fetched.lock().unwrap().clone()
    }

    /// Content of a trashed file
    pub fn trashed(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.trash.root().join(name)).ok()
    }

    pub async fn stored(&self, song_id: SongId) -> Option<Song> {
        self.library.get(song_id).await.unwrap()
    }

    /// Run the loader on the stored song, or a new one
    pub async fn run(&self, song_id: SongId) -> RunOutcome {
        let song = self
            .stored(song_id)
            .await
            .unwrap_or_else(|| Song::new(song_id));
        self.loader.run(song).await
    }
}

//! Download run of a single song

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::commit::{
    cleanup_existing_resources, ensure_correct_folder_name, maybe_write_txt, persist_staged_files,
    write_sync_record,
};
use super::context::RunContext;
use super::download::{download_audio, download_background, download_cover, download_video};
use super::tags::write_audio_tags;
use crate::config::DownloadOptions;
use crate::events::{EventBus, SongEvent};
use crate::library::{DownloadStatus, LibraryOp, LibraryStore, Song};
use crate::media::ResourceFetcher;
use crate::usdb::{MetadataFetcher, UsdbError};
use crate::utils::Trash;

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Done,
    Failed,
    /// The song no longer exists on USDB and was removed from the library
    Deleted,
}

/// Creates or updates the folder of one song per run
#[derive(Clone)]
pub struct SongLoader {
    usdb: Arc<dyn MetadataFetcher>,
    fetcher: Arc<dyn ResourceFetcher>,
    library: Arc<dyn LibraryStore>,
    trash: Arc<dyn Trash>,
    events: EventBus,
    options: Arc<DownloadOptions>,
}

impl SongLoader {
    pub fn new(
        usdb: Arc<dyn MetadataFetcher>,
        fetcher: Arc<dyn ResourceFetcher>,
        library: Arc<dyn LibraryStore>,
        trash: Arc<dyn Trash>,
        events: EventBus,
        options: Arc<DownloadOptions>,
    ) -> Self {
        Self {
            usdb,
            fetcher,
            library,
            trash,
            events,
            options,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run the whole pipeline for `song`; never fails, the outcome says how it went
    pub async fn run(&self, song: Song) -> RunOutcome {
        let span = info_span!("song", id = %song.song_id);
        self.run_and_report(song).instrument(span).await
    }

    async fn run_and_report(&self, mut song: Song) -> RunOutcome {
        let song_id = song.song_id;
        song.status = DownloadStatus::Downloading;
        self.events.post(SongEvent::SongChanged(song_id));

        let (outcome, event) = match self.run_inner(song).await {
            Ok(mut updated) => {
                updated.status = DownloadStatus::None;
                match self.library.apply(vec![LibraryOp::Upsert(updated)]).await {
                    Ok(()) => {
                        info!("All done!");
                        (RunOutcome::Done, SongEvent::SongChanged(song_id))
                    }
                    Err(e) => {
                        debug!("{:?}", e);
                        error!("Failed to save song to the library.");
                        (RunOutcome::Failed, SongEvent::SongChanged(song_id))
                    }
                }
            }
            Err(e) => match e.downcast_ref::<UsdbError>() {
                Some(UsdbError::AuthRequired) => {
                    error!("Aborted; download requires login.");
                    (RunOutcome::Failed, SongEvent::SongChanged(song_id))
                }
                Some(UsdbError::NotFound) => {
                    error!("Song has been deleted from USDB.");
                    if let Err(e) = self.library.apply(vec![LibraryOp::Delete(song_id)]).await {
                        warn!("Failed to remove song from the library: {:#}", e);
                    }
                    (RunOutcome::Deleted, SongEvent::SongDeleted(song_id))
                }
                _ => {
                    debug!("{:?}", e);
                    error!(
                        "Failed to finish download due to an unexpected error. \
                         See debug log for more information."
                    );
                    (RunOutcome::Failed, SongEvent::SongChanged(song_id))
                }
            },
        };

        self.events.post(event);
        self.events.post(SongEvent::DownloadFinished(song_id));
        outcome
    }

    async fn run_inner(&self, song: Song) -> Result<Song> {
        let temp_dir = tempfile::tempdir().context("Failed to create temp dir")?;
        let mut ctx =
            RunContext::new(song, self.usdb.as_ref(), self.options.clone(), temp_dir.path())
                .await?;
        let fetcher = self.fetcher.as_ref();
        let trash = self.trash.as_ref();

        download_audio(&mut ctx, fetcher).await;
        download_video(&mut ctx, fetcher).await;
        download_cover(&mut ctx, fetcher).await;
        download_background(&mut ctx, fetcher).await;
        write_audio_tags(&ctx).await;

        cleanup_existing_resources(&mut ctx, trash).await?;
        ensure_correct_folder_name(&mut ctx).await?;
        // after the folder rename so the headers name the final files
        maybe_write_txt(&mut ctx)?;
        persist_staged_files(&mut ctx, trash).await?;
        write_sync_record(&mut ctx)?;

        Ok(ctx.song)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::SongId;
    use crate::sync::fakes::{Harness, txt};

    const ID: SongId = SongId::new(42);

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let harness = Harness::new(&txt("X", "Y", "a=urlA"), &["urlA"]);

        assert_eq!(harness.run(ID).await, RunOutcome::Done);
        assert_eq!(harness.fetched(), vec!["urlA"]);
        let folder = harness.song_dir().join("X - Y");
        assert_eq!(std::fs::read_to_string(folder.join("X - Y.mp3")).unwrap(), "urlA");

        assert_eq!(harness.run(ID).await, RunOutcome::Done);
        assert_eq!(harness.fetched(), vec!["urlA"]);

        let song = harness.stored(ID).await.unwrap();
        let record = song.sync_meta.unwrap();
        assert_eq!(record.audio.as_ref().unwrap().resource, "urlA");
        assert!(record.audio.as_ref().unwrap().is_in_sync(&folder));
        assert!(folder.join("X - Y.txt").exists());
        assert!(record.path.exists());
        assert_eq!(song.status, DownloadStatus::None);
        assert!(harness.trashed("X - Y.mp3").is_none());
    }

    #[tokio::test]
    async fn test_changed_resource_replaces_file() {
        let harness = Harness::new(&txt("X", "Y", "a=urlA"), &["urlA", "urlB"]);
        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        harness.set_txt(&txt("X", "Y", "a=urlB,v=urlA"));
        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        assert_eq!(harness.fetched(), vec!["urlA", "urlB"]);
        let folder = harness.song_dir().join("X - Y");
        assert_eq!(std::fs::read_to_string(folder.join("X - Y.mp3")).unwrap(), "urlB");
        assert_eq!(harness.trashed("X - Y.mp3").as_deref(), Some("urlA"));
        let record = harness.stored(ID).await.unwrap().sync_meta.unwrap();
        assert_eq!(record.audio.unwrap().resource, "urlB");
    }

    #[tokio::test]
    async fn test_failed_download_keeps_previous_file() {
        let harness = Harness::new(&txt("X", "Y", "a=urlA"), &["urlA"]);
        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        harness.set_txt(&txt("X", "Y", "a=urlB"));
        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        assert_eq!(harness.fetched(), vec!["urlA", "urlB"]);
        let folder = harness.song_dir().join("X - Y");
        assert_eq!(std::fs::read_to_string(folder.join("X - Y.mp3")).unwrap(), "urlA");
        let record = harness.stored(ID).await.unwrap().sync_meta.unwrap();
        assert_eq!(record.audio.unwrap().resource, "urlA");
        assert_eq!(record.meta_tags.audio.as_deref(), Some("urlB"));
    }

    #[tokio::test]
    async fn test_title_change_renames_folder_and_files() {
        let harness = Harness::new(&txt("X", "Y", "a=urlA"), &["urlA"]);
        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        harness.set_txt(&txt("X", "Z", "a=urlA"));
        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        assert_eq!(harness.fetched(), vec!["urlA"]);
        assert!(!harness.song_dir().join("X - Y").exists());
        let folder = harness.song_dir().join("X - Z");
        assert_eq!(std::fs::read_to_string(folder.join("X - Z.mp3")).unwrap(), "urlA");
        let txt = std::fs::read_to_string(folder.join("X - Z.txt")).unwrap();
        assert!(txt.contains("#MP3:X - Z.mp3"));

        let record = harness.stored(ID).await.unwrap().sync_meta.unwrap();
        assert_eq!(record.folder(), folder);
        assert_eq!(record.audio.unwrap().fname, "X - Z.mp3");
        assert_eq!(record.txt.unwrap().fname, "X - Z.txt");
        assert_eq!(harness.trashed("X - Y.txt").map(|t| t.contains("#TITLE:Y")), Some(true));
    }

    #[tokio::test]
    async fn test_deleted_song_is_removed() {
        let harness = Harness::new(&txt("X", "Y", "a=urlA"), &["urlA"]);
        assert_eq!(harness.run(ID).await, RunOutcome::Done);
        let mut events = harness.loader.events().subscribe();

        harness.set_error(UsdbError::NotFound);
        assert_eq!(harness.run(ID).await, RunOutcome::Deleted);

        assert!(harness.stored(ID).await.is_none());
        assert_eq!(events.try_recv().unwrap(), SongEvent::SongChanged(ID));
        assert_eq!(events.try_recv().unwrap(), SongEvent::SongDeleted(ID));
        assert_eq!(events.try_recv().unwrap(), SongEvent::DownloadFinished(ID));
        assert!(events.try_recv().is_err());
        // files stay on disk
        assert!(harness.song_dir().join("X - Y").join("X - Y.mp3").exists());
    }

    #[tokio::test]
    async fn test_login_required_fails_without_changes() {
        let harness = Harness::new(&txt("X", "Y", "a=urlA"), &["urlA"]);
        let mut events = harness.loader.events().subscribe();
        harness.set_error(UsdbError::AuthRequired);

        assert_eq!(harness.run(ID).await, RunOutcome::Failed);

        assert!(harness.stored(ID).await.is_none());
        assert!(harness.fetched().is_empty());
        assert!(!harness.song_dir().exists());
        assert_eq!(events.try_recv().unwrap(), SongEvent::SongChanged(ID));
        assert_eq!(events.try_recv().unwrap(), SongEvent::SongChanged(ID));
        assert_eq!(events.try_recv().unwrap(), SongEvent::DownloadFinished(ID));
    }

    #[tokio::test]
    async fn test_invalid_txt_fails() {
        let harness = Harness::new("not a song", &[]);
        assert_eq!(harness.run(ID).await, RunOutcome::Failed);
        assert!(harness.stored(ID).await.is_none());
    }

    const COVER: &str = "https://images.fanart.tv/fanart/c1.jpg";
    const BACKGROUND: &str = "https://images.fanart.tv/fanart/b1.jpg";

    fn read(path: std::path::PathBuf) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn test_video_and_images_are_committed() {
        let harness = Harness::with_media(
            &txt("X", "Y", "a=urlA,v=urlV,co=c1.jpg,bg=b1.jpg"),
            &["urlA", "urlV", COVER, BACKGROUND],
            false,
        );
        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        assert_eq!(harness.fetched(), vec!["urlA", "urlV", COVER, BACKGROUND]);
        let folder = harness.song_dir().join("X - Y");
        assert_eq!(read(folder.join("X - Y.mp4")), "urlV");
        assert_eq!(read(folder.join("X - Y [CO].jpg")), COVER);
        assert_eq!(read(folder.join("X - Y [BG].jpg")), BACKGROUND);
        let song_txt = read(folder.join("X - Y.txt"));
        assert!(song_txt.contains("#VIDEO:X - Y.mp4"));
        assert!(song_txt.contains("#COVER:X - Y [CO].jpg"));
        assert!(song_txt.contains("#BACKGROUND:X - Y [BG].jpg"));

        let record = harness.stored(ID).await.unwrap().sync_meta.unwrap();
        assert_eq!(record.video.unwrap().resource, "urlV");
        assert_eq!(record.cover.unwrap().fname, "X - Y [CO].jpg");
        assert_eq!(record.background.unwrap().resource, BACKGROUND);

        assert_eq!(harness.run(ID).await, RunOutcome::Done);
        assert_eq!(harness.fetched().len(), 4);
    }

    #[tokio::test]
    async fn test_audio_only_song_skips_video() {
        let harness = Harness::with_media(&txt("X", "Y", "a=urlA"), &["urlA", "urlC"], false);
        harness.set_comment_video("urlC");

        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        assert_eq!(harness.fetched(), vec!["urlA"]);
        let folder = harness.song_dir().join("X - Y");
        assert!(!folder.join("X - Y.mp4").exists());
        assert!(harness.stored(ID).await.unwrap().sync_meta.unwrap().video.is_none());
    }

    #[tokio::test]
    async fn test_comment_video_used_without_video_tag() {
        let harness = Harness::with_media(&txt("X", "Y", "co=c1.jpg"), &["urlC", COVER], false);
        harness.set_comment_video("urlC");

        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        let folder = harness.song_dir().join("X - Y");
        assert_eq!(read(folder.join("X - Y.mp3")), "urlC");
        assert_eq!(read(folder.join("X - Y.mp4")), "urlC");
    }

    #[tokio::test]
    async fn test_background_only_without_video() {
        let meta = "a=urlA,v=urlV,bg=b1.jpg";
        let available = ["urlA", "urlV", BACKGROUND];
        let harness = Harness::with_media(&txt("X", "Y", meta), &available, true);
        assert_eq!(harness.run(ID).await, RunOutcome::Done);
        assert!(!harness.fetched().contains(&BACKGROUND.to_string()));
        assert!(!harness.song_dir().join("X - Y").join("X - Y [BG].jpg").exists());

        let harness = Harness::with_media(&txt("X", "Y", meta), &["urlA", BACKGROUND], true);
        assert_eq!(harness.run(ID).await, RunOutcome::Done);
        assert!(harness.fetched().contains(&BACKGROUND.to_string()));
        assert!(harness.song_dir().join("X - Y").join("X - Y [BG].jpg").exists());
    }

    #[tokio::test]
    async fn test_cover_falls_back_to_usdb_cover() {
        let usdb_cover = "https://usdb.animux.de/data/cover/42.jpg";
        let harness =
            Harness::with_media(&txt("X", "Y", "a=urlA"), &["urlA", usdb_cover], false);
        harness.set_usdb_cover(usdb_cover);

        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        let folder = harness.song_dir().join("X - Y");
        assert_eq!(read(folder.join("X - Y [CO].jpg")), usdb_cover);
        let record = harness.stored(ID).await.unwrap().sync_meta.unwrap();
        assert_eq!(record.cover.unwrap().resource, usdb_cover);
    }

    #[tokio::test]
    async fn test_changed_cover_replaces_file_and_failed_cover_keeps_it() {
        let second = "https://images.fanart.tv/fanart/c2.jpg";
        let available = ["urlA", COVER, second];
        let harness = Harness::with_media(&txt("X", "Y", "a=urlA,co=c1.jpg"), &available, false);
        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        harness.set_txt(&txt("X", "Y", "a=urlA,co=c2.jpg"));
        assert_eq!(harness.run(ID).await, RunOutcome::Done);
        let cover = harness.song_dir().join("X - Y").join("X - Y [CO].jpg");
        assert_eq!(read(cover.clone()), second);
        assert_eq!(harness.trashed("X - Y [CO].jpg").as_deref(), Some(COVER));

        harness.set_txt(&txt("X", "Y", "a=urlA,co=missing.jpg"));
        assert_eq!(harness.run(ID).await, RunOutcome::Done);
        assert_eq!(read(cover), second);
        let record = harness.stored(ID).await.unwrap().sync_meta.unwrap();
        assert_eq!(record.cover.unwrap().resource, second);
    }

    #[tokio::test]
    async fn test_changed_background_replaces_file_and_failed_background_keeps_it() {
        let second = "https://images.fanart.tv/fanart/b2.jpg";
        let available = ["urlA", BACKGROUND, second];
        let harness = Harness::with_media(&txt("X", "Y", "a=urlA,bg=b1.jpg"), &available, false);
        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        harness.set_txt(&txt("X", "Y", "a=urlA,bg=b2.jpg"));
        assert_eq!(harness.run(ID).await, RunOutcome::Done);
        let background = harness.song_dir().join("X - Y").join("X - Y [BG].jpg");
        assert_eq!(read(background.clone()), second);
        assert_eq!(harness.trashed("X - Y [BG].jpg").as_deref(), Some(BACKGROUND));

        harness.set_txt(&txt("X", "Y", "a=urlA,bg=missing.jpg"));
        assert_eq!(harness.run(ID).await, RunOutcome::Done);
        assert_eq!(read(background), second);
        let record = harness.stored(ID).await.unwrap().sync_meta.unwrap();
        assert_eq!(record.background.unwrap().resource, second);
    }

    #[tokio::test]
    async fn test_title_change_renames_video_and_images() {
        let meta = "a=urlA,v=urlV,co=c1.jpg,bg=b1.jpg";
        let available = ["urlA", "urlV", COVER, BACKGROUND];
        let harness = Harness::with_media(&txt("X", "Y", meta), &available, false);
        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        harness.set_txt(&txt("X", "Z", meta));
        assert_eq!(harness.run(ID).await, RunOutcome::Done);

        assert_eq!(harness.fetched().len(), 4);
        let folder = harness.song_dir().join("X - Z");
        assert_eq!(read(folder.join("X - Z.mp4")), "urlV");
        assert_eq!(read(folder.join("X - Z [CO].jpg")), COVER);
        assert_eq!(read(folder.join("X - Z [BG].jpg")), BACKGROUND);
        let record = harness.stored(ID).await.unwrap().sync_meta.unwrap();
        assert_eq!(record.video.unwrap().fname, "X - Z.mp4");
        assert_eq!(record.cover.unwrap().fname, "X - Z [CO].jpg");
        assert_eq!(record.background.unwrap().fname, "X - Z [BG].jpg");
    }
}

//! Rebuild the library from sync records found in the song directory
//!
//! Song folders carry their own `.usdb` record, so a moved folder or a lost
//! library file can be recovered by walking the song directory.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{LibraryOp, LibraryStore, Song, SongId, SyncMetaId, SyncRecord};
use crate::song_txt::{Headers, SongTxt};

/// A record file and the headers of the txt it tracks, if readable
#[derive(Debug)]
struct FoundRecord {
    record: SyncRecord,
    headers: Option<Headers>,
}

fn read_headers(record: &SyncRecord) -> Option<Headers> {
    let txt = record.txt.as_ref()?;
    let bytes = std::fs::read(record.folder().join(&txt.fname)).ok()?;
    SongTxt::parse(&String::from_utf8_lossy(&bytes))
        .ok()
        .map(|txt| txt.headers)
}

fn find_records_blocking(song_dir: &Path) -> HashMap<SongId, FoundRecord> {
    let mut paths: Vec<PathBuf> = WalkDir::new(song_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| SyncMetaId::from_filename(&e.file_name().to_string_lossy()).is_some())
        .map(|e| e.into_path())
        .collect();
    paths.sort();

    let mut found: HashMap<SongId, FoundRecord> = HashMap::new();
    for path in paths {
        let record = match SyncRecord::try_from_file(&path) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping sync record: {:#}", e);
                continue;
            }
        };
        if let Some(first) = found.get(&record.song_id) {
            warn!(
                "Song {} has another sync record at {}; using {}",
                record.song_id,
                path.display(),
                first.record.path.display()
            );
            continue;
        }
        let headers = read_headers(&record);
        found.insert(record.song_id, FoundRecord { record, headers });
    }
    found
}

async fn find_records(song_dir: &Path) -> Result<HashMap<SongId, FoundRecord>> {
    let song_dir = song_dir.to_path_buf();
    tokio::task::spawn_blocking(move || find_records_blocking(&song_dir))
        .await
        .context("Song directory scan panicked")
}

/// Point library songs at the records found in `song_dir`
///
/// Moved folders are followed, songs whose record file is gone lose their
/// sync state and unknown records are added as new songs. Returns the number
/// of changed songs.
pub async fn rescan_library(library: &dyn LibraryStore, song_dir: &Path) -> Result<usize> {
    debug!("Scanning {} for sync records", song_dir.display());
    let mut found = find_records(song_dir).await?;

    let mut ops = Vec::new();
    for mut song in library.all().await? {
        match found.remove(&song.song_id) {
            Some(FoundRecord { record, .. }) => {
                if song.sync_meta.as_ref() != Some(&record) {
                    debug!("Song {} synced at {}", song.song_id, record.folder().display());
                    song.sync_meta = Some(record);
                    ops.push(LibraryOp::Upsert(song));
                }
            }
            None => {
                let missing = song
                    .sync_meta
                    .as_ref()
                    .is_some_and(|record| !record.path.exists());
                if missing {
                    debug!("Sync record of song {} is gone", song.song_id);
                    song.sync_meta = None;
                    ops.push(LibraryOp::Upsert(song));
                }
            }
        }
    }

    let mut added: Vec<FoundRecord> = found.into_values().collect();
    added.sort_by_key(|found| found.record.song_id);
    for FoundRecord { record, headers } in added {
        let mut song = Song::new(record.song_id);
        if let Some(headers) = headers {
            song.artist = headers.artist;
            song.title = headers.title;
            song.language = headers.language.unwrap_or_default();
            song.edition = headers.edition.unwrap_or_default();
        }
        song.sync_meta = Some(record);
        ops.push(LibraryOp::Upsert(song));
    }

    let changed = ops.len();
    if changed > 0 {
        library.apply(ops).await?;
        info!("Updated {} song(s) from local sync records.", changed);
    }
    Ok(changed)
}

//! CLI command handlers

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::{AuthManager, ConfigAction};
use crate::config::{DownloadOptions, library_path, song_list_path};
use crate::events::{EventBus, SongEvent};
use crate::library::{
    JsonLibraryStore, LibraryStore, ResourceKind, Song, SongId, rescan_library,
};
use crate::media::MediaFetcher;
use crate::sync::{SongLoader, SyncEngine};
use crate::usdb::{SongListCache, UsdbClient, song_list};
use crate::utils::{DirTrash, SystemTrash, Trash};

/// Handle the `auth` command
pub async fn auth(
    username: Option<String>,
    password: Option<String>,
    force: bool,
    logout: bool,
) -> Result<()> {
    if logout {
        AuthManager::clear()?;
        println!("{}", "Logged out of USDB.".green());
        return Ok(());
    }

    println!("{}", "Configuring USDB credentials...".cyan());

    let creds = AuthManager::authenticate(username, password, force).await?;

    println!();
    println!("{}", "Authentication successful!".green().bold());
    println!("  User: {}", creds.username);
    println!();
    println!("Credentials stored securely in system keyring.");

    Ok(())
}

/// Handle the `sync` command
pub async fn sync(
    song_ids: Vec<u32>,
    parallel: usize,
    trash_dir: Option<PathBuf>,
    song_dir: Option<PathBuf>,
) -> Result<()> {
    let mut options = DownloadOptions::load()?;
    if let Some(song_dir) = song_dir {
        options.song_dir = song_dir;
    }

    let library = Arc::new(JsonLibraryStore::open(library_path()?)?);
    rescan_library(library.as_ref(), &options.song_dir)
        .await
        .context("Failed to scan song directory")?;
    let songs = if song_ids.is_empty() {
        library.all().await?
    } else {
        let mut songs = Vec::with_capacity(song_ids.len());
        for id in song_ids {
            let song_id = SongId::new(id);
            songs.push(library.get(song_id).await?.unwrap_or_else(|| Song::new(song_id)));
        }
        songs
    };
    if songs.is_empty() {
        println!("{}", "No songs to sync. Pass song ids to add them.".yellow());
        return Ok(());
    }

    let credentials = AuthManager::load().ok();
    if credentials.is_none() {
        println!(
            "{}",
            "No USDB credentials found. Run 'karaoke-sync auth' first to download songs.".yellow()
        );
    }
    let usdb = UsdbClient::new(credentials)?;
    if !usdb.login().await.context("Failed to reach USDB")? {
        warn!("Continuing without login");
    }

    let trash: Arc<dyn Trash> = match trash_dir {
        Some(dir) => Arc::new(DirTrash::new(dir)),
        None => Arc::new(SystemTrash),
    };
    let total = songs.len();
    let events = EventBus::for_songs(total);
    let mut finished_events = events.subscribe();
    let loader = SongLoader::new(
        Arc::new(usdb),
        Arc::new(MediaFetcher::new()?),
        library,
        trash,
        events,
        Arc::new(options),
    );
    let engine = SyncEngine::new(loader, parallel);

    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );
    let bar = progress.clone();
    let progress_task = tokio::spawn(async move {
        loop {
            match finished_events.recv().await {
                Ok(event @ SongEvent::DownloadFinished(_)) => {
                    bar.inc(1);
                    bar.set_message(event.song_id().to_string());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!("Progress missed {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = engine.download_songs(songs).await;
    drop(engine);
    let _ = progress_task.await;
    progress.set_position((result.done + result.failed + result.deleted) as u64);
    progress.finish_with_message("Done");

    println!();
    println!("{}", "Sync complete!".green().bold());
    println!("  Downloaded: {}", result.done);
    if result.failed > 0 {
        println!("  {}", format!("Failed: {}", result.failed).red());
    }
    if result.deleted > 0 {
        println!("  {}", format!("Deleted from USDB: {}", result.deleted).yellow());
    }

    Ok(())
}

/// Handle the `list` command
pub async fn list(reload: bool, search: Option<String>) -> Result<()> {
    let usdb = UsdbClient::new(AuthManager::load().ok())?;
    if !usdb.login().await.context("Failed to reach USDB")? {
        warn!("Continuing without login");
    }
    let songs = SongListCache::new(song_list_path()?)
        .refresh(&usdb, reload)
        .await?;

    let query = search.unwrap_or_default();
    let mut shown = 0;
    for song in song_list::search(&songs, &query) {
        shown += 1;
        let golden = if song.golden_notes { " *".yellow() } else { "".normal() };
        println!(
            "{} {} - {}{} [{}] {}",
            song.song_id.to_string().green().bold(),
            song.artist,
            song.title,
            golden,
            song.language,
            format!("{} views", song.views).dimmed()
        );
    }
    println!();
    println!("{} of {} songs", shown, songs.len());

    Ok(())
}

/// Handle the `status` command
pub async fn status(song_id: Option<u32>) -> Result<()> {
    let library = JsonLibraryStore::open(library_path()?)?;
    let songs: Vec<Song> = match song_id {
        Some(id) => library.get(SongId::new(id)).await?.into_iter().collect(),
        None => library.all().await?,
    };

    if songs.is_empty() {
        println!("{}", "No songs found.".yellow());
        return Ok(());
    }

    for song in songs {
        println!(
            "{} {} - {}",
            song.song_id.to_string().green().bold(),
            song.artist,
            song.title
        );
        let Some(record) = &song.sync_meta else {
            println!("  {}", "Not downloaded".yellow());
            continue;
        };
        println!("  Folder: {}", record.folder().display());
        if record.pinned {
            println!("  Pinned");
        }
        for kind in ResourceKind::ALL {
            let Some(file) = record.resource(kind) else {
                continue;
            };
            let state = if file.is_in_sync(record.folder()) {
                "ok".green()
            } else {
                "changed".red()
            };
            println!("    {:<10} {} [{}]", kind.to_string(), file.fname, state);
        }
        println!();
    }

    Ok(())
}

/// Handle the `config` command
pub fn config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let options = DownloadOptions::load()?;
            println!("{}", DownloadOptions::config_path()?.display().to_string().cyan());
            println!(
                "{}",
                serde_json::to_string_pretty(&options).context("Failed to serialize settings")?
            );
        }
        ConfigAction::SetSongDir { path } => {
            let mut options = DownloadOptions::load()?;
            options.song_dir = path;
            options.save()?;
            println!("Song directory set to {}", options.song_dir.display().to_string().green());
        }
        ConfigAction::Reset => {
            DownloadOptions::default().save()?;
            println!("{}", "Settings reset to defaults.".green());
        }
    }
    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = super::Cli::command();
    generate(shell, &mut cmd, "karaoke-sync", &mut io::stdout());
}

//! Commit stage: turn staged resources into the final song folder

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use super::context::RunContext;
use crate::library::{ResourceKind, SyncMetaId, SyncRecord};
use crate::utils::{Trash, claim_unique_directory, move_dir_contents, move_file};

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Trash files that are out of sync or about to be replaced, and give kept
/// files their canonical name
pub async fn cleanup_existing_resources(ctx: &mut RunContext, trash: &dyn Trash) -> Result<()> {
    let Some(record) = &ctx.song.sync_meta else {
        return Ok(());
    };
    for kind in ResourceKind::ALL {
        let Some(old) = record.resource(kind) else {
            continue;
        };
        let staged = ctx.staged.get_mut(kind);
        match (&staged.existing_path, &staged.staged_path) {
            (None, _) => {
                let path = ctx.locations.file_path(&old.fname);
                if path.exists() {
                    trash
                        .trash(&path)
                        .with_context(|| format!("Failed to trash {}", path.display()))?;
                    debug!("Trashed untracked file: '{}'.", path.display());
                }
            }
            (Some(existing), Some(_)) => {
                trash
                    .trash(existing)
                    .with_context(|| format!("Failed to trash {}", existing.display()))?;
                debug!("Trashed existing file: '{}'.", existing.display());
                staged.existing_path = None;
            }
            (Some(existing), None) => {
                let canonical = ctx
                    .locations
                    .file_path(&ctx.locations.canonical_name(&old.fname));
                if *existing == canonical {
                    continue;
                }
                if canonical.exists() {
                    trash
                        .trash(&canonical)
                        .with_context(|| format!("Failed to trash {}", canonical.display()))?;
                    debug!("Trashed file in the way: '{}'.", canonical.display());
                }
                tokio::fs::rename(existing, &canonical)
                    .await
                    .with_context(|| format!("Failed to rename {}", existing.display()))?;
                debug!("Renamed '{}' to '{}'.", existing.display(), canonical.display());
                staged.existing_path = Some(canonical);
            }
        }
    }
    Ok(())
}

/// Claim the folder of a new song, or rename an existing one that does not
/// match the song's name
pub async fn ensure_correct_folder_name(ctx: &mut RunContext) -> Result<()> {
    let old = ctx.locations.folder().to_path_buf();
    if ctx.song.sync_meta.is_none() {
        let folder = claim_unique_directory(&old)
            .await
            .with_context(|| format!("Failed to create song folder {}", old.display()))?;
        debug!("Claimed song folder '{}'.", folder.display());
        ctx.locations.set_folder(folder);
        return Ok(());
    }

    tokio::fs::create_dir_all(&old)
        .await
        .with_context(|| format!("Failed to create song folder {}", old.display()))?;
    if ctx.locations.has_canonical_folder_name() {
        return Ok(());
    }

    let wanted = old.with_file_name(ctx.locations.filename_stem());
    let new = claim_unique_directory(&wanted)
        .await
        .with_context(|| format!("Failed to create song folder {}", wanted.display()))?;
    move_dir_contents(&old, &new).await?;
    info!("Renamed song folder to '{}'.", new.display());
    ctx.locations.set_folder(new.clone());

    for (_, staged) in ctx.staged.iter_mut() {
        let rebased = staged
            .existing_path
            .as_deref()
            .and_then(|p| p.strip_prefix(&old).ok())
            .map(|rel| new.join(rel));
        if let Some(path) = rebased {
            staged.existing_path = Some(path);
        }
    }
    Ok(())
}

/// Write the song txt into the temp dir with headers pointing at the final files
pub fn maybe_write_txt(ctx: &mut RunContext) -> Result<()> {
    let Some(options) = ctx.options.txt else {
        return Ok(());
    };

    let headers = &mut ctx.txt.headers;
    if let Some(name) = ctx.staged.audio.path().and_then(file_name) {
        headers.mp3 = Some(name);
    }
    if let Some(name) = ctx.staged.video.path().and_then(file_name) {
        headers.video = Some(name);
    }
    if let Some(name) = ctx.staged.cover.path().and_then(file_name) {
        headers.cover = Some(name);
    }
    if let Some(name) = ctx.staged.background.path().and_then(file_name) {
        headers.background = Some(name);
    }

    let path = ctx.locations.temp_path("txt");
    ctx.txt
        .write_to_file(&path, options.encoding, options.newline)?;
    ctx.staged.txt.stage(path, &ctx.song.song_id.usdb_url());
    info!("Success! Created song txt.");
    Ok(())
}

/// Move staged files into the song folder, trashing anything in their way
pub async fn persist_staged_files(ctx: &mut RunContext, trash: &dyn Trash) -> Result<()> {
    let folder = ctx.locations.folder().to_path_buf();
    for (kind, staged) in ctx.staged.iter_mut() {
        let Some(staged_path) = staged.staged_path.take() else {
            continue;
        };
        let name = staged_path
            .file_name()
            .with_context(|| format!("Staged {} has no file name", kind))?;
        let target = folder.join(name);
        if target.exists() {
            trash
                .trash(&target)
                .with_context(|| format!("Failed to trash {}", target.display()))?;
            debug!("Trashed existing file: '{}'.", target.display());
        }
        move_file(&staged_path, &target).await?;
        staged.staged_path = Some(target);
    }
    Ok(())
}

/// Record the committed files, reusing the identity of a previous record
pub fn write_sync_record(ctx: &mut RunContext) -> Result<()> {
    let old = ctx.song.sync_meta.take();
    let sync_meta_id = old
        .as_ref()
        .map(|r| r.sync_meta_id)
        .unwrap_or_else(SyncMetaId::new);

    let mut record = SyncRecord::new(
        sync_meta_id,
        ctx.song.song_id,
        ctx.locations.folder(),
        ctx.txt.meta_tags.clone(),
    );
    record.pinned = old.is_some_and(|r| r.pinned);
    for kind in ResourceKind::ALL {
        *record.resource_mut(kind) = ctx
            .staged
            .get(kind)
            .to_resource_file()
            .with_context(|| format!("Failed to stat {} file", kind))?;
    }
    record.write_to_file()?;
    ctx.song.sync_meta = Some(record);
    Ok(())
}

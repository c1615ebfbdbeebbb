//! Download stage: fetch each resource kind from its candidates

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::candidates;
use super::context::RunContext;
use super::staged::StagedResource;
use crate::library::ResourceKind;
use crate::media::{ImageKind, ResourceFetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    /// A candidate equals the resource already present
    Unchanged,
    Fetched,
    Exhausted,
}

/// Try candidates in order until one is unchanged or fetched
async fn walk_candidates<F, Fut>(
    staged: &mut StagedResource,
    candidates: Vec<String>,
    mut fetch: F,
) -> Walk
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Option<PathBuf>>,
{
    for candidate in candidates {
        if staged.resource.as_deref() == Some(candidate.as_str()) {
            return Walk::Unchanged;
        }
        if let Some(path) = fetch(candidate.clone()).await {
            staged.stage(path, &candidate);
            return Walk::Fetched;
        }
    }
    Walk::Exhausted
}

fn report(walk: Walk, kind: ResourceKind, staged: &StagedResource, failure_detail: &str) {
    let name = kind.to_string();
    match walk {
        Walk::Unchanged => info!("{} resource is unchanged.", capitalize(&name)),
        Walk::Fetched => info!("Success! Downloaded {}.", name),
        Walk::Exhausted => {
            let keep = if staged.resource.is_some() { " Keeping last resource." } else { "" };
            error!("Failed to download {}{}!{}", name, failure_detail, keep);
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

fn with_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

pub async fn download_audio(ctx: &mut RunContext, fetcher: &dyn ResourceFetcher) {
    let Some(options) = ctx.options.audio else {
        return;
    };
    let candidates = candidates::audio_candidates(&ctx.txt.meta_tags, &ctx.details);
    let stem = ctx.locations.temp_stem();
    let walk = walk_candidates(&mut ctx.staged.audio, candidates, |candidate| {
        let stem = &stem;
        async move {
            let ext = fetcher.fetch_audio(&candidate, &options, stem).await?;
            Some(with_extension(stem, &ext))
        }
    })
    .await;

    let detail = format!(" (song duration > {})", ctx.txt.minimum_song_length());
    report(walk, ResourceKind::Audio, &ctx.staged.audio, &detail);
}

pub async fn download_video(ctx: &mut RunContext, fetcher: &dyn ResourceFetcher) {
    let Some(options) = ctx.options.video else {
        return;
    };
    if ctx.txt.meta_tags.is_audio_only() {
        return;
    }
    let candidates = candidates::video_candidates(&ctx.txt.meta_tags, &ctx.details);
    let stem = ctx.locations.temp_stem();
    let walk = walk_candidates(&mut ctx.staged.video, candidates, |candidate| {
        let stem = &stem;
        async move {
            let ext = fetcher.fetch_video(&candidate, &options, stem).await?;
            Some(with_extension(stem, &ext))
        }
    })
    .await;

    report(walk, ResourceKind::Video, &ctx.staged.video, "");
}

pub async fn download_cover(ctx: &mut RunContext, fetcher: &dyn ResourceFetcher) {
    let Some(options) = ctx.options.cover else {
        return;
    };
    let Some(url) = candidates::cover_url(&ctx.txt.meta_tags, &ctx.details) else {
        warn!("No cover resource found.");
        return;
    };
    let stem = ctx.locations.temp_stem();
    let walk = walk_candidates(&mut ctx.staged.cover, vec![url], |url| {
        let stem = &stem;
        async move {
            fetcher
                .fetch_image(&url, ImageKind::Cover, options.max_size, stem)
                .await
        }
    })
    .await;

    report(walk, ResourceKind::Cover, &ctx.staged.cover, "");
}

pub async fn download_background(ctx: &mut RunContext, fetcher: &dyn ResourceFetcher) {
    if !ctx.options.download_background(ctx.has_video()) {
        return;
    }
    let Some(url) = candidates::background_url(&ctx.txt.meta_tags) else {
        warn!("No background resource found.");
        return;
    };
    let stem = ctx.locations.temp_stem();
    let walk = walk_candidates(&mut ctx.staged.background, vec![url], |url| {
        let stem = &stem;
        async move {
            fetcher
                .fetch_image(&url, ImageKind::Background, None, stem)
                .await
        }
    })
    .await;

    report(walk, ResourceKind::Background, &ctx.staged.background, "");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_walk_stops_at_unchanged() {
        let mut staged = StagedResource {
            resource: Some("b".to_string()),
            existing_path: Some(PathBuf::from("/songs/x.mp3")),
            ..Default::default()
        };
        let mut tried = Vec::new();
        let walk = walk_candidates(&mut staged, vec!["a".into(), "b".into(), "c".into()], |c| {
            tried.push(c);
            async { None }
        })
        .await;

        assert_eq!(walk, Walk::Unchanged);
        assert_eq!(tried, vec!["a"]);
        assert_eq!(staged.staged_path, None);
    }

    #[tokio::test]
    async fn test_walk_stages_first_success() {
        let mut staged = StagedResource::default();
        let walk = walk_candidates(&mut staged, vec!["a".into(), "b".into()], |c| async move {
            (c == "b").then(|| PathBuf::from("/tmp/x.m4a"))
        })
        .await;

        assert_eq!(walk, Walk::Fetched);
        assert_eq!(staged.path_and_resource(), Some((Path::new("/tmp/x.m4a"), "b")));
    }

    #[tokio::test]
    async fn test_walk_exhausted_keeps_previous() {
        let mut staged = StagedResource {
            resource: Some("old".to_string()),
            existing_path: Some(PathBuf::from("/songs/x.mp3")),
            ..Default::default()
        };
        let walk = walk_candidates(&mut staged, vec!["new".into()], |_| async { None }).await;

        assert_eq!(walk, Walk::Exhausted);
        assert_eq!(staged.path_and_resource(), Some((Path::new("/songs/x.mp3"), "old")));
    }

    #[test]
    fn test_with_extension_keeps_dots_in_stem() {
        assert_eq!(
            with_extension(Path::new("/tmp/Mr. X - Y"), "m4a"),
            PathBuf::from("/tmp/Mr. X - Y.m4a")
        );
    }
}

//! Remote sources to try for each resource kind, best first

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::song_txt::MetaTags;
use crate::usdb::SongDetails;

/// Upper bound of sources tried per resource
pub const MAX_CANDIDATES: usize = 10;

/// Meta tag video, then videos posted in comments
pub fn video_candidates(meta_tags: &MetaTags, details: &SongDetails) -> Vec<String> {
    let tagged = meta_tags.video.as_deref();
    distinct_capped(tagged.into_iter().chain(details.all_comment_videos()))
}

/// Meta tag audio, then every video candidate
pub fn audio_candidates(meta_tags: &MetaTags, details: &SongDetails) -> Vec<String> {
    if meta_tags.audio.is_none() && meta_tags.video.is_none() {
        debug!("No valid audio/video meta tag. Looking in comments.");
    }
    let tagged = meta_tags.audio.as_deref();
    let videos = meta_tags
        .video
        .as_deref()
        .into_iter()
        .chain(details.all_comment_videos());
    distinct_capped(tagged.into_iter().chain(videos))
}

fn distinct_capped<'a>(candidates: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .filter(|c| seen.insert(*c))
        .take(MAX_CANDIDATES)
        .map(str::to_string)
        .collect()
}

/// Meta tag cover, falling back to the small cover hosted by USDB
pub fn cover_url(meta_tags: &MetaTags, details: &SongDetails) -> Option<String> {
    if let Some(cover) = &meta_tags.cover {
        let url = cover.source_url();
        debug!("Downloading cover from #VIDEO params: {}", url);
        return Some(url);
    }
    let url = details.cover_url.clone()?;
    warn!("No cover resource in #VIDEO tag, so fallback to small USDB cover!");
    Some(url)
}

pub fn background_url(meta_tags: &MetaTags) -> Option<String> {
    let url = meta_tags.background.as_ref()?.source_url();
    debug!("Downloading background from #VIDEO params: {}", url);
    Some(url)
}

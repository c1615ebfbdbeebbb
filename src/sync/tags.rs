//! Tag-writing stage: song metadata and lyrics into the audio file

use anyhow::{Context, Result};
use lofty::TextEncoding;
use lofty::config::WriteOptions;
use lofty::id3::v2::{
    BinaryFrame, Frame, FrameId, Id3v2Tag, SyncTextContentType, SynchronizedTextFrame,
    TimestampFormat,
};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{Tag, TagType};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use super::context::RunContext;
use crate::utils::language_code;

/// Tag flavor written for an audio container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagFormat {
    Mp3,
    M4a,
    Ogg,
}

impl TagFormat {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp3" => Some(TagFormat::Mp3),
            "m4a" => Some(TagFormat::M4a),
            "ogg" => Some(TagFormat::Ogg),
            _ => None,
        }
    }

    fn tag_type(self) -> TagType {
        match self {
            TagFormat::Mp3 => TagType::Id3v2,
            TagFormat::M4a => TagType::Mp4Ilst,
            TagFormat::Ogg => TagType::VorbisComments,
        }
    }
}

/// Values written into the tag
#[derive(Debug, Clone, Default)]
struct TagData {
    artist: String,
    title: String,
    language: &'static str,
    genre: Option<String>,
    year: Option<String>,
    lyrics: String,
    lrc: String,
    /// Start of each line in milliseconds
    synced: Vec<(u32, String)>,
    source: String,
    cover: Option<Vec<u8>>,
    background: Option<Vec<u8>>,
}

async fn read_artwork(path: Option<&Path>) -> Option<Vec<u8>> {
    let path = path?;
    match tokio::fs::read(path).await {
        Ok(data) => Some(data),
        Err(e) => {
            debug!("Failed to read artwork {}: {}", path.display(), e);
            None
        }
    }
}

fn build_tag(format: TagFormat, data: TagData) -> Tag {
    let mut tag = Tag::new(format.tag_type());
    tag.set_artist(data.artist);
    tag.set_title(data.title);
    if let Some(genre) = data.genre {
        tag.set_genre(genre);
    }
    if let Some(year) = data.year {
        tag.insert_text(ItemKey::RecordingDate, year);
    }
    if format != TagFormat::M4a {
        tag.insert_text(ItemKey::Language, data.language.to_string());
    }
    tag.insert_text(ItemKey::Lyrics, data.lyrics);
    match format {
        TagFormat::Ogg => {
            tag.insert_text(ItemKey::Unknown("SYNCEDLYRICS".to_string()), data.lrc);
        }
        TagFormat::Mp3 | TagFormat::M4a => {
            tag.insert_text(ItemKey::Comment, data.source);
        }
    }

    if let Some(cover) = data.cover {
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::Jpeg),
            None,
            cover,
        ));
    }
    if let Some(background) = data.background.filter(|_| format == TagFormat::M4a) {
        tag.push_picture(Picture::new_unchecked(
            PictureType::Illustration,
            Some(MimeType::Jpeg),
            None,
            background,
        ));
    }
    tag
}

/// ID3v2 tag with a SYLT frame holding the lyrics in milliseconds
fn build_id3v2_tag(mut data: TagData) -> Result<Id3v2Tag> {
    let language = data
        .language
        .as_bytes()
        .try_into()
        .unwrap_or(*b"und");
    let synced = std::mem::take(&mut data.synced);
    let sylt = SynchronizedTextFrame::new(
        TextEncoding::UTF8,
        language,
        TimestampFormat::MS,
        SyncTextContentType::Lyrics,
        None,
        synced,
    );
    let sylt = sylt.as_bytes().context("Failed to encode synchronized lyrics")?;

    let mut tag = Id3v2Tag::from(build_tag(TagFormat::Mp3, data));
    let id = FrameId::new("SYLT").context("Invalid frame id")?;
    tag.insert(Frame::Binary(BinaryFrame::new(id, sylt)));
    Ok(tag)
}

fn write_tags(path: &Path, format: TagFormat, data: TagData) -> Result<()> {
    let mut tagged_file = Probe::open(path)
        .context("Failed to open audio file")?
        .read()
        .context("Failed to read audio file")?;

    if format == TagFormat::Mp3 {
        return build_id3v2_tag(data)?
            .save_to_path(path, WriteOptions::default())
            .context("Failed to save audio file tags");
    }

    let tag = build_tag(format, data);
    tagged_file.remove(tag.tag_type());
    tagged_file.insert_tag(tag);

    tagged_file
        .save_to_path(path, WriteOptions::default())
        .context("Failed to save audio file tags")?;
    Ok(())
}

/// Write tags to the staged or kept audio file; failures are logged only
pub async fn write_audio_tags(ctx: &RunContext) {
    let Some(options) = ctx.options.audio else {
        return;
    };
    let Some((path, resource)) = ctx.staged.audio.path_and_resource() else {
        return;
    };
    let Some(format) = TagFormat::from_path(path) else {
        debug!("No tag writer for '{}'.", path.display());
        return;
    };

    let (cover, background) = if options.embed_artwork {
        (
            read_artwork(ctx.staged.cover.path()).await,
            read_artwork(ctx.staged.background.path()).await,
        )
    } else {
        (None, None)
    };
    let headers = &ctx.txt.headers;
    let data = TagData {
        artist: headers.artist.clone(),
        title: headers.title.clone(),
        language: language_code(headers.main_language()),
        genre: headers.genre.clone(),
        year: headers.year.clone(),
        lyrics: ctx.txt.unsynchronized_lyrics(),
        lrc: ctx.txt.to_lrc(),
        synced: ctx.txt.synchronized_lyrics(),
        source: resource.to_string(),
        cover,
        background,
    };

    let path: PathBuf = path.to_path_buf();
    let task_path = path.clone();
    let result = tokio::task::spawn_blocking(move || write_tags(&task_path, format, data))
        .await
        .context("Tag writing task panicked")
        .and_then(|r| r);

    match result {
        Ok(()) => debug!("Audio tags written to file '{}'.", path.display()),
        Err(e) => {
            debug!("{:?}", e);
            error!("Failed to write audio tags to file '{}'!", path.display());
        }
    }
}

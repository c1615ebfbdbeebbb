//! UltraStar song txt: headers, notes and the lyrics derived from them

mod headers;
mod meta_tags;

pub use headers::Headers;
pub use meta_tags::MetaTags;

use anyhow::{Context, Result};
use std::path::Path;
use thiserror::Error;

use crate::config::{Encoding, Newline};

const BOM: char = '\u{feff}';

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing header #{0}")]
    MissingHeader(&'static str),
    #[error("invalid value for header #{0}: {1}")]
    InvalidHeader(&'static str, String),
    #[error("invalid line {0}: {1}")]
    InvalidLine(usize, String),
    #[error("song has no notes")]
    NoNotes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Regular,
    Golden,
    Freestyle,
    Rap,
    GoldenRap,
}

impl NoteKind {
    fn from_marker(marker: char) -> Option<Self> {
        match marker {
            ':' => Some(NoteKind::Regular),
            '*' => Some(NoteKind::Golden),
            'F' => Some(NoteKind::Freestyle),
            'R' => Some(NoteKind::Rap),
            'G' => Some(NoteKind::GoldenRap),
            _ => None,
        }
    }

    fn marker(self) -> char {
        match self {
            NoteKind::Regular => ':',
            NoteKind::Golden => '*',
            NoteKind::Freestyle => 'F',
            NoteKind::Rap => 'R',
            NoteKind::GoldenRap => 'G',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub kind: NoteKind,
    pub start: i32,
    pub duration: i32,
    pub pitch: i32,
    pub text: String,
}

impl Note {
    fn parse(line: &str) -> Option<Self> {
        let mut chars = line.chars();
        let kind = NoteKind::from_marker(chars.next()?)?;
        let mut parts = chars.as_str().trim_start().splitn(4, ' ');
        let start = parts.next()?.parse().ok()?;
        let duration = parts.next()?.parse().ok()?;
        let pitch = parts.next()?.parse().ok()?;
        let text = parts.next().unwrap_or("").to_string();
        Some(Self {
            kind,
            start,
            duration,
            pitch,
            text,
        })
    }

    pub fn end(&self) -> i32 {
        self.start + self.duration
    }
}

/// One line of the song body
#[derive(Debug, Clone, PartialEq)]
pub enum BodyLine {
    Note(Note),
    LineBreak { start: i32, end: Option<i32> },
    Player(String),
}

impl BodyLine {
    fn parse(line: &str) -> Option<Self> {
        if let Some(rest) = line.strip_prefix('-') {
            let mut beats = rest.split_whitespace();
            let start = beats.next()?.parse().ok()?;
            let end = beats.next().and_then(|b| b.parse().ok());
            return Some(BodyLine::LineBreak { start, end });
        }
        if let Some(rest) = line.strip_prefix('P') {
            let player = rest.trim();
            if !player.is_empty() && player.chars().all(|c| c.is_ascii_digit()) {
                return Some(BodyLine::Player(player.to_string()));
            }
        }
        Note::parse(line).map(BodyLine::Note)
    }

    fn to_line(&self) -> String {
        match self {
            BodyLine::Note(note) => format!(
                "{} {} {} {} {}",
                note.kind.marker(),
                note.start,
                note.duration,
                note.pitch,
                note.text
            ),
            BodyLine::LineBreak { start, end: Some(end) } => format!("- {} {}", start, end),
            BodyLine::LineBreak { start, end: None } => format!("- {}", start),
            BodyLine::Player(player) => format!("P{}", player),
        }
    }
}

/// A parsed song txt
#[derive(Debug, Clone, PartialEq)]
pub struct SongTxt {
    pub headers: Headers,
    pub meta_tags: MetaTags,
    pub body: Vec<BodyLine>,
}

impl SongTxt {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let content = content.trim_start_matches(BOM);
        let mut pairs = Vec::new();
        let mut body = Vec::new();
        let mut in_body = false;

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            if !in_body {
                if let Some(header) = line.strip_prefix('#') {
                    if let Some((key, value)) = header.split_once(':') {
                        pairs.push((key.trim().to_uppercase(), value.to_string()));
                    }
                    continue;
                }
                in_body = true;
            }
            if line.starts_with('E') && line.trim() == "E" {
                break;
            }
            let parsed = BodyLine::parse(line)
                .ok_or_else(|| ParseError::InvalidLine(index + 1, line.to_string()))?;
            body.push(parsed);
        }

        let mut headers = Headers::from_pairs(pairs)?;
        if !body.iter().any(|l| matches!(l, BodyLine::Note(_))) {
            return Err(ParseError::NoNotes);
        }

        let meta_tags = match headers.video.as_deref().and_then(MetaTags::parse) {
            Some(tags) => {
                headers.video = None;
                tags
            }
            None => MetaTags::default(),
        };

        Ok(Self {
            headers,
            meta_tags,
            body,
        })
    }

    /// Notes grouped by line, limited to the first singer of a duet
    fn first_voice_lines(&self) -> Vec<Vec<&Note>> {
        let mut lines = vec![Vec::new()];
        let mut seen_player = false;
        for line in &self.body {
            match line {
                BodyLine::Player(_) if seen_player => break,
                BodyLine::Player(_) => seen_player = true,
                BodyLine::LineBreak { .. } => lines.push(Vec::new()),
                BodyLine::Note(note) => {
                    if let Some(current) = lines.last_mut() {
                        current.push(note);
                    }
                }
            }
        }
        lines.retain(|l| !l.is_empty());
        lines
    }

    fn beat_to_ms(&self, beat: i32) -> u32 {
        let ms = self.headers.gap_ms() + f64::from(beat) * 60_000.0 / (self.headers.bpm() * 4.0);
        ms.round().max(0.0) as u32
    }

    /// Plain lyrics, one line per sung line
    pub fn unsynchronized_lyrics(&self) -> String {
        self.first_voice_lines()
            .iter()
            .map(|notes| line_text(notes))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Start time in milliseconds and text of every sung line
    pub fn synchronized_lyrics(&self) -> Vec<(u32, String)> {
        self.first_voice_lines()
            .iter()
            .map(|notes| (self.beat_to_ms(notes[0].start), line_text(notes)))
            .collect()
    }

    /// Synchronized lyrics in LRC format
    pub fn to_lrc(&self) -> String {
        self.synchronized_lyrics()
            .into_iter()
            .map(|(ms, text)| {
                format!(
                    "[{:02}:{:02}.{:02}]{}",
                    ms / 60_000,
                    ms / 1000 % 60,
                    ms % 1000 / 10,
                    text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Time until the last note ends, as `m:ss`
    pub fn minimum_song_length(&self) -> String {
        let last_beat = self
            .body
            .iter()
            .filter_map(|l| match l {
                BodyLine::Note(note) => Some(note.end()),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        let secs = self.beat_to_ms(last_beat) / 1000;
        format!("{}:{:02}", secs / 60, secs % 60)
    }

    pub fn to_txt_string(&self, newline: Newline) -> String {
        let headers = self.headers.to_pairs();
        let meta_tags = (!self.meta_tags.is_empty() && self.headers.video.is_none())
            .then(|| self.meta_tags.to_string());

        let mut lines: Vec<String> = Vec::with_capacity(headers.len() + self.body.len() + 2);
        for (key, value) in headers {
            if key == "BPM" {
                if let Some(tags) = &meta_tags {
                    lines.push(format!("#VIDEO:{}", tags));
                }
            }
            lines.push(format!("#{}:{}", key, value));
        }
        lines.extend(self.body.iter().map(BodyLine::to_line));
        lines.push("E".to_string());

        let mut text = lines.join(newline.as_str());
        text.push_str(newline.as_str());
        text
    }

    pub fn write_to_file(&self, path: &Path, encoding: Encoding, newline: Newline) -> Result<()> {
        let mut content = String::new();
        if encoding == Encoding::Utf8Bom {
            content.push(BOM);
        }
        content.push_str(&self.to_txt_string(newline));
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write song txt {}", path.display()))
    }
}

fn line_text(notes: &[&Note]) -> String {
    notes.iter().map(|n| n.text.as_str()).collect::<String>().trim().to_string()
}

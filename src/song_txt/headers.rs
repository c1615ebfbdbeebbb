//! `#KEY:value` headers of a song txt

use super::ParseError;

/// Known headers of a song txt; unknown ones are kept in `other`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    pub title: String,
    pub artist: String,
    pub language: Option<String>,
    pub edition: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
    pub creator: Option<String>,
    pub mp3: Option<String>,
    pub cover: Option<String>,
    pub background: Option<String>,
    pub video: Option<String>,
    /// Beats per minute as written, may use a decimal comma
    pub bpm: String,
    /// Delay of the first beat in milliseconds
    pub gap: Option<String>,
    pub other: Vec<(String, String)>,
}

impl Headers {
    pub(super) fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, ParseError> {
        let mut headers = Headers::default();
        let mut title = None;
        let mut artist = None;
        let mut bpm = None;

        for (key, value) in pairs {
            let value = value.trim().to_string();
            let optional = (!value.is_empty()).then(|| value.clone());
            match key.as_str() {
                "TITLE" => title = Some(value),
                "ARTIST" => artist = Some(value),
                "BPM" => bpm = Some(value),
                "LANGUAGE" => headers.language = optional,
                "EDITION" => headers.edition = optional,
                "GENRE" => headers.genre = optional,
                "YEAR" => headers.year = optional,
                "CREATOR" => headers.creator = optional,
                "MP3" => headers.mp3 = optional,
                "COVER" => headers.cover = optional,
                "BACKGROUND" => headers.background = optional,
                "VIDEO" => headers.video = optional,
                "GAP" => headers.gap = optional,
                _ => headers.other.push((key, value)),
            }
        }

        headers.title = title.ok_or(ParseError::MissingHeader("TITLE"))?;
        headers.artist = artist.ok_or(ParseError::MissingHeader("ARTIST"))?;
        let bpm = bpm.ok_or(ParseError::MissingHeader("BPM"))?;
        if parse_number(&bpm).is_none_or(|v| v <= 0.0) {
            return Err(ParseError::InvalidHeader("BPM", bpm));
        }
        headers.bpm = bpm;
        Ok(headers)
    }

    pub fn artist_title(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    pub fn bpm(&self) -> f64 {
        parse_number(&self.bpm).unwrap_or(1.0)
    }

    pub fn gap_ms(&self) -> f64 {
        self.gap.as_deref().and_then(parse_number).unwrap_or(0.0)
    }

    /// First of possibly several comma-separated languages
    pub fn main_language(&self) -> &str {
        self.language
            .as_deref()
            .and_then(|l| l.split(',').next())
            .map(str::trim)
            .unwrap_or("")
    }

    /// Headers in the order they are written back
    pub(super) fn to_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = vec![("TITLE", self.title.as_str()), ("ARTIST", self.artist.as_str())];
        let optional = [
            ("LANGUAGE", &self.language),
            ("EDITION", &self.edition),
            ("GENRE", &self.genre),
            ("YEAR", &self.year),
            ("CREATOR", &self.creator),
            ("MP3", &self.mp3),
            ("COVER", &self.cover),
            ("BACKGROUND", &self.background),
            ("VIDEO", &self.video),
        ];
        pairs.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.as_deref().map(|v| (key, v))),
        );
        pairs.extend(self.other.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        pairs.push(("BPM", self.bpm.as_str()));
        if let Some(gap) = &self.gap {
            pairs.push(("GAP", gap));
        }
        pairs
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().replace(',', ".").parse().ok()
}

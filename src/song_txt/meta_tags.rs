//! Meta tags embedded in the `#VIDEO` header
//!
//! USDB songs name their remote sources as comma-separated `key=value` pairs,
//! e.g. `#VIDEO:a=abc123,v=dQw4w9WgXcQ,co=cover.jpg`.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const FANART_URL: &str = "https://images.fanart.tv/fanart/";

/// An image source given in the meta tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetaTag {
    source: String,
}

impl ImageMetaTag {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Full URL of the image; bare names refer to fanart.tv
    pub fn source_url(&self) -> String {
        if self.source.contains("://") {
            self.source.clone()
        } else {
            format!("{}{}", FANART_URL, self.source)
        }
    }
}

/// Remote sources of a song's resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MetaTags {
    pub audio: Option<String>,
    pub video: Option<String>,
    pub cover: Option<ImageMetaTag>,
    pub background: Option<ImageMetaTag>,
    /// Tags without meaning for downloads, preserved in order
    pub other: Vec<(String, String)>,
}

impl MetaTags {
    /// Parse a `#VIDEO` value, returning `None` if it holds no meta tags
    pub fn parse(value: &str) -> Option<Self> {
        if !value.contains('=') {
            return None;
        }
        let mut tags = Self::default();
        for pair in value.split(',') {
            let Some((key, val)) = pair.split_once('=') else {
                continue;
            };
            let val = unescape(val.trim());
            if val.is_empty() {
                continue;
            }
            match key.trim() {
                "a" => tags.audio = Some(val),
                "v" => tags.video = Some(val),
                "co" => tags.cover = Some(ImageMetaTag::new(val)),
                "bg" => tags.background = Some(ImageMetaTag::new(val)),
                other => tags.other.push((other.to_string(), val)),
            }
        }
        Some(tags)
    }

    /// Audio is given explicitly but no video is
    pub fn is_audio_only(&self) -> bool {
        self.audio.is_some() && self.video.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_none()
            && self.video.is_none()
            && self.cover.is_none()
            && self.background.is_none()
            && self.other.is_empty()
    }
}

fn unescape(value: &str) -> String {
    value.replace("%2C", ",")
}

fn escape(value: &str) -> String {
    value.replace(',', "%2C")
}

impl fmt::Display for MetaTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        if let Some(video) = &self.video {
            pairs.push(("v", video));
        }
        if let Some(audio) = &self.audio {
            pairs.push(("a", audio));
        }
        if let Some(cover) = &self.cover {
            pairs.push(("co", cover.source()));
        }
        if let Some(background) = &self.background {
            pairs.push(("bg", background.source()));
        }
        pairs.extend(self.other.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let joined = pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, escape(v)))
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&joined)
    }
}

impl FromStr for MetaTags {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s).unwrap_or_default())
    }
}

impl From<MetaTags> for String {
    fn from(tags: MetaTags) -> Self {
        tags.to_string()
    }
}

impl TryFrom<String> for MetaTags {
    type Error = Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

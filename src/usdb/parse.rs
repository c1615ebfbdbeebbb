//! Scraping of USDB HTML pages
//!
//! Labels are matched in all languages USDB is served in (English, German,
//! French), so the page language does not need to be detected first.

use chrono::NaiveDateTime;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use tracing::debug;

use super::models::{CommentContents, SongComment, SongDetails, UsdbSong};
use super::{BASE_URL, UsdbError};
use crate::library::SongId;

pub const NOT_LOGGED_IN: &str = "You are not logged in. Login to use this function.";
pub const DATASET_NOT_FOUND: &str = "Datensatz nicht gefunden";
pub const LOGIN_INVALID: &str = "Login or Password invalid, please try again.";

const DATETIME_FORMAT: &str = "%d.%m.%y - %H:%M";

const GOLDEN_NOTES: &[&str] = &["Golden Notes", "Goldene Noten", "Notes en or"];
const RATING: &[&str] = &["Rating", "Bewertung", "Classement"];
const CREATED_BY: &[&str] = &["Created by", "Erstellt von", "créé par"];
const VIEWS: &[&str] = &["Views", "Aufrufe", "Affichages"];
const YES: &[&str] = &["Yes", "Ja", "Oui"];

const VIDEO_SOURCES: &str = r"(?:https?://)?(?:www\.)?(?:youtube\.com|youtube-nocookie\.com|youtu\.be|vimeo\.com|archive\.org|fb\.watch|universal-music\.de|dailymotion\.com)/\S+";

static VIDEO_SOURCE_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b({})", VIDEO_SOURCES)).expect("valid regex"));

static VIDEO_SOURCE_FULL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{}$", VIDEO_SOURCES)).expect("valid regex"));

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        (?:https?://)?
        (?:www\.)?
        (?:m\.)?
        (?:
            youtube\.com/
            | youtube-nocookie\.com/
            | youtu\.be
        )
        \S*
        (?:/|%3D|v=|vi=)
        ([0-9a-z_-]{11})
        (?:[%\#?&]|$)
        ",
    )
    .expect("valid regex")
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static CONTENT_TABLE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"table[border="0"][width="500"]"#));
static TD: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static TR: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static IMG: LazyLock<Selector> = LazyLock::new(|| selector("img[src]"));
static COMMENT_HEADER: LazyLock<Selector> = LazyLock::new(|| selector("tr.list_tr2"));
static EMBED: LazyLock<Selector> = LazyLock::new(|| selector("embed[src]"));
static IFRAME: LazyLock<Selector> = LazyLock::new(|| selector("iframe[src]"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static TEXTAREA: LazyLock<Selector> = LazyLock::new(|| selector("textarea"));
static LIST_CELL: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"td[onclick^="show_detail("]"#));

/// Trimmed text content of an element
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parse the detail page of a song
pub fn parse_song_page(html: &str, song_id: SongId) -> Result<SongDetails, UsdbError> {
    let document = Html::parse_document(html);
    let mut tables = document.select(&CONTENT_TABLE);
    let details_table = tables
        .next()
        .ok_or_else(|| UsdbError::parse("details table not found"))?;

    let mut details = parse_details_table(details_table, song_id)?;
    if let Some(comments_table) = tables.next() {
        details.comments = parse_comments_table(comments_table)?;
    }
    Ok(details)
}

fn parse_details_table(table: ElementRef<'_>, song_id: SongId) -> Result<SongDetails, UsdbError> {
    let mut cells = table.select(&TD).map(element_text);
    let artist = cells
        .next()
        .ok_or_else(|| UsdbError::parse("artist not found"))?;
    let title = cells
        .next()
        .ok_or_else(|| UsdbError::parse("title not found"))?;

    let cover_src = table
        .select(&IMG)
        .next()
        .and_then(|img| img.value().attr("src"));
    let cover_url = match cover_src {
        Some(src) if !src.contains("nocover") => Some(format!("{}{}", BASE_URL, src)),
        _ => {
            debug!("No USDB cover. Consider adding one!");
            None
        }
    };

    let views = cell_after(table, VIEWS)
        .map(element_text)
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| UsdbError::parse("views not found"))?;
    let rating = cell_after(table, RATING)
        .map(|cell| {
            cell.select(&IMG)
                .filter(|img| img.value().attr("src").is_some_and(|src| src.contains("star.png")))
                .count() as u32
        })
        .unwrap_or(0);
    let golden_notes = cell_after(table, GOLDEN_NOTES)
        .map(|cell| YES.contains(&element_text(cell).as_str()))
        .unwrap_or(false);
    let uploader = cell_after(table, CREATED_BY)
        .map(element_text)
        .unwrap_or_default();

    Ok(SongDetails {
        song_id,
        artist,
        title,
        cover_url,
        uploader,
        golden_notes,
        rating,
        views,
        comments: Vec::new(),
    })
}

/// The cell following the cell labelled with one of `labels`
fn cell_after<'a>(table: ElementRef<'a>, labels: &[&str]) -> Option<ElementRef<'a>> {
    let mut cells = table.select(&TD);
    while let Some(cell) = cells.next() {
        if labels.contains(&element_text(cell).trim_end_matches(':')) {
            return cells.next();
        }
    }
    None
}

fn parse_comments_table(table: ElementRef<'_>) -> Result<Vec<SongComment>, UsdbError> {
    let mut comments = Vec::new();
    for header in table.select(&COMMENT_HEADER) {
        let meta = header.select(&TD).next().map(element_text).unwrap_or_default();
        let Some((date_time, author)) = meta.trim_start_matches("[del] [edit] ").split_once(" | ")
        else {
            // the form for a new comment
            break;
        };
        let date_time = NaiveDateTime::parse_from_str(date_time.trim(), DATETIME_FORMAT)
            .map_err(|e| UsdbError::parse(format!("comment date '{}': {}", date_time, e)))?;
        let Some(body) = header.next_siblings().find_map(ElementRef::wrap) else {
            debug!("Comment by '{}' has no body.", author.trim());
            continue;
        };
        comments.push(SongComment {
            date_time,
            author: author.trim().to_string(),
            contents: parse_comment_contents(body),
        });
    }
    Ok(comments)
}

/// Text of an element with emoji images replaced by their title
fn text_with_emojis(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if e.name() == "img" => text.push_str(e.attr("title").unwrap_or("")),
            _ => {}
        }
    }
    text.trim().to_string()
}

fn parse_comment_contents(row: ElementRef<'_>) -> CommentContents {
    let text = row
        .select(&TD)
        .next()
        .map(text_with_emojis)
        .unwrap_or_default();

    let mut contents = CommentContents {
        text,
        ..Default::default()
    };
    for url in comment_urls(row, &contents.text) {
        match extract_youtube_id(&url) {
            Some(id) => contents.youtube_ids.push(id),
            None => contents.urls.push(url),
        }
    }
    contents
}

/// Embedded videos, then iframes, then links, then plain URLs in the text
fn comment_urls(row: ElementRef<'_>, text: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for (selector, attr) in [(&*EMBED, "src"), (&*IFRAME, "src"), (&*ANCHOR, "href")] {
        urls.extend(
            row.select(selector)
                .filter_map(|element| element.value().attr(attr))
                .filter(|src| VIDEO_SOURCE_FULL.is_match(src))
                .map(str::to_string),
        );
    }
    urls.extend(
        VIDEO_SOURCE_IN_TEXT
            .captures_iter(text)
            .map(|c| c[1].to_string()),
    );
    urls
}

/// Extract the YouTube id from the many URL shapes YouTube uses
pub fn extract_youtube_id(url: &str) -> Option<String> {
    YOUTUBE_ID.captures(url).map(|c| c[1].to_string())
}

/// Parse the txt page of a song
pub fn parse_song_txt(html: &str) -> Result<String, UsdbError> {
    let document = Html::parse_document(html);
    document
        .select(&TEXTAREA)
        .next()
        .map(|textarea| textarea.text().collect())
        .ok_or_else(|| UsdbError::parse("textarea for notes not found"))
}

/// Parse one page of the song list
///
/// Every song is a row of cells opening its detail page, in the column order
/// id/artist, title, edition, golden notes, language, rating, views.
pub fn parse_song_list(html: &str) -> Vec<UsdbSong> {
    let document = Html::parse_document(html);
    document
        .select(&TR)
        .filter_map(parse_song_list_row)
        .collect()
}

fn parse_song_list_row(row: ElementRef<'_>) -> Option<UsdbSong> {
    let cells: Vec<ElementRef<'_>> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| LIST_CELL.matches(cell))
        .collect();
    let [artist, title, edition, golden_notes, language, rating, views] = cells.as_slice() else {
        return None;
    };
    let song_id = artist
        .value()
        .attr("onclick")?
        .strip_prefix("show_detail(")?
        .strip_suffix(')')?
        .parse()
        .ok()?;
    Some(UsdbSong {
        song_id,
        artist: element_text(*artist),
        title: element_text(*title),
        edition: element_text(*edition),
        golden_notes: YES.contains(&element_text(*golden_notes).as_str()),
        language: element_text(*language),
        rating: rating
            .select(&IMG)
            .filter(|img| img.value().attr("src").is_some_and(|src| src.contains("star.png")))
            .count() as u32,
        views: element_text(*views).parse().unwrap_or(0),
    })
}

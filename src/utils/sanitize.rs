//! Filename and folder naming rules for song folders

use regex::Regex;
use std::sync::LazyLock;

/// Matches the ending of a resource file name, including the cover/background
/// markers, e.g. `" [CO].jpg"` in `"Artist - Title [CO].jpg"`.
static FILE_ENDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+?((?: \[(?:CO|BG)\])?\.[^.]+)$").expect("valid regex"));

static NUMERIC_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ \(\d+\)$").expect("valid regex"));

/// Sanitize a filename for safe filesystem usage
///
/// Drops characters that are rejected or ambiguous on common filesystems and
/// replaces brackets and path separators with harmless lookalikes.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '?' | ':' | '"' | '\0' => {}
            '<' => out.push('('),
            '>' => out.push(')'),
            '/' | '\\' | '|' | '*' => out.push('-'),
            _ => out.push(c),
        }
    }
    // Windows does not like trailing periods
    if out.ends_with('.') {
        out.truncate(out.trim_end_matches([' ', '.']).len());
    }
    out.trim().to_string()
}

/// True if `text` is `name` or `"name (n)"` for some number n.
pub fn is_name_maybe_with_suffix(text: &str, name: &str) -> bool {
    match text.strip_prefix(name) {
        Some("") => true,
        Some(tail) => NUMERIC_SUFFIX.is_match(tail),
        None => false,
    }
}

/// The ending of a resource file name (extension plus `[CO]`/`[BG]` marker),
/// or an empty string if the name has no extension.
pub fn resource_file_ending(name: &str) -> &str {
    FILE_ENDING
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map_or("", |m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_removes_punctuation() {
        assert_eq!(sanitize_filename("What? Now: \"Yes\""), "What Now Yes");
    }

    #[test]
    fn test_sanitize_replaces_separators() {
        assert_eq!(sanitize_filename("AC/DC - Back\\In|Black*"), "AC-DC - Back-In-Black-");
        assert_eq!(sanitize_filename("<Intro>"), "(Intro)");
    }

    #[test]
    fn test_sanitize_trailing_periods() {
        assert_eq!(sanitize_filename("P!nk - So What . . ."), "P!nk - So What");
        assert_eq!(sanitize_filename("Mr. Brightside"), "Mr. Brightside");
    }

    #[test]
    fn test_no_changes_needed() {
        assert_eq!(sanitize_filename("Queen - Bohemian Rhapsody"), "Queen - Bohemian Rhapsody");
    }

    #[test]
    fn test_trim_whitespace() {
        assert_eq!(sanitize_filename("  Artist - Title  "), "Artist - Title");
    }

    #[test]
    fn test_name_with_suffix() {
        assert!(is_name_maybe_with_suffix("A - B", "A - B"));
        assert!(is_name_maybe_with_suffix("A - B (12)", "A - B"));
        assert!(!is_name_maybe_with_suffix("A - B (x)", "A - B"));
        assert!(!is_name_maybe_with_suffix("A - Bc", "A - B"));
        assert!(!is_name_maybe_with_suffix("X - Y", "A - B"));
    }

    #[test]
    fn test_resource_file_ending() {
        assert_eq!(resource_file_ending("A - B.mp3"), ".mp3");
        assert_eq!(resource_file_ending("A - B [CO].jpg"), " [CO].jpg");
        assert_eq!(resource_file_ending("A - B [BG].jpg"), " [BG].jpg");
        assert_eq!(resource_file_ending("Mr. X - Y.webm"), ".webm");
        assert_eq!(resource_file_ending("no_extension"), "");
    }
}

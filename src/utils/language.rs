//! ISO 639-2/B codes for the language names used in song headers

/// Code used when a language name is unknown
pub const UNDETERMINED: &str = "und";

const ISO_639_2B: &[(&str, &str)] = &[
    ("Afrikaans", "afr"),
    ("Albanian", "alb"),
    ("Arabic", "ara"),
    ("Armenian", "arm"),
    ("Basque", "baq"),
    ("Belarusian", "bel"),
    ("Bengali", "ben"),
    ("Bosnian", "bos"),
    ("Breton", "bre"),
    ("Bulgarian", "bul"),
    ("Catalan", "cat"),
    ("Chinese", "chi"),
    ("Croatian", "hrv"),
    ("Czech", "cze"),
    ("Danish", "dan"),
    ("Dutch", "dut"),
    ("English", "eng"),
    ("Esperanto", "epo"),
    ("Estonian", "est"),
    ("Faroese", "fao"),
    ("Finnish", "fin"),
    ("French", "fre"),
    ("Galician", "glg"),
    ("Georgian", "geo"),
    ("German", "ger"),
    ("Greek", "gre"),
    ("Hebrew", "heb"),
    ("Hindi", "hin"),
    ("Hungarian", "hun"),
    ("Icelandic", "ice"),
    ("Indonesian", "ind"),
    ("Irish", "gle"),
    ("Italian", "ita"),
    ("Japanese", "jpn"),
    ("Korean", "kor"),
    ("Latin", "lat"),
    ("Latvian", "lav"),
    ("Lithuanian", "lit"),
    ("Luxembourgish", "ltz"),
    ("Macedonian", "mac"),
    ("Malay", "may"),
    ("Maltese", "mlt"),
    ("Norwegian", "nor"),
    ("Persian", "per"),
    ("Polish", "pol"),
    ("Portuguese", "por"),
    ("Romanian", "rum"),
    ("Russian", "rus"),
    ("Scottish Gaelic", "gla"),
    ("Serbian", "srp"),
    ("Slovak", "slo"),
    ("Slovenian", "slv"),
    ("Spanish", "spa"),
    ("Swahili", "swa"),
    ("Swedish", "swe"),
    ("Tagalog", "tgl"),
    ("Thai", "tha"),
    ("Turkish", "tur"),
    ("Ukrainian", "ukr"),
    ("Vietnamese", "vie"),
    ("Welsh", "wel"),
    ("Yiddish", "yid"),
];

/// Map a language name like `"German"` to its ISO 639-2/B code
pub fn language_code(name: &str) -> &'static str {
    let name = name.trim();
    ISO_639_2B
        .iter()
        .find(|(lang, _)| lang.eq_ignore_ascii_case(name))
        .map_or(UNDETERMINED, |(_, code)| code)
}

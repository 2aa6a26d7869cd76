//! Normalizes a raw Usenet subject line into a [`ParsedSubject`].
//!
//! Ported from the ingest service's `parsers.py` (`normalize_subject`, `extract_tags`,
//! `extract_music_tags`, `extract_book_tags`, `extract_xxx_tags`, `detect_language`):
//! bracketed tags and structured domain hints are captured before the subject is
//! cleaned, then cleaning runs in the same order the original applies it.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ParsedSubject;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\[\]]+)\]").unwrap());
static PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\(\[]\s*(\d+)\s*/\s*\d+\s*[\)\]]").unwrap()
});
static MUSIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<artist>[^-]+)-(?P<album>[^-]+)-(?P<year>\d{4})-(?P<format>FLAC|MP3)(?:-(?P<bitrate>\d{3}))?").unwrap()
});
static BOOK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<author>[^-]+)-(?P<title>[^-]+)-(?P<year>\d{4})-(?P<format>EPUB|MOBI|PDF)(?:-(?P<isbn>\d{10,13}))?").unwrap()
});
static XXX_STUDIO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<studio>[A-Za-z0-9]+(?:\.[A-Za-z0-9]+)+)\.(?P<date>\d{4})\.(?P<resolution>\d{3,4}p)").unwrap()
});
static XXX_SITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<site>[A-Za-z0-9]+(?:\.[A-Za-z0-9]+)+)\.(?P<date>\d{4}\.\d{2}\.\d{2})").unwrap()
});
static FILLER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(repost|sample)\b").unwrap());
static YENC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\byenc\b").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static TRIM_SEP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-\s]+|[-\s]+$").unwrap());

/// Bracketed language tokens recognized verbatim, checked case-insensitively.
const LANGUAGE_TOKENS: &[(&str, &str)] = &[("[ITA]", "it"), ("[FRENCH]", "fr"), ("[GERMAN]", "de")];

/// Parse a raw subject line into its normalized title, tag set, part number, language,
/// and extension hint. Deterministic and infallible: malformed input degrades to an
/// empty title rather than an error.
pub fn parse(subject: &str, detect_language: bool) -> ParsedSubject {
    let subject = sanitize(subject);
    if subject.is_empty() {
        return ParsedSubject::default();
    }

    let mut tags: Vec<String> = extract_tags(&subject);
    let mut extension = None;

    if let Some(caps) = MUSIC_RE.captures(&subject) {
        push_structured_tags(&mut tags, &caps, &["artist", "album", "year", "format", "bitrate"]);
        extension = caps.name("format").map(|m| m.as_str().to_lowercase());
    }
    if let Some(caps) = BOOK_RE.captures(&subject) {
        push_structured_tags(&mut tags, &caps, &["author", "title", "year", "format", "isbn"]);
        extension = extension.or_else(|| caps.name("format").map(|m| m.as_str().to_lowercase()));
    }
    if let Some(caps) = XXX_STUDIO_RE.captures(&subject) {
        push_structured_tags(&mut tags, &caps, &["studio", "date", "resolution"]);
    } else if let Some(caps) = XXX_SITE_RE.captures(&subject) {
        push_structured_tags(&mut tags, &caps, &["site", "date"]);
    }

    let segment_number = PART_RE
        .captures(&subject)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(1);

    let language = if detect_language {
        detect_language_token(&subject).or_else(|| ascii_heuristic(&subject))
    } else {
        None
    };

    let norm_title = clean(&subject);

    tags.sort();
    tags.dedup();

    ParsedSubject { norm_title, tags, segment_number, language, extension }
}

/// Re-encode lossily so NUL bytes and lone surrogate code points never survive into
/// `norm_title` or a stored `message_id`. `subject.to_string()` already guarantees
/// valid UTF-8 for a `&str` input; this exists for callers handing us bytes that
/// originated as WTF-8/Latin-1 off the wire and were decoded leniently upstream.
fn sanitize(subject: &str) -> String {
    subject.replace('\0', "").chars().filter(|c| !is_surrogate_replacement(*c)).collect()
}

fn is_surrogate_replacement(c: char) -> bool {
    c == '\u{FFFD}'
}

fn extract_tags(subject: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for caps in TAG_RE.captures_iter(subject) {
        let content = &caps[1];
        for tag in content.split([' ', ',']) {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() {
                tags.push(tag);
            }
        }
    }
    tags
}

fn push_structured_tags(tags: &mut Vec<String>, caps: &regex::Captures, names: &[&str]) {
    for name in names {
        if let Some(m) = caps.name(name) {
            let value = m.as_str().replace('.', " ").to_lowercase();
            if !value.is_empty() {
                tags.push(value);
            }
        }
    }
}

fn detect_language_token(subject: &str) -> Option<String> {
    let upper = subject.to_uppercase();
    LANGUAGE_TOKENS
        .iter()
        .find(|(token, _)| upper.contains(token))
        .map(|(_, code)| code.to_string())
}

/// Degraded-mode fallback used when no bracketed language token is present: `"en"`
/// when the cleaned text is ASCII-only, `None` otherwise. This matches the original
/// service's own behavior when its optional language-detection dependency is absent.
fn ascii_heuristic(subject: &str) -> Option<String> {
    let cleaned = clean(subject);
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.is_ascii() {
        Some("en".to_string())
    } else {
        None
    }
}

fn clean(subject: &str) -> String {
    let mut cleaned = subject.replace(['.', '_'], " ");
    cleaned = TAG_RE.replace_all(&cleaned, "").to_string();
    cleaned = YENC_RE.replace_all(&cleaned, "").to_string();
    cleaned = PART_RE.replace_all(&cleaned, "").to_string();
    for (token, _) in LANGUAGE_TOKENS {
        let escaped = regex::escape(token);
        if let Ok(re) = Regex::new(&format!("(?i){escaped}")) {
            cleaned = re.replace_all(&cleaned, "").to_string();
        }
    }
    cleaned = FILLER_RE.replace_all(&cleaned, "").to_string();
    cleaned = WHITESPACE_RE.replace_all(&cleaned, " ").trim().to_string();
    cleaned = TRIM_SEP_RE.replace_all(&cleaned, "").to_string();
    cleaned.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_part_movie_subject() {
        let parsed = parse("Awesome.Film.2024.1080p.BluRay.x264 (1/1)", true);
        assert_eq!(parsed.norm_title, "awesome film 2024 1080p bluray x264");
        assert_eq!(parsed.segment_number, 1);
    }

    #[test]
    fn part_marker_is_stripped_and_number_extracted() {
        let parsed = parse("Release.Name (2/5)", true);
        assert_eq!(parsed.norm_title, "release name");
        assert_eq!(parsed.segment_number, 2);
    }

    #[test]
    fn bracketed_tags_are_lowercased_and_stripped_from_title() {
        let parsed = parse("Some.Show.S01E02.[FRENCH][1080p]", true);
        assert!(parsed.tags.contains(&"french".to_string()) || parsed.language == Some("fr".to_string()));
        assert!(parsed.tags.contains(&"1080p".to_string()));
        assert!(!parsed.norm_title.contains('['));
    }

    #[test]
    fn surrogate_and_nul_bytes_are_sanitized() {
        let parsed = parse("Example\u{FFFD}(1/1)", true);
        assert_eq!(parsed.norm_title, "example");
    }

    #[test]
    fn deterministic_across_repeated_calls() {
        let subject = "Band-Album-2020-FLAC";
        assert_eq!(parse(subject, true), parse(subject, true));
    }

    #[test]
    fn detect_language_false_disables_detection() {
        let parsed = parse("Some English Only Subject", false);
        assert!(parsed.language.is_none());
    }

    #[test]
    fn music_extractor_recovers_structured_tags() {
        let parsed = parse("SomeBand-GreatAlbum-2021-FLAC", true);
        assert!(parsed.tags.iter().any(|t| t.contains("greatalbum") || t == "flac"));
        assert_eq!(parsed.extension.as_deref(), Some("flac"));
    }

    #[test]
    fn norm_title_never_contains_uppercase() {
        let parsed = parse("UPPER.CASE.Subject", true);
        assert_eq!(parsed.norm_title, parsed.norm_title.to_lowercase());
    }
}

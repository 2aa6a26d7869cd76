//! Maps `(group, subject, tags)` to a Newznab category id.
//!
//! Ported from the ingest service's `_infer_category` in `main.py`, extended to the
//! fuller Newznab sub-category table: group-name hints win first, then an explicit
//! tag match, then subject keyword heuristics, with `other` (7000) as the fallback.

/// Console.
pub const CAT_CONSOLE: u32 = 1000;
/// Movies.
pub const CAT_MOVIES: u32 = 2000;
/// Audio, a.k.a. music — both names resolve to the same id.
pub const CAT_AUDIO: u32 = 3000;
/// PC software.
pub const CAT_PC: u32 = 4000;
/// TV.
pub const CAT_TV: u32 = 5000;
/// Adult.
pub const CAT_XXX: u32 = 6000;
/// Catch-all.
pub const CAT_OTHER: u32 = 7000;
pub const CAT_MISC: u32 = 7010;
/// Ebooks/books — both names resolve to the same id.
pub const CAT_EBOOK: u32 = 7020;
pub const CAT_COMICS: u32 = 7030;

/// `(keyword, category_id)`, longest keyword wins on tie for specificity.
const GROUP_CATEGORY_HINTS: &[(&str, u32)] = &[
    ("movies", CAT_MOVIES),
    ("tv", CAT_TV),
    ("music", CAT_AUDIO),
    ("audio", CAT_AUDIO),
    ("sounds", CAT_AUDIO),
    ("mp3", CAT_AUDIO),
    ("flac", CAT_AUDIO),
    ("ebook", CAT_EBOOK),
    ("ebooks", CAT_EBOOK),
    ("books", CAT_EBOOK),
    ("comics", CAT_COMICS),
    ("comic", CAT_COMICS),
    ("erotica", CAT_XXX),
    ("xxx", CAT_XXX),
    ("console", CAT_CONSOLE),
    ("games", CAT_CONSOLE),
    ("pc", CAT_PC),
    ("apps", CAT_PC),
];

/// `(tag, category_id)` checked verbatim against the lowercase tag set.
const TAG_CATEGORY_MAP: &[(&str, u32)] = &[
    ("flac", CAT_AUDIO),
    ("mp3", CAT_AUDIO),
    ("aac", CAT_AUDIO),
    ("audiobook", CAT_AUDIO),
    ("epub", CAT_EBOOK),
    ("mobi", CAT_EBOOK),
    ("pdf", CAT_EBOOK),
    ("cbz", CAT_COMICS),
    ("cbr", CAT_COMICS),
    ("comic", CAT_COMICS),
];

const TV_EPISODE_RE_HINTS: &[&str] = &["s01e", "s02e", "s03e", "s04e", "s05e"];

/// Infer a Newznab category id. Total over all inputs; never fails.
///
/// Group-name hints win first, but a subject-keyword refinement (e.g. `bluray` ->
/// 2050) still applies on top when it lands in the same coarse bucket the group hint
/// picked — a group hint only establishes the 1000s bucket, it never outranks a more
/// specific id the subject itself supports.
pub fn infer(subject: &str, tags: &[String], group: &str) -> u32 {
    let keyword_cat = from_keywords(subject);

    if let Some(cat) = from_group(group) {
        if coarse(keyword_cat) == coarse(cat) {
            return keyword_cat;
        }
        return cat;
    }
    if let Some(cat) = from_tags(tags) {
        return cat;
    }
    keyword_cat
}

/// The 1000s bucket a category id belongs to (2050 -> 2000).
fn coarse(cat: u32) -> u32 {
    (cat / 1000) * 1000
}

fn from_group(group: &str) -> Option<u32> {
    let lower = group.to_lowercase();
    GROUP_CATEGORY_HINTS
        .iter()
        .filter(|(kw, _)| lower.contains(kw))
        .max_by_key(|(kw, _)| kw.len())
        .map(|(_, cat)| *cat)
}

fn from_tags(tags: &[String]) -> Option<u32> {
    TAG_CATEGORY_MAP
        .iter()
        .find(|(tag, _)| tags.iter().any(|t| t == tag))
        .map(|(_, cat)| *cat)
}

fn from_keywords(subject: &str) -> u32 {
    let lower = subject.to_lowercase();

    if is_tv_episode(&lower) {
        return refine_tv(&lower);
    }
    if contains_any(&lower, &["flac", "mp3", "aac", "audiobook"]) {
        return CAT_AUDIO;
    }
    if contains_any(&lower, &["epub", "mobi", "pdf"]) {
        return CAT_EBOOK;
    }
    if contains_any(&lower, &["cbz", "cbr", "comic"]) {
        return CAT_COMICS;
    }
    if contains_any(&lower, &["bluray", "3d", "hdrip", "webrip", "dvdrip", "xvid", "cam"]) {
        return refine_movie(&lower);
    }
    if contains_any(&lower, &["xxx", "porn", "erotic"]) {
        return CAT_XXX;
    }

    CAT_OTHER
}

fn is_tv_episode(lower: &str) -> bool {
    TV_EPISODE_RE_HINTS.iter().any(|hint| lower.contains(hint))
        || sxxexx_pattern(lower)
}

/// Matches a generic `sNNeNN` pattern beyond the small literal hint table above.
fn sxxexx_pattern(lower: &str) -> bool {
    let bytes = lower.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b's' && bytes[i + 1].is_ascii_digit() {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'e' && j + 1 < bytes.len() && bytes[j + 1].is_ascii_digit() {
                return true;
            }
        }
        i += 1;
    }
    false
}

fn refine_tv(lower: &str) -> u32 {
    if contains_any(lower, &["sport"]) {
        return 5060;
    }
    if contains_any(lower, &["1080p", "720p"]) {
        return 5040;
    }
    if contains_any(lower, &["xvid", "dvdrip"]) {
        return 5020;
    }
    CAT_TV
}

fn refine_movie(lower: &str) -> u32 {
    if contains_any(lower, &["3d"]) {
        return 2060;
    }
    if contains_any(lower, &["bluray"]) {
        return 2050;
    }
    if contains_any(lower, &["1080p", "720p", "hdrip", "webrip"]) {
        return 2040;
    }
    if contains_any(lower, &["dvdrip", "xvid", "cam"]) {
        return 2020;
    }
    CAT_MOVIES
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_hint_wins_over_keywords() {
        let cat = infer("Some.Random.Release", &[], "alt.binaries.movies");
        assert_eq!(cat, CAT_MOVIES);
    }

    #[test]
    fn audio_and_music_hints_alias_to_same_id() {
        assert_eq!(infer("x", &[], "alt.binaries.sounds.music"), CAT_AUDIO);
        assert_eq!(infer("x", &[], "alt.binaries.sounds.flac"), CAT_AUDIO);
    }

    #[test]
    fn explicit_tag_wins_over_keyword_heuristics() {
        let cat = infer("Unrelated subject with no hints", &["epub".to_string()], "alt.binaries.misc");
        assert_eq!(cat, CAT_EBOOK);
    }

    #[test]
    fn tv_episode_pattern_refines_by_resolution() {
        let cat = infer("Show.Name.S01E02.1080p.WEB", &[], "alt.binaries.misc");
        assert_eq!(cat, 5040);
    }

    #[test]
    fn movie_keyword_refinement() {
        let cat = infer("Some.Movie.2024.BluRay.x264", &[], "alt.binaries.misc");
        assert_eq!(cat, 2050);
    }

    #[test]
    fn movie_keyword_refinement_applies_even_under_a_matching_group_hint() {
        let cat = infer(
            "Awesome.Film.2024.1080p.BluRay.x264 (1/1)",
            &[],
            "alt.binaries.movies",
        );
        assert_eq!(cat, 2050);
    }

    #[test]
    fn group_hint_with_no_keyword_refinement_stays_coarse() {
        let cat = infer("Some.Random.Release", &[], "alt.binaries.movies");
        assert_eq!(cat, CAT_MOVIES);
    }

    #[test]
    fn unknown_subject_falls_back_to_other() {
        let cat = infer("completely unrecognizable text", &[], "alt.binaries.misc");
        assert_eq!(cat, CAT_OTHER);
    }

    #[test]
    fn total_function_never_panics_on_empty_input() {
        let _ = infer("", &[], "");
    }
}

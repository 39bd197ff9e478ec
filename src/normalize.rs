//! Shared text conventions for source rows and reporting labels.
//!
//! Missing-value placeholders, composite genre labels, track-origin
//! classification and the ASCII-folded artist keys used by diagnostics.
//! The resolver itself matches on raw strings; nothing here rewrites a
//! title or artist before linkage except the trim inside the composite key.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// PLACEHOLDERS
// ============================================================================

/// Artist substituted when a row has a title but no artist.
pub const NO_ARTIST: &str = "No Artist";

/// Label for a reporting cell with no values.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Separator between segments of a composite label ("Soundtrack && Pop").
pub const COMPOSITE_SEPARATOR: &str = "&&";

/// Joiner used when flattening several values into one label.
pub const LABEL_JOINER: &str = " && ";

// Track origin classes
pub const ORIGIN_LIBRARY: &str = "library";
pub const ORIGIN_SEARCH: &str = "search";
pub const ORIGIN_RECENTLY_PLAYED: &str = "for you - recently played";
pub const ORIGIN_PERSONALIZED_MIX: &str = "for you - personalized mix";
pub const ORIGIN_FOR_YOU_OTHER: &str = "for you - other";
pub const ORIGIN_OTHER: &str = "other";

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Regex to collapse runs of whitespace into a single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Leading article on artist names: "The Beatles"
pub static LEADING_ARTICLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^the\s+").unwrap());

// ============================================================================
// MISSING VALUES AND LABELS
// ============================================================================

/// The row's artist, or [`NO_ARTIST`] when it is missing.
pub fn artist_or_placeholder(artist: Option<&str>) -> &str {
    artist.unwrap_or(NO_ARTIST)
}

/// Genre vocabulary entry as shown in reports: missing becomes "", others
/// are trimmed.
pub fn simplify_genre(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or_default().to_string()
}

/// Trimmed segments of a possibly composite label.
/// "Soundtrack && Pop" → ["Soundtrack", "Pop"]; "Rock" → ["Rock"].
pub fn split_composite(label: &str) -> impl Iterator<Item = &str> {
    label.split(COMPOSITE_SEPARATOR).map(str::trim)
}

/// Flatten values into one label: none → "Unknown", one → itself,
/// several → joined with " && ".
pub fn join_labels<S: AsRef<str>>(values: &[S]) -> String {
    match values {
        [] => UNKNOWN_LABEL.to_string(),
        [single] => single.as_ref().to_string(),
        many => many
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(LABEL_JOINER),
    }
}

// ============================================================================
// DERIVED COLUMNS
// ============================================================================

/// Classify the play-activity "Feature Name" (e.g. "for_you/recently_played")
/// into a track origin.
pub fn classify_track_origin(feature_name: Option<&str>) -> &'static str {
    let Some(feature) = feature_name else {
        return ORIGIN_OTHER;
    };
    let mut segments = feature.split('/');
    let category = segments.next().unwrap_or_default().trim();

    match category {
        "search" | "browse" => ORIGIN_SEARCH,
        "library" | "my-music" | "playlists" | "playlist_detail" => ORIGIN_LIBRARY,
        "for_you" => match segments.next().map(str::trim) {
            Some("recently_played") => ORIGIN_RECENTLY_PLAYED,
            Some("personalized_mix") => ORIGIN_PERSONALIZED_MIX,
            _ => ORIGIN_FOR_YOU_OTHER,
        },
        _ => ORIGIN_OTHER,
    }
}

/// Split a likes/dislikes "Item Description" of the form "Artist - Title"
/// into `(artist, title)`. Empty pieces are reported as missing.
pub fn split_item_description(description: &str) -> (Option<String>, Option<String>) {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };
    let artist = description.split(" - ").next().and_then(non_empty);
    let title = description.split(" -").nth(1).and_then(non_empty);
    (artist, title)
}

// ============================================================================
// ASCII FOLDING (diagnostics only)
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII.
/// e.g., "Beyoncé" → "beyonce", "Stéphane" → "stephane"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

/// Straighten curly quotes and spell out "&".
pub fn normalize_punctuation(s: &str) -> String {
    let result = s
        .replace(['\u{2018}', '\u{2019}', '\u{00B4}', '\u{0060}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(" & ", " and ");
    MULTI_SPACE.replace_all(&result, " ").to_string()
}

/// Comparison key for spotting near-duplicate artist strings.
///
/// Never used for linkage: two different artist strings stay two artists.
pub fn artist_comparison_key(artist: &str) -> String {
    let folded = fold_to_ascii(&normalize_punctuation(artist));
    let trimmed = folded.trim();
    LEADING_ARTICLE.replace(trimmed, "").to_string()
}

// ============================================================================
// TESTS
// ============================================================================

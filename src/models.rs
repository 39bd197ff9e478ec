//! Core data models for listening-history resolution.
//!
//! This module contains the canonical [`Track`] entity, its provenance
//! records, the typed rows of the four source tables, and the bookkeeping
//! (unmatched ledger, run statistics) produced by one resolution run.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// Position of a track in the resolver's arena. Assigned from the creation
/// counter, so it doubles as the track's id.
pub type TrackId = usize;

/// Index mapping the exact (title, artist) key to its owning track.
pub type TitleArtistIndex = FxHashMap<TitleArtistKey, TrackId>;

/// Artist string to every distinct title seen for it, in first-seen order.
/// Drives similarity lookups only; never used to merge artists.
pub type ArtistTitles = FxHashMap<String, Vec<String>>;

/// External identifier to the lowest track id carrying it.
pub type IdentifierIndex = FxHashMap<String, TrackId>;

// ============================================================================
// Provenance
// ============================================================================

/// Which source table a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    LibraryTracks,
    IdentifierInfo,
    PlayActivity,
    LikesDislikes,
}

impl SourceTag {
    /// Tags in pass order.
    pub const ALL: [SourceTag; 4] = [
        SourceTag::LibraryTracks,
        SourceTag::IdentifierInfo,
        SourceTag::PlayActivity,
        SourceTag::LikesDislikes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceTag::LibraryTracks => "library_tracks",
            SourceTag::IdentifierInfo => "identifier_info",
            SourceTag::PlayActivity => "play_activity",
            SourceTag::LikesDislikes => "likes_dislikes",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source row that contributed to a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Appearance {
    pub source: SourceTag,
    pub row_index: usize,
}

/// Preference attached to a track. LIKE is folded into LOVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rating {
    Love,
    Dislike,
}

impl Rating {
    /// Parse a raw rating value. Anything other than LOVE, LIKE or DISLIKE is
    /// not a rating.
    pub fn parse(raw: &str) -> Option<Rating> {
        match raw {
            "LOVE" | "LIKE" => Some(Rating::Love),
            "DISLIKE" => Some(Rating::Dislike),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Love => "LOVE",
            Rating::Dislike => "DISLIKE",
        }
    }
}

// ============================================================================
// Track Entity
// ============================================================================

/// Canonical track: one real-world song as inferred by the resolver.
///
/// All mutation is additive. Titles, genres, identifiers and ratings are
/// insertion-ordered sets; appearances are append-only; the library flag
/// only ever goes from false to true.
#[derive(Clone, Debug, Serialize)]
pub struct Track {
    id: TrackId,
    titles: Vec<String>,
    artist: String,
    is_in_library: bool,
    appearances: Vec<Appearance>,
    genres: Vec<String>,
    external_ids: Vec<String>,
    ratings: Vec<Rating>,
}

impl Track {
    /// Create a track from the title and artist that first identified it.
    pub fn new(id: TrackId, title: &str, artist: &str) -> Self {
        let mut track = Self {
            id,
            titles: Vec::new(),
            artist: String::new(),
            is_in_library: false,
            appearances: Vec::new(),
            genres: Vec::new(),
            external_ids: Vec::new(),
            ratings: Vec::new(),
        };
        track.add_title(title);
        track.set_artist(artist);
        track
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Title the track was created with.
    pub fn primary_title(&self) -> &str {
        self.titles.first().map(String::as_str).unwrap_or_default()
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn is_in_library(&self) -> bool {
        self.is_in_library
    }

    pub fn appearances(&self) -> &[Appearance] {
        &self.appearances
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn external_ids(&self) -> &[String] {
        &self.external_ids
    }

    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    pub fn has_title(&self, title: &str) -> bool {
        self.titles.iter().any(|t| t == title)
    }

    /// Append a title spelling. Returns true when it was new.
    pub fn add_title(&mut self, title: &str) -> bool {
        if self.has_title(title) {
            return false;
        }
        self.titles.push(title.to_string());
        true
    }

    /// Only called at creation; the artist never changes afterwards.
    pub fn set_artist(&mut self, artist: &str) {
        self.artist = artist.to_string();
    }

    pub fn has_external_id(&self, id: &str) -> bool {
        self.external_ids.iter().any(|e| e == id)
    }

    /// Append an external identifier. Returns true when it was new.
    pub fn add_external_id(&mut self, id: &str) -> bool {
        if self.has_external_id(id) {
            return false;
        }
        self.external_ids.push(id.to_string());
        true
    }

    pub fn mark_in_library(&mut self) {
        self.is_in_library = true;
    }

    /// Missing genres are ignored; others, blank included, are trimmed and
    /// kept once.
    pub fn add_genre(&mut self, genre: Option<&str>) {
        let Some(genre) = genre.map(str::trim) else {
            return;
        };
        if !self.genres.iter().any(|g| g == genre) {
            self.genres.push(genre.to_string());
        }
    }

    pub fn add_appearance(&mut self, source: SourceTag, row_index: usize) {
        self.appearances.push(Appearance { source, row_index });
    }

    pub fn add_rating(&mut self, raw: Option<&str>) {
        let Some(rating) = raw.and_then(Rating::parse) else {
            return;
        };
        if !self.ratings.contains(&rating) {
            self.ratings.push(rating);
        }
    }

    pub fn appears_in(&self, source: SourceTag) -> bool {
        self.appearances.iter().any(|a| a.source == source)
    }
}

// ============================================================================
// Composite Key
// ============================================================================

/// Exact-match key: title and artist, each trimmed.
///
/// Stored as a pair rather than a delimited string so that a separator
/// occurring inside a title can never collide with another key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TitleArtistKey {
    title: String,
    artist: String,
}

impl TitleArtistKey {
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            artist: artist.trim().to_string(),
        }
    }
}

impl fmt::Display for TitleArtistKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} && {}", self.title, self.artist)
    }
}

// ============================================================================
// Source Rows
// ============================================================================

/// Row of the library catalog.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LibraryTrackRow {
    #[serde(rename = "Title", default, deserialize_with = "deserialize_opt_text")]
    pub title: Option<String>,
    #[serde(rename = "Artist", default, deserialize_with = "deserialize_opt_text")]
    pub artist: Option<String>,
    #[serde(rename = "Genre", default, deserialize_with = "deserialize_opt_text")]
    pub genre: Option<String>,
    #[serde(rename = "Track Like Rating", default, deserialize_with = "deserialize_opt_text")]
    pub like_rating: Option<String>,
    #[serde(
        rename = "Apple Music Track Identifier",
        default,
        deserialize_with = "deserialize_opt_identifier"
    )]
    pub apple_music_id: Option<String>,
    #[serde(
        rename = "Tag Matched Track Identifier",
        default,
        deserialize_with = "deserialize_opt_identifier"
    )]
    pub tag_matched_id: Option<String>,
    #[serde(rename = "Track Identifier", default, deserialize_with = "deserialize_opt_identifier")]
    pub track_id: Option<String>,
    #[serde(
        rename = "Purchased Track Identifier",
        default,
        deserialize_with = "deserialize_opt_identifier"
    )]
    pub purchased_id: Option<String>,
}

impl LibraryTrackRow {
    /// Identifiers in precedence order: the Apple Music identifier plus a
    /// distinct tag-matched one when present, otherwise the plain track
    /// identifier plus the purchased one.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids = Vec::with_capacity(2);
        if let Some(apple_music) = self.apple_music_id.as_deref() {
            ids.push(apple_music);
            if let Some(tag_matched) = self.tag_matched_id.as_deref() {
                if tag_matched != apple_music {
                    ids.push(tag_matched);
                }
            }
        } else {
            if let Some(track) = self.track_id.as_deref() {
                ids.push(track);
            }
            if let Some(purchased) = self.purchased_id.as_deref() {
                ids.push(purchased);
            }
        }
        ids
    }
}

/// Row of the identifier cross-reference table.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IdentifierRow {
    #[serde(rename = "Identifier", default, deserialize_with = "deserialize_opt_identifier")]
    pub identifier: Option<String>,
    #[serde(rename = "Title", default, deserialize_with = "deserialize_opt_text")]
    pub title: Option<String>,
}

/// Row of the play-event log.
///
/// Exports name the title and artist columns either `Title`/`Artist` or
/// `Content Name`/`Artist Name`; tables carrying both prefer the former.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "PlayActivityColumns")]
pub struct PlayActivityRow {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    /// Pre-computed classification; filled from `feature_name` when absent.
    pub track_origin: Option<String>,
    pub feature_name: Option<String>,
    pub play_year: Option<i32>,
    pub event_start: Option<String>,
    pub event_end: Option<String>,
}

/// Play-event columns as exported, before alias columns are merged.
#[derive(Deserialize)]
struct PlayActivityColumns {
    #[serde(rename = "Title", default, deserialize_with = "deserialize_opt_text")]
    title: Option<String>,
    #[serde(rename = "Content Name", default, deserialize_with = "deserialize_opt_text")]
    content_name: Option<String>,
    #[serde(rename = "Artist", default, deserialize_with = "deserialize_opt_text")]
    artist: Option<String>,
    #[serde(rename = "Artist Name", default, deserialize_with = "deserialize_opt_text")]
    artist_name: Option<String>,
    #[serde(rename = "Genre", default, deserialize_with = "deserialize_opt_text")]
    genre: Option<String>,
    #[serde(rename = "Track origin", default, deserialize_with = "deserialize_opt_text")]
    track_origin: Option<String>,
    #[serde(rename = "Feature Name", default, deserialize_with = "deserialize_opt_text")]
    feature_name: Option<String>,
    #[serde(rename = "Play_Year", default, deserialize_with = "deserialize_opt_year")]
    play_year: Option<i32>,
    #[serde(rename = "Play Year", default, deserialize_with = "deserialize_opt_year")]
    play_year_spaced: Option<i32>,
    #[serde(rename = "Event Start Timestamp", default, deserialize_with = "deserialize_opt_text")]
    event_start: Option<String>,
    #[serde(rename = "Event End Timestamp", default, deserialize_with = "deserialize_opt_text")]
    event_end: Option<String>,
}

impl From<PlayActivityColumns> for PlayActivityRow {
    fn from(columns: PlayActivityColumns) -> Self {
        Self {
            title: columns.title.or(columns.content_name),
            artist: columns.artist.or(columns.artist_name),
            genre: columns.genre,
            track_origin: columns.track_origin,
            feature_name: columns.feature_name,
            play_year: columns.play_year.or(columns.play_year_spaced),
            event_start: columns.event_start,
            event_end: columns.event_end,
        }
    }
}

/// Row of the like/dislike log.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LikeDislikeRow {
    #[serde(rename = "Item Reference", default, deserialize_with = "deserialize_opt_identifier")]
    pub item_reference: Option<String>,
    #[serde(rename = "Title", default, deserialize_with = "deserialize_opt_text")]
    pub title: Option<String>,
    #[serde(rename = "Artist", default, deserialize_with = "deserialize_opt_text")]
    pub artist: Option<String>,
    #[serde(rename = "Preference", default, deserialize_with = "deserialize_opt_text")]
    pub preference: Option<String>,
    /// "Artist - Title"; source of `title`/`artist` when those are absent.
    #[serde(rename = "Item Description", default, deserialize_with = "deserialize_opt_text")]
    pub item_description: Option<String>,
}

// Exports mix JSON strings and numbers for the same column, and dataframe
// dumps write integers as floats (1234.0). These accept any scalar.

fn scalar_to_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 => Some(format!("{}", f as i64)),
                    _ => Some(n.to_string()),
                }
            }
        }
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn deserialize_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_text))
}

fn deserialize_opt_identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(scalar_to_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn deserialize_opt_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(scalar_to_text)
        .and_then(|s| s.trim().parse::<i32>().ok()))
}

// ============================================================================
// Run Bookkeeping
// ============================================================================

/// Rows that could not be linked to any track, per source table.
/// Diagnostic only; the resolver never reads it back.
#[derive(Clone, Debug, Default, Serialize)]
pub struct UnmatchedLedger {
    pub library_tracks: Vec<usize>,
    /// (row index, identifier) pairs.
    pub identifier_info: Vec<(usize, Option<String>)>,
    pub play_activity: Vec<usize>,
    pub likes_dislikes: Vec<usize>,
}

impl UnmatchedLedger {
    pub fn contains(&self, source: SourceTag, row_index: usize) -> bool {
        match source {
            SourceTag::LibraryTracks => self.library_tracks.contains(&row_index),
            SourceTag::IdentifierInfo => self.identifier_info.iter().any(|(i, _)| *i == row_index),
            SourceTag::PlayActivity => self.play_activity.contains(&row_index),
            SourceTag::LikesDislikes => self.likes_dislikes.contains(&row_index),
        }
    }

    pub fn len_for(&self, source: SourceTag) -> usize {
        match source {
            SourceTag::LibraryTracks => self.library_tracks.len(),
            SourceTag::IdentifierInfo => self.identifier_info.len(),
            SourceTag::PlayActivity => self.play_activity.len(),
            SourceTag::LikesDislikes => self.likes_dislikes.len(),
        }
    }

    pub fn total(&self) -> usize {
        SourceTag::ALL.iter().map(|s| self.len_for(*s)).sum()
    }
}

/// Per-pass linkage counts for one resolution run.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ResolverStats {
    // Pass 1: library catalog
    pub library_rows: usize,
    pub library_exact_matches: usize,
    pub library_similar_matches: usize,
    pub library_created: usize,
    pub library_missing_title: usize,

    // Pass 2: identifier table
    pub identifier_rows: usize,
    pub identifier_matches: usize,
    pub identifier_unmatched: usize,

    // Pass 3: play activity
    pub play_rows: usize,
    pub play_exact_matches: usize,
    pub play_similar_matches: usize,
    pub play_created: usize,
    pub play_missing_title: usize,
    pub play_library_flagged: usize, // tracks promoted to in-library by a play row

    // Pass 4: likes/dislikes
    pub likes_rows: usize,
    pub likes_identifier_matches: usize,
    pub likes_exact_matches: usize,
    pub likes_similar_matches: usize,
    pub likes_unmatched: usize,
    pub likes_missing_title: usize,

    // Final totals
    pub total_tracks: usize,
    pub total_unmatched: usize,

    // Timing
    pub elapsed_seconds: f64,
}

impl ResolverStats {
    pub fn rows_seen(&self) -> usize {
        self.library_rows + self.identifier_rows + self.play_rows + self.likes_rows
    }

    /// Share of all rows linked to some track, as a percentage.
    pub fn link_rate(&self) -> f64 {
        let seen = self.rows_seen();
        if seen == 0 {
            0.0
        } else {
            100.0 * (seen - self.total_unmatched.min(seen)) as f64 / seen as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

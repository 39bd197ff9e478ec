//! Track resolution: four ordered linkage passes over the source tables.
//!
//! The resolver owns every [`Track`] of a run in an arena indexed by
//! [`TrackId`], plus the indices that drive linkage:
//! - Title·Artist index: exact (title, artist) key to track
//! - Artist→Titles index: every title seen per artist, in first-seen order
//! - Identifier index: external identifier to the lowest track id carrying it
//!
//! Passes must run in order (library, identifiers, plays, likes). Each row is
//! either linked to a track, which records the appearance, or written to the
//! unmatched ledger. Nothing here fails: bad rows are ledger entries.

use crate::models::{
    ArtistTitles, IdentifierIndex, IdentifierRow, LibraryTrackRow, LikeDislikeRow, PlayActivityRow,
    ResolverStats, SourceTag, TitleArtistIndex, TitleArtistKey, Track, TrackId, UnmatchedLedger,
};
use crate::normalize::{artist_or_placeholder, ORIGIN_LIBRARY};
use crate::scoring::is_similar_title;
use crate::sources::SourceTables;

/// Outcome of the title/artist matching policy for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Linkage {
    /// Exact (title, artist) key already known
    Exact(TrackId),
    /// Same artist, title above the similarity threshold
    Similar(TrackId),
    NoMatch,
}

/// Mutable state of one resolution run.
pub struct TrackResolver {
    tracks: Vec<Track>,
    key_index: TitleArtistIndex,
    artist_titles: ArtistTitles,
    id_index: IdentifierIndex,
    genres: Vec<Option<String>>,
    unmatched: UnmatchedLedger,
    next_id: TrackId,
    stats: ResolverStats,
}

impl Default for TrackResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackResolver {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            key_index: TitleArtistIndex::default(),
            artist_titles: ArtistTitles::default(),
            id_index: IdentifierIndex::default(),
            genres: Vec::new(),
            unmatched: UnmatchedLedger::default(),
            next_id: 0,
            stats: ResolverStats::default(),
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    pub fn unmatched(&self) -> &UnmatchedLedger {
        &self.unmatched
    }

    /// Run the pass reading `source`. Callers iterate [`SourceTag::ALL`],
    /// which lists the sources in pass order.
    pub fn run_pass(&mut self, source: SourceTag, tables: &SourceTables) {
        match source {
            SourceTag::LibraryTracks => self.resolve_library_tracks(&tables.library_tracks),
            SourceTag::IdentifierInfo => self.resolve_identifier_info(&tables.identifier_info),
            SourceTag::PlayActivity => self.resolve_play_activity(&tables.play_activity),
            SourceTag::LikesDislikes => self.resolve_likes_dislikes(&tables.likes_dislikes),
        }
    }

    // ========================================================================
    // Pass 1: library catalog
    // ========================================================================

    /// Link or create a track for every titled library row. Library rows are
    /// authoritative for membership, rating and identifiers.
    pub fn resolve_library_tracks(&mut self, rows: &[LibraryTrackRow]) {
        for (row_index, row) in rows.iter().enumerate() {
            self.stats.library_rows += 1;

            let Some(title) = row.title.as_deref() else {
                self.stats.library_missing_title += 1;
                self.unmatched.library_tracks.push(row_index);
                continue;
            };
            let artist = artist_or_placeholder(row.artist.as_deref());

            let id = match self.link_by_title_artist(title, artist) {
                Linkage::Exact(id) => {
                    self.stats.library_exact_matches += 1;
                    id
                }
                Linkage::Similar(id) => {
                    self.stats.library_similar_matches += 1;
                    self.tracks[id].add_title(title);
                    id
                }
                Linkage::NoMatch => {
                    self.stats.library_created += 1;
                    self.create_track(title, artist)
                }
            };

            let track = &mut self.tracks[id];
            track.mark_in_library();
            track.add_appearance(SourceTag::LibraryTracks, row_index);
            track.add_genre(row.genre.as_deref());
            track.add_rating(row.like_rating.as_deref());
            for identifier in row.identifiers() {
                self.add_external_id(id, identifier);
            }
            self.record_genre(row.genre.as_deref());
            self.register_alias(id, title, artist);
        }
    }

    // ========================================================================
    // Pass 2: identifier table
    // ========================================================================

    /// Attach identifier rows to the track already carrying that identifier.
    /// Never creates tracks and never touches the title or artist indices.
    pub fn resolve_identifier_info(&mut self, rows: &[IdentifierRow]) {
        for (row_index, row) in rows.iter().enumerate() {
            self.stats.identifier_rows += 1;

            match self.track_for_identifier(row.identifier.as_deref()) {
                Some(id) => {
                    self.stats.identifier_matches += 1;
                    let track = &mut self.tracks[id];
                    track.add_appearance(SourceTag::IdentifierInfo, row_index);
                    if let Some(title) = row.title.as_deref() {
                        track.add_title(title);
                    }
                }
                None => {
                    self.stats.identifier_unmatched += 1;
                    self.unmatched
                        .identifier_info
                        .push((row_index, row.identifier.clone()));
                }
            }
        }
    }

    // ========================================================================
    // Pass 3: play activity
    // ========================================================================

    /// Link or create a track for every titled play row. A play only flags a
    /// track as in-library when its own origin says it was played from there.
    pub fn resolve_play_activity(&mut self, rows: &[PlayActivityRow]) {
        for (row_index, row) in rows.iter().enumerate() {
            self.stats.play_rows += 1;

            let Some(title) = row.title.as_deref() else {
                self.stats.play_missing_title += 1;
                self.unmatched.play_activity.push(row_index);
                continue;
            };
            let artist = artist_or_placeholder(row.artist.as_deref());

            let id = match self.link_by_title_artist(title, artist) {
                Linkage::Exact(id) => {
                    self.stats.play_exact_matches += 1;
                    id
                }
                Linkage::Similar(id) => {
                    self.stats.play_similar_matches += 1;
                    self.tracks[id].add_title(title);
                    id
                }
                Linkage::NoMatch => {
                    self.stats.play_created += 1;
                    self.create_track(title, artist)
                }
            };

            let track = &mut self.tracks[id];
            track.add_appearance(SourceTag::PlayActivity, row_index);
            track.add_genre(row.genre.as_deref());
            if !track.is_in_library() && row.track_origin.as_deref() == Some(ORIGIN_LIBRARY) {
                track.mark_in_library();
                self.stats.play_library_flagged += 1;
            }
            self.record_genre(row.genre.as_deref());
            self.register_alias(id, title, artist);
        }
    }

    // ========================================================================
    // Pass 4: likes / dislikes
    // ========================================================================

    /// Attach ratings to known tracks: by identifier first, then exact key,
    /// then a similar title of the same artist. Never creates tracks.
    pub fn resolve_likes_dislikes(&mut self, rows: &[LikeDislikeRow]) {
        for (row_index, row) in rows.iter().enumerate() {
            self.stats.likes_rows += 1;

            let Some(title) = row.title.as_deref() else {
                self.stats.likes_missing_title += 1;
                self.unmatched.likes_dislikes.push(row_index);
                continue;
            };
            let artist = artist_or_placeholder(row.artist.as_deref());

            if let Some(id) = self.track_for_identifier(row.item_reference.as_deref()) {
                self.stats.likes_identifier_matches += 1;
                self.apply_preference(id, row_index, title, row.preference.as_deref());
                // An identifier match never links two artist strings
                if self.tracks[id].artist() == artist {
                    self.register_alias(id, title, artist);
                }
                continue;
            }

            let id = match self.link_by_title_artist(title, artist) {
                Linkage::Exact(id) => {
                    self.stats.likes_exact_matches += 1;
                    id
                }
                Linkage::Similar(id) => {
                    self.stats.likes_similar_matches += 1;
                    id
                }
                Linkage::NoMatch => {
                    self.stats.likes_unmatched += 1;
                    self.unmatched.likes_dislikes.push(row_index);
                    continue;
                }
            };
            self.apply_preference(id, row_index, title, row.preference.as_deref());
            self.register_alias(id, title, artist);
        }
    }

    fn apply_preference(&mut self, id: TrackId, row_index: usize, title: &str, preference: Option<&str>) {
        let track = &mut self.tracks[id];
        track.add_appearance(SourceTag::LikesDislikes, row_index);
        track.add_rating(preference);
        track.add_title(title);
    }

    // ========================================================================
    // Matching policy
    // ========================================================================

    /// Exact key first, then the first known title of the same artist that
    /// clears the similarity threshold.
    fn link_by_title_artist(&self, title: &str, artist: &str) -> Linkage {
        if let Some(&id) = self.key_index.get(&TitleArtistKey::new(title, artist)) {
            return Linkage::Exact(id);
        }
        match self.find_similar_title(title, artist) {
            Some(id) => Linkage::Similar(id),
            None => Linkage::NoMatch,
        }
    }

    /// First-match, not best-match: the artist's titles are tried in the order
    /// they were first seen.
    fn find_similar_title(&self, title: &str, artist: &str) -> Option<TrackId> {
        let known_titles = self.artist_titles.get(artist)?;
        known_titles
            .iter()
            .filter(|known| is_similar_title(title, known))
            .find_map(|known| self.key_index.get(&TitleArtistKey::new(known, artist)).copied())
    }

    fn track_for_identifier(&self, identifier: Option<&str>) -> Option<TrackId> {
        identifier.and_then(|id| self.id_index.get(id).copied())
    }

    // ========================================================================
    // Registry updates
    // ========================================================================

    fn create_track(&mut self, title: &str, artist: &str) -> TrackId {
        let id = self.next_id;
        self.tracks.push(Track::new(id, title, artist));
        self.next_id += 1;
        id
    }

    fn add_external_id(&mut self, id: TrackId, identifier: &str) {
        if self.tracks[id].add_external_id(identifier) {
            self.id_index
                .entry(identifier.to_string())
                .and_modify(|owner| *owner = (*owner).min(id))
                .or_insert(id);
        }
    }

    /// Make `(title, artist)` an exact key for the track and a similarity
    /// candidate for the artist. An existing key keeps its owner.
    fn register_alias(&mut self, id: TrackId, title: &str, artist: &str) {
        self.key_index
            .entry(TitleArtistKey::new(title, artist))
            .or_insert(id);
        let titles = self.artist_titles.entry(artist.to_string()).or_default();
        if !titles.iter().any(|t| t == title) {
            titles.push(title.to_string());
        }
    }

    fn record_genre(&mut self, genre: Option<&str>) {
        if !self.genres.iter().any(|g| g.as_deref() == genre) {
            self.genres.push(genre.map(str::to_string));
        }
    }

    /// End the run and hand over everything it produced.
    pub fn finish(mut self) -> Resolution {
        self.stats.total_tracks = self.tracks.len();
        self.stats.total_unmatched = self.unmatched.total();
        Resolution {
            tracks: self.tracks,
            key_index: self.key_index,
            artist_titles: self.artist_titles,
            genres: self.genres,
            unmatched: self.unmatched,
            stats: self.stats,
        }
    }
}

/// Run all four passes in [`SourceTag::ALL`] order.
pub fn resolve_all(tables: &SourceTables) -> Resolution {
    let mut resolver = TrackResolver::new();
    for source in SourceTag::ALL {
        resolver.run_pass(source, tables);
    }
    resolver.finish()
}

// ============================================================================
// Resolution output
// ============================================================================

/// Everything one run produced. Tracks are ordered by id.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub tracks: Vec<Track>,
    pub key_index: TitleArtistIndex,
    pub artist_titles: ArtistTitles,
    /// Distinct raw genre values; `None` stands for rows without a genre.
    pub genres: Vec<Option<String>>,
    pub unmatched: UnmatchedLedger,
    pub stats: ResolverStats,
}

impl Resolution {
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id)
    }

    /// Track owning the exact (title, artist) key.
    pub fn track_for(&self, title: &str, artist: &str) -> Option<&Track> {
        self.key_index
            .get(&TitleArtistKey::new(title, artist))
            .and_then(|&id| self.track(id))
    }

    /// Tracks with any title containing `needle`, case-insensitive.
    pub fn find_by_title(&self, needle: &str) -> Vec<&Track> {
        let needle = needle.to_lowercase();
        self.tracks
            .iter()
            .filter(|t| t.titles().iter().any(|title| title.to_lowercase().contains(&needle)))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Appearance, Rating};

    fn library(title: &str, artist: &str) -> LibraryTrackRow {
        LibraryTrackRow {
            title: Some(title.into()),
            artist: Some(artist.into()),
            ..Default::default()
        }
    }

    fn library_with_id(title: &str, artist: &str, id: &str) -> LibraryTrackRow {
        LibraryTrackRow {
            apple_music_id: Some(id.into()),
            ..library(title, artist)
        }
    }

    fn play(title: &str, artist: &str) -> PlayActivityRow {
        PlayActivityRow {
            title: Some(title.into()),
            artist: Some(artist.into()),
            ..Default::default()
        }
    }

    fn like(title: &str, artist: &str, reference: Option<&str>, preference: &str) -> LikeDislikeRow {
        LikeDislikeRow {
            item_reference: reference.map(Into::into),
            title: Some(title.into()),
            artist: Some(artist.into()),
            preference: Some(preference.into()),
            item_description: None,
        }
    }

    fn identifier(id: &str, title: &str) -> IdentifierRow {
        IdentifierRow {
            identifier: Some(id.into()),
            title: Some(title.into()),
        }
    }

    #[test]
    fn test_duplicate_library_row_yields_one_track() {
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[library("Song A", "Artist X"), library("Song A", "Artist X")]);
        let res = resolver.finish();

        assert_eq!(res.tracks.len(), 1);
        assert_eq!(
            res.tracks[0].appearances(),
            [
                Appearance { source: SourceTag::LibraryTracks, row_index: 0 },
                Appearance { source: SourceTag::LibraryTracks, row_index: 1 },
            ]
        );
        assert_eq!(res.stats.library_exact_matches, 1);
        assert_eq!(res.stats.library_created, 1);
    }

    #[test]
    fn test_library_row_fields() {
        let row = LibraryTrackRow {
            genre: Some(" Metal ".into()),
            like_rating: Some("LIKE".into()),
            apple_music_id: Some("100".into()),
            tag_matched_id: Some("200".into()),
            ..library("The Unforgiven", "Metallica")
        };
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[row]);
        let res = resolver.finish();

        let track = &res.tracks[0];
        assert!(track.is_in_library());
        assert_eq!(track.genres(), ["Metal".to_string()]);
        assert_eq!(track.ratings(), [Rating::Love]);
        assert_eq!(track.external_ids(), ["100".to_string(), "200".to_string()]);
        assert_eq!(res.artist_titles["Metallica"], vec!["The Unforgiven".to_string()]);
        assert_eq!(res.genres, vec![Some(" Metal ".to_string())]);
    }

    #[test]
    fn test_library_similar_title_becomes_alias() {
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[
            library("Title_1", "Artist_1"),
            library("Title_2", "Artist_1"),
            library("Title_Very_Different", "Artist_1"),
        ]);
        let res = resolver.finish();

        assert_eq!(res.tracks.len(), 2);
        assert_eq!(res.tracks[0].titles(), ["Title_1".to_string(), "Title_2".to_string()]);
        assert_eq!(res.tracks[1].titles(), ["Title_Very_Different".to_string()]);
        assert_eq!(res.track_for("Title_2", "Artist_1").map(Track::id), Some(0));
        assert_eq!(
            res.artist_titles["Artist_1"],
            vec!["Title_1".to_string(), "Title_2".to_string(), "Title_Very_Different".to_string()]
        );
    }

    #[test]
    fn test_missing_artist_uses_placeholder() {
        let row = LibraryTrackRow {
            title: Some("Interlude".into()),
            ..Default::default()
        };
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[row]);
        let res = resolver.finish();
        assert_eq!(res.tracks[0].artist(), "No Artist");
        assert!(res.track_for("Interlude", "No Artist").is_some());
    }

    #[test]
    fn test_missing_title_goes_to_ledger() {
        let untitled = LibraryTrackRow {
            artist: Some("Artist".into()),
            ..Default::default()
        };
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[untitled]);
        resolver.resolve_play_activity(&[PlayActivityRow::default()]);
        let res = resolver.finish();

        assert!(res.tracks.is_empty());
        assert_eq!(res.unmatched.library_tracks, vec![0]);
        assert_eq!(res.unmatched.play_activity, vec![0]);
        assert_eq!(res.stats.total_unmatched, 2);
    }

    #[test]
    fn test_remastered_play_links_to_known_track() {
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[library("The Unforgiven", "Metallica")]);
        resolver.resolve_play_activity(&[
            play("The Unforgiven (Remastered)", "Metallica"),
            play("One", "Metallica"),
        ]);
        let res = resolver.finish();

        assert_eq!(res.tracks.len(), 2);
        let unforgiven = &res.tracks[0];
        assert_eq!(
            unforgiven.titles(),
            ["The Unforgiven".to_string(), "The Unforgiven (Remastered)".to_string()]
        );
        assert!(unforgiven.appears_in(SourceTag::PlayActivity));

        let one = &res.tracks[1];
        assert_eq!(one.artist(), "Metallica");
        assert_eq!(one.titles(), ["One".to_string()]);
        assert_eq!(res.stats.play_similar_matches, 1);
        assert_eq!(res.stats.play_created, 1);
    }

    #[test]
    fn test_similar_search_takes_first_qualifying_title() {
        let mut resolver = TrackResolver::new();
        // 0.5 apart, so two separate tracks
        resolver.resolve_library_tracks(&[library("abcdefgh", "A"), library("abcdXYZW", "A")]);
        // qualifies for both, scores higher against the second
        resolver.resolve_play_activity(&[play("abcdefXYZW", "A")]);
        let res = resolver.finish();

        assert_eq!(res.tracks.len(), 2);
        assert!(res.tracks[0].has_title("abcdefXYZW"));
        assert!(!res.tracks[1].has_title("abcdefXYZW"));
    }

    #[test]
    fn test_play_exact_match_skips_similarity() {
        let mut resolver = TrackResolver::new();
        resolver.resolve_play_activity(&[play("Song", "Artist"), play(" Song", "Artist ")]);
        let res = resolver.finish();
        assert_eq!(res.tracks.len(), 1);
        assert_eq!(res.stats.play_exact_matches, 1);
        assert_eq!(res.tracks[0].appearances().len(), 2);
    }

    #[test]
    fn test_play_marks_library_only_from_library_origin() {
        let from_library = PlayActivityRow {
            track_origin: Some("library".into()),
            genre: Some("Pop".into()),
            ..play("Song", "Artist")
        };
        let from_search = PlayActivityRow {
            track_origin: Some("search".into()),
            ..play("Other", "Someone")
        };
        let mut resolver = TrackResolver::new();
        resolver.resolve_play_activity(&[from_search, from_library.clone(), from_library]);
        let res = resolver.finish();

        assert!(!res.tracks[0].is_in_library());
        assert!(res.tracks[1].is_in_library());
        assert_eq!(res.stats.play_library_flagged, 1);
        assert_eq!(res.genres, vec![None, Some("Pop".to_string())]);
    }

    #[test]
    fn test_identifier_pass_never_creates_tracks() {
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[library_with_id("Song", "Artist", "1234")]);
        let before = resolver.tracks().len();
        resolver.resolve_identifier_info(&[identifier("1234", "Song (Live)"), identifier("999", "Nope")]);
        assert_eq!(resolver.tracks().len(), before);
        let res = resolver.finish();

        let track = &res.tracks[0];
        assert!(track.has_title("Song (Live)"));
        assert!(track.appears_in(SourceTag::IdentifierInfo));
        assert_eq!(res.unmatched.identifier_info, vec![(1, Some("999".to_string()))]);
        // identifier aliases stay out of the artist index
        assert_eq!(res.artist_titles["Artist"], vec!["Song".to_string()]);
    }

    #[test]
    fn test_shared_identifier_links_lowest_id() {
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[
            library("First", "A"),
            library_with_id("Second", "B", "42"),
            library_with_id("First", "A", "42"),
        ]);
        resolver.resolve_identifier_info(&[identifier("42", "First")]);
        let res = resolver.finish();

        assert!(res.tracks[0].appears_in(SourceTag::IdentifierInfo));
        assert!(!res.tracks[1].appears_in(SourceTag::IdentifierInfo));
    }

    #[test]
    fn test_likes_unmatched_creates_nothing() {
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[library_with_id("Song", "Artist", "1")]);
        resolver.resolve_likes_dislikes(&[
            like("Completely Else", "Artist", Some("77"), "LOVE"),
            like("Song", "Unknown Band", None, "LOVE"),
        ]);
        let res = resolver.finish();

        assert_eq!(res.tracks.len(), 1);
        assert_eq!(res.unmatched.likes_dislikes, vec![0, 1]);
        assert!(res.tracks[0].ratings().is_empty());
    }

    #[test]
    fn test_likes_match_by_identifier_then_key_then_similarity() {
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[
            library_with_id("Alpha", "Band", "1"),
            library("Bravo", "Band"),
            library("Charlie Song", "Band"),
        ]);
        resolver.resolve_likes_dislikes(&[
            like("Alpha (Single)", "Band", Some("1"), "LIKE"),
            like("Bravo", "Band", None, "DISLIKE"),
            like("Charlie Songs", "Band", None, "LOVE"),
        ]);
        let res = resolver.finish();

        assert_eq!(res.tracks.len(), 3);
        assert_eq!(res.tracks[0].ratings(), [Rating::Love]);
        assert!(res.tracks[0].has_title("Alpha (Single)"));
        assert_eq!(res.tracks[1].ratings(), [Rating::Dislike]);
        assert!(res.tracks[2].has_title("Charlie Songs"));
        assert_eq!(res.stats.likes_identifier_matches, 1);
        assert_eq!(res.stats.likes_exact_matches, 1);
        assert_eq!(res.stats.likes_similar_matches, 1);
        assert!(res.unmatched.likes_dislikes.is_empty());
    }

    #[test]
    fn test_likes_identifier_match_keeps_artists_apart() {
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[library_with_id("Song", "Artist", "5")]);
        resolver.resolve_likes_dislikes(&[like("Song", "Artsit", Some("5"), "LOVE")]);
        let res = resolver.finish();

        assert_eq!(res.tracks[0].ratings(), [Rating::Love]);
        assert!(res.track_for("Song", "Artsit").is_none());
        assert!(!res.artist_titles.contains_key("Artsit"));
    }

    #[test]
    fn test_ids_strictly_increase_in_creation_order() {
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[library("A", "X"), library("B", "Y")]);
        resolver.resolve_play_activity(&[play("C", "Z"), play("A", "X"), play("D", "W")]);
        let res = resolver.finish();

        let ids: Vec<TrackId> = res.tracks.iter().map(Track::id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(res.stats.total_tracks, 4);
    }

    #[test]
    fn test_every_titled_row_is_linked_or_unmatched() {
        let tables = SourceTables {
            library_tracks: vec![
                library_with_id("Song A", "Artist X", "10"),
                library("Song B", "Artist X"),
                LibraryTrackRow::default(),
            ],
            identifier_info: vec![identifier("10", "Song A"), identifier("11", "Lost")],
            play_activity: vec![
                play("Song A", "Artist X"),
                play("Song C", "Artist Y"),
                PlayActivityRow::default(),
            ],
            likes_dislikes: vec![
                like("Song C", "Artist Y", None, "LOVE"),
                like("Nothing Like It", "Nobody", Some("99"), "DISLIKE"),
            ],
        };
        let res = resolve_all(&tables);

        let sizes = [
            (SourceTag::LibraryTracks, tables.library_tracks.len()),
            (SourceTag::IdentifierInfo, tables.identifier_info.len()),
            (SourceTag::PlayActivity, tables.play_activity.len()),
            (SourceTag::LikesDislikes, tables.likes_dislikes.len()),
        ];
        for (source, len) in sizes {
            for row_index in 0..len {
                let linked = res
                    .tracks
                    .iter()
                    .flat_map(|t| t.appearances())
                    .filter(|a| a.source == source && a.row_index == row_index)
                    .count();
                let unmatched = res.unmatched.contains(source, row_index);
                assert!(
                    (linked == 1) != unmatched,
                    "{} row {} linked {} times, unmatched {}",
                    source,
                    row_index,
                    linked,
                    unmatched
                );
            }
        }
    }

    #[test]
    fn test_passes_follow_source_order() {
        assert_eq!(
            SourceTag::ALL,
            [
                SourceTag::LibraryTracks,
                SourceTag::IdentifierInfo,
                SourceTag::PlayActivity,
                SourceTag::LikesDislikes,
            ]
        );

        // the identifier row only matches once the library pass has run
        let tables = SourceTables {
            library_tracks: vec![library_with_id("Song", "Artist", "7")],
            identifier_info: vec![identifier("7", "Song (Live)")],
            ..Default::default()
        };
        let mut resolver = TrackResolver::new();
        resolver.run_pass(SourceTag::IdentifierInfo, &tables);
        assert_eq!(resolver.unmatched().identifier_info.len(), 1);

        let res = resolve_all(&tables);
        assert!(res.unmatched.identifier_info.is_empty());
        assert!(res.tracks[0].has_title("Song (Live)"));
    }

    #[test]
    fn test_find_by_title() {
        let mut resolver = TrackResolver::new();
        resolver.resolve_library_tracks(&[library("Nothing Else Matters", "Metallica"), library("One", "U2")]);
        let res = resolver.finish();
        let found = res.find_by_title("else");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].artist(), "Metallica");
        assert!(res.find_by_title("zzz").is_empty());
    }
}

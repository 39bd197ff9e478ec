//! Read-only summaries over a finished [`Resolution`].
//!
//! Row-index lookups for joining tracks back onto a source table, the
//! play-activity reporting view built from them, genre and generic count
//! tables, per-year rankings and their top-N lists.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{PlayActivityRow, Rating, SourceTag, Track, TrackId};
use crate::normalize::{join_labels, simplify_genre, split_composite, COMPOSITE_SEPARATOR};
use crate::resolver::Resolution;

/// Label → occurrences.
pub type CountTable = BTreeMap<String, usize>;

/// Play year → count table for that year.
pub type YearlyCounts = BTreeMap<i32, CountTable>;

/// Play year → top entries for that year.
pub type YearlyRanking = BTreeMap<i32, Vec<(String, usize)>>;

/// A track as seen from one source row.
#[derive(Debug, Clone, Copy)]
pub struct IndexedTrack<'a> {
    pub track: &'a Track,
    pub is_in_library: bool,
    pub ratings: &'a [Rating],
    pub genres: &'a [String],
}

/// One play-activity row with its track's attributes joined on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Track_Instance")]
    pub track_instance: Option<TrackId>,
    #[serde(rename = "Library_Track")]
    pub library_track: bool,
    #[serde(rename = "Rating")]
    pub rating: String,
    #[serde(rename = "Genres")]
    pub genres: String,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Artist")]
    pub artist: Option<String>,
    #[serde(rename = "Track_origin")]
    pub track_origin: Option<String>,
    #[serde(rename = "Play_Year")]
    pub play_year: Option<i32>,
}

/// Reporting columns a ranking can be built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RankingColumn {
    Genres,
    Artist,
    Title,
    TrackOrigin,
}

impl RankingColumn {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "Genres" => Some(Self::Genres),
            "Artist" => Some(Self::Artist),
            "Title" => Some(Self::Title),
            "Track_origin" => Some(Self::TrackOrigin),
            _ => None,
        }
    }

    fn value(self, row: &ReportRow) -> Option<&str> {
        match self {
            Self::Genres => Some(row.genres.as_str()),
            Self::Artist => row.artist.as_deref(),
            Self::Title => row.title.as_deref(),
            Self::TrackOrigin => row.track_origin.as_deref(),
        }
    }
}

pub struct CatalogSummary<'a> {
    resolution: &'a Resolution,
    genre_vocabulary: Vec<String>,
}

impl<'a> CatalogSummary<'a> {
    pub fn new(resolution: &'a Resolution) -> Self {
        Self {
            resolution,
            genre_vocabulary: Self::simplify_genres(&resolution.genres),
        }
    }

    /// Trimmed genre vocabulary, "" for the missing placeholder.
    pub fn genre_vocabulary(&self) -> &[String] {
        &self.genre_vocabulary
    }

    /// Project raw genre values for reporting: missing becomes "", the rest
    /// are trimmed. Order and duplicates are kept.
    pub fn simplify_genres(raw: &[Option<String>]) -> Vec<String> {
        raw.iter().map(|g| simplify_genre(g.as_deref())).collect()
    }

    // ========================================================================
    // Row-index lookups
    // ========================================================================

    /// Row index → tracks that appear at that row of every source whose tag
    /// contains `source_label` ("play" selects play_activity). A track is
    /// listed once per row index.
    pub fn build_index_for_source(&self, source_label: &str) -> BTreeMap<usize, Vec<IndexedTrack<'a>>> {
        let resolution: &'a Resolution = self.resolution;
        let mut index: BTreeMap<usize, Vec<IndexedTrack<'a>>> = BTreeMap::new();

        for track in &resolution.tracks {
            for appearance in track.appearances() {
                if !appearance.source.as_str().contains(source_label) {
                    continue;
                }
                let entries = index.entry(appearance.row_index).or_default();
                if entries.iter().any(|e| e.track.id() == track.id()) {
                    continue;
                }
                entries.push(IndexedTrack {
                    track,
                    is_in_library: track.is_in_library(),
                    ratings: track.ratings(),
                    genres: track.genres(),
                });
            }
        }

        index
    }

    /// Play-activity rows with `Track_Instance`, `Library_Track`, `Rating`
    /// and `Genres` joined from the first track linked to each row.
    pub fn build_reporting_view(&self, play_rows: &[PlayActivityRow]) -> Vec<ReportRow> {
        let index = self.build_index_for_source(SourceTag::PlayActivity.as_str());

        play_rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                let linked = index.get(&row_index).and_then(|entries| entries.first());
                let ratings: Vec<&str> = linked
                    .map(|e| e.ratings.iter().map(|r| r.as_str()).collect())
                    .unwrap_or_default();
                let genres: &[String] = linked.map(|e| e.genres).unwrap_or_default();

                ReportRow {
                    track_instance: linked.map(|e| e.track.id()),
                    library_track: linked.is_some_and(|e| e.is_in_library),
                    rating: join_labels(&ratings),
                    genres: join_labels(genres),
                    title: row.title.clone(),
                    artist: row.artist.clone(),
                    track_origin: row.track_origin.clone(),
                    play_year: row.play_year,
                }
            })
            .collect()
    }

    // ========================================================================
    // Count tables
    // ========================================================================

    /// Count genre labels against the vocabulary. Every vocabulary entry is
    /// present, zero when unseen; composite labels count each segment and
    /// segments outside the vocabulary are ignored.
    pub fn build_genre_count_table<S: AsRef<str>>(&self, labels: &[S]) -> CountTable {
        let mut counts: CountTable = self
            .genre_vocabulary
            .iter()
            .map(|genre| (genre.clone(), 0))
            .collect();

        for label in labels {
            let label = label.as_ref();
            if label.contains(COMPOSITE_SEPARATOR) {
                for segment in split_composite(label) {
                    if let Some(count) = counts.get_mut(segment) {
                        *count += 1;
                    }
                }
            } else if let Some(count) = counts.get_mut(label) {
                *count += 1;
            }
        }

        counts
    }

    /// Per play year, count `column` over the rows of that year. `Genres`
    /// uses the genre count table; `Artist`, `Title` and `Track_origin` a
    /// plain frequency table. Any other column gives an empty map.
    pub fn build_ranking_per_year(&self, rows: &[ReportRow], column: &str) -> YearlyCounts {
        let Some(column) = RankingColumn::parse(column) else {
            return YearlyCounts::new();
        };

        let mut by_year: BTreeMap<i32, Vec<&ReportRow>> = BTreeMap::new();
        for row in rows {
            if let Some(year) = row.play_year {
                by_year.entry(year).or_default().push(row);
            }
        }

        by_year
            .into_iter()
            .map(|(year, year_rows)| {
                let counts = match column {
                    RankingColumn::Genres => {
                        let labels: Vec<&str> = year_rows.iter().map(|r| r.genres.as_str()).collect();
                        self.build_genre_count_table(&labels)
                    }
                    _ => build_count_table(year_rows.iter().map(|r| column.value(r))),
                };
                (year, counts)
            })
            .collect()
    }
}

/// Frequency of every distinct non-missing value.
pub fn build_count_table<I, S>(values: I) -> CountTable
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut counts = CountTable::new();
    for value in values.into_iter().flatten() {
        *counts.entry(value.as_ref().to_string()).or_insert(0) += 1;
    }
    counts
}

// ============================================================================
// Rankings
// ============================================================================

/// The `n` largest entries, count descending, ties by label.
pub fn rank_top(counts: &CountTable, n: usize) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

pub fn rank_top_per_year(per_year: &YearlyCounts, n: usize) -> YearlyRanking {
    per_year
        .iter()
        .map(|(year, counts)| (*year, rank_top(counts, n)))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

//! Loading the four source tables from an export directory.
//!
//! Each table is a JSON array of row objects keyed by the export's column
//! names; a row's index is its position in the array. Columns the export
//! may omit (track origin, play year, likes title/artist) are derived here
//! so the resolver only ever sees complete rows.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::models::{IdentifierRow, LibraryTrackRow, LikeDislikeRow, PlayActivityRow, SourceTag};
use crate::normalize::{classify_track_origin, split_item_description};

/// The four parsed tables of one export, in pass order.
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub library_tracks: Vec<LibraryTrackRow>,
    pub identifier_info: Vec<IdentifierRow>,
    pub play_activity: Vec<PlayActivityRow>,
    pub likes_dislikes: Vec<LikeDislikeRow>,
}

impl SourceTables {
    pub fn len_for(&self, source: SourceTag) -> usize {
        match source {
            SourceTag::LibraryTracks => self.library_tracks.len(),
            SourceTag::IdentifierInfo => self.identifier_info.len(),
            SourceTag::PlayActivity => self.play_activity.len(),
            SourceTag::LikesDislikes => self.likes_dislikes.len(),
        }
    }
}

/// File holding a source table inside the export directory.
pub fn table_path(dir: &Path, source: SourceTag) -> PathBuf {
    dir.join(format!("{}.json", source.as_str()))
}

/// Read all four tables from `dir` and fill derived columns.
pub fn load_source_tables(dir: &Path) -> Result<SourceTables> {
    if !dir.is_dir() {
        anyhow::bail!("Input directory '{}' does not exist", dir.display());
    }

    let mut tables = SourceTables {
        library_tracks: read_table(&table_path(dir, SourceTag::LibraryTracks))?,
        identifier_info: read_table(&table_path(dir, SourceTag::IdentifierInfo))?,
        play_activity: read_table(&table_path(dir, SourceTag::PlayActivity))?,
        likes_dislikes: read_table(&table_path(dir, SourceTag::LikesDislikes))?,
    };

    for row in &mut tables.play_activity {
        fill_play_activity(row);
    }
    for row in &mut tables.likes_dislikes {
        fill_likes_dislikes(row);
    }

    Ok(tables)
}

/// Parse one JSON array of rows.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read table {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse table {}", path.display()))
}

// ============================================================================
// Derived columns
// ============================================================================

fn fill_play_activity(row: &mut PlayActivityRow) {
    if row.track_origin.is_none() {
        row.track_origin = Some(classify_track_origin(row.feature_name.as_deref()).to_string());
    }
    if row.play_year.is_none() {
        row.play_year = row
            .event_start
            .as_deref()
            .and_then(parse_year)
            .or_else(|| row.event_end.as_deref().and_then(parse_year));
    }
}

fn fill_likes_dislikes(row: &mut LikeDislikeRow) {
    let Some(description) = row.item_description.as_deref() else {
        return;
    };
    let (artist, title) = split_item_description(description);
    if row.artist.is_none() {
        row.artist = artist;
    }
    if row.title.is_none() {
        row.title = title;
    }
}

/// Year of an export timestamp: RFC 3339 ("2020-03-01T12:00:00Z"),
/// "YYYY-MM-DD HH:MM:SS" or a bare date.
pub fn parse_year(timestamp: &str) -> Option<i32> {
    let timestamp = timestamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.year());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.year());
    }
    NaiveDate::parse_from_str(timestamp, "%Y-%m-%d")
        .ok()
        .map(|d| d.year())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_export_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("track-resolver-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_export(dir: &Path, library: &str, identifiers: &str, plays: &str, likes: &str) {
        fs::write(table_path(dir, SourceTag::LibraryTracks), library).unwrap();
        fs::write(table_path(dir, SourceTag::IdentifierInfo), identifiers).unwrap();
        fs::write(table_path(dir, SourceTag::PlayActivity), plays).unwrap();
        fs::write(table_path(dir, SourceTag::LikesDislikes), likes).unwrap();
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2020-03-01T12:00:00Z"), Some(2020));
        assert_eq!(parse_year("2019-12-31T23:30:00.123+02:00"), Some(2019));
        assert_eq!(parse_year("2018-06-15 08:00:00"), Some(2018));
        assert_eq!(parse_year("2017-01-02"), Some(2017));
        assert_eq!(parse_year("yesterday"), None);
    }

    #[test]
    fn test_fill_play_activity() {
        let mut row = PlayActivityRow {
            feature_name: Some("for_you / recently_played".into()),
            event_start: Some("not a date".into()),
            event_end: Some("2021-05-01T10:00:00Z".into()),
            ..Default::default()
        };
        fill_play_activity(&mut row);
        assert_eq!(row.track_origin.as_deref(), Some("for you - recently played"));
        assert_eq!(row.play_year, Some(2021));

        let mut preset = PlayActivityRow {
            track_origin: Some("library".into()),
            play_year: Some(2016),
            event_start: Some("2021-05-01T10:00:00Z".into()),
            ..Default::default()
        };
        fill_play_activity(&mut preset);
        assert_eq!(preset.track_origin.as_deref(), Some("library"));
        assert_eq!(preset.play_year, Some(2016));
    }

    #[test]
    fn test_fill_likes_from_description() {
        let mut row = LikeDislikeRow {
            item_description: Some("Manu Chao - Clandestino".into()),
            ..Default::default()
        };
        fill_likes_dislikes(&mut row);
        assert_eq!(row.artist.as_deref(), Some("Manu Chao"));
        assert_eq!(row.title.as_deref(), Some("Clandestino"));

        let mut explicit = LikeDislikeRow {
            title: Some("Kept".into()),
            item_description: Some("Someone - Other".into()),
            ..Default::default()
        };
        fill_likes_dislikes(&mut explicit);
        assert_eq!(explicit.title.as_deref(), Some("Kept"));
        assert_eq!(explicit.artist.as_deref(), Some("Someone"));
    }

    #[test]
    fn test_load_source_tables() {
        let dir = temp_export_dir("load");
        write_export(
            &dir,
            r#"[{"Title": "One", "Artist": "Metallica", "Apple Music Track Identifier": 1.0}]"#,
            r#"[{"Identifier": 1, "Title": "One"}]"#,
            r#"[{"Content Name": "One", "Artist Name": "Metallica", "Feature Name": "library",
                 "Event Start Timestamp": "2020-01-01T00:00:00Z"}]"#,
            r#"[{"Item Reference": "1", "Item Description": "Metallica - One", "Preference": "LOVE"}]"#,
        );

        let tables = load_source_tables(&dir).unwrap();
        assert_eq!(tables.len_for(SourceTag::LibraryTracks), 1);
        assert_eq!(tables.library_tracks[0].apple_music_id.as_deref(), Some("1"));
        assert_eq!(tables.identifier_info[0].identifier.as_deref(), Some("1"));
        assert_eq!(tables.play_activity[0].track_origin.as_deref(), Some("library"));
        assert_eq!(tables.play_activity[0].play_year, Some(2020));
        assert_eq!(tables.likes_dislikes[0].title.as_deref(), Some("One"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let dir = temp_export_dir("missing");
        fs::write(table_path(&dir, SourceTag::LibraryTracks), "[]").unwrap();
        let err = load_source_tables(&dir).unwrap_err();
        assert!(err.to_string().contains("identifier_info.json"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = std::env::temp_dir().join("track-resolver-does-not-exist");
        assert!(load_source_tables(&dir).is_err());
    }
}

//! Explain why rows ended up in the unmatched ledger.
//!
//! Usage: analyze-unmatched <export-dir> [--sample N] [--log-only]
//!
//! Read-only: resolves the export, then looks for near misses the resolver
//! deliberately refuses to act on (titles just below the similarity
//! threshold, artist strings spelled differently, identifier rows whose
//! title alone is known).

use anyhow::Result;
use clap::Parser;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

use track_resolver::models::ArtistTitles;
use track_resolver::normalize::{artist_comparison_key, artist_or_placeholder};
use track_resolver::progress::{set_log_only, Phase};
use track_resolver::resolver::{resolve_all, Resolution};
use track_resolver::scoring::{similarity, SIMILARITY_THRESHOLD};
use track_resolver::sources::load_source_tables;

/// Artist pairs at or above this normalized Levenshtein score are reported
/// as probable spelling variants.
const ARTIST_NEAR_MISS: f64 = 0.8;

#[derive(Parser)]
#[command(name = "analyze-unmatched")]
#[command(about = "Diagnose unmatched rows of a resolved music-listening export")]
struct Args {
    /// Export directory holding the four JSON source tables
    input: PathBuf,

    /// Rows printed per category
    #[arg(long, default_value = "5")]
    sample: usize,

    #[arg(long)]
    log_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeVerdict {
    /// Artist known, best title below the threshold
    TitleBelowThreshold,
    /// Artist unknown but close to a known artist string
    ArtistVariant,
    NoEvidence,
    MissingTitle,
}

#[derive(Debug)]
struct LikeDiagnosis {
    row_index: usize,
    title: String,
    artist: String,
    best_title: Option<(String, f64)>,
    closest_artist: Option<(String, f64)>,
    verdict: LikeVerdict,
}

/// Best-scoring title of `artist` for `title`.
fn best_title_for(artist_titles: &ArtistTitles, artist: &str, title: &str) -> Option<(String, f64)> {
    artist_titles
        .get(artist)?
        .iter()
        .map(|known| (known.clone(), similarity(title, known)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Closest other artist string by normalized Levenshtein over folded names.
fn closest_artist(folded_artists: &[(String, String)], artist: &str) -> Option<(String, f64)> {
    let key = artist_comparison_key(artist);
    folded_artists
        .iter()
        .filter(|(name, _)| name != artist)
        .map(|(name, folded)| (name.clone(), strsim::normalized_levenshtein(&key, folded)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

fn diagnose_like(
    resolution: &Resolution,
    folded_artists: &[(String, String)],
    row_index: usize,
    title: Option<&str>,
    artist: Option<&str>,
) -> LikeDiagnosis {
    let artist = artist_or_placeholder(artist).to_string();
    let Some(title) = title else {
        return LikeDiagnosis {
            row_index,
            title: String::new(),
            artist,
            best_title: None,
            closest_artist: None,
            verdict: LikeVerdict::MissingTitle,
        };
    };

    let best_title = best_title_for(&resolution.artist_titles, &artist, title);
    let closest = if best_title.is_none() {
        closest_artist(folded_artists, &artist)
    } else {
        None
    };

    let verdict = if best_title.is_some() {
        LikeVerdict::TitleBelowThreshold
    } else if closest.as_ref().is_some_and(|(_, score)| *score >= ARTIST_NEAR_MISS) {
        LikeVerdict::ArtistVariant
    } else {
        LikeVerdict::NoEvidence
    };

    LikeDiagnosis {
        row_index,
        title: title.to_string(),
        artist,
        best_title,
        closest_artist: closest,
        verdict,
    }
}

fn print_share(label: &str, count: usize, total: usize) {
    let pct = if total == 0 { 0.0 } else { 100.0 * count as f64 / total as f64 };
    println!("{:<28}{:>6}  {:>5.1}%", label, count, pct);
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);
    let start = Instant::now();

    println!("Resolving export {:?}...", args.input);
    let tables = load_source_tables(&args.input)?;
    let resolution = resolve_all(&tables);
    println!(
        "  {} tracks, {} unmatched rows",
        resolution.stats.total_tracks, resolution.stats.total_unmatched
    );

    let folded_artists: Vec<(String, String)> = resolution
        .artist_titles
        .keys()
        .map(|a| (a.clone(), artist_comparison_key(a)))
        .collect();

    // Likes and dislikes
    let like_rows = &resolution.unmatched.likes_dislikes;
    let phase = Phase::counted("Likes and dislikes", like_rows.len() as u64);
    let likes: Vec<LikeDiagnosis> = like_rows
        .par_iter()
        .map(|&row_index| {
            let row = &tables.likes_dislikes[row_index];
            let diagnosis = diagnose_like(
                &resolution,
                &folded_artists,
                row_index,
                row.title.as_deref(),
                row.artist.as_deref(),
            );
            phase.inc(1);
            diagnosis
        })
        .collect();
    phase.finish(&format!("{} rows diagnosed", likes.len()));

    // Identifier rows: is the title alone known?
    let id_rows = &resolution.unmatched.identifier_info;
    let phase = Phase::counted("Identifier rows", id_rows.len() as u64);
    let title_known: Vec<(usize, Option<String>, String)> = id_rows
        .par_iter()
        .filter_map(|(row_index, identifier)| {
            phase.inc(1);
            let title = tables.identifier_info[*row_index].title.as_deref()?;
            resolution
                .tracks
                .iter()
                .any(|t| t.has_title(title))
                .then(|| (*row_index, identifier.clone(), title.to_string()))
        })
        .collect();
    phase.finish(&format!("{} titles already known", title_known.len()));

    let count = |verdict: LikeVerdict| likes.iter().filter(|d| d.verdict == verdict).count();

    println!("\n=== UNMATCHED LIKES/DISLIKES ({} rows) ===", likes.len());
    println!();
    print_share("Title below threshold", count(LikeVerdict::TitleBelowThreshold), likes.len());
    print_share("Artist spelling variant", count(LikeVerdict::ArtistVariant), likes.len());
    print_share("No evidence", count(LikeVerdict::NoEvidence), likes.len());
    print_share("Missing title", count(LikeVerdict::MissingTitle), likes.len());

    println!("\nTitle below threshold ({:.3}):", SIMILARITY_THRESHOLD);
    for d in likes
        .iter()
        .filter(|d| d.verdict == LikeVerdict::TitleBelowThreshold)
        .take(args.sample)
    {
        if let Some((known, score)) = &d.best_title {
            println!("  row {}: {} - {:?} ~ {:?} ({:.3})", d.row_index, d.artist, d.title, known, score);
        }
    }

    println!("\nArtist spelling variants:");
    for d in likes
        .iter()
        .filter(|d| d.verdict == LikeVerdict::ArtistVariant)
        .take(args.sample)
    {
        if let Some((known, score)) = &d.closest_artist {
            println!("  row {}: {:?} ~ {:?} ({:.3}) for {:?}", d.row_index, d.artist, known, score, d.title);
        }
    }

    println!("\n=== UNMATCHED IDENTIFIER ROWS ({} rows) ===", id_rows.len());
    println!();
    print_share("Title known, id not", title_known.len(), id_rows.len());
    for (row_index, identifier, title) in title_known.iter().take(args.sample) {
        println!(
            "  row {}: id {} title {:?}",
            row_index,
            identifier.as_deref().unwrap_or("-"),
            title
        );
    }

    println!();
    println!("Elapsed: {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}

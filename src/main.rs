use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use track_resolver::models::{ResolverStats, SourceTag, Track, UnmatchedLedger};
use track_resolver::progress::{format_duration, is_log_only, set_log_only, Phase};
use track_resolver::resolver::{Resolution, TrackResolver};
use track_resolver::safety::{validate_output_path, REPORT_PATTERN};
use track_resolver::sources::{load_source_tables, table_path, SourceTables};
use track_resolver::summary::{rank_top_per_year, CatalogSummary, CountTable, ReportRow, YearlyRanking};

#[derive(Parser)]
#[command(name = "track-resolver")]
#[command(about = "Resolve a music-listening export into canonical tracks")]
struct Args {
    /// Export directory holding the four JSON source tables
    input: PathBuf,

    /// Report to write; the file name must contain "resolved"
    output: PathBuf,

    /// Hide progress bars and log plain progress lines instead
    #[arg(long)]
    log_only: bool,

    /// Also write run statistics to this JSON file
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Print every track with a title containing this text
    #[arg(long)]
    lookup: Option<String>,

    /// Entries per year in each ranking
    #[arg(long, default_value = "10")]
    top: usize,
}

#[derive(Serialize)]
struct Rankings {
    genres: YearlyRanking,
    artists: YearlyRanking,
    titles: YearlyRanking,
    track_origins: YearlyRanking,
}

#[derive(Serialize)]
struct Report<'a> {
    tracks: &'a [Track],
    unmatched: &'a UnmatchedLedger,
    genre_vocabulary: &'a [String],
    genre_counts: CountTable,
    play_activity_view: &'a [ReportRow],
    rankings: Rankings,
    stats: &'a ResolverStats,
}

fn load(input: &Path) -> Result<SourceTables> {
    let phase = Phase::spinner("Loading export");
    let tables = load_source_tables(input)?;
    let counts: Vec<String> = SourceTag::ALL
        .iter()
        .map(|s| format!("{} {}", tables.len_for(*s), s))
        .collect();
    phase.finish(&counts.join(", "));
    Ok(tables)
}

fn pass_name(source: SourceTag) -> &'static str {
    match source {
        SourceTag::LibraryTracks => "Pass 1: Library catalog",
        SourceTag::IdentifierInfo => "Pass 2: Identifier table",
        SourceTag::PlayActivity => "Pass 3: Play activity",
        SourceTag::LikesDislikes => "Pass 4: Likes and dislikes",
    }
}

fn pass_outcome(source: SourceTag, stats: &ResolverStats) -> String {
    match source {
        SourceTag::LibraryTracks => format!(
            "{} created, {} exact, {} similar, {} untitled",
            stats.library_created, stats.library_exact_matches, stats.library_similar_matches, stats.library_missing_title
        ),
        SourceTag::IdentifierInfo => format!(
            "{} matched, {} unmatched",
            stats.identifier_matches, stats.identifier_unmatched
        ),
        SourceTag::PlayActivity => format!(
            "{} created, {} exact, {} similar, {} flagged in library",
            stats.play_created, stats.play_exact_matches, stats.play_similar_matches, stats.play_library_flagged
        ),
        SourceTag::LikesDislikes => format!(
            "{} by identifier, {} exact, {} similar, {} unmatched",
            stats.likes_identifier_matches, stats.likes_exact_matches, stats.likes_similar_matches, stats.likes_unmatched
        ),
    }
}

fn resolve(tables: &SourceTables) -> Resolution {
    let mut resolver = TrackResolver::new();

    for source in SourceTag::ALL {
        let phase = Phase::spinner(pass_name(source));
        resolver.run_pass(source, tables);
        phase.finish(&pass_outcome(source, resolver.stats()));
        if is_log_only() {
            resolver.stats().log_phase(source.as_str());
        }
    }

    resolver.finish()
}

fn build_rankings(summary: &CatalogSummary, view: &[ReportRow], top: usize) -> Rankings {
    let ranked = |column: &str| rank_top_per_year(&summary.build_ranking_per_year(view, column), top);
    Rankings {
        genres: ranked("Genres"),
        artists: ranked("Artist"),
        titles: ranked("Title"),
        track_origins: ranked("Track_origin"),
    }
}

fn write_report(path: &Path, report: &Report) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create report {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    Ok(())
}

fn print_lookup(resolution: &Resolution, needle: &str) {
    println!("\nTracks with a title containing '{}':", needle);
    println!("{:-<80}", "");

    let found = resolution.find_by_title(needle);
    if found.is_empty() {
        println!("No tracks found.");
        return;
    }

    for track in found {
        let ratings: Vec<&str> = track.ratings().iter().map(|r| r.as_str()).collect();
        println!(
            "[{}] {} - {} (also {:?}) library={} ratings={:?} genres={:?} appearances={}",
            track.id(),
            track.artist(),
            track.primary_title(),
            track.titles().get(1..).unwrap_or_default(),
            track.is_in_library(),
            ratings,
            track.genres(),
            track.appearances().len()
        );
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);

    let source_paths: Vec<PathBuf> = SourceTag::ALL.iter().map(|s| table_path(&args.input, *s)).collect();
    let source_refs: Vec<&Path> = source_paths.iter().map(PathBuf::as_path).collect();
    validate_output_path(&args.output, REPORT_PATTERN, &source_refs)?;

    let start = Instant::now();

    println!("Reading export: {:?}", args.input);
    let tables = load(&args.input)?;

    let mut resolution = resolve(&tables);
    resolution.stats.elapsed_seconds = start.elapsed().as_secs_f64();

    let phase = Phase::spinner("Summarizing");
    let summary = CatalogSummary::new(&resolution);
    let view = summary.build_reporting_view(&tables.play_activity);
    let genre_labels: Vec<&str> = view.iter().map(|r| r.genres.as_str()).collect();
    let report = Report {
        tracks: &resolution.tracks,
        unmatched: &resolution.unmatched,
        genre_vocabulary: summary.genre_vocabulary(),
        genre_counts: summary.build_genre_count_table(&genre_labels),
        play_activity_view: &view,
        rankings: build_rankings(&summary, &view, args.top),
        stats: &resolution.stats,
    };
    phase.finish(&format!("{} reporting rows", view.len()));

    println!("Writing report: {:?}", args.output);
    write_report(&args.output, &report)?;

    if let Some(stats_path) = &args.stats {
        resolution
            .stats
            .write_to_file(stats_path)
            .with_context(|| format!("Failed to write stats {}", stats_path.display()))?;
    }
    if is_log_only() {
        resolution.stats.log_phase("final");
    }

    let stats = &resolution.stats;
    println!("\n{:=<60}", "");
    println!("Resolution complete!");
    println!("  Rows: {}", stats.rows_seen());
    println!("  Tracks: {}", stats.total_tracks);
    println!("  Unmatched rows: {}", stats.total_unmatched);
    println!("  Linked: {:.1}%", stats.link_rate());
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    if let Some(needle) = &args.lookup {
        print_lookup(&resolution, needle);
    }

    Ok(())
}

//! Progress reporting for the resolution pipeline.
//!
//! Every step of a run (loading, each pass, summarizing, diagnostics) is a
//! [`Phase`]: a progress bar when the row count is known, a spinner
//! otherwise. In log-only mode the bars are hidden and phases emit plain
//! `[phase] ...` lines on stderr for tail-friendly output.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Rows between two log lines of a counted phase in log-only mode.
pub const LOG_INTERVAL: u64 = 1_000;

/// Set log-only mode globally
pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

/// Check if log-only mode is enabled
pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Progress line for log-only mode, `None` between intervals.
fn progress_line(phase: &str, current: u64, total: u64, interval: u64) -> Option<String> {
    if total == 0 || interval == 0 || (current % interval != 0 && current != total) {
        return None;
    }
    let pct = 100.0 * current as f64 / total as f64;
    Some(format!("[{}] {}/{} ({:.1}%)", phase, current, total, pct))
}

/// One step of a run.
pub struct Phase {
    name: String,
    bar: ProgressBar,
    total: u64,
    started: Instant,
}

impl Phase {
    /// Phase over a known number of rows.
    pub fn counted(name: &str, total: u64) -> Self {
        let bar = ProgressBar::new(total);
        if is_log_only() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
                    .unwrap()
                    .progress_chars("=> "),
            );
        }
        bar.set_message(name.to_string());
        Self::with_bar(name, bar, total)
    }

    /// Phase without a row count.
    pub fn spinner(name: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if is_log_only() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{msg} {spinner} [{elapsed_precise}]")
                    .unwrap(),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
        }
        bar.set_message(name.to_string());
        Self::with_bar(name, bar, 0)
    }

    fn with_bar(name: &str, bar: ProgressBar, total: u64) -> Self {
        if is_log_only() {
            eprintln!("[{}] started", name);
        }
        Self {
            name: name.to_string(),
            bar,
            total,
            started: Instant::now(),
        }
    }

    /// Advance a counted phase. Safe to call from rayon workers.
    pub fn inc(&self, delta: u64) {
        self.bar.inc(delta);
        if is_log_only() {
            if let Some(line) = progress_line(&self.name, self.bar.position(), self.total, LOG_INTERVAL) {
                eprintln!("{}", line);
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Close the phase with a one-line outcome.
    pub fn finish(self, outcome: &str) {
        let message = format!("{}: {}", self.name, outcome);
        if is_log_only() {
            eprintln!("[{}] {} ({})", self.name, outcome, format_duration(self.elapsed()));
        }
        self.bar.finish_with_message(message);
    }
}

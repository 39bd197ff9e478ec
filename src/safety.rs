//! Guard against a run overwriting its own inputs.
//!
//! The report is written over whatever is at the output path, so the path is
//! checked against the export tables before anything is written.

use anyhow::{bail, Result};
use std::path::Path;

/// File name fragment every report path must carry.
pub const REPORT_PATTERN: &str = "resolved";

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output filename must contain the required pattern (e.g., "resolved")
/// - Output cannot be one of the source tables
/// - Output cannot reuse a source table's file name, wherever it lives
pub fn validate_output_path(output: &Path, required_pattern: &str, source_paths: &[&Path]) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.contains(required_pattern) {
        bail!(
            "Safety check failed: output file '{}' must contain '{}' in the name",
            output.display(),
            required_pattern
        );
    }

    for source in source_paths {
        if output == *source {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }

        let source_name = source.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !source_name.is_empty() && output_name == source_name {
            bail!(
                "Safety check failed: output '{}' reuses the source table name '{}'",
                output.display(),
                source_name
            );
        }
    }

    Ok(())
}

//! Review rendering and writing.

use std::io::Write;
use std::path::{Component, Path};

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::commit::AnalysisOutcome;
use crate::error::AnalyzerError;

/// Render a Markdown review of an analysis, dated today (UTC).
pub fn render_review(outcome: &AnalysisOutcome) -> String {
    let today = Utc::now().format("%Y-%m-%d").to_string();
    format_review(outcome, &today)
}

fn format_review(outcome: &AnalysisOutcome, date: &str) -> String {
    let analysis = &outcome.analysis;
    let mut review = format!("# Commit Review - {}\n\n", date);

    review.push_str("## Proposed Message\n\n```text\n");
    review.push_str(&outcome.message);
    review.push_str("\n```\n\n");
    review.push_str(&format!("_Source: {}_\n\n", outcome.source));

    if analysis.breaking_changes {
        review.push_str("**Contains breaking changes.**\n\n");
    }

    if !analysis.summary.is_empty() {
        review.push_str("## Summary\n\n");
        review.push_str(&analysis.summary);
        review.push_str("\n\n");
    }

    if !analysis.change_types.is_empty() {
        review.push_str("## Changes\n\n");
        for change in &analysis.change_types {
            match &change.scope {
                Some(scope) => review.push_str(&format!(
                    "- **{}** ({}): {}\n",
                    change.commit_type, scope, change.description
                )),
                None => review.push_str(&format!(
                    "- **{}**: {}\n",
                    change.commit_type, change.description
                )),
            }
        }
        review.push('\n');
    }

    if !analysis.impacted_areas.is_empty() {
        review.push_str("## Impacted Areas\n\n");
        review.push_str(&analysis.impacted_areas.join(", "));
        review.push_str("\n\n");
    }

    review.push_str("## Files\n\n");
    if analysis.files.is_empty() {
        review.push_str("_None_\n");
    } else {
        for file in &analysis.files {
            review.push_str(&format!("- `{}`\n", file));
        }
    }

    review
}

/// Reject empty paths and paths with `..` segments.
pub fn validate_path(path: &Path) -> Result<(), AnalyzerError> {
    if path.as_os_str().is_empty() {
        return Err(AnalyzerError::Validation("path must not be empty".to_string()));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(AnalyzerError::Validation(format!(
            "path '{}' must not contain '..' segments",
            path.display()
        )));
    }
    Ok(())
}

/// Writes review text to disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReviewWriter;

impl ReviewWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write `content` to `path`, returning the number of bytes written.
    ///
    /// The path is validated before anything touches the disk. Parent
    /// directories are created, and the file is replaced atomically through
    /// a temporary file in the same directory.
    pub fn write(&self, path: &Path, content: &str) -> Result<usize, AnalyzerError> {
        validate_path(path)?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| AnalyzerError::Io(e.error))?;

        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(content.len())
    }
}

//! Prompt construction, fallback messages and cache keys.
//!
//! Everything here is pure string building; no I/O.

use crate::commit::types::{CommitAnalysis, CommitType};
use crate::diff::ParsedDiff;

/// Number of diff characters that contribute to a cache key.
const CACHE_KEY_DIFF_CHARS: usize = 100;

/// Build the categorization prompt for a single file's change.
pub fn single_change_prompt(diff: &ParsedDiff) -> String {
    let additions = format_lines(&diff.additions, '+');
    let deletions = format_lines(&diff.deletions, '-');

    format!(
        r#"You are categorizing one file's change for a Git commit following the Conventional Commits specification.

## File
{file_path} ({change_type})

## Added Lines
{additions}

## Deleted Lines
{deletions}

## Rules
- Format the first line as `type(scope): description`
- Type: one of {types}
- Scope: optional, the module or area affected
- Description: imperative present tense ("add", "fix", "remove")
- HARD LIMIT: the first line MUST be at most 72 characters
- Set `breaking: true` ONLY if the change breaks a public API or interface

## Output Format
Respond with ONLY a JSON object (no markdown, no explanation):
{{"type": "feat", "scope": "optional scope", "commitMessage": "type(scope): description", "breaking": false, "details": "optional longer explanation"}}"#,
        file_path = diff.file_path,
        change_type = diff.change_type,
        types = type_list(),
    )
}

/// Build the prompt that merges per-file analyses into one commit message.
pub fn multi_change_prompt(analysis: &CommitAnalysis) -> String {
    let files = analysis
        .files
        .iter()
        .map(|f| format!("- {}", f))
        .collect::<Vec<_>>()
        .join("\n");

    let changes = analysis
        .change_types
        .iter()
        .map(|c| format!("- {}", c.description))
        .collect::<Vec<_>>()
        .join("\n");

    let summary = if analysis.summary.is_empty() {
        "(none)"
    } else {
        analysis.summary.as_str()
    };

    format!(
        r#"You are writing one Git commit message that covers several analyzed changes, following the Conventional Commits specification.

## Files
{files}

## Per-file Changes
{changes}

## Notes
{summary}

## Breaking
{breaking}

## Rules
- Pick the most significant change type as the primary type for the first line
- Format the first line as `type(scope): description`, at most 72 characters, imperative present tense
- List the remaining changes in the body, separated from the first line and from each other by blank lines
- Type: one of {types}
- Set `breaking: true` if any change breaks a public API or interface

## Output Format
Respond with ONLY a JSON object (no markdown, no explanation):
{{"type": "feat", "scope": "optional scope", "commitMessage": "type(scope): description\n\nother changes", "breaking": false, "details": "optional summary"}}"#,
        breaking = analysis.breaking_changes,
        types = type_list(),
    )
}

/// Deterministic message used when the model cannot be relied on.
pub fn fallback_message<S: AsRef<str>>(files: &[S], commit_type: CommitType) -> String {
    let joined = files.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", ");
    format!("{}: update {}", commit_type, joined)
}

/// Cache key over a file set and the start of the diff text.
///
/// Files are sorted so the key ignores their order. This is a lossy
/// fingerprint, so distinct diffs sharing a prefix may collide.
pub fn cache_key<S: AsRef<str>>(files: &[S], diff_text: &str) -> String {
    let mut sorted: Vec<&str> = files.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();

    let prefix: String = diff_text.chars().take(CACHE_KEY_DIFF_CHARS).collect();
    let collapsed = prefix.split_whitespace().collect::<Vec<_>>().join(" ");

    format!("{}|{}", sorted.join(","), collapsed)
}

fn format_lines(lines: &[String], marker: char) -> String {
    if lines.is_empty() {
        return "(none)".to_string();
    }
    lines
        .iter()
        .map(|l| format!("{}{}", marker, l))
        .collect::<Vec<_>>()
        .join("\n")
}

fn type_list() -> String {
    CommitType::ALL
        .iter()
        .map(CommitType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

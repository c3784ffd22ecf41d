//! Unified diff text to per-file change records.

use std::fmt;
use std::path::Path;

use glob::Pattern;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ParseOptions;
use crate::error::AnalyzerError;

use super::sanitize::sanitize_line;

/// Boundary between file blocks in `git diff` output.
const FILE_MARKER: &str = "diff --git ";

/// Kind of change a file underwent, derived from its captured line counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

impl ChangeType {
    /// `Added` when only additions exist, `Deleted` when only deletions exist,
    /// `Modified` for everything else (including no captured lines at all).
    pub fn from_counts(additions: usize, deletions: usize) -> Self {
        match (additions, deletions) {
            (a, 0) if a > 0 => ChangeType::Added,
            (0, d) if d > 0 => ChangeType::Deleted,
            _ => ChangeType::Modified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Modified => "modified",
            ChangeType::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file's block of a unified diff, with sanitized added and removed lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedDiff {
    pub file_path: String,
    pub additions: Vec<String>,
    pub deletions: Vec<String>,
    pub change_type: ChangeType,
}

impl ParsedDiff {
    fn new(file_path: String, additions: Vec<String>, deletions: Vec<String>) -> Self {
        let change_type = ChangeType::from_counts(additions.len(), deletions.len());
        Self {
            file_path,
            additions,
            deletions,
            change_type,
        }
    }
}

/// Compiled exclude patterns.
struct ExcludeMatcher {
    patterns: Vec<Pattern>,
}

impl ExcludeMatcher {
    fn new(raw: &[String]) -> Self {
        let patterns = raw
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Ignoring invalid exclude pattern '{}': {}", p, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    fn is_excluded(&self, path: &str) -> bool {
        let file_name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path);

        self.patterns
            .iter()
            .any(|p| p.matches(path) || p.matches(file_name))
    }
}

/// Parse raw diff bytes, rejecting input that is not valid UTF-8.
pub fn parse_bytes(raw: &[u8], options: &ParseOptions) -> Result<Vec<ParsedDiff>, AnalyzerError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| AnalyzerError::Validation(format!("diff is not valid UTF-8: {e}")))?;
    parse(text, options)
}

/// Parse unified diff text into one [`ParsedDiff`] per file block.
///
/// Empty input yields an empty vector. Input larger than
/// `options.max_diff_bytes` is rejected before any work is done.
pub fn parse(diff_text: &str, options: &ParseOptions) -> Result<Vec<ParsedDiff>, AnalyzerError> {
    if diff_text.len() > options.max_diff_bytes {
        return Err(AnalyzerError::Validation(format!(
            "diff is {} bytes, exceeding the {} byte limit",
            diff_text.len(),
            options.max_diff_bytes
        )));
    }

    let excludes = ExcludeMatcher::new(&options.exclude_patterns);
    let mut parsed = Vec::new();

    for chunk in file_blocks(diff_text) {
        if chunk.trim().is_empty() {
            continue;
        }

        let mut lines = chunk.lines();
        let header = lines.next().unwrap_or("");
        let file_path = extract_path(header);

        if file_path.is_empty() {
            continue;
        }
        if excludes.is_excluded(&file_path) {
            debug!("Skipping excluded file {}", file_path);
            continue;
        }

        let mut additions = Vec::new();
        let mut deletions = Vec::new();

        for line in lines {
            if let Some(rest) = line.strip_prefix('+') {
                if !rest.starts_with('+') && additions.len() < options.max_lines_per_file {
                    additions.push(sanitize_line(rest));
                }
            } else if let Some(rest) = line.strip_prefix('-') {
                if !rest.starts_with('-') && deletions.len() < options.max_lines_per_file {
                    deletions.push(sanitize_line(rest));
                }
            }
        }

        parsed.push(ParsedDiff::new(file_path, additions, deletions));
    }

    Ok(parsed)
}

/// Split diff text at `diff --git ` markers that begin a line.
///
/// Each block starts just after its marker. Text before the first marker is
/// dropped, and a marker inside a content line does not start a block.
fn file_blocks(diff_text: &str) -> Vec<&str> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in diff_text.split_inclusive('\n') {
        if line.starts_with(FILE_MARKER) {
            starts.push(offset + FILE_MARKER.len());
        }
        offset += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts
                .get(i + 1)
                .map_or(diff_text.len(), |next| next - FILE_MARKER.len());
            &diff_text[start..end]
        })
        .collect()
}

/// Pull the post-image path out of an `a/<path> b/<path>` header line.
fn extract_path(header: &str) -> String {
    let header = header.trim();
    match header.find(" b/") {
        Some(idx) if header.starts_with("a/") => header[idx + 3..].trim().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TWO_FILE_DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,3 @@
 use std::fmt;
-pub fn old() {}
+pub fn new() {}
diff --git a/README.md b/README.md
new file mode 100644
--- /dev/null
+++ b/README.md
@@ -0,0 +1,2 @@
+# Title
+Some text
";

    #[test]
    fn test_empty_input_yields_nothing() {
        let parsed = parse("", &ParseOptions::default()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_text_without_file_blocks_yields_nothing() {
        let parsed = parse("just some words\nno diff here\n", &ParseOptions::default()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_parses_two_files() {
        let parsed = parse(TWO_FILE_DIFF, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.len(), 2);

        assert_eq!(parsed[0].file_path, "src/lib.rs");
        assert_eq!(parsed[0].additions, vec!["pub fn new() {}"]);
        assert_eq!(parsed[0].deletions, vec!["pub fn old() {}"]);
        assert_eq!(parsed[0].change_type, ChangeType::Modified);

        assert_eq!(parsed[1].file_path, "README.md");
        assert_eq!(parsed[1].additions, vec!["# Title", "Some text"]);
        assert!(parsed[1].deletions.is_empty());
        assert_eq!(parsed[1].change_type, ChangeType::Added);
    }

    #[test]
    fn test_header_lines_are_not_captured() {
        let parsed = parse(TWO_FILE_DIFF, &ParseOptions::default()).unwrap();
        for diff in &parsed {
            assert!(diff.additions.iter().all(|l| !l.starts_with("++")));
            assert!(diff.deletions.iter().all(|l| !l.starts_with("--")));
        }
    }

    #[test]
    fn test_deleted_file() {
        let text = "diff --git a/old.rs b/old.rs
deleted file mode 100644
--- a/old.rs
+++ /dev/null
@@ -1,2 +0,0 @@
-fn gone() {}
-fn also_gone() {}
";
        let parsed = parse(text, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].change_type, ChangeType::Deleted);
        assert_eq!(parsed[0].deletions.len(), 2);
    }

    #[test]
    fn test_caps_lines_per_file() {
        let mut text = String::from("diff --git a/big.rs b/big.rs\n");
        for i in 0..10 {
            text.push_str(&format!("+line {i}\n"));
        }
        let options = ParseOptions {
            max_lines_per_file: 3,
            ..ParseOptions::default()
        };
        let parsed = parse(&text, &options).unwrap();
        assert_eq!(parsed[0].additions, vec!["line 0", "line 1", "line 2"]);
    }

    #[test]
    fn test_default_excludes_lockfiles_and_logs() {
        let text = "diff --git a/Cargo.lock b/Cargo.lock
+checksum = \"abc\"
diff --git a/logs/app.log b/logs/app.log
+started
diff --git a/web/package-lock.json b/web/package-lock.json
+{}
diff --git a/src/main.rs b/src/main.rs
+fn main() {}
";
        let parsed = parse(text, &ParseOptions::default()).unwrap();
        let paths: Vec<&str> = parsed.iter().map(|d| d.file_path.as_str()).collect();
        assert_eq!(paths, vec!["src/main.rs"]);
    }

    #[test]
    fn test_custom_exclude_patterns() {
        let options = ParseOptions {
            exclude_patterns: vec!["src/generated/*".to_string()],
            ..ParseOptions::default()
        };
        let text = "diff --git a/src/generated/api.rs b/src/generated/api.rs
+pub struct Api;
diff --git a/Cargo.lock b/Cargo.lock
+version = 3
";
        let parsed = parse(text, &options).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].file_path, "Cargo.lock");
    }

    #[test]
    fn test_chunk_without_path_marker_is_skipped() {
        let text = "diff --git garbage header\n+added\n";
        let parsed = parse(text, &ParseOptions::default()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_marker_inside_content_line_is_not_a_file() {
        let text = "diff --git a/src/t.rs b/src/t.rs
--- a/src/t.rs
+++ b/src/t.rs
@@ -1,2 +1,3 @@
 fn t() {
+    let s = \"diff --git a/fake.rs b/fake.rs\";
+    let real = 1;
-    let old = \"x diff --git a/gone.rs b/gone.rs\";
";
        let parsed = parse(text, &ParseOptions::default()).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].file_path, "src/t.rs");
        assert_eq!(
            parsed[0].additions,
            vec!["let s = \"diff --git a/fake.rs b/fake.rs\";", "let real = 1;"]
        );
        assert_eq!(parsed[0].deletions.len(), 1);
    }

    #[test]
    fn test_file_blocks_split_only_at_line_start() {
        let text = "preamble\ndiff --git a/x b/x\n+a diff --git here\ndiff --git a/y b/y\n+b\n";
        assert_eq!(
            file_blocks(text),
            vec!["a/x b/x\n+a diff --git here\n", "a/y b/y\n+b\n"]
        );
    }

    #[test]
    fn test_captured_lines_are_sanitized() {
        let text = "diff --git a/config.yml b/config.yml
+password: \"secret123\"
+owner: ops@example.com
";
        let parsed = parse(text, &ParseOptions::default()).unwrap();
        assert_eq!(parsed[0].additions[0], "password: [REDACTED]");
        assert_eq!(parsed[0].additions[1], "owner: [EMAIL]");
    }

    #[test]
    fn test_oversized_input_is_rejected() {
        let options = ParseOptions {
            max_diff_bytes: 16,
            ..ParseOptions::default()
        };
        let result = parse("diff --git a/x b/x\n+123456789\n", &options);
        assert!(matches!(result, Err(AnalyzerError::Validation(_))));
    }

    #[test]
    fn test_parse_bytes_rejects_invalid_utf8() {
        let result = parse_bytes(&[0x64, 0xff, 0xfe], &ParseOptions::default());
        assert!(matches!(result, Err(AnalyzerError::Validation(_))));
    }

    #[test]
    fn test_extract_path() {
        assert_eq!(extract_path("a/src/x.rs b/src/x.rs"), "src/x.rs");
        assert_eq!(extract_path("a/old name.rs b/new name.rs"), "new name.rs");
        assert_eq!(extract_path("no markers"), "");
    }

    proptest! {
        #[test]
        fn change_type_depends_only_on_counts(additions in 0usize..500, deletions in 0usize..500) {
            let expected = if additions > 0 && deletions == 0 {
                ChangeType::Added
            } else if additions == 0 && deletions > 0 {
                ChangeType::Deleted
            } else {
                ChangeType::Modified
            };
            prop_assert_eq!(ChangeType::from_counts(additions, deletions), expected);
        }

        #[test]
        fn parsed_change_type_matches_captured_counts(adds in 0usize..20, dels in 0usize..20) {
            let mut text = String::from("diff --git a/f.rs b/f.rs\n");
            for i in 0..dels {
                text.push_str(&format!("-old {i}\n"));
            }
            for i in 0..adds {
                text.push_str(&format!("+new {i}\n"));
            }
            let parsed = parse(&text, &ParseOptions::default()).unwrap();
            prop_assert_eq!(parsed.len(), 1);
            prop_assert_eq!(
                parsed[0].change_type,
                ChangeType::from_counts(parsed[0].additions.len(), parsed[0].deletions.len())
            );
        }
    }
}

//! Path-based commit type inference for the fallback message.

use crate::commit::types::CommitType;

const DOC_EXTENSIONS: &[&str] = &[".md", ".rst", ".txt"];
const DOC_NAMES: &[&str] = &["readme", "changelog", "license", "contributing"];
const TEST_MARKERS: &[&str] = &["_test.", ".test.", ".spec."];
const STYLE_EXTENSIONS: &[&str] = &[".css", ".scss", ".sass", ".less"];

/// Guess a commit type from file paths alone.
///
/// A category only wins when every file belongs to it; mixed or
/// unrecognized sets are `chore`. An empty set is also `chore`.
pub fn infer_commit_type<S: AsRef<str>>(files: &[S]) -> CommitType {
    if files.is_empty() {
        return CommitType::Chore;
    }

    let all = |pred: fn(&str) -> bool| files.iter().all(|f| pred(&f.as_ref().to_lowercase()));

    if all(is_docs) {
        CommitType::Docs
    } else if all(is_test) {
        CommitType::Test
    } else if all(is_style) {
        CommitType::Style
    } else {
        CommitType::Chore
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_docs(path: &str) -> bool {
    let name = file_name(path);
    path.starts_with("docs/")
        || path.contains("/docs/")
        || DOC_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
        || DOC_NAMES.iter().any(|doc| name.starts_with(doc))
}

fn is_test(path: &str) -> bool {
    let name = file_name(path);
    path.starts_with("tests/")
        || path.contains("/tests/")
        || name.starts_with("test_")
        || TEST_MARKERS.iter().any(|m| name.contains(m))
}

fn is_style(path: &str) -> bool {
    STYLE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

//! Staged diff retrieval from a git repository using git2.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use git2::{Delta, Diff, DiffFindOptions, DiffFormat, ErrorCode, Repository, Tree};
use serde::Serialize;
use tracing::debug;

use crate::error::SourceControlError;

/// Status of a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "Added"),
            FileStatus::Modified => write!(f, "Modified"),
            FileStatus::Deleted => write!(f, "Deleted"),
            FileStatus::Renamed => write!(f, "Renamed"),
        }
    }
}

/// A file with staged changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedFile {
    pub path: String,
    pub status: FileStatus,
    /// Old path for renamed files (None for non-rename changes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

/// Source of staged changes for a repository.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiffSource: Send + Sync {
    /// Raw unified diff text of everything staged under `root`.
    async fn staged_diff(&self, root: &Path) -> Result<String, SourceControlError>;

    /// File-level summary of the staged changes under `root`.
    async fn changed_files(&self, root: &Path) -> Result<Vec<ChangedFile>, SourceControlError>;
}

/// [`DiffSource`] backed by libgit2.
///
/// git2 is synchronous, so every call runs on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitDiffSource;

#[async_trait]
impl DiffSource for GitDiffSource {
    async fn staged_diff(&self, root: &Path) -> Result<String, SourceControlError> {
        let root = root.to_path_buf();
        run_blocking(move || {
            let repo = open_repository(&root)?;
            let diff = staged(&repo)?;
            render_patch(&diff)
        })
        .await
    }

    async fn changed_files(&self, root: &Path) -> Result<Vec<ChangedFile>, SourceControlError> {
        let root = root.to_path_buf();
        run_blocking(move || {
            let repo = open_repository(&root)?;
            let mut diff = staged(&repo)?;
            let mut find_opts = DiffFindOptions::new();
            find_opts.renames(true);
            diff.find_similar(Some(&mut find_opts))
                .map_err(SourceControlError::StatusFailed)?;
            Ok(collect_files(&diff))
        })
        .await
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T, SourceControlError>
where
    F: FnOnce() -> Result<T, SourceControlError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| SourceControlError::TaskFailed(e.to_string()))?
}

fn open_repository(root: &Path) -> Result<Repository, SourceControlError> {
    Repository::open(root).map_err(|source| SourceControlError::OpenRepository {
        path: root.display().to_string(),
        source,
    })
}

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found),
/// so the first commit's staged files diff against the empty tree.
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, SourceControlError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(SourceControlError::DiffFailed(e)),
    };

    let tree = head_ref
        .peel_to_tree()
        .map_err(SourceControlError::DiffFailed)?;
    Ok(Some(tree))
}

/// Diff between HEAD and the index.
fn staged(repo: &Repository) -> Result<Diff<'_>, SourceControlError> {
    let head_tree = resolve_head_tree(repo)?;
    repo.diff_tree_to_index(head_tree.as_ref(), None, None)
        .map_err(SourceControlError::DiffFailed)
}

/// Render a diff as unified patch text, headers included.
fn render_patch(diff: &Diff<'_>) -> Result<String, SourceControlError> {
    let mut text = String::new();

    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        if origin == '+' || origin == '-' || origin == ' ' {
            text.push(origin);
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .map_err(SourceControlError::DiffFailed)?;

    debug!("Rendered staged diff: {} bytes", text.len());
    Ok(text)
}

/// Collect changed file entries from a diff.
fn collect_files(diff: &Diff<'_>) -> Vec<ChangedFile> {
    let mut files = Vec::new();

    for delta in diff.deltas() {
        let status = match delta.status() {
            Delta::Added | Delta::Untracked | Delta::Copied => FileStatus::Added,
            Delta::Deleted => FileStatus::Deleted,
            Delta::Renamed => FileStatus::Renamed,
            _ => FileStatus::Modified,
        };

        let new_path = delta
            .new_file()
            .path()
            .map(|p| p.to_string_lossy().to_string());
        let old_path = delta
            .old_file()
            .path()
            .map(|p| p.to_string_lossy().to_string());

        let (path, old_path) = match status {
            FileStatus::Renamed => {
                let path = new_path
                    .clone()
                    .or_else(|| old_path.clone())
                    .unwrap_or_default();
                (path, old_path)
            }
            _ => (new_path.or(old_path).unwrap_or_default(), None),
        };

        if !path.is_empty() {
            files.push(ChangedFile {
                path,
                status,
                old_path,
            });
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

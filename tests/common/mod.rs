//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};

use diffscribe::config::AnalyzerConfig;
use diffscribe::diff::{ChangedFile, DiffSource};
use diffscribe::error::{ModelError, SourceControlError};
use diffscribe::llm::LanguageModel;

/// Analyzer config with short retry delays so failing-model tests stay fast.
pub fn fast_config() -> AnalyzerConfig {
    AnalyzerConfig {
        retry_base_delay: Duration::from_millis(5),
        batch_pause: Duration::from_millis(1),
        ..AnalyzerConfig::default()
    }
}

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        Self { dir, repo }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Get the test signature for commits.
    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Write a file and add it to the index without committing.
    pub fn stage(&self, path: &str, content: &str) {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full, content).expect("Failed to write test file");

        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(path)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Remove a file from the working tree and the index.
    pub fn stage_removal(&self, path: &str) {
        std::fs::remove_file(self.dir.path().join(path)).expect("Failed to remove file");
        let mut index = self.repo.index().expect("Failed to get index");
        index.remove_path(Path::new(path)).expect("Failed to remove from index");
        index.write().expect("Failed to write index");
    }

    /// Commit whatever is staged. Returns the commit OID.
    pub fn commit(&self, message: &str) -> Oid {
        let sig = self.signature();
        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }
}

/// Scripted [`LanguageModel`] that counts calls and records prompts.
///
/// Replies are served in order; the last one repeats once the script runs out.
pub struct FakeModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying(replies: &[&str]) -> Self {
        Self::scripted(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    /// Every call fails as if the provider CLI exited with an error.
    pub fn failing(message: &str) -> Self {
        Self::scripted(vec![Err(message.to_string())])
    }

    fn scripted(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            match replies.pop_front() {
                Some(reply) => {
                    *last = Some(reply.clone());
                    reply
                }
                None => last.clone().unwrap_or_else(|| Err("no scripted reply".to_string())),
            }
        };

        reply.map_err(|message| ModelError::NonZeroExit {
            provider: "Fake",
            code: 1,
            stderr: message,
        })
    }
}

/// [`DiffSource`] serving a fixed diff, or failing like a broken `git`.
pub struct FakeSource {
    diff: Option<String>,
}

impl FakeSource {
    pub fn with_diff(diff: &str) -> Self {
        Self {
            diff: Some(diff.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { diff: None }
    }
}

#[async_trait]
impl DiffSource for FakeSource {
    async fn staged_diff(&self, _root: &Path) -> Result<String, SourceControlError> {
        self.diff.clone().ok_or_else(|| SourceControlError::CommandFailed {
            command: "git diff --cached".to_string(),
            stderr: "fatal: not a git repository".to_string(),
        })
    }

    async fn changed_files(&self, _root: &Path) -> Result<Vec<ChangedFile>, SourceControlError> {
        Ok(Vec::new())
    }
}

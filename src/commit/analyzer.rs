//! Commit analysis pipeline.
//!
//! Fetches the staged diff, parses it, consults the cache, fans files out to
//! the model in batches, consolidates the answers and applies the fallback
//! policy when the model cannot be relied on.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::commit::cache::CommitCache;
use crate::commit::heuristics::infer_commit_type;
use crate::commit::prompt::{cache_key, fallback_message, multi_change_prompt, single_change_prompt};
use crate::commit::types::{CommitAnalysis, ModelResponse};
use crate::config::AnalyzerConfig;
use crate::diff::{ChangedFile, DiffSource, ParsedDiff, parse};
use crate::error::{AnalyzerError, ErrorKind};
use crate::llm::{LanguageModel, RetryPolicy, retry_with_backoff, with_timeout};

/// Message returned when nothing is staged.
pub const NO_CHANGES_MESSAGE: &str = "No changes to commit";

/// Where an outcome's message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeSource {
    Model,
    Cache,
    Fallback,
    NoChanges,
}

impl fmt::Display for OutcomeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutcomeSource::Model => "model",
            OutcomeSource::Cache => "cache",
            OutcomeSource::Fallback => "fallback",
            OutcomeSource::NoChanges => "no changes",
        };
        f.write_str(name)
    }
}

/// A commit message together with the analysis behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub message: String,
    pub analysis: CommitAnalysis,
    pub source: OutcomeSource,
}

impl AnalysisOutcome {
    fn no_changes() -> Self {
        Self {
            message: NO_CHANGES_MESSAGE.to_string(),
            analysis: CommitAnalysis::empty(),
            source: OutcomeSource::NoChanges,
        }
    }

    /// Deterministic outcome built from file paths alone.
    fn fallback(files: Vec<String>) -> Self {
        let commit_type = infer_commit_type(&files);
        Self {
            message: fallback_message(&files, commit_type),
            analysis: CommitAnalysis {
                files,
                ..CommitAnalysis::empty()
            },
            source: OutcomeSource::Fallback,
        }
    }
}

/// Staged files with their parsed diffs, as listed by [`CommitAnalyzer::list_changes`].
#[derive(Debug, Clone, Serialize)]
pub struct ChangeListing {
    pub files: Vec<ChangedFile>,
    pub diffs: Vec<ParsedDiff>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Idle,
    BatchInFlight { batch: usize, total: usize },
    Consolidating,
    Done,
    Fallback,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::BatchInFlight { batch, total } => {
                write!(f, "batch {}/{} in flight", batch, total)
            }
            PipelineState::Consolidating => write!(f, "consolidating"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Fallback => write!(f, "fallback"),
        }
    }
}

impl PipelineState {
    fn advance(&mut self, next: PipelineState) {
        debug!("Pipeline: {} -> {}", self, next);
        *self = next;
    }
}

/// Drives diff retrieval, model calls and consolidation for one repository at a time.
///
/// The cache lives as long as the analyzer, so repeated runs over an
/// unchanged diff skip the model.
pub struct CommitAnalyzer {
    source: Arc<dyn DiffSource>,
    model: Arc<dyn LanguageModel>,
    config: AnalyzerConfig,
    cache: Mutex<CommitCache>,
}

impl CommitAnalyzer {
    pub fn new(
        source: Arc<dyn DiffSource>,
        model: Arc<dyn LanguageModel>,
        config: AnalyzerConfig,
    ) -> Self {
        let cache = CommitCache::new(config.cache_max_size, config.cache_ttl);
        Self {
            source,
            model,
            config,
            cache: Mutex::new(cache),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Produce a commit message for the changes staged under `root`.
    ///
    /// Nothing staged is a normal outcome. Model timeouts and unusable
    /// responses degrade to a deterministic fallback message. Diff source
    /// failures are returned unchanged; anything else is logged and returned.
    pub async fn analyze(&self, root: &Path) -> Result<AnalysisOutcome, AnalyzerError> {
        let mut state = PipelineState::Idle;

        let (raw, diffs) = match self.staged_changes(root).await {
            Ok(staged) => staged,
            Err(e) => return self.handle_failure(e, Vec::new(), &mut state),
        };
        let files: Vec<String> = diffs.iter().map(|d| d.file_path.clone()).collect();
        let key = cache_key(&files, &raw);

        let cached = self.cache.lock().await.get(&key);
        if let Some(response) = cached {
            info!("Using cached commit message for {} file(s)", files.len());
            state.advance(PipelineState::Done);
            return Ok(AnalysisOutcome {
                message: response.commit_message.clone(),
                analysis: CommitAnalysis::from_response(files, &response),
                source: OutcomeSource::Cache,
            });
        }

        match self.generate(&diffs, &files, &mut state).await {
            Ok((response, analysis)) => {
                self.cache.lock().await.set(key, response.clone());
                state.advance(PipelineState::Done);
                Ok(AnalysisOutcome {
                    message: response.commit_message,
                    analysis,
                    source: OutcomeSource::Model,
                })
            }
            Err(e) => self.handle_failure(e, files, &mut state),
        }
    }

    /// List staged files along with their parsed, sanitized diffs.
    pub async fn list_changes(&self, root: &Path) -> Result<ChangeListing, AnalyzerError> {
        let files = self.source.changed_files(root).await?;
        let raw = self.source.staged_diff(root).await?;
        let diffs = parse(&raw, &self.config.parse)?;
        Ok(ChangeListing { files, diffs })
    }

    async fn staged_changes(&self, root: &Path) -> Result<(String, Vec<ParsedDiff>), AnalyzerError> {
        let raw = self.source.staged_diff(root).await?;
        let diffs = parse(&raw, &self.config.parse)?;
        if diffs.is_empty() {
            return Err(AnalyzerError::NoChanges);
        }
        debug!("Parsed {} file diff(s) from {} bytes", diffs.len(), raw.len());
        Ok((raw, diffs))
    }

    /// Run the model over every file, then merge the answers.
    ///
    /// With a single file its own response is final and no merge call is made.
    async fn generate(
        &self,
        diffs: &[ParsedDiff],
        files: &[String],
        state: &mut PipelineState,
    ) -> Result<(ModelResponse, CommitAnalysis), AnalyzerError> {
        let responses = self.analyze_batches(diffs, state).await?;

        if let [only] = responses.as_slice() {
            let analysis = CommitAnalysis::from_response(files.to_vec(), only);
            return Ok((only.clone(), analysis));
        }

        state.advance(PipelineState::Consolidating);
        let draft = CommitAnalysis::consolidate(
            files.iter().map(String::as_str).zip(responses.iter()),
        );
        let final_response = self.call_model(multi_change_prompt(&draft)).await?;
        let analysis = draft.finalize(&final_response);
        Ok((final_response, analysis))
    }

    /// One categorization call per file: concurrent within a batch,
    /// sequential across batches with a pause in between.
    async fn analyze_batches(
        &self,
        diffs: &[ParsedDiff],
        state: &mut PipelineState,
    ) -> Result<Vec<ModelResponse>, AnalyzerError> {
        let batch_size = self.config.batch_size.max(1);
        let total = diffs.len().div_ceil(batch_size);
        let mut responses = Vec::with_capacity(diffs.len());

        for (index, batch) in diffs.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch_pause).await;
            }
            state.advance(PipelineState::BatchInFlight {
                batch: index + 1,
                total,
            });

            let calls = batch
                .iter()
                .map(|diff| self.call_model(single_change_prompt(diff)));
            // A propagating failure outranks a fallback-worthy one, whatever
            // the file order.
            let mut recoverable = None;
            for result in join_all(calls).await {
                match result {
                    Ok(response) => responses.push(response),
                    Err(e) if e.is_recoverable() => {
                        recoverable.get_or_insert(e);
                    }
                    Err(e) => return Err(e),
                }
            }
            if let Some(e) = recoverable {
                return Err(e);
            }
        }

        Ok(responses)
    }

    /// The single model-call wrapper: retry around a timed call, then
    /// JSON extraction and validation.
    async fn call_model(&self, prompt: String) -> Result<ModelResponse, AnalyzerError> {
        let policy = RetryPolicy {
            max_attempts: self.config.max_attempts,
            base_delay: self.config.retry_base_delay,
        };
        let timeout = self.config.call_timeout;
        let model = self.model.as_ref();
        let prompt = prompt.as_str();

        retry_with_backoff(policy, move |attempt| async move {
            debug!("Model call attempt {} ({} prompt chars)", attempt + 1, prompt.len());
            let text = with_timeout(timeout, async {
                model.generate(prompt).await.map_err(AnalyzerError::from)
            })
            .await?;
            ModelResponse::parse(&text)
        })
        .await
    }

    fn handle_failure(
        &self,
        err: AnalyzerError,
        files: Vec<String>,
        state: &mut PipelineState,
    ) -> Result<AnalysisOutcome, AnalyzerError> {
        match err.kind() {
            ErrorKind::NoChanges => {
                info!("{}", NO_CHANGES_MESSAGE);
                state.advance(PipelineState::Done);
                Ok(AnalysisOutcome::no_changes())
            }
            ErrorKind::LlmTimeout | ErrorKind::InvalidResponse => {
                warn!("Falling back to a generated message: {}", err);
                state.advance(PipelineState::Fallback);
                Ok(AnalysisOutcome::fallback(files))
            }
            ErrorKind::SourceControl => Err(err),
            ErrorKind::Validation | ErrorKind::Unexpected => {
                error!(kind = %err.kind(), "Commit analysis failed: {}", err);
                Err(err)
            }
        }
    }
}

//! diffscribe - AI-assisted conventional commit messages and reviews for staged changes.
//!
//! # Overview
//!
//! diffscribe reads a repository's staged diff, parses and sanitizes it, asks a
//! language model (Claude or Codex CLI) to categorize each file in batches, and
//! consolidates the answers into one conventional commit message. Responses are
//! cached in-process, and a deterministic message is produced when the model
//! times out or answers with something unusable.

pub mod commit;
pub mod config;
pub mod diff;
pub mod error;
pub mod llm;
pub mod logging;
pub mod review;
pub mod tools;

// Re-export commonly used types
pub use commit::{AnalysisOutcome, CommitAnalysis, CommitAnalyzer, CommitType, ModelResponse, OutcomeSource};
pub use config::{AnalyzerConfig, ParseOptions};
pub use diff::{ChangeType, DiffSource, GitDiffSource, ParsedDiff};
pub use error::{AnalyzerError, ErrorKind, ModelError, SourceControlError, ToolError};
pub use llm::{CliModel, LanguageModel, Provider};
pub use review::{ReviewWriter, render_review};
pub use tools::ToolRegistry;

//! Commit message generation: domain types, prompts, caching and the analysis pipeline.

pub mod analyzer;
pub mod cache;
pub mod heuristics;
pub mod prompt;
pub mod types;

pub use analyzer::{AnalysisOutcome, ChangeListing, CommitAnalyzer, NO_CHANGES_MESSAGE, OutcomeSource};
pub use cache::CommitCache;
pub use heuristics::infer_commit_type;
pub use prompt::{cache_key, fallback_message, multi_change_prompt, single_change_prompt};
pub use types::{ChangeCategory, CommitAnalysis, CommitType, ModelResponse};

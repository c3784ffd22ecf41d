//! Error types for diffscribe modules using thiserror.

use std::fmt;

use thiserror::Error;

/// Errors from the diff source (the version-control collaborator).
///
/// These are never recovered by the analyzer; they reach the caller unchanged.
#[derive(Error, Debug)]
pub enum SourceControlError {
    #[error("Failed to open repository at {path}: {source}")]
    OpenRepository {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to collect staged diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Failed to read repository status: {0}")]
    StatusFailed(#[source] git2::Error),

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Diff collection task failed: {0}")]
    TaskFailed(String),
}

/// Errors from language-model providers.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("{provider} CLI not found. {hint}")]
    NotInstalled {
        provider: &'static str,
        hint: &'static str,
    },

    #[error("Failed to spawn {provider} process: {source}")]
    SpawnFailed {
        provider: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{provider} CLI exited with code {code}: {stderr}")]
    NonZeroExit {
        provider: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("{provider} reported an error: {message}")]
    ExecutionFailed {
        provider: &'static str,
        message: String,
    },
}

/// Errors surfaced by the commit analysis pipeline.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("No changes to commit (nothing is staged)")]
    NoChanges,

    #[error("Language model call timed out after {timeout_ms}ms")]
    LlmTimeout { timeout_ms: u64 },

    #[error("Language model returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    SourceControl(#[from] SourceControlError),

    #[error("Language model provider failed: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of [`AnalyzerError`], used to pick retry vs. fallback vs. propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoChanges,
    LlmTimeout,
    InvalidResponse,
    SourceControl,
    Validation,
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NoChanges => "no-changes",
            ErrorKind::LlmTimeout => "llm-timeout",
            ErrorKind::InvalidResponse => "invalid-response",
            ErrorKind::SourceControl => "source-control",
            ErrorKind::Validation => "validation",
            ErrorKind::Unexpected => "unexpected",
        };
        f.write_str(name)
    }
}

impl AnalyzerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyzerError::NoChanges => ErrorKind::NoChanges,
            AnalyzerError::LlmTimeout { .. } => ErrorKind::LlmTimeout,
            AnalyzerError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            AnalyzerError::SourceControl(_) => ErrorKind::SourceControl,
            AnalyzerError::Validation(_) => ErrorKind::Validation,
            AnalyzerError::Model(_) | AnalyzerError::Io(_) => ErrorKind::Unexpected,
        }
    }

    /// Whether the analyzer degrades to the deterministic fallback message.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::LlmTimeout | ErrorKind::InvalidResponse
        )
    }
}

/// Errors from the tool surface.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool} at '{path}': {message}")]
    InvalidArguments {
        tool: &'static str,
        path: String,
        message: String,
    },

    #[error("Invalid arguments for {tool}: {message}")]
    Validation {
        tool: &'static str,
        message: String,
    },

    #[error(transparent)]
    Failed(#[from] AnalyzerError),

    #[error("Failed to serialize tool output: {0}")]
    Serialization(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_covers_every_variant() {
        assert_eq!(AnalyzerError::NoChanges.kind(), ErrorKind::NoChanges);
        assert_eq!(
            AnalyzerError::LlmTimeout { timeout_ms: 10 }.kind(),
            ErrorKind::LlmTimeout
        );
        assert_eq!(
            AnalyzerError::InvalidResponse("x".into()).kind(),
            ErrorKind::InvalidResponse
        );
        assert_eq!(
            AnalyzerError::SourceControl(SourceControlError::TaskFailed("x".into())).kind(),
            ErrorKind::SourceControl
        );
        assert_eq!(
            AnalyzerError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            AnalyzerError::Model(ModelError::NotInstalled {
                provider: "Claude",
                hint: ""
            })
            .kind(),
            ErrorKind::Unexpected
        );
    }

    #[test]
    fn test_only_timeout_and_invalid_response_are_recoverable() {
        assert!(AnalyzerError::LlmTimeout { timeout_ms: 1 }.is_recoverable());
        assert!(AnalyzerError::InvalidResponse("bad".into()).is_recoverable());
        assert!(!AnalyzerError::NoChanges.is_recoverable());
        assert!(!AnalyzerError::Validation("bad".into()).is_recoverable());
        assert!(
            !AnalyzerError::SourceControl(SourceControlError::CommandFailed {
                command: "git diff".into(),
                stderr: "fatal".into(),
            })
            .is_recoverable()
        );
    }

    #[test]
    fn test_source_control_error_is_transparent() {
        let err = AnalyzerError::from(SourceControlError::CommandFailed {
            command: "git diff --cached".into(),
            stderr: "fatal: not a git repository".into(),
        });
        assert_eq!(
            err.to_string(),
            "git diff --cached failed: fatal: not a git repository"
        );
    }
}

//! Externally invocable tools with JSON-schema described inputs.
//!
//! Arguments are deserialized with path-aware errors and validated before
//! any side effect runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::commit::CommitAnalyzer;
use crate::error::ToolError;
use crate::review::{ReviewWriter, validate_path};

/// Name, description and input schema of a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

pub trait Tool: DeserializeOwned + JsonSchema {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    /// Reject inputs that must not reach the side-effecting step.
    fn validate(&self) -> Result<(), ToolError>;

    fn parameters() -> Value {
        schema_for!(Self).as_value().to_owned()
    }

    fn definition() -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME,
            description: Self::DESCRIPTION,
            parameters: Self::parameters(),
        }
    }

    /// Deserialize and validate raw JSON arguments.
    fn parse_args(args: &str) -> Result<Self, ToolError> {
        let jd = &mut serde_json::Deserializer::from_str(args);
        let parsed: Self = serde_path_to_error::deserialize(jd).map_err(|e| {
            error!("Failed to parse JSON arguments for {} at path: {}", Self::NAME, e.path());
            ToolError::InvalidArguments {
                tool: Self::NAME,
                path: e.path().to_string(),
                message: e.inner().to_string(),
            }
        })?;
        parsed.validate()?;
        Ok(parsed)
    }
}

/// # list_changes
/// List the staged files of a repository with their parsed, sanitized diffs.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListChanges {
    /// Repository root directory
    pub root: PathBuf,
}

/// # generate_commit_message
/// Generate a conventional commit message for a repository's staged changes.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GenerateCommitMessage {
    /// Repository root directory
    pub root: PathBuf,
}

/// # write_file
/// Write text content to a file, creating parent directories.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct WriteFile {
    /// Target path; must not contain `..` segments
    pub path: PathBuf,
    /// Text to write
    pub content: String,
}

fn require_root(tool: &'static str, root: &Path) -> Result<(), ToolError> {
    if root.as_os_str().is_empty() {
        return Err(ToolError::Validation {
            tool,
            message: "root must not be empty".to_string(),
        });
    }
    Ok(())
}

impl Tool for ListChanges {
    const NAME: &'static str = "list_changes";
    const DESCRIPTION: &'static str =
        "List staged files with their status and parsed diffs for a repository root.";

    fn validate(&self) -> Result<(), ToolError> {
        require_root(Self::NAME, &self.root)
    }
}

impl Tool for GenerateCommitMessage {
    const NAME: &'static str = "generate_commit_message";
    const DESCRIPTION: &'static str =
        "Generate a conventional commit message for the staged changes of a repository root.";

    fn validate(&self) -> Result<(), ToolError> {
        require_root(Self::NAME, &self.root)
    }
}

impl Tool for WriteFile {
    const NAME: &'static str = "write_file";
    const DESCRIPTION: &'static str =
        "Write text content to a file path. Paths with '..' segments are rejected.";

    fn validate(&self) -> Result<(), ToolError> {
        validate_path(&self.path).map_err(|e| ToolError::Validation {
            tool: Self::NAME,
            message: e.to_string(),
        })?;
        if self.content.is_empty() {
            return Err(ToolError::Validation {
                tool: Self::NAME,
                message: "content must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Dispatches tool calls by name.
pub struct ToolRegistry {
    analyzer: Arc<CommitAnalyzer>,
    writer: ReviewWriter,
}

impl ToolRegistry {
    pub fn new(analyzer: Arc<CommitAnalyzer>) -> Self {
        Self {
            analyzer,
            writer: ReviewWriter::new(),
        }
    }

    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ListChanges::definition(),
            GenerateCommitMessage::definition(),
            WriteFile::definition(),
        ]
    }

    /// Run tool `name` with raw JSON `args`, returning its JSON result.
    pub async fn call(&self, name: &str, args: &str) -> Result<Value, ToolError> {
        debug!("Tool call: {}", name);
        match name {
            ListChanges::NAME => {
                let input = ListChanges::parse_args(args)?;
                let listing = self.analyzer.list_changes(&input.root).await?;
                serde_json::to_value(listing).map_err(ToolError::Serialization)
            }
            GenerateCommitMessage::NAME => {
                let input = GenerateCommitMessage::parse_args(args)?;
                let outcome = self.analyzer.analyze(&input.root).await?;
                serde_json::to_value(outcome).map_err(ToolError::Serialization)
            }
            WriteFile::NAME => {
                let input = WriteFile::parse_args(args)?;
                let bytes = self.writer.write(&input.path, &input.content)?;
                Ok(json!({
                    "path": input.path.display().to_string(),
                    "bytesWritten": bytes,
                }))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

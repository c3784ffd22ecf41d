//! Commit analysis domain types and model response validation.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;
use crate::llm::extract_json;

/// Conventional commit types the model may choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Refactor,
    Docs,
    Test,
    Chore,
    Style,
    Perf,
}

impl CommitType {
    pub const ALL: [CommitType; 8] = [
        CommitType::Feat,
        CommitType::Fix,
        CommitType::Refactor,
        CommitType::Docs,
        CommitType::Test,
        CommitType::Chore,
        CommitType::Style,
        CommitType::Perf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Refactor => "refactor",
            CommitType::Docs => "docs",
            CommitType::Test => "test",
            CommitType::Chore => "chore",
            CommitType::Style => "style",
            CommitType::Perf => "perf",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feat" => Ok(Self::Feat),
            "fix" => Ok(Self::Fix),
            "refactor" => Ok(Self::Refactor),
            "docs" => Ok(Self::Docs),
            "test" => Ok(Self::Test),
            "chore" => Ok(Self::Chore),
            "style" => Ok(Self::Style),
            "perf" => Ok(Self::Perf),
            _ => Err(format!("Unknown commit type: {}", s)),
        }
    }
}

/// A categorized change within a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCategory {
    #[serde(rename = "type")]
    pub commit_type: CommitType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub description: String,
}

/// A validated categorization returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub commit_message: String,
    #[serde(rename = "type")]
    pub commit_type: CommitType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default)]
    pub breaking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Wire shape before validation; every field may be missing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModelResponse {
    commit_message: Option<String>,
    #[serde(rename = "type")]
    commit_type: Option<String>,
    scope: Option<String>,
    #[serde(default)]
    breaking: bool,
    details: Option<String>,
}

impl ModelResponse {
    /// Parse and validate raw model output.
    ///
    /// The JSON object may be wrapped in markdown or prose. Rejects output
    /// missing `type` or `commitMessage`, or naming a type outside [`CommitType`].
    pub fn parse(output: &str) -> Result<Self, AnalyzerError> {
        let json_str = extract_json(output);
        let raw: RawModelResponse = serde_json::from_str(&json_str).map_err(|e| {
            AnalyzerError::InvalidResponse(format!(
                "could not parse JSON: {}. Response: {}",
                e,
                preview(output)
            ))
        })?;

        let commit_message = raw
            .commit_message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| AnalyzerError::InvalidResponse("missing commitMessage".to_string()))?;

        let type_str = raw
            .commit_type
            .ok_or_else(|| AnalyzerError::InvalidResponse("missing type".to_string()))?;
        let commit_type = type_str
            .parse::<CommitType>()
            .map_err(AnalyzerError::InvalidResponse)?;

        Ok(Self {
            commit_message,
            commit_type,
            scope: non_blank(raw.scope),
            breaking: raw.breaking,
            details: non_blank(raw.details),
        })
    }

    /// Subject line of the commit message.
    pub fn subject(&self) -> &str {
        self.commit_message.lines().next().unwrap_or("").trim()
    }

    pub fn category(&self) -> ChangeCategory {
        ChangeCategory {
            commit_type: self.commit_type,
            scope: self.scope.clone(),
            description: self.subject().to_string(),
        }
    }
}

/// The consolidated view of all changes in one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitAnalysis {
    pub files: Vec<String>,
    pub summary: String,
    pub impacted_areas: Vec<String>,
    pub change_types: Vec<ChangeCategory>,
    pub breaking_changes: bool,
}

impl CommitAnalysis {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge per-file model responses into a draft analysis.
    ///
    /// Files keep first-seen order. Categories are de-duplicated by
    /// `(type, scope)` with the first description winning; impacted areas are
    /// the distinct non-empty scopes.
    pub fn consolidate<'a, I>(file_analyses: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a ModelResponse)>,
    {
        let mut analysis = Self::empty();
        let mut seen_files: HashSet<&str> = HashSet::new();
        let mut details = Vec::new();

        for (file, response) in file_analyses {
            if seen_files.insert(file) {
                analysis.files.push(file.to_string());
            }
            analysis.add_category(response.category());
            analysis.breaking_changes |= response.breaking;
            if let Some(d) = &response.details {
                details.push(d.clone());
            }
        }

        analysis.summary = details.join("\n");
        analysis
    }

    /// Rebuild an analysis from a single response, e.g. a cache hit.
    pub fn from_response(files: Vec<String>, response: &ModelResponse) -> Self {
        let mut analysis = Self {
            files,
            summary: response.details.clone().unwrap_or_default(),
            breaking_changes: response.breaking,
            ..Self::empty()
        };
        analysis.add_category(response.category());
        analysis
    }

    /// Replace the draft with the authoritative final response.
    ///
    /// Only the file list survives from the draft. The result matches what
    /// [`CommitAnalysis::from_response`] rebuilds on a cache hit.
    pub fn finalize(self, response: &ModelResponse) -> Self {
        Self::from_response(self.files, response)
    }

    fn add_category(&mut self, category: ChangeCategory) {
        let duplicate = self
            .change_types
            .iter()
            .any(|c| c.commit_type == category.commit_type && c.scope == category.scope);
        if duplicate {
            return;
        }

        if let Some(scope) = &category.scope
            && !self.impacted_areas.contains(scope)
        {
            self.impacted_areas.push(scope.clone());
        }
        self.change_types.push(category);
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

//! The language-model collaborator.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::ModelError;

use super::subprocess::{check_installed, run_provider};

/// Something that turns a prompt into response text.
///
/// Implementations only transport text. Timeouts, malformed JSON and missing
/// fields are detected by the analyzer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Supported model CLIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Claude,
    Codex,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Claude => "Claude",
            Provider::Codex => "Codex",
        }
    }

    pub(crate) fn binary(&self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::Codex => "codex",
        }
    }

    pub(crate) fn install_hint(&self) -> &'static str {
        match self {
            Provider::Claude => "Install with: npm install -g @anthropic-ai/claude-code",
            Provider::Codex => "Install with: npm install -g @openai/codex",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" => Ok(Provider::Claude),
            "codex" => Ok(Provider::Codex),
            other => Err(format!("Unknown provider '{}' (expected claude or codex)", other)),
        }
    }
}

/// [`LanguageModel`] that shells out to a provider CLI.
#[derive(Debug, Clone, Copy)]
pub struct CliModel {
    provider: Provider,
}

impl CliModel {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub async fn check_installed(&self) -> Result<(), ModelError> {
        check_installed(self.provider).await
    }
}

#[async_trait]
impl LanguageModel for CliModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        run_provider(self.provider, prompt).await
    }
}

//! Model CLI spawning.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::ModelError;

use super::model::Provider;

/// Claude CLI JSON envelope when using `--output-format json`.
#[derive(serde::Deserialize)]
struct ClaudeEnvelope {
    result: String,
    #[serde(default)]
    is_error: bool,
}

/// Check that the provider's CLI is on PATH and answers `--version`.
pub async fn check_installed(provider: Provider) -> Result<(), ModelError> {
    let not_installed = ModelError::NotInstalled {
        provider: provider.as_str(),
        hint: provider.install_hint(),
    };

    if which::which(provider.binary()).is_err() {
        return Err(not_installed);
    }

    let version_check = Command::new(provider.binary())
        .arg("--version")
        .output()
        .await
        .map_err(|source| ModelError::SpawnFailed {
            provider: provider.as_str(),
            source,
        })?;

    if !version_check.status.success() {
        return Err(not_installed);
    }

    Ok(())
}

/// Run the provider's CLI with a prompt and return the response text.
///
/// The child is killed if the returned future is dropped, which is how the
/// analyzer's per-call timeout reclaims a hung process.
pub async fn run_provider(provider: Provider, prompt: &str) -> Result<String, ModelError> {
    let mut cmd = Command::new(provider.binary());
    match provider {
        Provider::Claude => {
            cmd.arg("-p").arg(prompt).arg("--output-format").arg("json");
        }
        Provider::Codex => {
            cmd.arg("exec").arg(prompt);
        }
    }

    let output = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ModelError::SpawnFailed {
            provider: provider.as_str(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let code = output.status.code().unwrap_or(-1);
        return Err(ModelError::NonZeroExit {
            provider: provider.as_str(),
            code,
            stderr,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    debug!("{} returned {} bytes", provider, stdout.len());

    match provider {
        Provider::Claude => unwrap_claude_envelope(&stdout),
        Provider::Codex => Ok(stdout),
    }
}

/// Unwrap the Claude CLI envelope, passing non-envelope output through.
fn unwrap_claude_envelope(stdout: &str) -> Result<String, ModelError> {
    match serde_json::from_str::<ClaudeEnvelope>(stdout) {
        Ok(envelope) if envelope.is_error => Err(ModelError::ExecutionFailed {
            provider: Provider::Claude.as_str(),
            message: envelope.result,
        }),
        Ok(envelope) => Ok(envelope.result),
        Err(_) => Ok(stdout.to_string()),
    }
}

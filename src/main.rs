//! diffscribe - CLI entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use diffscribe::commit::{CommitAnalyzer, OutcomeSource};
use diffscribe::config::AnalyzerConfig;
use diffscribe::diff::GitDiffSource;
use diffscribe::llm::{CliModel, Provider};
use diffscribe::review::{ReviewWriter, render_review};
use diffscribe::tools::ToolRegistry;

/// Generate conventional commit messages and reviews from staged changes.
#[derive(Parser, Debug)]
#[command(name = "diffscribe")]
#[command(about = "Generate conventional commit messages and reviews from staged changes")]
#[command(version)]
struct Cli {
    /// Model CLI to use (claude or codex)
    #[arg(long, global = true, env = "DIFFSCRIBE_PROVIDER", default_value = "claude")]
    provider: Provider,

    /// Enable debug logging (DIFFSCRIBE_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a commit message for the staged changes
    Commit {
        /// Repository root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Also write a Markdown review to this path
        #[arg(long)]
        review: Option<PathBuf>,

        /// Per-call model timeout in milliseconds [default: 2000, env: DIFFSCRIBE_TIMEOUT_MS]
        ///
        /// Model CLIs often take longer than two seconds to answer. Raise this
        /// (e.g. --timeout-ms 60000) if commits keep getting the generated
        /// fallback message.
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Files analyzed concurrently per batch
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// List staged files and their parsed diffs as JSON
    Changes {
        /// Repository root
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Write text to a file
    Write {
        #[arg(long)]
        path: PathBuf,

        #[arg(long)]
        content: String,
    },

    /// Print tool definitions with their input schemas
    Tools,

    /// Invoke a tool with JSON arguments
    Tool {
        /// Tool name, e.g. generate_commit_message
        name: String,

        /// JSON arguments, e.g. '{"root": "."}'
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    diffscribe::logging::init(cli.verbose);

    match cli.command {
        Command::Commit {
            root,
            review,
            timeout_ms,
            batch_size,
        } => {
            let mut config = AnalyzerConfig::from_env();
            if let Some(ms) = timeout_ms {
                config.call_timeout = Duration::from_millis(ms);
            }
            if let Some(size) = batch_size {
                if size == 0 {
                    bail!("--batch-size must be at least 1");
                }
                config.batch_size = size;
            }
            run_commit(cli.provider, config, &root, review.as_deref()).await
        }
        Command::Changes { root } => {
            let analyzer = build_analyzer(cli.provider, AnalyzerConfig::from_env());
            let listing = analyzer
                .list_changes(&root)
                .await
                .context("Failed to list staged changes")?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
            Ok(())
        }
        Command::Write { path, content } => {
            let bytes = ReviewWriter::new()
                .write(&path, &content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} bytes to {}", bytes, path.display());
            Ok(())
        }
        Command::Tools => {
            let definitions = ToolRegistry::definitions();
            println!("{}", serde_json::to_string_pretty(&definitions)?);
            Ok(())
        }
        Command::Tool { name, args } => {
            let registry = ToolRegistry::new(build_analyzer(cli.provider, AnalyzerConfig::from_env()));
            let result = registry
                .call(&name, &args)
                .await
                .with_context(|| format!("Tool '{}' failed", name))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

async fn run_commit(
    provider: Provider,
    config: AnalyzerConfig,
    root: &Path,
    review: Option<&Path>,
) -> Result<()> {
    CliModel::new(provider)
        .check_installed()
        .await
        .with_context(|| format!("{} CLI is required", provider))?;

    let analyzer = build_analyzer(provider, config);

    eprintln!("Analyzing staged changes with {}...", provider);
    let outcome = analyzer
        .analyze(root)
        .await
        .context("Failed to generate commit message")?;

    if outcome.source == OutcomeSource::Fallback {
        eprintln!(
            "Warning: {} did not produce a usable answer; using a generated message. \
             If it timed out, raise --timeout-ms or DIFFSCRIBE_TIMEOUT_MS.",
            provider
        );
    }
    println!("{}", outcome.message);

    if let Some(path) = review {
        let bytes = ReviewWriter::new()
            .write(path, &render_review(&outcome))
            .with_context(|| format!("Failed to write review to {}", path.display()))?;
        eprintln!("✓ Review written to {} ({} bytes)", path.display(), bytes);
    }

    Ok(())
}

fn build_analyzer(provider: Provider, config: AnalyzerConfig) -> Arc<CommitAnalyzer> {
    Arc::new(CommitAnalyzer::new(
        Arc::new(GitDiffSource),
        Arc::new(CliModel::new(provider)),
        config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_timeout_help_names_flag_default_and_env() {
        let cli = Cli::command();
        let commit = cli.find_subcommand("commit").unwrap();
        let timeout = commit
            .get_arguments()
            .find(|arg| arg.get_id() == "timeout_ms")
            .unwrap();

        let help = timeout.get_help().unwrap().to_string();
        assert!(help.contains("default: 2000"));
        assert!(help.contains("DIFFSCRIBE_TIMEOUT_MS"));
        assert!(timeout.get_long_help().unwrap().to_string().contains("--timeout-ms 60000"));
    }

    #[test]
    fn test_commit_accepts_timeout_override() {
        let cli = Cli::try_parse_from(["diffscribe", "commit", "--timeout-ms", "60000"]).unwrap();
        match cli.command {
            Command::Commit { timeout_ms, .. } => assert_eq!(timeout_ms, Some(60000)),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

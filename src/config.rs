//! Pipeline configuration with environment overrides.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Default exclude patterns: lockfiles and logs never reach the model.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "*.lock",
    "*.log",
];

/// Upper bound on raw diff size accepted by the parser (1 MiB).
pub const DEFAULT_MAX_DIFF_BYTES: usize = 1024 * 1024;

const TIMEOUT_ENV_VAR: &str = "DIFFSCRIBE_TIMEOUT_MS";
const BATCH_SIZE_ENV_VAR: &str = "DIFFSCRIBE_BATCH_SIZE";
const MAX_ATTEMPTS_ENV_VAR: &str = "DIFFSCRIBE_MAX_ATTEMPTS";
const CACHE_TTL_ENV_VAR: &str = "DIFFSCRIBE_CACHE_TTL_SECS";
const MAX_DIFF_BYTES_ENV_VAR: &str = "DIFFSCRIBE_MAX_DIFF_BYTES";

/// Options controlling how raw diff text becomes [`ParsedDiff`](crate::diff::ParsedDiff) records.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Cap on additions and on deletions captured per file.
    pub max_lines_per_file: usize,
    /// Glob patterns matched against the file path and the file name.
    pub exclude_patterns: Vec<String>,
    /// Advisory; context lines are never captured.
    pub include_context: bool,
    /// Inputs larger than this are rejected before parsing.
    pub max_diff_bytes: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_lines_per_file: 50,
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            include_context: false,
            max_diff_bytes: DEFAULT_MAX_DIFF_BYTES,
        }
    }
}

/// Tunables for the commit analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub call_timeout: Duration,
    /// Total attempts per model call, first one included.
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub cache_max_size: usize,
    pub cache_ttl: Duration,
    pub parse: ParseOptions,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            batch_pause: Duration::from_millis(100),
            call_timeout: Duration::from_millis(2000),
            max_attempts: 2,
            retry_base_delay: Duration::from_millis(500),
            cache_max_size: 100,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            parse: ParseOptions::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Build the default configuration with `DIFFSCRIBE_*` environment overrides applied.
    ///
    /// Invalid values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = read_env::<u64>(TIMEOUT_ENV_VAR) {
            config.call_timeout = Duration::from_millis(ms);
        }
        if let Some(size) = read_env::<usize>(BATCH_SIZE_ENV_VAR) {
            if size == 0 {
                warn!("{} must be at least 1, keeping {}", BATCH_SIZE_ENV_VAR, config.batch_size);
            } else {
                config.batch_size = size;
            }
        }
        if let Some(attempts) = read_env::<u32>(MAX_ATTEMPTS_ENV_VAR) {
            if attempts == 0 {
                warn!("{} must be at least 1, keeping {}", MAX_ATTEMPTS_ENV_VAR, config.max_attempts);
            } else {
                config.max_attempts = attempts;
            }
        }
        if let Some(secs) = read_env::<u64>(CACHE_TTL_ENV_VAR) {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(bytes) = read_env::<usize>(MAX_DIFF_BYTES_ENV_VAR) {
            config.parse.max_diff_bytes = bytes;
        }

        config
    }
}

/// Read and parse an environment variable, warning when it is set but invalid.
fn read_env<T: FromStr>(name: &str) -> Option<T> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => match v.trim().parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                warn!("Invalid {} value '{}', using default", name, v);
                None
            }
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.batch_pause, Duration::from_millis(100));
        assert_eq!(config.call_timeout, Duration::from_millis(2000));
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.cache_max_size, 100);
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.parse.max_lines_per_file, 50);
        assert!(config.parse.exclude_patterns.iter().any(|p| p == "*.log"));
        assert!(config.parse.exclude_patterns.iter().any(|p| p == "package-lock.json"));
    }

    #[test]
    #[serial]
    fn test_from_env_applies_overrides() {
        temp_env::with_vars(
            [
                (TIMEOUT_ENV_VAR, Some("750")),
                (BATCH_SIZE_ENV_VAR, Some("5")),
                (MAX_ATTEMPTS_ENV_VAR, Some("4")),
                (CACHE_TTL_ENV_VAR, Some("60")),
                (MAX_DIFF_BYTES_ENV_VAR, Some("2048")),
            ],
            || {
                let config = AnalyzerConfig::from_env();
                assert_eq!(config.call_timeout, Duration::from_millis(750));
                assert_eq!(config.batch_size, 5);
                assert_eq!(config.max_attempts, 4);
                assert_eq!(config.cache_ttl, Duration::from_secs(60));
                assert_eq!(config.parse.max_diff_bytes, 2048);
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_invalid_values() {
        temp_env::with_vars(
            [
                (TIMEOUT_ENV_VAR, Some("soon")),
                (BATCH_SIZE_ENV_VAR, Some("0")),
                (MAX_ATTEMPTS_ENV_VAR, Some("0")),
            ],
            || {
                let config = AnalyzerConfig::from_env();
                assert_eq!(config.call_timeout, Duration::from_millis(2000));
                assert_eq!(config.batch_size, 3);
                assert_eq!(config.max_attempts, 2);
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_empty_value_uses_default() {
        temp_env::with_var(TIMEOUT_ENV_VAR, Some(""), || {
            let config = AnalyzerConfig::from_env();
            assert_eq!(config.call_timeout, Duration::from_millis(2000));
        });
    }
}

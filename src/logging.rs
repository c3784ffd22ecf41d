//! Tracing subscriber setup for the CLI.

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding an `EnvFilter` directive, e.g. `diffscribe=debug`.
pub const LOG_ENV_VAR: &str = "DIFFSCRIBE_LOG";

/// Install the global subscriber, writing to stderr so stdout stays parseable.
///
/// `DIFFSCRIBE_LOG` wins over the default level, which is `warn`, or `debug`
/// when `verbose` is set.
pub fn init(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let fmt = fmt::layer()
        .with_target(verbose)
        .with_writer(std::io::stderr);

    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(fmt)
        .with(env_filter)
        .try_init();

    if verbose {
        tracing::debug!("Verbose logging enabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_keeps_first_subscriber() {
        init(false);
        init(true);
        tracing::warn!("still logging");
    }
}

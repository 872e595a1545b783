//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Filter priority:
//! 1. `--log-level` CLI flag
//! 2. `SYNCWATCH_LOG` environment variable (any `EnvFilter` directive)
//! 3. `info`
//!
//! Logs go to stderr so stdout stays clean for command output.

use tracing_subscriber::EnvFilter;

pub const ENV_VAR: &str = "SYNCWATCH_LOG";

/// Installs the global subscriber. Later calls are ignored.
pub fn init(cli_level: Option<&str>) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_env(ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

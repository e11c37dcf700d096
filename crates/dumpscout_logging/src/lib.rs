//! Shared logging setup for dumpscout binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "dumpscout=info";
const QUIET_LOG_FILTER: &str = "dumpscout=warn";

/// Logging configuration for a dumpscout binary.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the file filter on stderr instead of warnings only.
    pub verbose: bool,
    /// Also write a daily-rotated log file under [`logs_dir`].
    pub log_to_file: bool,
}

/// Initialize tracing with stderr output and an optional daily log file.
///
/// `RUST_LOG` overrides the default filter for both outputs.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = if config.verbose {
        file_filter.to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| QUIET_LOG_FILTER.to_string())
    };

    let file_layer = if config.log_to_file {
        let dir = ensure_logs_dir().context("Failed to ensure log directory")?;
        let appender = tracing_appender::rolling::daily(
            dir,
            format!("{}.log", sanitize_name(config.app_name)),
        );
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_filter(file_filter),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(console_filter)),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Get the dumpscout home directory: `~/.dumpscout`, or `$DUMPSCOUT_HOME`.
pub fn dumpscout_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("DUMPSCOUT_HOME") {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".dumpscout"))
        .context("Could not determine home directory")
}

/// Get the logs directory: `~/.dumpscout/logs`
pub fn logs_dir() -> Result<PathBuf> {
    Ok(dumpscout_home()?.join("logs"))
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_path_characters() {
        assert_eq!(sanitize_name("dumpscout"), "dumpscout");
        assert_eq!(sanitize_name("dump/scout v2"), "dump_scout_v2");
    }
}

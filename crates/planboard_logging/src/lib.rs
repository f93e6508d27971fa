//! Shared logging setup for Planboard binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "planboard=info,planboard_engine=info,planboard_schema=info";
const HOME_ENV: &str = "PLANBOARD_HOME";

/// How a binary wants its console output filtered.
pub struct LogConfig<'a> {
    /// Base name of the rolling log file (`<app_name>.log.<date>`).
    pub app_name: &'a str,
    /// Mirror the file filter on stderr.
    pub verbose: bool,
    /// Only warnings and errors on stderr.
    pub quiet: bool,
}

/// Install the global subscriber: stderr plus a daily rolling file under
/// [`logs_dir`].
///
/// The returned guard flushes the file writer on drop and must be held
/// for the lifetime of the process.
pub fn init_logging(config: LogConfig<'_>) -> Result<WorkerGuard> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let appender = tracing_appender::rolling::daily(&log_dir, format!("{}.log", sanitize_name(config.app_name)));
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = console_filter(&config);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn console_filter(config: &LogConfig<'_>) -> EnvFilter {
    if config.quiet {
        EnvFilter::new("warn")
    } else if config.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("planboard=debug,planboard_engine=debug,planboard_schema=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Planboard home directory: `$PLANBOARD_HOME` or `~/.planboard`.
pub fn planboard_home() -> PathBuf {
    if let Ok(override_path) = std::env::var(HOME_ENV) {
        if !override_path.trim().is_empty() {
            return PathBuf::from(override_path);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".planboard")
}

/// Logs directory: `<home>/logs`
pub fn logs_dir() -> PathBuf {
    planboard_home().join("logs")
}

/// Create the logs directory if needed and return it.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "planboard".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("planboard"), "planboard");
        assert_eq!(sanitize_name("plan board/cli"), "plan_board_cli");
        assert_eq!(sanitize_name(""), "planboard");
    }

    #[test]
    fn test_home_override_and_logs_dir() {
        let tmp = tempfile::tempdir().unwrap();
        std::env::set_var(HOME_ENV, tmp.path());
        assert_eq!(planboard_home(), tmp.path());
        let logs = ensure_logs_dir().unwrap();
        assert!(logs.is_dir());
        assert_eq!(logs, tmp.path().join("logs"));
        std::env::remove_var(HOME_ENV);
    }
}

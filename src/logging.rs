//! Logging infrastructure for RegressionMaker
//!
//! Logs go to the console and to rotating files in the app data directory.
//!
//! - `regression-maker.<date>.log`: every level allowed by the filter
//! - `error.<date>.log`: warnings and errors only
//!
//! ```no_run
//! use regression_maker::logging;
//!
//! logging::init().expect("Failed to initialize logging");
//! tracing::info!("App started");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const APP_DIR: &str = "regression-maker";

/// Gets the log directory path based on platform conventions
///
/// Returns:
/// - Windows: `%APPDATA%/regression-maker/logs`
/// - macOS: `~/Library/Application Support/regression-maker/logs`
/// - Linux: `~/.local/share/regression-maker/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;

    let log_dir = base_dir.join(APP_DIR).join("logs");

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

/// Initializes console and rotating file output.
///
/// # Errors
///
/// Returns error if log directory cannot be created or file appenders fail
pub fn init() -> Result<()> {
    let log_dir = get_log_dir()?;

    let all_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix(APP_DIR)
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create all-logs file appender")?;

    let error_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("error")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create error-logs file appender")?;

    // Default to INFO, allow override with RUST_LOG
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    // Console output stays compact so it does not drown the CLI's own output
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(all_logs_appender);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(error_logs_appender)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(
        "Logging initialized, writing to {}",
        dated_log_file(&log_dir, APP_DIR).display()
    );

    Ok(())
}

/// Console-only logging, used when the data directory is not writable.
pub fn init_console_only() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init()
    {
        tracing::debug!("Keeping the installed subscriber: {e}");
    }
}

/// Daily rotation names files by the UTC date.
fn dated_log_file(dir: &Path, prefix: &str) -> PathBuf {
    let today = chrono::Utc::now().format("%Y-%m-%d");
    dir.join(format!("{prefix}.{today}.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_dir() {
        let log_dir = get_log_dir().expect("Failed to get log dir");
        assert!(
            log_dir.ends_with("regression-maker/logs") || log_dir.ends_with("regression-maker\\logs")
        );
    }

    #[test]
    fn test_current_log_file_is_dated() {
        let path = dated_log_file(&get_log_dir().expect("Failed to get log dir"), APP_DIR);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("regression-maker."), "name was {name}");
        assert!(name.ends_with(".log"), "name was {name}");
    }

    #[test]
    fn test_dated_log_file_matches_appender() {
        use std::io::Write as _;

        let dir = tempfile::tempdir().unwrap();
        let mut appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("session")
            .filename_suffix("log")
            .build(dir.path())
            .unwrap();
        writeln!(appender, "hello").unwrap();
        appender.flush().unwrap();

        assert!(dated_log_file(dir.path(), "session").is_file());
    }

    #[test]
    fn test_console_only_twice_is_harmless() {
        init_console_only();
        init_console_only();
        tracing::info!("still logging");
    }
}

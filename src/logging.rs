use anyhow::{Context, Result, anyhow};
use camino::Utf8Path;
use std::fs;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the level filter.
///
/// `RUST_LOG` wins when set; otherwise `debug` in debug mode and `info` otherwise.
pub fn build_env_filter(debug_mode: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Create the log directory if it doesn't exist.
pub fn ensure_log_dir(log_dir: &Utf8Path) -> Result<()> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }
    Ok(())
}

/// Setup logging with a daily rotating file and optional console output.
///
/// Console output goes to stderr so command output on stdout stays clean.
///
/// # Arguments
/// * `log_dir` - Directory for log files
/// * `log_prefix` - Prefix for log files (e.g., "bartender")
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `console_output` - If true, also log to stderr
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(
    log_dir: &Utf8Path,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    ensure_log_dir(log_dir)?;

    let file_appender = rolling::daily(log_dir, log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(build_env_filter(debug_mode))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        log_dir,
        log_prefix,
        debug_mode,
        console_output
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_log_directory_created() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = Utf8PathBuf::try_from(temp_dir.path().join("nested").join("logs")).unwrap();

        // Only the directory part; installing a global subscriber would
        // conflict with other tests in this process
        ensure_log_dir(&log_dir).unwrap();
        assert!(log_dir.is_dir());

        // Idempotent
        ensure_log_dir(&log_dir).unwrap();
    }

    #[test]
    fn test_setup_logging_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = Utf8PathBuf::try_from(temp_dir.path().join("logs")).unwrap();

        // May fail if another test already installed a subscriber,
        // but the directory must exist either way
        let _ = setup_logging(&log_dir, "test", false, false);
        assert!(log_dir.exists());
    }
}

//! Logging setup for processes hosting the hotkey engine.

use fe2cm_common::logging::{ensure_log_dir, log_dir, LOG_FILE_PREFIX};
use fe2cm_common::{runtime_mode, RuntimeMode};
use std::path::Path;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Number of daily log files kept.
const MAX_LOG_FILES: usize = 5;

fn file_appender(dir: &Path) -> Result<RollingFileAppender, String> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| e.to_string())
}

/// Initialize logging based on runtime mode.
///
/// In production mode: logs to file with daily rotation.
/// In development mode: logs to the console.
///
/// Keep the returned guard alive for as long as logs should be flushed.
/// Does nothing if a global subscriber is already installed.
pub fn init_logging() -> Option<WorkerGuard> {
    match runtime_mode() {
        RuntimeMode::Production => {
            if let Err(e) = ensure_log_dir() {
                eprintln!("Warning: Failed to create log directory, using temp dir: {}", e);
            }

            let appender = file_appender(&log_dir()).or_else(|e| {
                eprintln!("Warning: Failed to create log file appender: {}", e);
                let temp_dir = std::env::temp_dir().join("fe2cm-logs");
                let _ = std::fs::create_dir_all(&temp_dir);
                file_appender(&temp_dir)
            });

            let appender = match appender {
                Ok(appender) => appender,
                Err(e) => {
                    eprintln!("Warning: Logging to stderr, no log file available: {}", e);
                    init_console("info");
                    return None;
                }
            };

            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let installed = tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .with_writer(non_blocking)
                .with_ansi(false)
                .try_init()
                .is_ok();

            if installed {
                info!("Production logging initialized");
            }
            Some(guard)
        }
        RuntimeMode::Development => {
            init_console("debug");
            debug!("Development logging initialized (console only)");
            None
        }
    }
}

fn init_console(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_appender_writes_prefixed_daily_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut appender = file_appender(dir.path()).unwrap();
        appender.write_all(b"hotkeys bound\n").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with(LOG_FILE_PREFIX));
        assert!(names[0].ends_with(".log"));
    }

    #[test]
    fn test_init_logging_twice_is_harmless() {
        let _first = init_logging();
        let _second = init_logging();
        info!("logging initialized twice");
    }
}

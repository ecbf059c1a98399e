//! Platform-specific logging directory resolution.

use std::path::PathBuf;

/// Returns the platform-appropriate directory for log files.
///
/// | Platform | Directory |
/// |----------|-----------|
/// | Linux | `$XDG_STATE_HOME/fe2cm/logs` or `~/.local/state/fe2cm/logs` |
/// | macOS | `~/Library/Logs/fe2cm` |
/// | Windows | `%LOCALAPPDATA%/fe2cm/logs` |
///
/// Falls back to the system temp directory when no home directory can be
/// determined.
pub fn log_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        match directories::ProjectDirs::from("io", "fe2cm", "fe2cm") {
            Some(base) => base
                .state_dir()
                .map(|d| d.to_path_buf())
                .unwrap_or_else(|| base.data_local_dir().join("state"))
                .join("logs"),
            None => fallback_log_dir(),
        }
    }

    #[cfg(target_os = "macos")]
    {
        match dirs::home_dir() {
            Some(home) => home.join("Library").join("Logs").join("fe2cm"),
            None => fallback_log_dir(),
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        match directories::ProjectDirs::from("io", "fe2cm", "fe2cm") {
            Some(base) => base.data_local_dir().join("logs"),
            None => fallback_log_dir(),
        }
    }
}

fn fallback_log_dir() -> PathBuf {
    std::env::temp_dir().join("fe2cm-logs")
}

/// Ensures the log directory exists, creating it if necessary.
pub fn ensure_log_dir() -> Result<(), std::io::Error> {
    std::fs::create_dir_all(log_dir())
}

/// File name prefix used by the rolling log appender.
pub const LOG_FILE_PREFIX: &str = "fe2cm";

/// Returns the path to the application log file.
pub fn app_log_path() -> PathBuf {
    log_dir().join(format!("{}.log", LOG_FILE_PREFIX))
}

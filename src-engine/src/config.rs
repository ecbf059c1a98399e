//! Configuration persistence for the FE2CM engine.
//!
//! This module re-exports the shared Config from fe2cm-common and adds
//! engine-side logging via tracing.

pub use fe2cm_common::config::Config;

use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Load configuration from `path`, falling back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    match Config::read_from(path) {
        Ok(config) => {
            info!("Loaded config from {:?}", path);
            config
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No config at {:?}, using defaults", path);
            Config::default()
        }
        Err(e) => {
            warn!("Failed to read config {:?}, using defaults: {}", path, e);
            Config::default()
        }
    }
}

/// Load configuration from `path` before changing and saving it.
///
/// A missing file gives defaults. A file that exists but cannot be read or
/// parsed is an error, so it is never overwritten with defaults.
pub fn load_config_for_update(path: &Path) -> std::io::Result<Config> {
    match Config::read_from(path) {
        Ok(config) => Ok(config),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => {
            warn!("Refusing to overwrite unreadable config {:?}: {}", path, e);
            Err(e)
        }
    }
}

/// Save configuration to `path` with tracing output.
pub fn save_config_to(config: &Config, path: &Path) -> std::io::Result<()> {
    config.save_to(path)?;
    info!("Saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe2-config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config_from(&path), Config::default());
    }

    #[test]
    fn test_update_refuses_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe2-config.json");
        assert_eq!(load_config_for_update(&path).unwrap(), Config::default());

        std::fs::write(&path, r#"{"volume": [1, 2]}"#).unwrap();
        let err = load_config_for_update(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"volume": [1, 2]}"#);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fe2-config.json");
        let mut config = Config::default();
        config.set("hotkeys.mute", "ctrl+m").unwrap();
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path);
        assert_eq!(loaded.settings.hotkeys.mute, "Ctrl+M");
    }
}

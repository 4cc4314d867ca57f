// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution and persisted configuration.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use scanwerk_core::AppConfig;
use scanwerk_core::error::Result;
use tracing::{debug, info, warn};

const CONFIG_FILE: &str = "config.json";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = base_dir(std::env::var_os("XDG_DATA_HOME"), std::env::var_os("HOME")).join("scanwerk");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Path of the configuration file inside `data_dir`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

fn base_dir(xdg: Option<OsString>, home: Option<OsString>) -> PathBuf {
    // Try XDG data dir, then fallback to home
    if let Some(xdg) = xdg.filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = home.filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    PathBuf::from("/tmp")
}

/// Load the persisted configuration, or defaults when it is missing or
/// unreadable.
pub fn load_config(data_dir: &Path) -> AppConfig {
    let path = config_path(data_dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(err) => {
            debug!(path = %path.display(), %err, "no saved configuration, using defaults");
            return AppConfig::default();
        }
    };

    match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), %err, "configuration unreadable, using defaults");
            AppConfig::default()
        }
    }
}

/// Write the configuration back to `data_dir`.
pub fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let path = config_path(data_dir);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    info!(path = %path.display(), "configuration saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_dir_precedence() {
        assert_eq!(
            base_dir(Some("/xdg".into()), Some("/home/u".into())),
            PathBuf::from("/xdg")
        );
        assert_eq!(
            base_dir(None, Some("/home/u".into())),
            PathBuf::from("/home/u/.local/share")
        );
        assert_eq!(base_dir(Some("".into()), None), PathBuf::from("/tmp"));
    }

    #[test]
    fn config_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            host: Some("192.168.1.6".into()),
            resolution_dpi: 600,
            ..AppConfig::default()
        };
        persist_config(dir.path(), &config).unwrap();
        assert_eq!(load_config(dir.path()), config);
    }

    #[test]
    fn missing_or_corrupt_config_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(dir.path()), AppConfig::default());

        std::fs::write(config_path(dir.path()), "{ not json").unwrap();
        assert_eq!(load_config(dir.path()), AppConfig::default());
    }
}

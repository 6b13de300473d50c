//! Centralized application directory paths for sora.
//!
//! Provides a single source of truth for all filesystem paths used by the
//! assistant. Uses the [`dirs`] crate for platform-appropriate directory
//! resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/sora/` | `~/.local/share/sora/` |
//! | Config | `~/Library/Application Support/sora/` | `~/.config/sora/` |
//!
//! # Environment Overrides
//!
//! All paths can be overridden for testing or custom deployments:
//! - `SORA_DATA_DIR` overrides [`data_dir`]
//! - `SORA_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Used for persistent user data: the search-history database and logs.
///
/// Resolves to `dirs::data_dir()/sora/` by default. Override with
/// the `SORA_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SORA_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("sora"))
        .unwrap_or_else(|| PathBuf::from("/tmp/sora-data"))
}

/// Application config directory.
///
/// Used for `config.toml`.
///
/// Resolves to `dirs::config_dir()/sora/` by default. Override with
/// the `SORA_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SORA_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("sora"))
        .unwrap_or_else(|| PathBuf::from("/tmp/sora-config"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Search-history database path (`data_dir()/sora-history.db`).
#[must_use]
pub fn history_db_file() -> PathBuf {
    data_dir().join("sora-history.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::EnvVarGuard;

    #[test]
    fn unoverridden_paths_live_under_a_sora_directory() {
        let _data = EnvVarGuard::unset("SORA_DATA_DIR");
        let dir = data_dir();
        assert!(!dir.as_os_str().is_empty());
        assert!(
            dir.to_string_lossy().contains("sora"),
            "data_dir should contain 'sora': {}",
            dir.display()
        );
    }

    #[test]
    fn data_dir_override_wins() {
        let _env = EnvVarGuard::set("SORA_DATA_DIR", "/custom/data");
        assert_eq!(data_dir(), PathBuf::from("/custom/data"));
        assert_eq!(logs_dir(), PathBuf::from("/custom/data/logs"));
        assert_eq!(
            history_db_file(),
            PathBuf::from("/custom/data/sora-history.db")
        );
    }

    #[test]
    fn config_dir_override_wins() {
        let _env = EnvVarGuard::set("SORA_CONFIG_DIR", "/custom/config");
        assert_eq!(config_dir(), PathBuf::from("/custom/config"));
        assert_eq!(config_file(), PathBuf::from("/custom/config/config.toml"));
    }

    #[test]
    fn derived_paths_stay_under_their_roots() {
        let _data = EnvVarGuard::unset("SORA_DATA_DIR");
        assert!(logs_dir().starts_with(data_dir()));
        assert!(history_db_file().starts_with(data_dir()));
        let file = config_file();
        assert!(file.to_string_lossy().ends_with("config.toml"));
    }
}

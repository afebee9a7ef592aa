//! Configuration structures for cmdtree.
//!
//! - [`MountConfig`] - One repository and where it is mounted
//! - [`WatchConfig`] - Watcher settings (masks, error policy, channel size)
//! - [`ToolsConfig`] - Tool listing settings
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with missing
//! fields filled from their defaults.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::path::normalize_mount_path;
use crate::types::Directory;

/// One repository of commands and the mount point it is composed at.
///
/// # Examples
///
/// ```
/// use ct_core::MountConfig;
///
/// let mount = MountConfig::default();
/// assert_eq!(mount.path, "/");
/// assert!(mount.directories.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Mount path in the composed namespace.
    pub path: String,

    /// Repository name used in logs.
    pub name: String,

    /// Directory sources.
    pub directories: Vec<Directory>,

    /// Individually tracked command files.
    pub files: Vec<Utf8PathBuf>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            path: "/".to_owned(),
            name: "default".to_owned(),
            directories: Vec::new(),
            files: Vec::new(),
        }
    }
}

/// Configuration for the file watcher.
///
/// # Examples
///
/// ```
/// use ct_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert!(config.masks.is_empty());
/// assert!(!config.break_on_error);
/// assert_eq!(config.channel_capacity, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Glob masks a changed path must match. Empty matches everything.
    pub masks: Vec<String>,

    /// Stop watching on the first callback or watch error.
    pub break_on_error: bool,

    /// Capacity of the channel between notify and the watch loop.
    pub channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            masks: Vec::new(),
            break_on_error: false,
            channel_capacity: 100,
        }
    }
}

/// Configuration for tool listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Maximum tools per page; `None` returns everything in one page.
    pub page_size: Option<usize>,
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use ct_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"mounts": [{"path": "plugins"}]}"#).unwrap();
/// assert_eq!(config.mounts[0].name, "default");
/// assert_eq!(config.watch.channel_capacity, 100);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Repositories and their mount points.
    pub mounts: Vec<MountConfig>,

    /// Watcher configuration.
    pub watch: WatchConfig,

    /// Tool listing configuration.
    pub tools: ToolsConfig,
}

impl Config {
    /// Reads a JSON configuration file.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_std_path())?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Checks that the configuration is usable.
    ///
    /// Directory roots must exist, mount paths must be unique after
    /// normalization, and the channel capacity must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.channel_capacity == 0 {
            return Err(ConfigError::invalid_option(
                "watch.channel_capacity",
                "must be positive",
            ));
        }

        if self.tools.page_size == Some(0) {
            return Err(ConfigError::invalid_option(
                "tools.page_size",
                "must be positive when set",
            ));
        }

        let mut seen: Vec<String> = Vec::with_capacity(self.mounts.len());
        for mount in &self.mounts {
            let normalized = normalize_mount_path(&mount.path);
            if seen.contains(&normalized) {
                return Err(ConfigError::InvalidPath {
                    path: Utf8PathBuf::from(&mount.path),
                    reason: format!("mount path {normalized} is used more than once"),
                });
            }
            seen.push(normalized);

            for dir in &mount.directories {
                if !dir.fs_root.is_dir() {
                    return Err(ConfigError::MissingDirectory(dir.fs_root.clone()));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::default();
        assert!(config.masks.is_empty());
        assert!(!config.break_on_error);
        assert_eq!(config.channel_capacity, 100);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            mounts: vec![MountConfig::default()],
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"watch": {"masks": ["**/*.json"]}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.watch.masks, vec!["**/*.json"]);
        assert_eq!(config.watch.channel_capacity, 100);
        assert!(config.mounts.is_empty());
        assert!(config.tools.page_size.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.watch.channel_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_mounts() {
        let config = Config {
            mounts: vec![
                MountConfig {
                    path: "/tools/".to_owned(),
                    ..MountConfig::default()
                },
                MountConfig {
                    path: "tools".to_owned(),
                    ..MountConfig::default()
                },
            ],
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_missing_directory() {
        let config = Config {
            mounts: vec![MountConfig {
                directories: vec![Directory::new("/definitely/not/here/cmdtree")],
                ..MountConfig::default()
            }],
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingDirectory(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file(Utf8Path::new("/definitely/not/here/cmdtree.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}

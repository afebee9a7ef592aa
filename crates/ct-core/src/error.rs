//! Error types for the ct-core crate.
//!
//! This module provides [`ConfigError`] for configuration loading and
//! validation, and [`LoadError`] for loaders turning files into commands.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use ct_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/some/path"));
/// assert!(error.to_string().contains("/some/path"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A required directory does not exist.
    #[error("missing required directory: {0}")]
    MissingDirectory(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Errors a loader reports while turning a source into commands.
///
/// A single `LoadError` aborts the whole repository load; nothing from the
/// batch is committed to the tree.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A command definition file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The path that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A command definition file could not be parsed.
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// The file that failed to parse.
        path: Utf8PathBuf,
        /// Parser message.
        reason: String,
    },

    /// The file parsed but does not describe a usable command.
    #[error("invalid command definition in {path}: {reason}")]
    Invalid {
        /// The offending file.
        path: Utf8PathBuf,
        /// Why the definition was rejected.
        reason: String,
    },

    /// Documentation ingestion failed.
    #[error("failed to load documentation from {path}: {reason}")]
    Docs {
        /// The documentation root.
        path: Utf8PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),
}

impl LoadError {
    /// Creates a new [`LoadError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`LoadError::Parse`] error.
    #[inline]
    pub fn parse(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`LoadError::Invalid`] error.
    #[inline]
    pub fn invalid(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`LoadError::Docs`] error.
    #[inline]
    pub fn docs(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::Docs {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Read { path, .. }
            | Self::Parse { path, .. }
            | Self::Invalid { path, .. }
            | Self::Docs { path, .. } => Some(path),
            Self::NonUtf8Path(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_invalid_path_display() {
        let error = ConfigError::InvalidPath {
            path: Utf8PathBuf::from("/invalid/path"),
            reason: "mount path must not be empty".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("/invalid/path"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("channel_capacity", "must be positive");
        let msg = error.to_string();
        assert!(msg.contains("channel_capacity"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_load_error_read() {
        let err = LoadError::read(
            "cmds/build.json",
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(err.path().map(|p| p.as_str()), Some("cmds/build.json"));
        assert!(err.to_string().contains("cmds/build.json"));
    }

    #[test]
    fn test_load_error_parse() {
        let err = LoadError::parse("cmds/bad.json", "expected value at line 1");
        assert_eq!(
            err.to_string(),
            "failed to parse cmds/bad.json: expected value at line 1"
        );
    }

    #[test]
    fn test_load_error_non_utf8_has_no_path() {
        let err = LoadError::NonUtf8Path(std::path::PathBuf::from("x"));
        assert!(err.path().is_none());
    }
}

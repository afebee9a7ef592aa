//! Error types for the ct-repo crate.

use ct_core::LoadError;
use ct_watcher::WatchError;

/// Errors returned by repositories and multi-repositories.
///
/// # Error Recovery Strategy
///
/// - **Missing loader** ([`RepositoryError::MissingLoader`]): configuration
///   error, nothing was attempted
/// - **Load / docs failures**: the whole load is abandoned and nothing is
///   committed to the trie
/// - **Mount failures** ([`RepositoryError::Mount`]): wrap the child's error
///   with the mount path that produced it
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The repository has no loader but was asked to load or watch.
    #[error("repository '{0}' has no loader configured")]
    MissingLoader(String),

    /// A command source failed to load.
    #[error("failed to load commands from {label}: {source}")]
    Load {
        /// Source label of the failing directory or file.
        label: String,
        /// Loader error.
        #[source]
        source: LoadError,
    },

    /// A documentation directory failed to load.
    #[error("failed to load docs for {label}: {source}")]
    Docs {
        /// Source label of the directory the docs belong to.
        label: String,
        /// Doc loader error.
        #[source]
        source: LoadError,
    },

    /// The watcher stopped with an error.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// A mounted child failed.
    #[error("mount {mount}: {source}")]
    Mount {
        /// Normalized mount path of the failing child.
        mount: String,
        /// The child's error.
        #[source]
        source: Box<RepositoryError>,
    },

    /// A child watch task panicked or was aborted.
    #[error("watch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RepositoryError {
    /// Creates a new [`RepositoryError::Load`] error.
    #[inline]
    pub fn load(label: impl Into<String>, source: LoadError) -> Self {
        Self::Load {
            label: label.into(),
            source,
        }
    }

    /// Creates a new [`RepositoryError::Docs`] error.
    #[inline]
    pub fn docs(label: impl Into<String>, source: LoadError) -> Self {
        Self::Docs {
            label: label.into(),
            source,
        }
    }

    /// Wraps `source` with the mount path it came from.
    #[inline]
    pub fn mount(mount: impl Into<String>, source: Self) -> Self {
        Self::Mount {
            mount: mount.into(),
            source: Box::new(source),
        }
    }

    /// Returns `true` for configuration errors detected before any work.
    #[must_use]
    pub fn is_config(&self) -> bool {
        match self {
            Self::MissingLoader(_) => true,
            Self::Watch(err) => err.is_config(),
            Self::Mount { source, .. } => source.is_config(),
            Self::Load { .. } | Self::Docs { .. } | Self::Join(_) => false,
        }
    }

    /// Returns `true` if this error only reports cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Watch(err) => err.is_cancelled(),
            Self::Mount { source, .. } => source.is_cancelled(),
            Self::MissingLoader(_) | Self::Load { .. } | Self::Docs { .. } | Self::Join(_) => {
                false
            }
        }
    }

    /// Returns the innermost mount path, if the error came from a mount.
    #[must_use]
    pub fn mount_path(&self) -> Option<&str> {
        match self {
            Self::Mount { mount, source } => source.mount_path().or(Some(mount.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_loader_is_config() {
        let err = RepositoryError::MissingLoader("core".to_owned());
        assert!(err.is_config());
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "repository 'core' has no loader configured");
    }

    #[test]
    fn test_mount_wraps_and_classifies() {
        let err = RepositoryError::mount("/plugins", RepositoryError::Watch(WatchError::Cancelled));
        assert!(err.is_cancelled());
        assert_eq!(err.mount_path(), Some("/plugins"));
        assert_eq!(err.to_string(), "mount /plugins: watch cancelled");
    }

    #[test]
    fn test_load_error_display() {
        let err = RepositoryError::load("local:core", LoadError::parse("/x/a.json", "expected value"));
        let text = err.to_string();
        assert!(text.contains("local:core"));
        assert!(!err.is_config());
    }
}

//! Error types for the ct-watcher crate.

use camino::Utf8PathBuf;

/// Errors that can occur while building or running a [`Watcher`].
///
/// # Error Recovery Strategy
///
/// - **Callback failures** ([`WatchError::Callback`]) and **event errors**
///   reported by notify ([`WatchError::Notify`]) raised inside the loop are
///   logged and skipped unless `break_on_error` is set.
/// - **Non-UTF-8 paths** ([`WatchError::NonUtf8Path`]) are skipped.
/// - Everything else is fatal and ends [`Watcher::run`].
///
/// [`Watcher`]: crate::Watcher
/// [`Watcher::run`]: crate::Watcher::run
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// No write callback was configured; a watcher without one is useless.
    #[error("watch options are missing a write callback")]
    MissingWriteCallback,

    /// A mask could not be compiled as a glob pattern.
    #[error("invalid watch mask '{mask}': {source}")]
    InvalidMask {
        /// The offending mask.
        mask: String,
        /// The underlying pattern error.
        #[source]
        source: glob::PatternError,
    },

    /// The specified path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The notify backend failed.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// A write or remove callback returned an error.
    #[error("callback failed for {path}: {source}")]
    Callback {
        /// Path the callback was invoked with.
        path: Utf8PathBuf,
        /// Error returned by the callback.
        #[source]
        source: anyhow::Error,
    },

    /// The watch was stopped through its cancellation token.
    #[error("watch cancelled")]
    Cancelled,

    /// The event channel was closed unexpectedly.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::Callback`] error.
    #[inline]
    pub fn callback(path: impl Into<Utf8PathBuf>, source: anyhow::Error) -> Self {
        Self::Callback {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`WatchError::InvalidMask`] error.
    #[inline]
    pub fn invalid_mask(mask: impl Into<String>, source: glob::PatternError) -> Self {
        Self::InvalidMask {
            mask: mask.into(),
            source,
        }
    }

    /// Returns `true` if this error is a configuration problem detected
    /// before any watching started.
    #[inline]
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::MissingWriteCallback | Self::InvalidMask { .. })
    }

    /// Returns `true` if this error is recoverable (watching can continue).
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Callback { .. } | Self::NonUtf8Path(_) | Self::Notify(_)
        )
    }

    /// Returns `true` if this error is fatal (watching should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns `true` if the watch ended through cancellation.
    #[inline]
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) | Self::Callback { path, .. } => Some(path),
            Self::MissingWriteCallback
            | Self::InvalidMask { .. }
            | Self::Notify(_)
            | Self::Cancelled
            | Self::ChannelClosed
            | Self::NonUtf8Path(_)
            | Self::Io(_) => None,
        }
    }
}

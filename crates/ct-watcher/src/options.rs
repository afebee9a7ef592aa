//! Watch options and callbacks.

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ct_core::WatchConfig;

/// Callback invoked with the path of a changed entry.
///
/// The lifetime lets callbacks borrow from the caller; a repository hands
/// the watcher closures that borrow the repository itself.
pub type WatchCallback<'cb> = Arc<dyn Fn(&Utf8Path) -> anyhow::Result<()> + Send + Sync + 'cb>;

/// What to watch and what to do about it.
///
/// # Examples
///
/// ```
/// use ct_watcher::WatchOptions;
///
/// let options = WatchOptions::new()
///     .with_path("/srv/cmds")
///     .with_masks(["**/*.json"])
///     .on_write(|path| {
///         println!("changed: {path}");
///         Ok(())
///     });
///
/// assert!(options.has_write_callback());
/// assert_eq!(options.paths().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct WatchOptions<'cb> {
    paths: Vec<Utf8PathBuf>,
    masks: Vec<String>,
    write_callback: Option<WatchCallback<'cb>>,
    remove_callback: Option<WatchCallback<'cb>>,
    break_on_error: Option<bool>,
    channel_capacity: Option<usize>,
}

impl fmt::Debug for WatchOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchOptions")
            .field("paths", &self.paths)
            .field("masks", &self.masks)
            .field("write_callback", &self.write_callback.is_some())
            .field("remove_callback", &self.remove_callback.is_some())
            .field("break_on_error", &self.break_on_error)
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

impl<'cb> WatchOptions<'cb> {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options carrying the masks and error policy from `config`.
    #[must_use]
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            masks: config.masks.clone(),
            break_on_error: Some(config.break_on_error),
            channel_capacity: Some(config.channel_capacity),
            ..Self::default()
        }
    }

    /// Adds one path to watch.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Adds several paths to watch.
    #[must_use]
    pub fn with_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Sets the glob masks.
    #[must_use]
    pub fn with_masks<I, S>(mut self, masks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.masks = masks.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the callback for create and write events.
    #[must_use]
    pub fn on_write<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Utf8Path) -> anyhow::Result<()> + Send + Sync + 'cb,
    {
        self.write_callback = Some(Arc::new(callback));
        self
    }

    /// Sets the callback for remove and rename events.
    #[must_use]
    pub fn on_remove<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Utf8Path) -> anyhow::Result<()> + Send + Sync + 'cb,
    {
        self.remove_callback = Some(Arc::new(callback));
        self
    }

    /// Stop on the first callback or watch error instead of logging it.
    #[must_use]
    pub fn break_on_error(mut self, enabled: bool) -> Self {
        self.break_on_error = Some(enabled);
        self
    }

    /// Sets the capacity of the event channel.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    /// Layers `overrides` on top of `self`.
    ///
    /// Non-empty paths and masks, set callbacks and set flags in `overrides`
    /// win; everything else is kept from `self`.
    #[must_use]
    pub fn overlay(self, overrides: Self) -> Self {
        Self {
            paths: if overrides.paths.is_empty() {
                self.paths
            } else {
                overrides.paths
            },
            masks: if overrides.masks.is_empty() {
                self.masks
            } else {
                overrides.masks
            },
            write_callback: overrides.write_callback.or(self.write_callback),
            remove_callback: overrides.remove_callback.or(self.remove_callback),
            break_on_error: overrides.break_on_error.or(self.break_on_error),
            channel_capacity: overrides.channel_capacity.or(self.channel_capacity),
        }
    }

    /// Paths to watch.
    #[must_use]
    pub fn paths(&self) -> &[Utf8PathBuf] {
        &self.paths
    }

    /// Configured masks.
    #[must_use]
    pub fn masks(&self) -> &[String] {
        &self.masks
    }

    /// Returns `true` if a write callback is set.
    #[must_use]
    pub fn has_write_callback(&self) -> bool {
        self.write_callback.is_some()
    }

    pub(crate) fn write_callback(&self) -> Option<&WatchCallback<'cb>> {
        self.write_callback.as_ref()
    }

    pub(crate) fn remove_callback(&self) -> Option<&WatchCallback<'cb>> {
        self.remove_callback.as_ref()
    }

    pub(crate) fn is_break_on_error(&self) -> bool {
        self.break_on_error.unwrap_or(false)
    }

    pub(crate) fn effective_capacity(&self) -> usize {
        self.channel_capacity
            .filter(|&n| n > 0)
            .unwrap_or_else(|| WatchConfig::default().channel_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = WatchConfig {
            masks: vec!["*.json".to_owned()],
            break_on_error: true,
            channel_capacity: 8,
        };
        let options = WatchOptions::from_config(&config);
        assert_eq!(options.masks(), ["*.json"]);
        assert!(options.is_break_on_error());
        assert_eq!(options.effective_capacity(), 8);
        assert!(!options.has_write_callback());
    }

    #[test]
    fn test_overlay_prefers_overrides() {
        let base = WatchOptions::new()
            .with_path("/base")
            .with_masks(["*.json"])
            .on_write(|_| Ok(()))
            .break_on_error(true);
        let overrides = WatchOptions::new().with_masks(["*.yaml"]).break_on_error(false);

        let merged = base.overlay(overrides);
        assert_eq!(merged.paths(), [Utf8PathBuf::from("/base")]);
        assert_eq!(merged.masks(), ["*.yaml"]);
        assert!(merged.has_write_callback());
        assert!(!merged.is_break_on_error());
    }

    #[test]
    fn test_zero_capacity_falls_back() {
        let options = WatchOptions::new().channel_capacity(0);
        assert_eq!(options.effective_capacity(), 100);
    }

    #[test]
    fn test_debug_hides_callbacks() {
        let options = WatchOptions::new().on_remove(|_| Ok(()));
        let debug = format!("{options:?}");
        assert!(debug.contains("remove_callback: true"));
        assert!(debug.contains("write_callback: false"));
    }
}

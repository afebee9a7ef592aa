//! Directory sources of commands.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// A directory tree that a repository loads commands from.
///
/// `fs_root` is the filesystem location; `root` is the command root inside
/// it (relative, `.` for the whole tree). Commands found under
/// `fs_root/root/a/b/` get parents `["a", "b"]`.
///
/// # Examples
///
/// ```
/// use ct_core::Directory;
/// use camino::Utf8PathBuf;
///
/// let dir = Directory::new("/srv/cmds")
///     .with_root("commands")
///     .with_docs("docs")
///     .with_name("core")
///     .with_source_prefix("local");
///
/// assert_eq!(dir.command_root(), Utf8PathBuf::from("/srv/cmds/commands"));
/// assert_eq!(dir.watch_root(), Utf8PathBuf::from("/srv/cmds/commands"));
/// assert_eq!(dir.source_label(), "local:core");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directory {
    /// Filesystem root of the source.
    pub fs_root: Utf8PathBuf,

    /// Command root relative to `fs_root`.
    pub root: Utf8PathBuf,

    /// Documentation directory relative to `fs_root`, if any.
    pub docs: Option<Utf8PathBuf>,

    /// Logical name of the source.
    pub name: Option<String>,

    /// Prefix for the source label.
    pub source_prefix: Option<String>,

    /// Path handed to the watcher; defaults to the command root.
    pub watch_path: Option<Utf8PathBuf>,
}

impl Default for Directory {
    fn default() -> Self {
        Self {
            fs_root: Utf8PathBuf::new(),
            root: Utf8PathBuf::from("."),
            docs: None,
            name: None,
            source_prefix: None,
            watch_path: None,
        }
    }
}

impl Directory {
    /// Creates a directory source rooted at `fs_root`.
    #[must_use]
    pub fn new(fs_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            fs_root: fs_root.into(),
            ..Self::default()
        }
    }

    /// Sets the command root within the filesystem root.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets the documentation subdirectory.
    #[must_use]
    pub fn with_docs(mut self, docs: impl Into<Utf8PathBuf>) -> Self {
        self.docs = Some(docs.into());
        self
    }

    /// Sets the logical name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the source-label prefix.
    #[must_use]
    pub fn with_source_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.source_prefix = Some(prefix.into());
        self
    }

    /// Overrides the path handed to the watcher.
    #[must_use]
    pub fn with_watch_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.watch_path = Some(path.into());
        self
    }

    /// Absolute location of the command root.
    #[must_use]
    pub fn command_root(&self) -> Utf8PathBuf {
        if self.root.as_str().is_empty() || self.root == Utf8Path::new(".") {
            self.fs_root.clone()
        } else {
            self.fs_root.join(&self.root)
        }
    }

    /// Absolute location of the documentation root, if configured.
    #[must_use]
    pub fn docs_root(&self) -> Option<Utf8PathBuf> {
        self.docs.as_ref().map(|docs| self.fs_root.join(docs))
    }

    /// The path the watcher should observe for this source.
    #[must_use]
    pub fn watch_root(&self) -> Utf8PathBuf {
        self.watch_path
            .clone()
            .unwrap_or_else(|| self.command_root())
    }

    /// Label identifying this source in logs and command metadata.
    ///
    /// `prefix:name` when both are set, whichever one is set otherwise, and
    /// the filesystem root as a last resort.
    #[must_use]
    pub fn source_label(&self) -> String {
        match (&self.source_prefix, &self.name) {
            (Some(prefix), Some(name)) => format!("{prefix}:{name}"),
            (Some(label), None) | (None, Some(label)) => label.clone(),
            (None, None) => self.fs_root.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_root_is_fs_root() {
        let dir = Directory::new("/srv/cmds");
        assert_eq!(dir.command_root(), Utf8PathBuf::from("/srv/cmds"));
        assert_eq!(dir.watch_root(), Utf8PathBuf::from("/srv/cmds"));
        assert!(dir.docs_root().is_none());
    }

    #[test]
    fn test_watch_path_override() {
        let dir = Directory::new("/srv").with_watch_path("/srv/live");
        assert_eq!(dir.watch_root(), Utf8PathBuf::from("/srv/live"));
    }

    #[test]
    fn test_source_label_rules() {
        assert_eq!(Directory::new("/a").source_label(), "/a");
        assert_eq!(Directory::new("/a").with_name("n").source_label(), "n");
        assert_eq!(Directory::new("/a").with_source_prefix("p").source_label(), "p");
        assert_eq!(
            Directory::new("/a")
                .with_name("n")
                .with_source_prefix("p")
                .source_label(),
            "p:n"
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let dir: Directory =
            serde_json::from_str(r#"{"fs_root": "/x", "docs": "help"}"#).unwrap();
        assert_eq!(dir.root, Utf8PathBuf::from("."));
        assert_eq!(dir.docs_root(), Some(Utf8PathBuf::from("/x/help")));
    }
}

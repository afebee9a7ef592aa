//! Loader seams.
//!
//! Parsing command files and ingesting documentation are left to the
//! embedding application. A [`Repository`](crate::Repository) only needs
//! something that turns a path into [`CommandEntry`] values.

use camino::Utf8Path;
use ct_core::{CommandEntry, LoadError};

/// Context handed to a [`Loader`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Source label recorded on loaded commands.
    pub source: String,

    /// Parent path prepended to every loaded command.
    pub parents: Vec<String>,
}

impl LoadOptions {
    /// Creates options for `source` with no parent prefix.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            parents: Vec::new(),
        }
    }

    /// Sets the parent prefix.
    #[must_use]
    pub fn with_parents(mut self, parents: Vec<String>) -> Self {
        self.parents = parents;
        self
    }
}

/// Turns command-definition files into commands and aliases.
///
/// `root` is the command root of the source; `path` is either `root` itself
/// (load the whole tree) or a single file inside it. Commands found in
/// subdirectories of `path` get those directories appended to
/// `options.parents`.
///
/// Any `Fn(&Utf8Path, &Utf8Path, &LoadOptions)` closure is a loader.
pub trait Loader: Send + Sync {
    /// Loads every command under `path`.
    fn load_commands(
        &self,
        root: &Utf8Path,
        path: &Utf8Path,
        options: &LoadOptions,
    ) -> Result<Vec<CommandEntry>, LoadError>;
}

impl<F> Loader for F
where
    F: Fn(&Utf8Path, &Utf8Path, &LoadOptions) -> Result<Vec<CommandEntry>, LoadError>
        + Send
        + Sync,
{
    fn load_commands(
        &self,
        root: &Utf8Path,
        path: &Utf8Path,
        options: &LoadOptions,
    ) -> Result<Vec<CommandEntry>, LoadError> {
        self(root, path, options)
    }
}

/// Ingests help content from a documentation directory.
pub trait DocLoader: Send + Sync {
    /// Loads documentation from `root`, which is known to exist.
    fn load_docs(&self, root: &Utf8Path) -> Result<(), LoadError>;
}

/// A [`DocLoader`] that ignores documentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDocs;

impl DocLoader for NoDocs {
    fn load_docs(&self, _root: &Utf8Path) -> Result<(), LoadError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_core::CommandDef;

    #[test]
    fn test_closure_is_loader() {
        let loader = |_root: &Utf8Path,
                      path: &Utf8Path,
                      options: &LoadOptions|
         -> Result<Vec<CommandEntry>, LoadError> {
            let name = path.file_stem().unwrap_or("root");
            Ok(vec![CommandEntry::from(
                CommandDef::new(name, options.parents.clone()).with_source(options.source.clone()),
            )])
        };

        let options = LoadOptions::new("test").with_parents(vec!["tools".to_owned()]);
        let entries = loader
            .load_commands(Utf8Path::new("/srv"), Utf8Path::new("/srv/build.json"), &options)
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "build");
        assert_eq!(entries[0].parents(), ["tools"]);
    }

    #[test]
    fn test_no_docs() {
        assert!(NoDocs.load_docs(Utf8Path::new("/anywhere")).is_ok());
    }
}

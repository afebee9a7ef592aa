//! The command abstraction stored in the trie.
//!
//! A [`Command`] is an opaque unit of functionality with a stable name and a
//! parent path. The trie only ever needs those two; everything else is
//! surfaced through [`Command::description`].
//!
//! Commands are shared as [`SharedCommand`] (`Arc<dyn Command>`) so that the
//! same command can appear in a repository tree, a composite view, and a
//! caller's result list without being copied.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::path::prefixed;

/// A reference-counted, type-erased command.
pub type SharedCommand = Arc<dyn Command>;

/// Human-facing metadata about a command.
///
/// Used for tool projection and for anything that renders commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescription {
    /// Parent segments followed by the command name.
    pub full_path: Vec<String>,

    /// One-line summary.
    #[serde(default)]
    pub short: String,

    /// Longer help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,

    /// Label of the source the command was loaded from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CommandDescription {
    /// Returns the full path joined with `/`.
    #[must_use]
    pub fn path_string(&self) -> String {
        self.full_path.join("/")
    }
}

/// A named unit of functionality living under a parent path.
///
/// # Examples
///
/// ```
/// use ct_core::{Command, CommandDef};
///
/// let build = CommandDef::new("build", ["tools"]);
/// assert_eq!(build.name(), "build");
/// assert_eq!(build.full_path(), vec!["tools", "build"]);
/// ```
pub trait Command: Send + Sync + fmt::Debug {
    /// The command's name, unique within its parent node.
    fn name(&self) -> &str;

    /// The path segments under which the command lives.
    fn parents(&self) -> &[String];

    /// Returns descriptive metadata. The default carries only the path.
    fn description(&self) -> CommandDescription {
        CommandDescription {
            full_path: self.full_path(),
            ..CommandDescription::default()
        }
    }

    /// Parent segments followed by the name.
    fn full_path(&self) -> Vec<String> {
        prefixed(self.parents(), &[self.name()])
    }
}

/// A plain, data-only command.
///
/// This is what loaders typically produce and what tests use. It
/// deserializes from the same shape it serializes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDef {
    /// Command name.
    pub name: String,

    /// Parent path segments.
    #[serde(default)]
    pub parents: Vec<String>,

    /// One-line summary.
    #[serde(default)]
    pub short: String,

    /// Longer help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,

    /// Source label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CommandDef {
    /// Creates a command with the given name and parent path.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parents: parents.into_iter().map(Into::into).collect(),
            short: String::new(),
            long: None,
            source: None,
        }
    }

    /// Sets the one-line summary.
    #[must_use]
    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = short.into();
        self
    }

    /// Sets the long help text.
    #[must_use]
    pub fn with_long(mut self, long: impl Into<String>) -> Self {
        self.long = Some(long.into());
        self
    }

    /// Sets the source label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Wraps the command in an [`Arc`] for insertion.
    #[must_use]
    pub fn into_shared(self) -> SharedCommand {
        Arc::new(self)
    }
}

impl Command for CommandDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn parents(&self) -> &[String] {
        &self.parents
    }

    fn description(&self) -> CommandDescription {
        CommandDescription {
            full_path: self.full_path(),
            short: self.short.clone(),
            long: self.long.clone(),
            source: self.source.clone(),
        }
    }
}

/// A command re-parented under a mount prefix.
///
/// The wrapped command is shared, not copied; only the parent path differs.
#[derive(Debug, Clone)]
pub struct MountedCommand {
    inner: SharedCommand,
    parents: Vec<String>,
}

impl MountedCommand {
    /// Wraps `inner` so its parents become `prefix` followed by its own parents.
    #[must_use]
    pub fn new<S: AsRef<str>>(inner: SharedCommand, prefix: &[S]) -> Self {
        let parents = prefixed(prefix, inner.parents());
        Self { inner, parents }
    }

    /// Wraps `inner` as a [`SharedCommand`], or returns it untouched when the
    /// prefix is empty.
    #[must_use]
    pub fn shared<S: AsRef<str>>(inner: SharedCommand, prefix: &[S]) -> SharedCommand {
        if prefix.is_empty() {
            inner
        } else {
            Arc::new(Self::new(inner, prefix))
        }
    }

    /// The command as seen by its own repository.
    #[must_use]
    pub fn inner(&self) -> &SharedCommand {
        &self.inner
    }
}

impl Command for MountedCommand {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn parents(&self) -> &[String] {
        &self.parents
    }

    fn description(&self) -> CommandDescription {
        CommandDescription {
            full_path: self.full_path(),
            ..self.inner.description()
        }
    }
}

/// An alias resolved against its target.
///
/// Behaves like the target command but lives at its own name and path.
#[derive(Debug, Clone)]
pub struct AliasCommand {
    name: String,
    parents: Vec<String>,
    target: SharedCommand,
}

impl AliasCommand {
    /// Creates a resolved alias.
    #[must_use]
    pub fn new(name: impl Into<String>, parents: Vec<String>, target: SharedCommand) -> Self {
        Self {
            name: name.into(),
            parents,
            target,
        }
    }

    /// The concrete command this alias points to.
    #[must_use]
    pub fn target(&self) -> &SharedCommand {
        &self.target
    }
}

impl Command for AliasCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn parents(&self) -> &[String] {
        &self.parents
    }

    fn description(&self) -> CommandDescription {
        CommandDescription {
            full_path: self.full_path(),
            ..self.target.description()
        }
    }
}

//! Loader output: concrete commands and unresolved aliases.
//!
//! Loaders hand back a flat list of [`CommandEntry`] values. The variant is
//! decided once, at load time, so the repository never has to inspect a
//! command to find out whether it is an alias.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::path::split_path;
use crate::types::command::{Command, CommandDef, SharedCommand};

/// An alias that still has to be resolved against the trie.
///
/// The target is looked up at the alias's own `parents` path first, so an
/// alias usually sits under the command it aliases (`tools/build/fast` for
/// `tools/build`). `alias_for` is only consulted when nothing lives there.
///
/// # Examples
///
/// ```
/// use ct_core::AliasSpec;
///
/// let fast = AliasSpec::under("fast", ["tools", "build"]);
/// assert!(fast.alias_for.is_empty());
///
/// let b = AliasSpec::new("b", ["shortcuts"], "tools/build");
/// assert_eq!(b.alias_for, vec!["tools", "build"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasSpec {
    /// Name the alias is reachable under.
    pub name: String,

    /// Parent path of the alias itself.
    #[serde(default)]
    pub parents: Vec<String>,

    /// Full path of the target, used when `parents` names no command.
    #[serde(default)]
    pub alias_for: Vec<String>,
}

impl AliasSpec {
    /// Creates an alias of the command at `parents`.
    #[must_use]
    pub fn under<I, S>(name: impl Into<String>, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parents: parents.into_iter().map(Into::into).collect(),
            alias_for: Vec::new(),
        }
    }

    /// Creates an alias with an explicit target; `target` is a
    /// slash-separated full path.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, parents: I, target: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parents: parents.into_iter().map(Into::into).collect(),
            alias_for: split_path(target),
        }
    }
}

/// One item produced by a loader.
#[derive(Debug, Clone)]
pub enum CommandEntry {
    /// A command that can be inserted directly.
    Concrete(SharedCommand),
    /// An alias that must be resolved after all concrete commands are in.
    Alias(AliasSpec),
}

impl CommandEntry {
    /// Name of the command or alias.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Concrete(cmd) => cmd.name(),
            Self::Alias(alias) => &alias.name,
        }
    }

    /// Parent path of the command or alias.
    #[must_use]
    pub fn parents(&self) -> &[String] {
        match self {
            Self::Concrete(cmd) => cmd.parents(),
            Self::Alias(alias) => &alias.parents,
        }
    }

    /// Returns `true` for [`CommandEntry::Alias`].
    #[inline]
    #[must_use]
    pub const fn is_alias(&self) -> bool {
        matches!(self, Self::Alias(_))
    }
}

impl From<SharedCommand> for CommandEntry {
    fn from(cmd: SharedCommand) -> Self {
        Self::Concrete(cmd)
    }
}

impl From<CommandDef> for CommandEntry {
    fn from(cmd: CommandDef) -> Self {
        Self::Concrete(Arc::new(cmd))
    }
}

impl From<AliasSpec> for CommandEntry {
    fn from(alias: AliasSpec) -> Self {
        Self::Alias(alias)
    }
}

//! The command trie.
//!
//! Every node owns its children exclusively and holds the commands whose
//! parent path ends at that node. The root acts as the receiver for every
//! operation; paths are given relative to it.
//!
//! ```text
//! root
//!  ├── commands: []
//!  └── children
//!       └── "tools"
//!            ├── commands: [build, test]
//!            └── children: {}
//! ```
//!
//! The trie does no locking of its own. Callers that share it across
//! threads wrap it (see `ct-repo`).

use std::mem;

use ct_core::{Command, FxHashMap, SharedCommand};

use crate::render::RenderNode;

/// The empty path, addressing the node the operation is called on.
pub const ROOT: &[&str] = &[];

/// A node of the command trie.
///
/// # Invariants
///
/// - At most one command per distinct name in `commands`.
/// - Child keys are the only way to reach a child, so every root-to-node
///   segment sequence is unique.
///
/// # Examples
///
/// ```
/// use ct_core::CommandDef;
/// use ct_trie::{ROOT, TrieNode};
///
/// let mut root = TrieNode::new();
/// root.insert_command(&["tools"], CommandDef::new("build", ["tools"]).into_shared());
/// root.insert_command(&["tools"], CommandDef::new("test", ["tools"]).into_shared());
///
/// assert_eq!(root.collect_commands(&["tools"], false).len(), 2);
/// assert!(root.find_command(&["tools", "build"]).is_some());
/// assert_eq!(root.collect_commands(ROOT, true).len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TrieNode {
    children: FxHashMap<String, TrieNode>,
    commands: Vec<SharedCommand>,
}

impl TrieNode {
    /// Creates an empty node.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands stored directly at this node.
    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[SharedCommand] {
        &self.commands
    }

    /// Returns the direct child with the given segment.
    #[inline]
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<&TrieNode> {
        self.children.get(segment)
    }

    /// Iterates over direct children in unspecified order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &TrieNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` if the node has neither commands nor children.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.children.is_empty()
    }

    /// Number of commands in this subtree.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
            + self
                .children
                .values()
                .map(TrieNode::command_count)
                .sum::<usize>()
    }

    /// Inserts `command` at the node for `path`, creating intermediate nodes.
    ///
    /// A command with the same name at that node is replaced in place.
    pub fn insert_command<S: AsRef<str>>(&mut self, path: &[S], command: SharedCommand) {
        self.ensure_node(path).upsert(command);
    }

    /// Returns the node at `path`, or `None` if any segment is missing.
    #[must_use]
    pub fn find_node<S: AsRef<str>>(&self, path: &[S]) -> Option<&TrieNode> {
        let mut node = self;
        for segment in path {
            node = node.children.get(segment.as_ref())?;
        }
        Some(node)
    }

    /// Looks up a command by its full path.
    ///
    /// The last segment is the command name, the rest its parent path. An
    /// empty path never names a command.
    #[must_use]
    pub fn find_command<S: AsRef<str>>(&self, path: &[S]) -> Option<SharedCommand> {
        let (name, parent_path) = path.split_last()?;
        self.find_node(parent_path)?
            .commands
            .iter()
            .find(|cmd| cmd.name() == name.as_ref())
            .cloned()
    }

    /// Removes everything addressed by `path` and returns the removed commands.
    ///
    /// An empty path clears this whole subtree. Otherwise the command named
    /// by the last segment is removed from the parent node, and a child
    /// subtree keyed by that segment is removed as well; both go in one call
    /// when a leaf and a branch share the name.
    pub fn remove<S: AsRef<str>>(&mut self, path: &[S]) -> Vec<SharedCommand> {
        let Some((last, parent_path)) = path.split_last() else {
            return mem::take(self).into_commands();
        };

        let Some(parent) = self.find_node_mut(parent_path) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        if let Some(idx) = parent
            .commands
            .iter()
            .position(|cmd| cmd.name() == last.as_ref())
        {
            removed.push(parent.commands.remove(idx));
        }
        if let Some(child) = parent.children.remove(last.as_ref()) {
            removed.extend(child.into_commands());
        }
        removed
    }

    /// Collects commands under `prefix`.
    ///
    /// When `prefix` itself names a command, that command is included. With
    /// `recurse` unset only the node's direct commands are returned,
    /// otherwise every command of the subtree. Order is unspecified.
    #[must_use]
    pub fn collect_commands<S: AsRef<str>>(&self, prefix: &[S], recurse: bool) -> Vec<SharedCommand> {
        let mut out = Vec::new();

        if let Some(leaf) = self.find_command(prefix) {
            out.push(leaf);
        }

        if let Some(node) = self.find_node(prefix) {
            if recurse {
                node.collect_into(&mut out);
            } else {
                out.extend(node.commands.iter().cloned());
            }
        }

        out
    }

    /// Grafts a copy of `source` onto the node at `path`.
    ///
    /// Children are merged recursively; commands from `source` are inserted
    /// with replace-by-name semantics. Commands are shared, not cloned.
    pub fn insert_node<S: AsRef<str>>(&mut self, path: &[S], source: &TrieNode) {
        self.ensure_node(path).merge(source);
    }

    /// Projects this subtree into a display tree named `name`.
    #[must_use]
    pub fn to_render_node(&self, name: &str) -> RenderNode {
        let mut entries: Vec<RenderNode> = self
            .children
            .iter()
            .map(|(segment, child)| child.to_render_node(segment))
            .collect();

        for cmd in &self.commands {
            match entries.iter_mut().find(|entry| entry.name == cmd.name()) {
                Some(entry) => entry.command = Some(SharedCommand::clone(cmd)),
                None => entries.push(RenderNode::leaf(SharedCommand::clone(cmd))),
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        RenderNode::new(name, None, entries)
    }

    fn find_node_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut TrieNode> {
        let mut node = self;
        for segment in path {
            node = node.children.get_mut(segment.as_ref())?;
        }
        Some(node)
    }

    fn ensure_node<S: AsRef<str>>(&mut self, path: &[S]) -> &mut TrieNode {
        let mut node = self;
        for segment in path {
            node = node.children.entry(segment.as_ref().to_owned()).or_default();
        }
        node
    }

    fn upsert(&mut self, command: SharedCommand) {
        match self
            .commands
            .iter_mut()
            .find(|existing| existing.name() == command.name())
        {
            Some(slot) => *slot = command,
            None => self.commands.push(command),
        }
    }

    fn merge(&mut self, source: &TrieNode) {
        for cmd in &source.commands {
            self.upsert(SharedCommand::clone(cmd));
        }
        for (segment, child) in &source.children {
            self.children
                .entry(segment.clone())
                .or_default()
                .merge(child);
        }
    }

    fn collect_into(&self, out: &mut Vec<SharedCommand>) {
        out.extend(self.commands.iter().cloned());
        for child in self.children.values() {
            child.collect_into(out);
        }
    }

    fn into_commands(self) -> Vec<SharedCommand> {
        let mut out = self.commands;
        for (_, child) in self.children {
            out.extend(child.into_commands());
        }
        out
    }
}

//! Display projection of the trie.
//!
//! A [`RenderNode`] is what help and tree views consume: children sorted by
//! name, and a path that is both a branch and a command collapsed into one
//! entry carrying the command.

use std::fmt;

use ct_core::{Command, SharedCommand};

/// A display-oriented node.
#[derive(Debug, Clone, Default)]
pub struct RenderNode {
    /// Segment name; empty for a root.
    pub name: String,

    /// The command living at this path, if any.
    pub command: Option<SharedCommand>,

    /// Children sorted by name.
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    /// Creates a render node.
    #[must_use]
    pub fn new(name: impl Into<String>, command: Option<SharedCommand>, children: Vec<RenderNode>) -> Self {
        Self {
            name: name.into(),
            command,
            children,
        }
    }

    /// Creates a childless node for a command.
    #[must_use]
    pub fn leaf(command: SharedCommand) -> Self {
        Self {
            name: command.name().to_owned(),
            command: Some(command),
            children: Vec::new(),
        }
    }

    /// Returns `true` if no command lives at this node.
    #[inline]
    #[must_use]
    pub fn is_branch_only(&self) -> bool {
        self.command.is_none()
    }

    /// Finds a direct child by name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&RenderNode> {
        self.children.iter().find(|c| c.name == name)
    }

    fn write_children(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        let count = self.children.len();
        for (i, child) in self.children.iter().enumerate() {
            let last = i + 1 == count;
            let (branch, pad) = if last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            writeln!(f, "{indent}{branch}{}", child.name)?;
            child.write_children(f, &format!("{indent}{pad}"))?;
        }
        Ok(())
    }
}

impl fmt::Display for RenderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.name.is_empty() { "." } else { self.name.as_str() };
        writeln!(f, "{name}")?;
        self.write_children(f, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_core::CommandDef;

    #[test]
    fn test_leaf_takes_command_name() {
        let node = RenderNode::leaf(CommandDef::new("build", ["tools"]).into_shared());
        assert_eq!(node.name, "build");
        assert!(!node.is_branch_only());
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_display_single_node() {
        let node = RenderNode::new("tools", None, Vec::new());
        assert_eq!(node.to_string(), "tools\n");
        assert!(node.child("x").is_none());
    }
}

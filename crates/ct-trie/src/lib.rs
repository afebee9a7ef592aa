//! Path-segment trie of commands.
//!
//! [`TrieNode`] is the in-memory store behind every repository: a tree keyed
//! by path segment where each node holds the commands living at that path.
//! [`RenderNode`] is its sorted, display-oriented projection.
//!
//! The trie is a pure data structure. It performs no I/O and no locking.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod node;
mod render;

pub use node::{ROOT, TrieNode};
pub use render::RenderNode;

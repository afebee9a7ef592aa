//! The query and watch surface shared by repositories and compositions.

use std::fmt;

use async_trait::async_trait;
use ct_core::{SharedCommand, Tool, ToolPage};
use ct_trie::{RenderNode, TrieNode};
use ct_watcher::WatchOptions;
use tokio_util::sync::CancellationToken;

use crate::error::RepositoryError;

/// A tree of commands that can be queried and kept live.
///
/// Implemented by [`Repository`](crate::Repository) and
/// [`MultiRepository`](crate::MultiRepository), so compositions can nest.
/// Prefixes are path segments; an empty prefix means the root.
#[async_trait]
pub trait CommandSource: Send + Sync + fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Commands at `prefix`, and below it when `recurse` is set.
    fn collect_commands(&self, prefix: &[&str], recurse: bool) -> Vec<SharedCommand>;

    /// Looks up a command by slash-separated full path.
    fn get_command(&self, path: &str) -> Option<SharedCommand>;

    /// A snapshot of the node at `prefix`.
    fn find_node(&self, prefix: &[&str]) -> Option<TrieNode>;

    /// The render projection of the subtree at `prefix`.
    fn get_render_node(&self, prefix: &[&str]) -> Option<RenderNode>;

    /// Every command as a tool, unsorted.
    fn tools(&self) -> Result<Vec<Tool>, RepositoryError>;

    /// One page of the name-sorted tool list following `cursor`.
    fn list_tools(
        &self,
        cursor: Option<&str>,
        page_size: Option<usize>,
    ) -> Result<ToolPage, RepositoryError> {
        Ok(ToolPage::paginate(self.tools()?, cursor, page_size))
    }

    /// Keeps the tree in sync with its sources until `cancel` fires.
    async fn watch(
        &self,
        cancel: CancellationToken,
        options: WatchOptions<'static>,
    ) -> Result<(), RepositoryError>;
}

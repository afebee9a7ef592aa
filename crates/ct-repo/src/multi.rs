//! Mount-based composition of command sources.
//!
//! A [`MultiRepository`] stitches independent sources into one namespace.
//! Each source is mounted at a normalized absolute path; commands from a
//! non-root mount appear with the mount's segments prepended to their
//! parents. Operations on a path are routed to the mount with the longest
//! matching component prefix, earlier mounts winning ties.

use std::sync::Arc;

use async_trait::async_trait;
use ct_core::path::{has_prefix, join_path, mount_segments, normalize_mount_path};
use ct_core::{MountedCommand, SharedCommand, Tool};
use ct_trie::{RenderNode, TrieNode};
use ct_watcher::WatchOptions;
use parking_lot::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::RepositoryError;
use crate::source::CommandSource;

#[derive(Debug, Clone)]
struct Mount {
    path: String,
    segments: Vec<String>,
    source: Arc<dyn CommandSource>,
}

impl Mount {
    fn reparent(&self, commands: Vec<SharedCommand>) -> impl Iterator<Item = SharedCommand> + '_ {
        commands
            .into_iter()
            .map(|cmd| MountedCommand::shared(cmd, &self.segments))
    }

    fn tool_prefix(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}

/// Sources composed under mount paths.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use ct_core::{CommandDef, CommandEntry};
/// use ct_repo::{CommandSource, MultiRepository, Repository};
///
/// let core = Repository::new("core");
/// core.add([CommandEntry::from(CommandDef::new("version", Vec::<String>::new()))]);
/// let plugins = Repository::new("plugins");
/// plugins.add([CommandEntry::from(CommandDef::new("hello", Vec::<String>::new()))]);
///
/// let multi = MultiRepository::new("all");
/// multi.mount("/", Arc::new(core));
/// multi.mount("plugins/", Arc::new(plugins));
///
/// assert!(multi.get_command("plugins/hello").is_some());
/// assert!(multi.get_command("version").is_some());
/// assert_eq!(multi.collect_commands(&[], true).len(), 2);
/// ```
#[derive(Debug)]
pub struct MultiRepository {
    name: String,
    mounts: RwLock<Vec<Mount>>,
}

impl MultiRepository {
    /// Creates a composition with no mounts.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mounts: RwLock::new(Vec::new()),
        }
    }

    /// Mounts `source` at `path` and returns the normalized mount path.
    ///
    /// Mounts are appended; mounting the same path twice keeps both, with
    /// the earlier one receiving routed calls.
    pub fn mount(&self, path: &str, source: Arc<dyn CommandSource>) -> String {
        let path = normalize_mount_path(path);
        tracing::debug!(multi = %self.name, mount = %path, source = source.name(), "Mounting source");
        self.mounts.write().push(Mount {
            segments: mount_segments(&path),
            path: path.clone(),
            source,
        });
        path
    }

    /// Removes the first mount at `path`, returning its source.
    pub fn unmount(&self, path: &str) -> Option<Arc<dyn CommandSource>> {
        let path = normalize_mount_path(path);
        let mut mounts = self.mounts.write();
        let index = mounts.iter().position(|m| m.path == path)?;
        tracing::debug!(multi = %self.name, mount = %path, "Unmounting source");
        Some(mounts.remove(index).source)
    }

    /// Normalized mount paths in mount order.
    #[must_use]
    pub fn mount_paths(&self) -> Vec<String> {
        self.mounts.read().iter().map(|m| m.path.clone()).collect()
    }

    /// Number of mounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mounts.read().len()
    }

    /// Returns `true` if nothing is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounts.read().is_empty()
    }

    /// Builds a fresh trie with every mount's tree grafted at its path.
    ///
    /// Commands keep the parents they have in their own source.
    #[must_use]
    pub fn composite_root(&self) -> TrieNode {
        let mut root = TrieNode::new();
        for mount in self.snapshot() {
            if let Some(node) = mount.source.find_node(&[]) {
                root.insert_node(&mount.segments, &node);
            }
        }
        root
    }

    fn snapshot(&self) -> Vec<Mount> {
        self.mounts.read().clone()
    }
}

/// The mount owning `path`: longest component prefix, first mount on ties.
fn route<'m>(mounts: &'m [Mount], path: &[&str]) -> Option<&'m Mount> {
    let mut best: Option<&Mount> = None;
    for mount in mounts {
        if has_prefix(path, &mount.segments)
            && best.is_none_or(|b| mount.segments.len() > b.segments.len())
        {
            best = Some(mount);
        }
    }
    best
}

#[async_trait]
impl CommandSource for MultiRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn collect_commands(&self, prefix: &[&str], recurse: bool) -> Vec<SharedCommand> {
        let mounts = self.snapshot();

        if prefix.is_empty() {
            return mounts
                .iter()
                .flat_map(|m| m.reparent(m.source.collect_commands(&[], recurse)))
                .collect();
        }

        if let Some(mount) = route(&mounts, prefix) {
            let rest = &prefix[mount.segments.len()..];
            return mount
                .reparent(mount.source.collect_commands(rest, recurse))
                .collect();
        }

        // Prefix sits above the mounts that live under it.
        if !recurse {
            return Vec::new();
        }
        mounts
            .iter()
            .filter(|m| has_prefix(&m.segments, prefix))
            .flat_map(|m| m.reparent(m.source.collect_commands(&[], true)))
            .collect()
    }

    fn get_command(&self, path: &str) -> Option<SharedCommand> {
        // Resolve `.`/`..` before routing, the same way mount paths are.
        let segments = mount_segments(path);
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let mounts = self.snapshot();
        let mount = route(&mounts, &segments)?;

        let rest = &segments[mount.segments.len()..];
        if rest.is_empty() {
            return None;
        }
        mount
            .source
            .get_command(&join_path(rest))
            .map(|cmd| MountedCommand::shared(cmd, &mount.segments))
    }

    fn find_node(&self, prefix: &[&str]) -> Option<TrieNode> {
        if prefix.is_empty() {
            return Some(self.composite_root());
        }
        let mounts = self.snapshot();
        match route(&mounts, prefix) {
            Some(mount) => mount.source.find_node(&prefix[mount.segments.len()..]),
            None => self.composite_root().find_node(prefix).cloned(),
        }
    }

    fn get_render_node(&self, prefix: &[&str]) -> Option<RenderNode> {
        if prefix.is_empty() {
            return Some(self.composite_root().to_render_node(""));
        }
        let mounts = self.snapshot();
        let Some(mount) = route(&mounts, prefix) else {
            let composite = self.composite_root();
            let name = prefix.last().copied().unwrap_or_default();
            return composite.find_node(prefix).map(|node| node.to_render_node(name));
        };

        let rest = &prefix[mount.segments.len()..];
        let mut render = mount.source.get_render_node(rest)?;
        if rest.is_empty() {
            if let Some(last) = prefix.last() {
                (*last).clone_into(&mut render.name);
            }
        }
        Some(render)
    }

    fn tools(&self) -> Result<Vec<Tool>, RepositoryError> {
        let mut tools = Vec::new();
        for mount in self.snapshot() {
            let child = mount
                .source
                .tools()
                .map_err(|e| RepositoryError::mount(mount.path.clone(), e))?;
            let prefix = mount.tool_prefix();
            tools.extend(child.into_iter().map(|tool| tool.prefixed(prefix)));
        }
        Ok(tools)
    }

    /// Watches every mount concurrently.
    ///
    /// The first failing mount cancels the others; the call returns once
    /// every child has returned, with that first error.
    async fn watch(
        &self,
        cancel: CancellationToken,
        options: WatchOptions<'static>,
    ) -> Result<(), RepositoryError> {
        let group = cancel.child_token();
        let mut tasks = JoinSet::new();

        for mount in self.snapshot() {
            let token = group.clone();
            let options = options.clone();
            tasks.spawn(async move {
                mount
                    .source
                    .watch(token, options)
                    .await
                    .map_err(|e| RepositoryError::mount(mount.path.clone(), e))
            });
        }
        tracing::info!(multi = %self.name, mounts = tasks.len(), "Watching mounts");

        let mut first: Option<RepositoryError> = None;
        while let Some(joined) = tasks.join_next().await {
            let Err(err) = joined.map_err(RepositoryError::from).and_then(|r| r) else {
                continue;
            };
            if first.is_none() {
                if !err.is_cancelled() {
                    tracing::warn!(multi = %self.name, error = %err, "Mount watch failed, stopping siblings");
                }
                group.cancel();
                first = Some(err);
            } else {
                tracing::debug!(multi = %self.name, error = %err, "Mount watch stopped");
            }
        }

        first.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use camino::{Utf8Path, Utf8PathBuf};
    use ct_core::{Command, CommandDef, CommandEntry, Directory, LoadError};

    use crate::loader::LoadOptions;
    use crate::repository::Repository;

    fn repo_with(name: &str, commands: &[(&str, &[&str])]) -> Arc<Repository> {
        let repo = Repository::new(name);
        repo.add(
            commands
                .iter()
                .map(|(n, parents)| CommandEntry::from(CommandDef::new(*n, parents.iter().copied()))),
        );
        Arc::new(repo)
    }

    fn paths(cmds: &[SharedCommand]) -> Vec<String> {
        let mut out: Vec<String> = cmds.iter().map(|c| join_path(&c.full_path())).collect();
        out.sort();
        out
    }

    #[derive(Debug)]
    struct Broken;

    #[async_trait]
    impl CommandSource for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn collect_commands(&self, _prefix: &[&str], _recurse: bool) -> Vec<SharedCommand> {
            Vec::new()
        }
        fn get_command(&self, _path: &str) -> Option<SharedCommand> {
            None
        }
        fn find_node(&self, _prefix: &[&str]) -> Option<TrieNode> {
            None
        }
        fn get_render_node(&self, _prefix: &[&str]) -> Option<RenderNode> {
            None
        }
        fn tools(&self) -> Result<Vec<Tool>, RepositoryError> {
            Err(RepositoryError::MissingLoader("broken".to_owned()))
        }
        async fn watch(
            &self,
            _cancel: CancellationToken,
            _options: WatchOptions<'static>,
        ) -> Result<(), RepositoryError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(RepositoryError::MissingLoader("broken".to_owned()))
        }
    }

    #[test]
    fn test_mount_normalizes_and_unmounts() {
        let multi = MultiRepository::new("all");
        assert_eq!(multi.mount("plugins/./", repo_with("p", &[])), "/plugins");
        assert_eq!(multi.mount("", repo_with("r", &[])), "/");
        assert_eq!(multi.mount_paths(), vec!["/plugins", "/"]);

        let removed = multi.unmount("/plugins/").unwrap();
        assert_eq!(removed.name(), "p");
        assert!(multi.unmount("/plugins").is_none());
        assert_eq!(multi.len(), 1);
    }

    #[test]
    fn test_collect_all_prefixes_non_root_mounts() {
        let multi = MultiRepository::new("all");
        multi.mount("/", repo_with("core", &[("root-cmd", &[])]));
        multi.mount("/plugins", repo_with("plugins", &[("hello", &[])]));

        assert_eq!(
            paths(&multi.collect_commands(&[], true)),
            vec!["plugins/hello", "root-cmd"]
        );
        assert_eq!(
            paths(&multi.collect_commands(&["plugins"], false)),
            vec!["plugins/hello"]
        );
    }

    #[test]
    fn test_get_command_routes_to_mount() {
        let multi = MultiRepository::new("all");
        multi.mount("/", repo_with("core", &[("build", &[])]));
        multi.mount("/tools", repo_with("tools", &[("build", &[])]));

        let routed = multi.get_command("tools/build").unwrap();
        assert_eq!(routed.full_path(), vec!["tools", "build"]);
        let root = multi.get_command("build").unwrap();
        assert_eq!(root.full_path(), vec!["build"]);
        assert!(multi.get_command("tools").is_none());
    }

    #[test]
    fn test_unprefixed_lookup_needs_root_mount() {
        let multi = MultiRepository::new("all");
        multi.mount("/tools", repo_with("tools", &[("build", &[])]));
        assert!(multi.get_command("build").is_none());
        assert!(multi.get_command("/tools/build").is_some());
    }

    #[test]
    fn test_get_command_resolves_dot_segments_before_routing() {
        let multi = MultiRepository::new("all");
        multi.mount("/", repo_with("core", &[("version", &[])]));
        multi.mount("/plugins", repo_with("plugins", &[]));

        let cmd = multi.get_command("plugins/../version").unwrap();
        assert_eq!(cmd.full_path(), vec!["version"]);
        assert!(multi.get_command("./plugins/../../version").is_some());
        assert!(multi.get_command("version/..").is_none());
    }

    #[test]
    fn test_longest_prefix_wins_regardless_of_order() {
        let multi = MultiRepository::new("all");
        multi.mount("/a", repo_with("outer", &[("x", &["b"])]));
        multi.mount("/a/b", repo_with("inner", &[("y", &[])]));

        let cmd = multi.get_command("a/b/y").unwrap();
        assert_eq!(cmd.full_path(), vec!["a", "b", "y"]);
        assert!(
            multi.get_command("a/b/x").is_none(),
            "/a/b is owned by the inner mount"
        );
        assert_eq!(paths(&multi.collect_commands(&["a", "b"], false)), vec!["a/b/y"]);
    }

    #[test]
    fn test_find_node_composite_and_fallback() {
        let multi = MultiRepository::new("all");
        multi.mount("/a/b", repo_with("inner", &[("x", &[]), ("y", &["deep"])]));

        let root = multi.find_node(&[]).unwrap();
        assert!(root.find_node(&["a", "b", "deep"]).is_some());

        let above = multi.find_node(&["a"]).unwrap();
        assert!(above.child("b").is_some());
        assert_eq!(paths(&multi.collect_commands(&["a"], true)), vec!["a/b/deep/y", "a/b/x"]);
        assert!(multi.collect_commands(&["a"], false).is_empty());
        assert!(multi.find_node(&["zzz"]).is_none());
    }

    #[test]
    fn test_render_node_names_mount_root() {
        let multi = MultiRepository::new("all");
        multi.mount("/", repo_with("core", &[("version", &[])]));
        multi.mount("/plugins", repo_with("plugins", &[("hello", &[])]));

        let render = multi.get_render_node(&["plugins"]).unwrap();
        assert_eq!(render.name, "plugins");
        assert!(render.child("hello").is_some());

        let root = multi.get_render_node(&[]).unwrap();
        assert!(root.child("plugins").is_some());
        assert!(root.child("version").is_some());
    }

    #[test]
    fn test_tools_prefixed_and_errors_wrapped() {
        let multi = MultiRepository::new("all");
        multi.mount("/", repo_with("core", &[("version", &[])]));
        multi.mount("/plugins", repo_with("plugins", &[("hello", &[])]));

        let page = multi.list_tools(None, None).unwrap();
        let names: Vec<&str> = page.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["plugins/hello", "version"]);

        multi.mount("/broken", Arc::new(Broken));
        let err = multi.list_tools(None, None).unwrap_err();
        assert_eq!(err.mount_path(), Some("/broken"));
    }

    #[tokio::test]
    async fn test_watch_with_no_mounts_returns() {
        let multi = MultiRepository::new("empty");
        assert!(multi.watch(CancellationToken::new(), WatchOptions::new()).await.is_ok());
    }

    fn watched_repo(root: &Utf8Path) -> Arc<Repository> {
        let loader = |_root: &Utf8Path,
                      _path: &Utf8Path,
                      _options: &LoadOptions|
         -> Result<Vec<CommandEntry>, LoadError> { Ok(Vec::new()) };
        Arc::new(
            Repository::new(root.as_str())
                .with_directory(Directory::new(root))
                .with_loader(loader),
        )
    }

    fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().canonicalize().unwrap()).unwrap();
        (dir, root)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_first_failure_stops_siblings() {
        let (_guard, root) = utf8_tempdir();
        let multi = MultiRepository::new("all");
        multi.mount("/", watched_repo(&root));
        multi.mount("/broken", Arc::new(Broken));

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            multi.watch(CancellationToken::new(), WatchOptions::new()),
        )
        .await
        .unwrap();

        let err = result.unwrap_err();
        assert_eq!(err.mount_path(), Some("/broken"));
        assert!(err.is_config());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancel_stops_every_mount() {
        let (_a_guard, a) = utf8_tempdir();
        let (_b_guard, b) = utf8_tempdir();
        let multi = Arc::new(MultiRepository::new("all"));
        multi.mount("/", watched_repo(&a));
        multi.mount("/b", watched_repo(&b));

        let cancel = CancellationToken::new();
        let handle = {
            let multi = Arc::clone(&multi);
            let token = cancel.clone();
            tokio::spawn(async move { multi.watch(token, WatchOptions::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
    }
}

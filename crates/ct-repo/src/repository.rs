//! A single live-reloading command tree.
//!
//! A [`Repository`] owns one [`TrieNode`] behind a read-write lock, the
//! directories and files it was loaded from, and the [`Loader`] that parses
//! them. The watch loop is the only regular writer; readers get owned
//! snapshots and never observe a half-applied batch.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use ct_core::path::{join_path, split_path};
use ct_core::{
    AliasCommand, AliasSpec, Command, CommandEntry, Directory, MountConfig, SharedCommand, Tool,
    WatchConfig,
};
use ct_trie::{ROOT, RenderNode, TrieNode};
use ct_watcher::{WatchOptions, Watcher};
use parking_lot::RwLock;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::error::RepositoryError;
use crate::loader::{DocLoader, LoadOptions, Loader};
use crate::source::CommandSource;
use crate::stats::RepositoryStats;

/// Hook invoked once per command added or removed.
pub type CommandCallback = Arc<dyn Fn(&SharedCommand) -> anyhow::Result<()> + Send + Sync>;

/// An alias that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedAlias {
    /// The alias as the loader produced it.
    pub alias: AliasSpec,

    /// Why it was dropped.
    pub reason: String,
}

/// Outcome of [`Repository::add`].
#[derive(Debug, Clone, Default)]
pub struct AddResult {
    /// Commands inserted, resolved aliases included.
    pub added: Vec<SharedCommand>,

    /// Aliases whose target was not found.
    pub dropped_aliases: Vec<DroppedAlias>,
}

impl AddResult {
    /// Returns `true` if no alias was dropped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dropped_aliases.is_empty()
    }
}

/// One logical command source and its tree.
///
/// # Examples
///
/// ```
/// use ct_core::{CommandDef, CommandEntry};
/// use ct_repo::Repository;
///
/// let repo = Repository::new("core");
/// let result = repo.add([
///     CommandEntry::from(CommandDef::new("build", ["tools"])),
///     CommandEntry::from(CommandDef::new("test", ["tools"])),
/// ]);
///
/// assert_eq!(result.added.len(), 2);
/// assert_eq!(repo.collect_commands(&["tools"], false).len(), 2);
/// assert!(repo.get_command("tools/build").is_some());
/// ```
pub struct Repository {
    name: String,
    directories: Vec<Directory>,
    files: Vec<Utf8PathBuf>,
    root: RwLock<TrieNode>,
    loader: Option<Arc<dyn Loader>>,
    update_callback: Option<CommandCallback>,
    remove_callback: Option<CommandCallback>,
    watch_config: WatchConfig,
    stats: RepositoryStats,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("directories", &self.directories)
            .field("files", &self.files)
            .field("commands", &self.root.read().command_count())
            .field("has_loader", &self.loader.is_some())
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directories: Vec::new(),
            files: Vec::new(),
            root: RwLock::new(TrieNode::new()),
            loader: None,
            update_callback: None,
            remove_callback: None,
            watch_config: WatchConfig::default(),
            stats: RepositoryStats::new(),
        }
    }

    /// Creates a repository with the sources of a mount configuration.
    #[must_use]
    pub fn from_mount(mount: &MountConfig) -> Self {
        Self::new(mount.name.clone())
            .with_directories(mount.directories.iter().cloned())
            .with_files(mount.files.iter().cloned())
    }

    /// Adds a directory source.
    #[must_use]
    pub fn with_directory(mut self, directory: Directory) -> Self {
        self.directories.push(directory);
        self
    }

    /// Adds several directory sources.
    #[must_use]
    pub fn with_directories(mut self, directories: impl IntoIterator<Item = Directory>) -> Self {
        self.directories.extend(directories);
        self
    }

    /// Adds an individually tracked file.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<Utf8PathBuf>) -> Self {
        self.files.push(file.into());
        self
    }

    /// Adds several individually tracked files.
    #[must_use]
    pub fn with_files(mut self, files: impl IntoIterator<Item = Utf8PathBuf>) -> Self {
        self.files.extend(files);
        self
    }

    /// Sets the loader.
    #[must_use]
    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Sets the default watch settings (masks, error policy).
    #[must_use]
    pub fn with_watch_config(mut self, config: WatchConfig) -> Self {
        self.watch_config = config;
        self
    }

    /// Sets the hook run for every added command.
    #[must_use]
    pub fn on_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SharedCommand) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.update_callback = Some(Arc::new(callback));
        self
    }

    /// Sets the hook run for every removed command.
    #[must_use]
    pub fn on_remove<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SharedCommand) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.remove_callback = Some(Arc::new(callback));
        self
    }

    /// Repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured directory sources.
    #[must_use]
    pub fn directories(&self) -> &[Directory] {
        &self.directories
    }

    /// Configured individual files.
    #[must_use]
    pub fn files(&self) -> &[Utf8PathBuf] {
        &self.files
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> &RepositoryStats {
        &self.stats
    }

    /// Loads every source and commits the result in one batch.
    ///
    /// Sources are loaded in parallel. Documentation directories are loaded
    /// afterwards through `docs`; a missing documentation directory is
    /// skipped. Nothing reaches the trie unless every source and every
    /// documentation directory loaded.
    pub fn load_commands(&self, docs: &dyn DocLoader) -> Result<AddResult, RepositoryError> {
        let sources: Vec<SourceRef<'_>> = self
            .directories
            .iter()
            .map(SourceRef::Dir)
            .chain(self.files.iter().map(|f| SourceRef::File(f)))
            .collect();
        if sources.is_empty() {
            return Ok(AddResult::default());
        }

        let Some(loader) = self.loader.as_deref() else {
            return Err(RepositoryError::MissingLoader(self.name.clone()));
        };

        let batches = sources
            .par_iter()
            .map(|source| source.load(loader))
            .collect::<Result<Vec<_>, _>>()?;

        for dir in &self.directories {
            let Some(docs_root) = dir.docs_root() else {
                continue;
            };
            if !docs_root.is_dir() {
                tracing::debug!(docs = %docs_root, "Documentation directory missing, skipping");
                continue;
            }
            docs.load_docs(&docs_root)
                .map_err(|e| RepositoryError::docs(dir.source_label(), e))?;
        }

        let result = self.add(batches.into_iter().flatten());
        tracing::info!(
            repository = %self.name,
            sources = sources.len(),
            added = result.added.len(),
            dropped_aliases = result.dropped_aliases.len(),
            "Loaded commands"
        );
        Ok(result)
    }

    /// Inserts a batch, concrete commands first, then aliases.
    ///
    /// Each alias resolves to the command named by its own `parents` path,
    /// falling back to the full path in `alias_for`. An alias whose target
    /// is missing is dropped and reported in the result.
    pub fn add(&self, entries: impl IntoIterator<Item = CommandEntry>) -> AddResult {
        let mut concrete = Vec::new();
        let mut aliases = Vec::new();
        for entry in entries {
            match entry {
                CommandEntry::Concrete(cmd) => concrete.push(cmd),
                CommandEntry::Alias(alias) => aliases.push(alias),
            }
        }

        let mut result = AddResult::default();
        {
            let mut root = self.root.write();
            for cmd in concrete {
                root.insert_command(cmd.parents(), Arc::clone(&cmd));
                result.added.push(cmd);
            }

            for alias in aliases {
                let target = root
                    .find_command(&alias.parents)
                    .or_else(|| root.find_command(&alias.alias_for));
                let Some(target) = target else {
                    let reason = if alias.alias_for.is_empty() {
                        format!("target {} not found", join_path(&alias.parents))
                    } else {
                        format!(
                            "target {} not found (nor {})",
                            join_path(&alias.alias_for),
                            join_path(&alias.parents)
                        )
                    };
                    result.dropped_aliases.push(DroppedAlias {
                        reason,
                        alias,
                    });
                    continue;
                };
                let cmd: SharedCommand = Arc::new(AliasCommand::new(
                    alias.name.clone(),
                    alias.parents.clone(),
                    target,
                ));
                root.insert_command(&alias.parents, Arc::clone(&cmd));
                result.added.push(cmd);
            }
        }

        for dropped in &result.dropped_aliases {
            tracing::warn!(
                repository = %self.name,
                alias = %join_path(&prefixed_name(&dropped.alias.parents, &dropped.alias.name)),
                reason = %dropped.reason,
                "Dropping unresolved alias"
            );
        }
        if let Some(callback) = &self.update_callback {
            for cmd in &result.added {
                if let Err(err) = callback(cmd) {
                    tracing::warn!(command = %join_path(&cmd.full_path()), error = %err, "Update callback failed");
                }
            }
        }

        self.stats.record_added(result.added.len());
        self.stats
            .record_dropped_aliases(result.dropped_aliases.len());
        result
    }

    /// Removes every command at or below each slash-separated prefix.
    ///
    /// An empty prefix clears the whole tree. Returns the removed commands.
    pub fn remove<I, S>(&self, prefixes: I) -> Vec<SharedCommand>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removed: Vec<SharedCommand> = {
            let mut root = self.root.write();
            prefixes
                .into_iter()
                .flat_map(|prefix| root.remove(&split_path(prefix.as_ref())))
                .collect()
        };

        if let Some(callback) = &self.remove_callback {
            for cmd in &removed {
                if let Err(err) = callback(cmd) {
                    tracing::warn!(command = %join_path(&cmd.full_path()), error = %err, "Remove callback failed");
                }
            }
        }

        self.stats.record_removed(removed.len());
        tracing::debug!(repository = %self.name, removed = removed.len(), "Removed commands");
        removed
    }

    /// Commands at `prefix`, and below it when `recurse` is set.
    pub fn collect_commands<S: AsRef<str>>(&self, prefix: &[S], recurse: bool) -> Vec<SharedCommand> {
        self.root.read().collect_commands(prefix, recurse)
    }

    /// A snapshot of the node at `prefix`.
    pub fn find_node<S: AsRef<str>>(&self, prefix: &[S]) -> Option<TrieNode> {
        self.root.read().find_node(prefix).cloned()
    }

    /// The render projection of `prefix`.
    ///
    /// When `prefix` also names a command, that command is attached to the
    /// returned node. A prefix naming only a command yields a leaf.
    pub fn get_render_node<S: AsRef<str>>(&self, prefix: &[S]) -> Option<RenderNode> {
        let root = self.root.read();
        let command = if prefix.is_empty() {
            None
        } else {
            root.find_command(prefix)
        };

        match (root.find_node(prefix), command) {
            (Some(node), command) => {
                let name = prefix.last().map_or("", |s| s.as_ref());
                let mut render = node.to_render_node(name);
                if let Some(cmd) = command {
                    cmd.name().clone_into(&mut render.name);
                    render.command = Some(cmd);
                }
                Some(render)
            }
            (None, Some(cmd)) => Some(RenderNode::leaf(cmd)),
            (None, None) => None,
        }
    }

    /// Looks up a command by slash-separated full path.
    pub fn get_command(&self, path: &str) -> Option<SharedCommand> {
        let segments = split_path(path);
        if segments.is_empty() {
            return None;
        }
        self.root.read().find_command(&segments)
    }

    /// Every command projected as a tool.
    pub fn tools(&self) -> Vec<Tool> {
        self.collect_commands(ROOT, true)
            .iter()
            .map(|cmd| Tool::from(cmd.description()))
            .collect()
    }

    /// Watches every source and keeps the tree in sync until `cancel` fires.
    ///
    /// Written files are handed back to the loader with parents derived
    /// from their location under the owning directory's command root;
    /// removed files drop `parents/stem`. Individually tracked files are
    /// never namespaced. `options` override the repository defaults, so
    /// callers can narrow the paths or masks or replace the callbacks.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::MissingLoader`] without a loader, otherwise the
    /// watcher's error (including cancellation).
    pub async fn watch(
        &self,
        cancel: CancellationToken,
        options: WatchOptions<'static>,
    ) -> Result<(), RepositoryError> {
        let Some(loader) = self.loader.as_deref() else {
            return Err(RepositoryError::MissingLoader(self.name.clone()));
        };
        let targets = WatchTargets::new(&self.directories, &self.files);

        let defaults = WatchOptions::from_config(&self.watch_config)
            .with_paths(self.directories.iter().map(Directory::watch_root))
            .with_paths(self.files.iter().cloned())
            .on_write(|path| self.reload_path(loader, &targets, path))
            .on_remove(|path| {
                self.remove_path(&targets, path);
                Ok(())
            });

        let mut watcher = Watcher::new(defaults.overlay(options))?;
        tracing::info!(repository = %self.name, "Watching repository");
        watcher.run(&cancel).await.map_err(RepositoryError::from)
    }

    fn reload_path(
        &self,
        loader: &dyn Loader,
        targets: &WatchTargets,
        path: &Utf8Path,
    ) -> anyhow::Result<()> {
        let Some(resolved) = targets.resolve(path) else {
            tracing::debug!(path = %path, "Change outside every source, ignoring");
            return Ok(());
        };
        if path.is_dir() {
            // Files inside report their own events.
            return Ok(());
        }

        // Synchronous load; the watcher runs callbacks inside `block_in_place`.
        let options = LoadOptions::new(resolved.label.clone()).with_parents(resolved.parents);
        let entries = match loader.load_commands(&resolved.root, path, &options) {
            Ok(entries) => entries,
            Err(err) => {
                self.stats.increment_watch_errors();
                return Err(RepositoryError::load(resolved.label, err).into());
            }
        };

        let result = self.add(entries);
        self.stats.increment_reloads();
        tracing::info!(
            repository = %self.name,
            path = %path,
            added = result.added.len(),
            "Reloaded file"
        );
        Ok(())
    }

    fn remove_path(&self, targets: &WatchTargets, path: &Utf8Path) {
        let (Some(resolved), Some(stem)) = (targets.resolve(path), path.file_stem()) else {
            return;
        };
        let full = prefixed_name(&resolved.parents, stem);
        let removed = self.remove([join_path(&full)]);
        tracing::info!(
            repository = %self.name,
            path = %path,
            removed = removed.len(),
            "Dropped commands for removed file"
        );
    }
}

#[async_trait]
impl CommandSource for Repository {
    fn name(&self) -> &str {
        &self.name
    }

    fn collect_commands(&self, prefix: &[&str], recurse: bool) -> Vec<SharedCommand> {
        Repository::collect_commands(self, prefix, recurse)
    }

    fn get_command(&self, path: &str) -> Option<SharedCommand> {
        Repository::get_command(self, path)
    }

    fn find_node(&self, prefix: &[&str]) -> Option<TrieNode> {
        Repository::find_node(self, prefix)
    }

    fn get_render_node(&self, prefix: &[&str]) -> Option<RenderNode> {
        Repository::get_render_node(self, prefix)
    }

    fn tools(&self) -> Result<Vec<Tool>, RepositoryError> {
        Ok(Repository::tools(self))
    }

    async fn watch(
        &self,
        cancel: CancellationToken,
        options: WatchOptions<'static>,
    ) -> Result<(), RepositoryError> {
        Repository::watch(self, cancel, options).await
    }
}

fn prefixed_name(parents: &[String], name: &str) -> Vec<String> {
    let mut full = parents.to_vec();
    full.push(name.to_owned());
    full
}

enum SourceRef<'a> {
    Dir(&'a Directory),
    File(&'a Utf8Path),
}

impl SourceRef<'_> {
    fn load(&self, loader: &dyn Loader) -> Result<Vec<CommandEntry>, RepositoryError> {
        let (label, root, path) = match self {
            Self::Dir(dir) => {
                let root = dir.command_root();
                (dir.source_label(), root.clone(), root)
            }
            Self::File(file) => (file.to_string(), parent_or_dot(file), file.to_path_buf()),
        };

        let entries = loader
            .load_commands(&root, &path, &LoadOptions::new(label.clone()))
            .map_err(|e| RepositoryError::load(label.clone(), e))?;
        tracing::debug!(source = %label, entries = entries.len(), "Loaded source");
        Ok(entries)
    }
}

fn parent_or_dot(path: &Utf8Path) -> Utf8PathBuf {
    path.parent()
        .filter(|p| !p.as_str().is_empty())
        .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_path_buf)
}

fn canonical(path: &Utf8Path) -> Utf8PathBuf {
    path.canonicalize_utf8().unwrap_or_else(|_| path.to_path_buf())
}

/// Maps changed paths back to the source that owns them.
#[derive(Debug, Default)]
struct WatchTargets {
    dirs: Vec<DirTarget>,
    files: Vec<Utf8PathBuf>,
}

#[derive(Debug)]
struct DirTarget {
    watch_root: Utf8PathBuf,
    command_root: Utf8PathBuf,
    label: String,
}

#[derive(Debug, PartialEq, Eq)]
struct Resolved {
    root: Utf8PathBuf,
    label: String,
    parents: Vec<String>,
}

impl WatchTargets {
    fn new(directories: &[Directory], files: &[Utf8PathBuf]) -> Self {
        Self {
            dirs: directories
                .iter()
                .map(|dir| DirTarget {
                    watch_root: canonical(&dir.watch_root()),
                    command_root: canonical(&dir.command_root()),
                    label: dir.source_label(),
                })
                .collect(),
            files: files.iter().map(|f| canonical(f)).collect(),
        }
    }

    fn resolve(&self, path: &Utf8Path) -> Option<Resolved> {
        if self.files.iter().any(|f| f == path) {
            return Some(Resolved {
                root: parent_or_dot(path),
                label: path.to_string(),
                parents: Vec::new(),
            });
        }

        let target = self
            .dirs
            .iter()
            .filter(|t| path.starts_with(&t.watch_root))
            .max_by_key(|t| t.watch_root.as_str().len())?;
        let relative = path
            .strip_prefix(&target.command_root)
            .or_else(|_| path.strip_prefix(&target.watch_root))
            .ok()?;
        let parents = relative
            .parent()
            .map(|dir| dir.components().map(|c| c.as_str().to_owned()).collect())
            .unwrap_or_default();

        Some(Resolved {
            root: target.command_root.clone(),
            label: target.label.clone(),
            parents,
        })
    }
}

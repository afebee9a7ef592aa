//! Recursive, mask-filtered file watcher.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ notify backend thread        │
//! │ RecommendedWatcher (non-rec) │
//! └──────────────┬───────────────┘
//!                │ blocking_send
//!                ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ Watcher::run (async)                                     │
//! │  select! { cancelled, rx.recv() }                        │
//! │    └─► classify ─► sibling check ─► unwatch on remove    │
//! │        ─► register new dirs ─► masks ─► callback         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every directory is registered non-recursively and new directories are
//! added as they appear, so behavior is identical across backends. When a
//! single file is watched, its parent directory is registered and events
//! for the file's siblings are dropped.

use camino::{Utf8Path, Utf8PathBuf};
use ct_core::{FxHashMap, FxHashSet};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher, WatcherKind};
use smallvec::SmallVec;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::WatchError;
use crate::events::{FileEvent, FileOp};
use crate::filter::MaskFilter;
use crate::options::WatchOptions;

/// Watches files and directories and dispatches changes to callbacks.
///
/// # Examples
///
/// ```no_run
/// use ct_watcher::{WatchOptions, Watcher};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), ct_watcher::WatchError> {
/// let options = WatchOptions::new()
///     .with_path("/srv/cmds")
///     .with_masks(["**/*.json"])
///     .on_write(|path| {
///         println!("changed: {path}");
///         Ok(())
///     });
///
/// let cancel = CancellationToken::new();
/// let mut watcher = Watcher::new(options)?;
/// watcher.run(&cancel).await
/// # }
/// ```
pub struct Watcher<'cb> {
    options: WatchOptions<'cb>,
    masks: MaskFilter,

    /// Canonical forms of the configured paths.
    roots: Vec<Utf8PathBuf>,

    /// Directories currently registered with the backend.
    watched_dirs: FxHashSet<Utf8PathBuf>,

    /// Files registered individually (kqueue only).
    watched_files: FxHashSet<Utf8PathBuf>,

    /// Parent directories that are only watched on behalf of specific files.
    file_parent_dirs: FxHashMap<Utf8PathBuf, SmallVec<[String; 4]>>,

    /// Backend reports writes only for files it watches directly.
    per_file_watches: bool,
}

impl std::fmt::Debug for Watcher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("roots", &self.roots)
            .field("masks", &self.masks.len())
            .field("watched_dirs", &self.watched_dirs.len())
            .finish_non_exhaustive()
    }
}

impl<'cb> Watcher<'cb> {
    /// Creates a watcher from options.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::MissingWriteCallback`] when no write callback is
    /// set and [`WatchError::InvalidMask`] when a mask does not compile.
    pub fn new(options: WatchOptions<'cb>) -> Result<Self, WatchError> {
        if !options.has_write_callback() {
            return Err(WatchError::MissingWriteCallback);
        }
        let masks = MaskFilter::new(options.masks())?;

        Ok(Self {
            options,
            masks,
            roots: Vec::new(),
            watched_dirs: FxHashSet::default(),
            watched_files: FxHashSet::default(),
            file_parent_dirs: FxHashMap::default(),
            per_file_watches: false,
        })
    }

    /// Watches until `cancel` fires or a fatal error occurs.
    ///
    /// Callback failures are logged and skipped unless the options ask to
    /// break on error, in which case the first one is returned.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Cancelled`] on cancellation,
    /// [`WatchError::PathNotFound`] if a configured path does not exist, and
    /// the first error encountered when breaking on error.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<(), WatchError> {
        let (tx, mut rx) = mpsc::channel(self.options.effective_capacity());
        let mut backend =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                // Receiver gone means the loop has stopped.
                let _ = tx.blocking_send(res);
            })?;
        self.per_file_watches = matches!(RecommendedWatcher::kind(), WatcherKind::Kqueue);

        self.register_roots(&mut backend)?;
        tracing::info!(
            roots = self.roots.len(),
            dirs = self.watched_dirs.len(),
            masks = self.masks.len(),
            "Watcher started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Watcher cancelled");
                    return Err(WatchError::Cancelled);
                }
                received = rx.recv() => match received {
                    Some(Ok(event)) => blocking(|| self.process(&mut backend, event))?,
                    Some(Err(err)) => self.report(WatchError::Notify(err))?,
                    None => return Err(WatchError::ChannelClosed),
                },
            }
        }
    }

    /// Returns `true` if `dir` is registered with the backend.
    #[must_use]
    pub fn is_watching(&self, dir: &Utf8Path) -> bool {
        self.watched_dirs.contains(dir)
    }

    /// Number of directories registered with the backend.
    #[must_use]
    pub fn watched_dir_count(&self) -> usize {
        self.watched_dirs.len()
    }

    fn register_roots(&mut self, backend: &mut dyn NotifyWatcher) -> Result<(), WatchError> {
        self.roots.clear();
        self.watched_dirs.clear();
        self.watched_files.clear();
        self.file_parent_dirs.clear();

        let paths = self.options.paths().to_vec();
        for path in &paths {
            let root = path
                .canonicalize_utf8()
                .map_err(|_| WatchError::path_not_found(path))?;
            if root.is_dir() {
                self.add_dir_recursive(backend, &root)?;
            } else {
                self.track_file(backend, &root)?;
            }
            self.roots.push(root);
        }
        Ok(())
    }

    fn track_file(
        &mut self,
        backend: &mut dyn NotifyWatcher,
        file: &Utf8Path,
    ) -> Result<(), WatchError> {
        let (Some(parent), Some(name)) = (file.parent(), file.file_name()) else {
            return Err(WatchError::path_not_found(file));
        };

        if self.watched_dirs.contains(parent) {
            if !self.file_parent_dirs.contains_key(parent) {
                // Parent is already watched as a whole.
                return Ok(());
            }
        } else {
            backend.watch(parent.as_std_path(), RecursiveMode::NonRecursive)?;
            self.watched_dirs.insert(parent.to_owned());
        }

        let names = self.file_parent_dirs.entry(parent.to_owned()).or_default();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_owned());
        }
        tracing::debug!(file = %file, "Tracking single file");
        Ok(())
    }

    fn add_dir_recursive(
        &mut self,
        backend: &mut dyn NotifyWatcher,
        dir: &Utf8Path,
    ) -> Result<(), WatchError> {
        let walker = ignore::WalkBuilder::new(dir)
            .standard_filters(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_dir()) {
                continue;
            }
            match Utf8PathBuf::try_from(entry.into_path()) {
                Ok(path) => self.watch_dir(backend, path)?,
                Err(e) => tracing::warn!(
                    path = %e.into_path_buf().display(),
                    "Skipping non-UTF-8 directory"
                ),
            }
        }
        Ok(())
    }

    fn watch_dir(
        &mut self,
        backend: &mut dyn NotifyWatcher,
        dir: Utf8PathBuf,
    ) -> Result<(), WatchError> {
        self.file_parent_dirs.remove(&dir);
        if self.watched_dirs.contains(&dir) {
            return Ok(());
        }
        backend.watch(dir.as_std_path(), RecursiveMode::NonRecursive)?;
        tracing::trace!(dir = %dir, "Watching directory");
        self.watched_dirs.insert(dir);
        Ok(())
    }

    /// Drops every registration at or below `path`.
    fn forget(&mut self, backend: &mut dyn NotifyWatcher, path: &Utf8Path) {
        let stale: Vec<Utf8PathBuf> = self
            .watched_dirs
            .iter()
            .chain(self.watched_files.iter())
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();

        for p in stale {
            // The backend usually drops watches on deleted entries itself.
            if let Err(err) = backend.unwatch(p.as_std_path()) {
                tracing::trace!(path = %p, error = %err, "Unwatch failed");
            }
            self.watched_dirs.remove(&p);
            self.watched_files.remove(&p);
        }
        self.file_parent_dirs.retain(|dir, _| !dir.starts_with(path));
    }

    fn is_untracked_sibling(&self, path: &Utf8Path) -> bool {
        path.parent()
            .and_then(|parent| self.file_parent_dirs.get(parent))
            .is_some_and(|names| {
                path.file_name()
                    .is_none_or(|name| !names.iter().any(|n| n == name))
            })
    }

    /// The watch root masks are evaluated against for `path`.
    fn mask_root<'a>(&'a self, path: &'a Utf8Path) -> Option<&'a Utf8Path> {
        self.roots
            .iter()
            .filter(|root| path != root.as_path() && path.starts_with(root))
            .max_by_key(|root| root.as_str().len())
            .map(Utf8PathBuf::as_path)
            .or_else(|| path.parent())
    }

    fn process(
        &mut self,
        backend: &mut dyn NotifyWatcher,
        event: notify::Event,
    ) -> Result<(), WatchError> {
        for file_event in FileEvent::from_notify(event) {
            if let Err(err) = self.handle_file_event(backend, &file_event) {
                self.report(err)?;
            }
        }
        Ok(())
    }

    fn report(&self, err: WatchError) -> Result<(), WatchError> {
        if self.options.is_break_on_error() {
            return Err(err);
        }
        tracing::warn!(error = %err, path = ?err.path(), "Watch error");
        Ok(())
    }

    fn handle_file_event(
        &mut self,
        backend: &mut dyn NotifyWatcher,
        event: &FileEvent,
    ) -> Result<(), WatchError> {
        let path = event.path.as_path();

        if self.is_untracked_sibling(path) {
            tracing::trace!(path = %path, "Ignoring untracked sibling");
            return Ok(());
        }

        if event.op.is_remove_class() {
            self.forget(backend, path);
        }

        if event.op == FileOp::Create {
            // Blocking; `run` calls in through `blocking`.
            match std::fs::metadata(path) {
                Ok(meta) if meta.is_dir() => {
                    tracing::debug!(dir = %path, "Watching new directory");
                    return self.add_dir_recursive(backend, path);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(path = %path, error = %err, "Created entry vanished before stat");
                    return Ok(());
                }
            }
        }

        if !self.masks.matches(path, self.mask_root(path)) {
            tracing::trace!(path = %path, "Path does not match masks");
            return Ok(());
        }

        if event.op == FileOp::Create
            && self.per_file_watches
            && self.watched_files.insert(path.to_owned())
        {
            backend.watch(path.as_std_path(), RecursiveMode::NonRecursive)?;
        }

        let callback = if event.op.is_write_class() {
            self.options.write_callback()
        } else {
            self.options.remove_callback()
        };
        let Some(callback) = callback else {
            return Ok(());
        };

        tracing::debug!(path = %path, op = ?event.op, "Dispatching change");
        callback(path).map_err(|source| WatchError::callback(path, source))
    }
}

/// Runs synchronous event handling without stalling other runtime tasks.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use notify::EventHandler;
    use parking_lot::Mutex;

    /// Backend that records registrations instead of watching.
    #[derive(Default)]
    struct Recorder {
        watched: Vec<PathBuf>,
        unwatched: Vec<PathBuf>,
    }

    impl NotifyWatcher for Recorder {
        fn new<F: EventHandler>(_handler: F, _config: notify::Config) -> notify::Result<Self> {
            Ok(Self::default())
        }

        fn watch(&mut self, path: &Path, _mode: RecursiveMode) -> notify::Result<()> {
            self.watched.push(path.to_path_buf());
            Ok(())
        }

        fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
            self.unwatched.push(path.to_path_buf());
            Ok(())
        }

        fn kind() -> WatcherKind {
            WatcherKind::NullWatcher
        }
    }

    type Seen = Arc<Mutex<Vec<String>>>;

    fn tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().canonicalize().unwrap()).unwrap();
        (dir, root)
    }

    fn recording(options: WatchOptions<'static>) -> (WatchOptions<'static>, Seen, Seen) {
        let writes: Seen = Arc::default();
        let removes: Seen = Arc::default();
        let w = Arc::clone(&writes);
        let r = Arc::clone(&removes);
        let options = options
            .on_write(move |p| {
                w.lock().push(p.to_string());
                Ok(())
            })
            .on_remove(move |p| {
                r.lock().push(p.to_string());
                Ok(())
            });
        (options, writes, removes)
    }

    fn write_event(path: &Utf8Path) -> FileEvent {
        FileEvent::new(path.to_owned(), FileOp::Write)
    }

    #[test]
    fn test_new_requires_write_callback() {
        let err = Watcher::new(WatchOptions::new().with_path("/tmp")).unwrap_err();
        assert!(matches!(err, WatchError::MissingWriteCallback));
    }

    #[test]
    fn test_new_rejects_bad_mask() {
        let options = WatchOptions::new().with_masks(["[oops"]).on_write(|_| Ok(()));
        assert!(matches!(
            Watcher::new(options),
            Err(WatchError::InvalidMask { .. })
        ));
    }

    #[test]
    fn test_missing_path_is_reported() {
        let options = WatchOptions::new()
            .with_path("/definitely/not/here/cmdtree")
            .on_write(|_| Ok(()));
        let mut watcher = Watcher::new(options).unwrap();
        let err = watcher.register_roots(&mut Recorder::default()).unwrap_err();
        assert!(matches!(err, WatchError::PathNotFound(_)));
    }

    #[test]
    fn test_single_file_ignores_siblings() {
        let (_guard, root) = tempdir();
        std::fs::write(root.join("app.yaml"), "a").unwrap();
        std::fs::write(root.join("other.yaml"), "b").unwrap();

        let (options, writes, _) = recording(WatchOptions::new().with_path(root.join("app.yaml")));
        let mut watcher = Watcher::new(options).unwrap();
        let mut backend = Recorder::default();
        watcher.register_roots(&mut backend).unwrap();

        assert_eq!(backend.watched, vec![root.as_std_path().to_path_buf()]);

        watcher
            .handle_file_event(&mut backend, &write_event(&root.join("other.yaml")))
            .unwrap();
        watcher
            .handle_file_event(&mut backend, &write_event(&root.join("app.yaml")))
            .unwrap();

        assert_eq!(*writes.lock(), vec![root.join("app.yaml").to_string()]);
    }

    #[test]
    fn test_directory_root_supersedes_file_tracking() {
        let (_guard, root) = tempdir();
        std::fs::write(root.join("app.yaml"), "a").unwrap();

        let (options, writes, _) = recording(
            WatchOptions::new()
                .with_path(root.join("app.yaml"))
                .with_path(&root),
        );
        let mut watcher = Watcher::new(options).unwrap();
        let mut backend = Recorder::default();
        watcher.register_roots(&mut backend).unwrap();

        watcher
            .handle_file_event(&mut backend, &write_event(&root.join("other.yaml")))
            .unwrap();
        assert_eq!(writes.lock().len(), 1);
    }

    #[test]
    fn test_new_directory_registered_recursively() {
        let (_guard, root) = tempdir();
        let (options, writes, _) = recording(WatchOptions::new().with_path(&root));
        let mut watcher = Watcher::new(options).unwrap();
        let mut backend = Recorder::default();
        watcher.register_roots(&mut backend).unwrap();
        assert!(watcher.is_watching(&root));

        std::fs::create_dir_all(root.join("sub/inner")).unwrap();
        let created = FileEvent::new(root.join("sub"), FileOp::Create);
        watcher.handle_file_event(&mut backend, &created).unwrap();

        assert!(watcher.is_watching(&root.join("sub")));
        assert!(watcher.is_watching(&root.join("sub/inner")));
        assert_eq!(watcher.watched_dir_count(), 3);
        assert!(writes.lock().is_empty());
    }

    #[test]
    fn test_remove_unwatches_everything_below() {
        let (_guard, root) = tempdir();
        std::fs::create_dir_all(root.join("sub/inner")).unwrap();
        let (options, _, removes) = recording(WatchOptions::new().with_path(&root));
        let mut watcher = Watcher::new(options).unwrap();
        let mut backend = Recorder::default();
        watcher.register_roots(&mut backend).unwrap();
        assert_eq!(watcher.watched_dir_count(), 3);

        let removed = FileEvent::new(root.join("sub"), FileOp::Remove);
        watcher.handle_file_event(&mut backend, &removed).unwrap();

        assert!(!watcher.is_watching(&root.join("sub")));
        assert!(!watcher.is_watching(&root.join("sub/inner")));
        assert!(watcher.is_watching(&root));
        assert_eq!(backend.unwatched.len(), 2);
        assert_eq!(*removes.lock(), vec![root.join("sub").to_string()]);
    }

    #[test]
    fn test_renamed_away_directory_is_forgotten() {
        let (_guard, root) = tempdir();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        let (options, writes, removes) = recording(WatchOptions::new().with_path(&root));
        let mut watcher = Watcher::new(options).unwrap();
        let mut backend = Recorder::default();
        watcher.register_roots(&mut backend).unwrap();
        assert!(watcher.is_watching(&root.join("sub")));

        // Gone from disk by the time the event is handled.
        std::fs::remove_dir(root.join("sub")).unwrap();
        let renamed = FileEvent::new(root.join("sub"), FileOp::Rename);
        watcher.handle_file_event(&mut backend, &renamed).unwrap();

        assert!(!watcher.is_watching(&root.join("sub")));
        assert!(watcher.is_watching(&root));
        assert_eq!(backend.unwatched, vec![root.join("sub").into_std_path_buf()]);
        assert_eq!(*removes.lock(), vec![root.join("sub").to_string()]);
        assert!(writes.lock().is_empty());
    }

    #[test]
    fn test_masks_filter_callbacks() {
        let (_guard, root) = tempdir();
        let (options, writes, _) =
            recording(WatchOptions::new().with_path(&root).with_masks(["**/*.yaml"]));
        let mut watcher = Watcher::new(options).unwrap();
        let mut backend = Recorder::default();
        watcher.register_roots(&mut backend).unwrap();

        watcher
            .handle_file_event(&mut backend, &write_event(&root.join("notes.txt")))
            .unwrap();
        watcher
            .handle_file_event(&mut backend, &write_event(&root.join("a/b/c.yaml")))
            .unwrap();

        assert_eq!(*writes.lock(), vec![root.join("a/b/c.yaml").to_string()]);
    }

    #[test]
    fn test_vanished_create_is_benign() {
        let (_guard, root) = tempdir();
        let (options, writes, _) = recording(WatchOptions::new().with_path(&root));
        let mut watcher = Watcher::new(options).unwrap();
        let mut backend = Recorder::default();
        watcher.register_roots(&mut backend).unwrap();

        let ghost = FileEvent::new(root.join("ghost.json"), FileOp::Create);
        watcher.handle_file_event(&mut backend, &ghost).unwrap();
        assert!(writes.lock().is_empty());
    }

    #[test]
    fn test_callback_errors_respect_break_on_error() {
        let (_guard, root) = tempdir();
        let failing = |p: &Utf8Path| -> anyhow::Result<()> { anyhow::bail!("cannot load {p}") };

        let event = notify::Event::new(notify::EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(root.join("a.json").into_std_path_buf());

        let mut lenient = Watcher::new(WatchOptions::new().with_path(&root).on_write(failing)).unwrap();
        let mut backend = Recorder::default();
        lenient.register_roots(&mut backend).unwrap();
        assert!(lenient.process(&mut backend, event.clone()).is_ok());

        let mut strict = Watcher::new(
            WatchOptions::new()
                .with_path(&root)
                .on_write(failing)
                .break_on_error(true),
        )
        .unwrap();
        strict.register_roots(&mut backend).unwrap();
        let err = strict.process(&mut backend, event).unwrap_err();
        assert!(matches!(err, WatchError::Callback { .. }));
    }

    #[tokio::test]
    async fn test_blocking_runs_inline_on_current_thread() {
        let value = tokio::spawn(async { blocking(|| 7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocking_yields_worker_on_multi_thread() {
        let (_guard, root) = tempdir();
        std::fs::write(root.join("a.json"), "{}").unwrap();
        let file = root.join("a.json");
        let len = tokio::spawn(async move { blocking(|| std::fs::metadata(file).unwrap().len()) })
            .await
            .unwrap();
        assert_eq!(len, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_returns_cancelled() {
        let (_guard, root) = tempdir();
        let mut watcher = Watcher::new(WatchOptions::new().with_path(&root).on_write(|_| Ok(()))).unwrap();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move { watcher.run(&token).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(WatchError::Cancelled)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_dispatches_real_writes() {
        let (_guard, root) = tempdir();
        let (options, writes, _) =
            recording(WatchOptions::new().with_path(&root).with_masks(["*.json"]));
        let mut watcher = Watcher::new(options).unwrap();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move { watcher.run(&token).await });

        let target = root.join("cmd.json");
        let mut seen = false;
        for i in 0..50 {
            std::fs::write(root.join("ignored.txt"), format!("{i}")).unwrap();
            std::fs::write(&target, format!("{{\"n\": {i}}}")).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            if writes.lock().iter().any(|p| p == target.as_str()) {
                seen = true;
                break;
            }
        }

        cancel.cancel();
        let _ = handle.await.unwrap();
        assert!(seen, "write callback never fired");
        assert!(writes.lock().iter().all(|p| p.ends_with(".json")));
    }
}

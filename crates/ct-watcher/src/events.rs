//! Classified file events.
//!
//! notify reports a rich [`EventKind`]; the watch loop only cares about four
//! operations. Renames are reported on the old path (the entry left that
//! name) and the new path shows up as a create.

use std::path::PathBuf;

use camino::Utf8PathBuf;
use notify::event::{EventKind, ModifyKind, RenameMode};
use smallvec::SmallVec;

/// The operation a [`FileEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileOp {
    /// A new entry appeared.
    Create,
    /// File contents changed.
    Write,
    /// The entry was deleted.
    Remove,
    /// The entry moved away from this path.
    Rename,
}

impl FileOp {
    /// Create and write events trigger the write callback.
    #[inline]
    #[must_use]
    pub const fn is_write_class(self) -> bool {
        matches!(self, Self::Create | Self::Write)
    }

    /// Remove and rename events trigger the remove callback.
    #[inline]
    #[must_use]
    pub const fn is_remove_class(self) -> bool {
        matches!(self, Self::Remove | Self::Rename)
    }
}

/// A single path and what happened to it.
///
/// # Examples
///
/// ```
/// use ct_watcher::{FileEvent, FileOp};
/// use camino::Utf8PathBuf;
///
/// let event = FileEvent::new(Utf8PathBuf::from("/srv/cmds/a.json"), FileOp::Write);
/// assert!(event.op.is_write_class());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Path of the affected entry.
    pub path: Utf8PathBuf,

    /// What happened.
    pub op: FileOp,
}

impl FileEvent {
    /// Creates a file event.
    #[inline]
    #[must_use]
    pub const fn new(path: Utf8PathBuf, op: FileOp) -> Self {
        Self { path, op }
    }

    /// Splits a notify event into per-path file events.
    ///
    /// Access and metadata-only events produce nothing. Paths that are not
    /// valid UTF-8 are logged and dropped.
    #[must_use]
    pub fn from_notify(event: notify::Event) -> SmallVec<[Self; 2]> {
        let mut out = SmallVec::new();
        let kind = event.kind;
        let mut paths = event.paths.into_iter();

        match kind {
            EventKind::Create(_) => paths.for_each(|p| push(&mut out, p, FileOp::Create)),
            EventKind::Remove(_) => paths.for_each(|p| push(&mut out, p, FileOp::Remove)),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                paths.for_each(|p| push(&mut out, p, FileOp::Rename));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                paths.for_each(|p| push(&mut out, p, FileOp::Create));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let Some(from) = paths.next() {
                    push(&mut out, from, FileOp::Rename);
                }
                paths.for_each(|p| push(&mut out, p, FileOp::Create));
            }
            // Backends that cannot tell which side of a rename they saw.
            EventKind::Modify(ModifyKind::Name(_)) => paths.for_each(|p| {
                let op = if p.exists() {
                    FileOp::Create
                } else {
                    FileOp::Rename
                };
                push(&mut out, p, op);
            }),
            EventKind::Modify(ModifyKind::Metadata(_))
            | EventKind::Access(_)
            | EventKind::Any
            | EventKind::Other => {}
            EventKind::Modify(_) => paths.for_each(|p| push(&mut out, p, FileOp::Write)),
        }

        out
    }
}

fn push(out: &mut SmallVec<[FileEvent; 2]>, path: PathBuf, op: FileOp) {
    match Utf8PathBuf::try_from(path) {
        Ok(path) => out.push(FileEvent::new(path, op)),
        Err(e) => {
            tracing::warn!(
                path = %e.into_path_buf().display(),
                "Skipping non-UTF-8 path in file event"
            );
        }
    }
}

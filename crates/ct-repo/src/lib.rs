//! Live-reloading command repositories and their composition.
//!
//! # Overview
//!
//! - [`Repository`] owns one command trie, the directories and files it is
//!   loaded from, and a [`Loader`] that parses them. `watch` keeps the trie
//!   in sync with the filesystem.
//! - [`MultiRepository`] mounts independent sources at path prefixes and
//!   routes every query to the mount that owns the path.
//! - [`CommandSource`] is the surface both implement, so compositions nest.
//!
//! # Crate Dependencies
//!
//! ```text
//! ct-cli ──► ct-repo ──► ct-trie ──► ct-core
//!                   └──► ct-watcher ─────►
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ct_core::Directory;
//! use ct_repo::{CommandSource, MultiRepository, NoDocs, Repository};
//! use ct_watcher::WatchOptions;
//! use tokio_util::sync::CancellationToken;
//!
//! # fn loader(
//! #     _root: &camino::Utf8Path,
//! #     _path: &camino::Utf8Path,
//! #     _options: &ct_repo::LoadOptions,
//! # ) -> Result<Vec<ct_core::CommandEntry>, ct_core::LoadError> {
//! #     Ok(Vec::new())
//! # }
//! #[tokio::main]
//! async fn main() -> Result<(), ct_repo::RepositoryError> {
//!     let core = Repository::new("core")
//!         .with_directory(Directory::new("/srv/cmds"))
//!         .with_loader(loader);
//!     core.load_commands(&NoDocs)?;
//!
//!     let multi = MultiRepository::new("all");
//!     multi.mount("/", Arc::new(core));
//!
//!     let cancel = CancellationToken::new();
//!     multi.watch(cancel, WatchOptions::new()).await
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod loader;
mod multi;
mod repository;
mod source;
mod stats;

pub use error::RepositoryError;
pub use loader::{DocLoader, LoadOptions, Loader, NoDocs};
pub use multi::MultiRepository;
pub use repository::{AddResult, CommandCallback, DroppedAlias, Repository};
pub use source::CommandSource;
pub use stats::{RepositoryStats, StatsSnapshot};

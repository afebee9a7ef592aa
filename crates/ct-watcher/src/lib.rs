//! Recursive, mask-filtered file watching with callbacks.
//!
//! # Overview
//!
//! A [`Watcher`] observes a set of files and directories. Directories are
//! watched recursively (new subdirectories are picked up as they appear);
//! single files are watched through their parent with sibling events
//! dropped. Changes that pass the glob masks are handed to the write or
//! remove callback from [`WatchOptions`].
//!
//! # Crate Dependencies
//!
//! ```text
//! ct-cli ──► ct-repo ──► ct-watcher ──► ct-core
//!                    └─► ct-trie ─────►
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use ct_watcher::{WatchOptions, Watcher};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cancel = CancellationToken::new();
//!     let options = WatchOptions::new()
//!         .with_path("/srv/cmds")
//!         .on_write(|path| {
//!             println!("reload {path}");
//!             Ok(())
//!         })
//!         .on_remove(|path| {
//!             println!("drop {path}");
//!             Ok(())
//!         });
//!
//!     let mut watcher = Watcher::new(options)?;
//!     match watcher.run(&cancel).await {
//!         Err(err) if err.is_cancelled() => Ok(()),
//!         other => Ok(other?),
//!     }
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod events;
mod filter;
mod options;
mod watcher;

pub use error::WatchError;
pub use events::{FileEvent, FileOp};
pub use filter::MaskFilter;
pub use options::{WatchCallback, WatchOptions};
pub use watcher::Watcher;

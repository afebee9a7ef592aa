//! Core types, errors, and configuration for cmdtree.
//!
//! This crate provides the foundational types shared across the workspace:
//!
//! - The command model ([`Command`], [`CommandEntry`], [`AliasSpec`]) consumed
//!   by the trie and produced by loaders
//! - Tool projections ([`Tool`], [`ToolPage`]) for external tool discovery
//! - Source configuration ([`Directory`], [`Config`])
//! - Error types ([`ConfigError`], [`LoadError`])
//! - Path segment helpers and `FxHashMap`/`FxHashSet` aliases
//!
//! # Crate Dependencies
//!
//! ```text
//! ct-cli ──► ct-repo ──► ct-trie ──► ct-core
//!                   └──► ct-watcher ─────►
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod path;
pub mod types;

pub use config::{Config, MountConfig, ToolsConfig, WatchConfig};
pub use error::{ConfigError, LoadError};
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
pub use types::{
    AliasCommand, AliasSpec, Command, CommandDef, CommandDescription, CommandEntry, Directory,
    MountedCommand, SharedCommand, Tool, ToolPage,
};

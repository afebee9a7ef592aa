//! Domain types for cmdtree.
//!
//! # Module Organization
//!
//! - [`command`] - The [`Command`] trait and its stock implementations
//! - [`entry`] - Loader output ([`CommandEntry`], [`AliasSpec`])
//! - [`tool`] - Flat tool projection and pagination
//! - [`directory`] - Directory sources
//!
//! All public types are re-exported here and at the crate root.

pub mod command;
pub mod directory;
pub mod entry;
pub mod tool;

pub use command::{
    AliasCommand, Command, CommandDef, CommandDescription, MountedCommand, SharedCommand,
};
pub use directory::Directory;
pub use entry::{AliasSpec, CommandEntry};
pub use tool::{Tool, ToolPage};

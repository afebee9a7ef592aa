//! File formats understood by the CLI.
//!
//! Commands are JSON files, one command or alias per file:
//!
//! ```json
//! { "name": "build", "short": "Build the project", "long": "..." }
//! { "name": "fast", "alias": true }
//! { "name": "b", "alias_for": "tools/build" }
//! ```
//!
//! An alias resolves to the command at its own parent path (`tools/build/fast`
//! aliases `tools/build`); `alias_for` names a target elsewhere and is used
//! when nothing lives there. `name` defaults to the file stem. Subdirectories below the loaded path
//! become parent segments. Documentation is a tree of markdown files whose
//! relative paths (minus `.md`) are the topic names.

use std::collections::BTreeMap;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use ct_core::{AliasSpec, CommandDef, CommandEntry, LoadError};
use ct_repo::{DocLoader, LoadOptions, Loader};
use ignore::WalkBuilder;
use parking_lot::RwLock;
use serde::Deserialize;

const COMMAND_EXTENSION: &str = "json";
const DOC_EXTENSION: &str = "md";

#[derive(Debug, Deserialize)]
struct CommandFile {
    name: Option<String>,
    #[serde(default)]
    short: String,
    long: Option<String>,
    #[serde(default)]
    alias: bool,
    alias_for: Option<String>,
}

/// Loads commands from `*.json` definition files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLoader;

impl Loader for JsonLoader {
    fn load_commands(
        &self,
        _root: &Utf8Path,
        path: &Utf8Path,
        options: &LoadOptions,
    ) -> Result<Vec<CommandEntry>, LoadError> {
        if path.is_file() {
            if path.extension() != Some(COMMAND_EXTENSION) {
                return Ok(Vec::new());
            }
            return load_file(path, options.parents.clone(), &options.source).map(|e| vec![e]);
        }

        walk_files(path, COMMAND_EXTENSION)?
            .into_iter()
            .map(|file| {
                let mut parents = options.parents.clone();
                parents.extend(relative_dirs(path, &file));
                load_file(&file, parents, &options.source)
            })
            .collect()
    }
}

fn load_file(path: &Utf8Path, parents: Vec<String>, source: &str) -> Result<CommandEntry, LoadError> {
    let text =
        std::fs::read_to_string(path.as_std_path()).map_err(|e| LoadError::read(path, e))?;
    let def: CommandFile =
        serde_json::from_str(&text).map_err(|e| LoadError::parse(path, e.to_string()))?;

    let name = def
        .name
        .filter(|n| !n.is_empty())
        .or_else(|| path.file_stem().map(str::to_owned))
        .ok_or_else(|| LoadError::invalid(path, "command has no name"))?;
    if name.contains('/') {
        return Err(LoadError::invalid(path, format!("name {name:?} contains '/'")));
    }

    if let Some(target) = def.alias_for {
        if target.trim_matches('/').is_empty() {
            return Err(LoadError::invalid(path, "alias_for is empty"));
        }
        return Ok(AliasSpec::new(name, parents, &target).into());
    }
    if def.alias {
        if parents.is_empty() {
            return Err(LoadError::invalid(path, "top-level alias needs alias_for"));
        }
        return Ok(AliasSpec::under(name, parents).into());
    }

    let mut cmd = CommandDef::new(name, parents)
        .with_short(def.short)
        .with_source(source);
    if let Some(long) = def.long {
        cmd = cmd.with_long(long);
    }
    Ok(cmd.into())
}

/// Directory segments between `base` and the file's parent.
fn relative_dirs(base: &Utf8Path, file: &Utf8Path) -> Vec<String> {
    file.strip_prefix(base)
        .ok()
        .and_then(Utf8Path::parent)
        .map(|dir| {
            dir.components()
                .filter_map(|c| match c {
                    Utf8Component::Normal(s) => Some(s.to_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Every file under `root` with extension `ext`, sorted by path.
fn walk_files(root: &Utf8Path, ext: &str) -> Result<Vec<Utf8PathBuf>, LoadError> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| LoadError::read(root, std::io::Error::other(e)))?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = Utf8Path::from_path(entry.path())
            .ok_or_else(|| LoadError::NonUtf8Path(entry.path().to_path_buf()))?;
        if path.extension() == Some(ext) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Collects markdown help topics from documentation directories.
#[derive(Debug, Default)]
pub struct MarkdownDocs {
    topics: RwLock<BTreeMap<String, Utf8PathBuf>>,
}

impl MarkdownDocs {
    /// Creates an empty topic index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Topic names in sorted order.
    pub fn topics(&self) -> Vec<String> {
        self.topics.read().keys().cloned().collect()
    }

    /// Reads a topic's markdown, `None` if the topic is unknown.
    pub fn read_topic(&self, topic: &str) -> Result<Option<String>, LoadError> {
        let Some(path) = self.topics.read().get(topic).cloned() else {
            return Ok(None);
        };
        std::fs::read_to_string(path.as_std_path())
            .map(Some)
            .map_err(|e| LoadError::read(path, e))
    }
}

impl DocLoader for MarkdownDocs {
    fn load_docs(&self, root: &Utf8Path) -> Result<(), LoadError> {
        let found: Vec<(String, Utf8PathBuf)> = walk_files(root, DOC_EXTENSION)?
            .into_iter()
            .filter_map(|file| {
                let rel = file.strip_prefix(root).ok()?.with_extension("");
                let topic = rel
                    .components()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join("/");
                Some((topic, file))
            })
            .collect();

        tracing::debug!(docs = %root, topics = found.len(), "Loaded documentation");
        self.topics.write().extend(found);
        Ok(())
    }
}

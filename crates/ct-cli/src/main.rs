//! Command-line interface for cmdtree.
//!
//! Loads command trees from JSON definition files, composes them under
//! mount points, and either answers a query or watches the sources and keeps
//! the composed tree live until interrupted.
//!
//! # Usage
//!
//! ```bash
//! # Print the whole tree from a directory of command files
//! cmdtree --dir ./commands tree
//!
//! # List everything below tools/
//! cmdtree --dir ./commands list tools --recursive
//!
//! # Compose several repositories from a config file and watch them
//! cmdtree --config cmdtree.json watch
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod loader;

use std::io::{self, Write};
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use ct_core::path::{join_path, split_path};
use ct_core::{Command, Config, Directory, MountConfig, SharedCommand};
use ct_repo::{CommandSource, MultiRepository, Repository};
use ct_watcher::WatchOptions;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::loader::{JsonLoader, MarkdownDocs};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Browse and watch live command trees.
#[derive(Parser, Debug)]
#[command(name = "cmdtree", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file describing mounts and watch settings.
    #[arg(short, long, global = true, env = "CMDTREE_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Directory of command files, mounted at `/`. Repeatable.
    #[arg(
        short = 'd',
        long = "dir",
        global = true,
        env = "CMDTREE_DIRS",
        value_delimiter = ','
    )]
    dirs: Vec<Utf8PathBuf>,

    /// Single command file, mounted at `/`. Repeatable.
    #[arg(long = "file", global = true, env = "CMDTREE_FILES", value_delimiter = ',')]
    files: Vec<Utf8PathBuf>,

    /// Glob mask a changed path must match to trigger a reload. Repeatable.
    #[arg(
        short,
        long = "mask",
        global = true,
        env = "CMDTREE_MASKS",
        value_delimiter = ','
    )]
    masks: Vec<String>,

    /// Enable verbose output (debug logging).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the command tree below a path.
    Tree {
        /// Slash-separated path; the root when omitted.
        prefix: Option<String>,
    },

    /// List commands at a path.
    List {
        /// Slash-separated path; the root when omitted.
        prefix: Option<String>,

        /// Include commands in every subdirectory.
        #[arg(short, long)]
        recursive: bool,
    },

    /// Show one command as JSON.
    Get {
        /// Slash-separated full path of the command.
        path: String,
    },

    /// List commands as a flat, paginated tool list (JSON).
    Tools {
        /// Name of the last tool on the previous page.
        #[arg(long)]
        cursor: Option<String>,

        /// Maximum tools per page.
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// List documentation topics, or print one.
    Docs {
        /// Topic to print.
        topic: Option<String>,
    },

    /// Watch all sources and keep the tree live until interrupted.
    Watch,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug level.
/// Color is disabled by `--no-color` or the `NO_COLOR` environment variable.
fn init_tracing(verbose: bool, no_color: bool) {
    let level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},notify=warn,globset=warn")));

    let use_ansi = !no_color && std::env::var_os("NO_COLOR").is_none();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Builds the effective configuration from the config file and flags.
///
/// `--dir` and `--file` add a mount at `/`; `--mask` replaces the configured
/// masks.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("failed to load configuration from {path}"))?,
        None => Config::default(),
    };

    if !cli.dirs.is_empty() || !cli.files.is_empty() {
        config.mounts.push(MountConfig {
            path: "/".to_owned(),
            name: "cli".to_owned(),
            directories: cli.dirs.iter().cloned().map(Directory::new).collect(),
            files: cli.files.clone(),
        });
    }

    if !cli.masks.is_empty() {
        config.watch.masks.clone_from(&cli.masks);
    }

    if config.mounts.is_empty() {
        return Err(eyre!(
            "no command sources; pass --dir, --file or a --config with mounts"
        ));
    }

    config.validate().wrap_err("invalid configuration")?;
    Ok(config)
}

/// Loads one repository per mount and composes them.
///
/// Returns the repositories alongside the composition so their statistics
/// stay reachable.
fn build_tree(
    config: &Config,
    docs: &MarkdownDocs,
) -> color_eyre::Result<(MultiRepository, Vec<Arc<Repository>>)> {
    let multi = MultiRepository::new("cmdtree");
    let mut repos = Vec::with_capacity(config.mounts.len());

    for mount in &config.mounts {
        let repo = Arc::new(
            Repository::from_mount(mount)
                .with_loader(JsonLoader)
                .with_watch_config(config.watch.clone())
                .on_update(log_update)
                .on_remove(log_remove),
        );

        let result = repo
            .load_commands(docs)
            .wrap_err_with(|| format!("failed to load repository {}", mount.name))?;
        info!(
            repository = %mount.name,
            mount = %mount.path,
            commands = result.added.len(),
            dropped_aliases = result.dropped_aliases.len(),
            "Loaded repository"
        );

        let source: Arc<dyn CommandSource> = Arc::<Repository>::clone(&repo);
        let mounted_at = multi.mount(&mount.path, source);
        debug!(repository = %mount.name, mount = %mounted_at, "Mounted repository");
        repos.push(repo);
    }

    Ok((multi, repos))
}

#[allow(clippy::unnecessary_wraps)] // Callback signature requires a Result
fn log_update(cmd: &SharedCommand) -> anyhow::Result<()> {
    debug!(command = %join_path(&cmd.full_path()), "Command updated");
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Callback signature requires a Result
fn log_remove(cmd: &SharedCommand) -> anyhow::Result<()> {
    debug!(command = %join_path(&cmd.full_path()), "Command removed");
    Ok(())
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Prints the render tree below `prefix`.
fn run_tree(multi: &MultiRepository, prefix: Option<&str>) -> color_eyre::Result<()> {
    let segments = split_path(prefix.unwrap_or_default());
    let refs: Vec<&str> = segments.iter().map(String::as_str).collect();

    let node = multi
        .get_render_node(&refs)
        .ok_or_else(|| eyre!("no commands at /{}", segments.join("/")))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write!(handle, "{node}")?;
    Ok(())
}

/// Prints `path<TAB>short` for every command at `prefix`.
fn run_list(
    multi: &MultiRepository,
    prefix: Option<&str>,
    recursive: bool,
) -> color_eyre::Result<()> {
    let segments = split_path(prefix.unwrap_or_default());
    let refs: Vec<&str> = segments.iter().map(String::as_str).collect();

    let mut rows: Vec<(String, String)> = multi
        .collect_commands(&refs, recursive)
        .iter()
        .map(|cmd| {
            let desc = cmd.description();
            (desc.path_string(), desc.short)
        })
        .collect();
    rows.sort();

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for (path, short) in rows {
        writeln!(handle, "{path}\t{short}")?;
    }
    Ok(())
}

/// Prints one command's description as JSON.
fn run_get(multi: &MultiRepository, path: &str) -> color_eyre::Result<()> {
    let cmd = multi
        .get_command(path)
        .ok_or_else(|| eyre!("no command at {path}"))?;
    print_json(&cmd.description())
}

/// Prints one page of the tool list as JSON.
fn run_tools(
    multi: &MultiRepository,
    cursor: Option<&str>,
    page_size: Option<usize>,
) -> color_eyre::Result<()> {
    let page = multi.list_tools(cursor, page_size)?;
    print_json(&page)
}

/// Lists documentation topics, or prints the named topic.
fn run_docs(docs: &MarkdownDocs, topic: Option<&str>) -> color_eyre::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match topic {
        Some(topic) => {
            let text = docs
                .read_topic(topic)?
                .ok_or_else(|| eyre!("no documentation topic {topic}"))?;
            write!(handle, "{text}")?;
        }
        None => {
            for topic in docs.topics() {
                writeln!(handle, "{topic}")?;
            }
        }
    }
    Ok(())
}

/// Watches every mount until Ctrl-C or SIGTERM.
async fn run_watch(multi: &MultiRepository, repos: &[Arc<Repository>]) -> color_eyre::Result<()> {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if let Err(err) = shutdown_signal().await {
            warn!(error = %err, "Failed to listen for shutdown signals");
        }
        trigger.cancel();
    });

    info!(mounts = ?multi.mount_paths(), "Watching for changes (Ctrl-C to stop)");
    let result = multi.watch(cancel, WatchOptions::new()).await;

    for repo in repos {
        let stats = repo.stats().snapshot();
        info!(
            repository = %repo.name(),
            added = stats.added,
            removed = stats.removed,
            reloads = stats.reloads,
            watch_errors = stats.watch_errors,
            "Watch summary"
        );
    }

    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_cancelled() => {
            info!("Stopped watching");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Resolves when the process receives Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json<T: serde::Serialize>(value: &T) -> color_eyre::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}")?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    let config = build_config(&cli)?;
    let docs = MarkdownDocs::new();
    let (multi, repos) = build_tree(&config, &docs)?;

    match &cli.command {
        Commands::Tree { prefix } => run_tree(&multi, prefix.as_deref()),
        Commands::List { prefix, recursive } => run_list(&multi, prefix.as_deref(), *recursive),
        Commands::Get { path } => run_get(&multi, path),
        Commands::Tools { cursor, page_size } => run_tools(
            &multi,
            cursor.as_deref(),
            page_size.or(config.tools.page_size),
        ),
        Commands::Docs { topic } => run_docs(&docs, topic.as_deref()),
        Commands::Watch => run_watch(&multi, &repos).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["cmdtree", "list", "tools", "-r", "--dir", "a,b", "-m", "*.json"]);
        assert_eq!(cli.dirs, vec![Utf8PathBuf::from("a"), Utf8PathBuf::from("b")]);
        assert_eq!(cli.masks, vec!["*.json"]);
        assert!(matches!(
            cli.command,
            Commands::List { recursive: true, ref prefix } if prefix.as_deref() == Some("tools")
        ));
    }

    #[test]
    fn test_build_config_requires_sources() {
        let cli = Cli::parse_from(["cmdtree", "tree"]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn test_build_config_mounts_dirs_at_root() {
        let tmp = TempDir::new().unwrap();
        let dir = utf8(&tmp);
        let cli = Cli::parse_from(["cmdtree", "tree", "--dir", dir.as_str(), "--mask", "**/*.json"]);

        let config = build_config(&cli).unwrap();
        assert_eq!(config.mounts.len(), 1);
        assert_eq!(config.mounts[0].path, "/");
        assert_eq!(config.mounts[0].directories[0].fs_root, dir);
        assert_eq!(config.watch.masks, vec!["**/*.json"]);
    }

    #[test]
    fn test_build_tree_composes_mounts() {
        let core = TempDir::new().unwrap();
        let plugins = TempDir::new().unwrap();
        std::fs::write(core.path().join("root-cmd.json"), r#"{"short": "Top"}"#).unwrap();
        std::fs::write(plugins.path().join("hello.json"), r#"{"short": "Hi"}"#).unwrap();

        let config = Config {
            mounts: vec![
                MountConfig {
                    directories: vec![Directory::new(utf8(&core))],
                    ..MountConfig::default()
                },
                MountConfig {
                    path: "plugins".to_owned(),
                    name: "plugins".to_owned(),
                    directories: vec![Directory::new(utf8(&plugins))],
                    ..MountConfig::default()
                },
            ],
            ..Config::default()
        };

        let (multi, repos) = build_tree(&config, &MarkdownDocs::new()).unwrap();
        assert_eq!(repos.len(), 2);
        assert!(multi.get_command("root-cmd").is_some());

        let hello = multi.get_command("plugins/hello").unwrap();
        assert_eq!(hello.full_path(), vec!["plugins", "hello"]);

        let tools = multi.list_tools(None, None).unwrap();
        let names: Vec<&str> = tools.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["plugins/hello", "root-cmd"]);
    }
}

//! Slash-separated command path helpers.
//!
//! Commands are addressed by path segments (`["tools", "build"]`) internally
//! and by slash-joined strings (`"tools/build"`) at the edges. Mount points
//! use a normalized absolute form (`"/plugins"`).
//!
//! # Examples
//!
//! ```
//! use ct_core::path::{normalize_mount_path, split_path};
//!
//! assert_eq!(split_path("/tools//build/"), vec!["tools", "build"]);
//! assert_eq!(normalize_mount_path("plugins/./extra/../"), "/plugins");
//! assert_eq!(normalize_mount_path(""), "/");
//! ```

/// Splits a slash-separated path into its non-empty segments.
///
/// Empty segments and `.` are dropped; `..` is kept verbatim since command
/// paths are not filesystem paths.
#[must_use]
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(str::to_owned)
        .collect()
}

/// Joins path segments with `/`.
#[must_use]
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        out.push_str(segment.as_ref());
    }
    out
}

/// Cleans a mount path into its canonical absolute form.
///
/// The result always starts with `/`, never ends with `/` (except the root
/// itself), and has `.`/`..`/empty segments resolved lexically. `..` above
/// the root is discarded.
#[must_use]
pub fn normalize_mount_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Returns the segments of a mount path after normalization.
#[must_use]
pub fn mount_segments(path: &str) -> Vec<String> {
    split_path(&normalize_mount_path(path))
}

/// Returns `true` if `prefix` is a component-wise prefix of `path`.
#[must_use]
pub fn has_prefix<A: AsRef<str>, B: AsRef<str>>(path: &[A], prefix: &[B]) -> bool {
    prefix.len() <= path.len()
        && prefix
            .iter()
            .zip(path)
            .all(|(p, s)| p.as_ref() == s.as_ref())
}

/// Concatenates a prefix and a path into an owned segment list.
#[must_use]
pub fn prefixed<A: AsRef<str>, B: AsRef<str>>(prefix: &[A], path: &[B]) -> Vec<String> {
    prefix
        .iter()
        .map(|s| s.as_ref().to_owned())
        .chain(path.iter().map(|s| s.as_ref().to_owned()))
        .collect()
}

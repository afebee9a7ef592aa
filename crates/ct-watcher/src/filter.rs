//! Glob mask filtering for watch events.
//!
//! Masks use `glob` syntax with `*` confined to a single path component and
//! `**` spanning directories. A path passes if any mask matches either its
//! path relative to the watch root or its absolute path. An empty mask list
//! passes everything.
//!
//! # Examples
//!
//! ```
//! use ct_watcher::MaskFilter;
//! use camino::Utf8Path;
//!
//! let filter = MaskFilter::new(["**/*.yaml"]).unwrap();
//! let root = Utf8Path::new("/srv/cmds");
//!
//! assert!(filter.matches(Utf8Path::new("/srv/cmds/a/b/c.yaml"), Some(root)));
//! assert!(!filter.matches(Utf8Path::new("/srv/cmds/notes.txt"), Some(root)));
//! ```

use camino::Utf8Path;
use glob::{MatchOptions, Pattern};

use crate::error::WatchError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled set of glob masks.
#[derive(Debug, Clone, Default)]
pub struct MaskFilter {
    patterns: Vec<Pattern>,
}

impl MaskFilter {
    /// Compiles masks.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidMask`] for the first mask that is not a
    /// valid glob.
    pub fn new<I, S>(masks: I) -> Result<Self, WatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = masks
            .into_iter()
            .map(|mask| {
                let mask = mask.as_ref();
                Pattern::new(mask).map_err(|e| WatchError::invalid_mask(mask, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns `true` if no masks are configured.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns the number of masks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Tests `path` against the masks.
    ///
    /// `root` is the watch root the path belongs to; when given, the path
    /// relative to it is tried before the absolute path.
    #[must_use]
    pub fn matches(&self, path: &Utf8Path, root: Option<&Utf8Path>) -> bool {
        if self.patterns.is_empty() {
            return true;
        }

        let relative = root
            .and_then(|root| path.strip_prefix(root).ok())
            .filter(|rel| !rel.as_str().is_empty());

        self.patterns.iter().any(|pattern| {
            relative.is_some_and(|rel| pattern.matches_with(rel.as_str(), MATCH_OPTIONS))
                || pattern.matches_with(path.as_str(), MATCH_OPTIONS)
        })
    }
}

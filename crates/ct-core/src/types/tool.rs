//! Flat tool projection of commands.
//!
//! External tool-discovery integrations want a flat `{name, description}`
//! list rather than a tree. [`ToolPage`] carries one cursor-paginated slice
//! of that list.

use serde::{Deserialize, Serialize};

use crate::types::command::CommandDescription;

/// A command projected for tool discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tool {
    /// Full command path joined with `/`.
    pub name: String,

    /// One-line summary of the command.
    pub description: String,
}

impl Tool {
    /// Creates a tool entry.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Returns the tool with `prefix/` prepended to its name.
    #[must_use]
    pub fn prefixed(mut self, prefix: &str) -> Self {
        if !prefix.is_empty() {
            self.name = format!("{prefix}/{}", self.name);
        }
        self
    }
}

impl From<CommandDescription> for Tool {
    fn from(desc: CommandDescription) -> Self {
        Self {
            name: desc.path_string(),
            description: desc.short,
        }
    }
}

/// One page of a name-sorted tool listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPage {
    /// Tools on this page.
    pub tools: Vec<Tool>,

    /// Cursor for the next page, `None` when this is the last one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl ToolPage {
    /// Sorts `tools` by name and returns the page following `cursor`.
    ///
    /// The cursor is the name of the last tool on the previous page. A
    /// `page_size` of `None` returns everything after the cursor. Tools
    /// sharing a name are never split across pages, so a page may run past
    /// `page_size` to keep them together.
    ///
    /// # Examples
    ///
    /// ```
    /// use ct_core::{Tool, ToolPage};
    ///
    /// let tools = vec![Tool::new("c", ""), Tool::new("a", ""), Tool::new("b", "")];
    /// let first = ToolPage::paginate(tools.clone(), None, Some(2));
    /// assert_eq!(first.next_cursor.as_deref(), Some("b"));
    ///
    /// let second = ToolPage::paginate(tools, first.next_cursor.as_deref(), Some(2));
    /// assert_eq!(second.tools, vec![Tool::new("c", "")]);
    /// assert!(second.next_cursor.is_none());
    /// ```
    #[must_use]
    pub fn paginate(mut tools: Vec<Tool>, cursor: Option<&str>, page_size: Option<usize>) -> Self {
        tools.sort_by(|a, b| a.name.cmp(&b.name));

        let start = cursor.map_or(0, |c| tools.partition_point(|t| t.name.as_str() <= c));
        let mut rest = tools.split_off(start);

        let next_cursor = match page_size {
            Some(size) if size > 0 && rest.len() > size => {
                let last = rest[size - 1].name.clone();
                let end = size + rest[size..].iter().take_while(|t| t.name == last).count();
                let more = end < rest.len();
                rest.truncate(end);
                more.then_some(last)
            }
            _ => None,
        };

        Self {
            tools: rest,
            next_cursor,
        }
    }
}

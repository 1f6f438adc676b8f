//! Allow-listed command table
//!
//! Maps a short keyword to one literal shell command. Entries never take
//! caller arguments, so the command that runs is always exactly the one
//! written in configuration.

use std::collections::HashMap;

use crate::error::{BridgeError, Result};

/// Keyword of the built-in log retrieval command
pub const GETLOG_KEYWORD: &str = "getlog";

/// Keyword of the built-in script pipeline command
pub const RUNSCRIPT_KEYWORD: &str = "runscript";

/// Read-only keyword -> shell command table
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: HashMap<String, String>,
}

impl AllowList {
    #[must_use]
    pub const fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Look up the shell command for `keyword`
    ///
    /// # Errors
    ///
    /// Returns `CommandNotAllowed` naming the keyword when it is not listed.
    pub fn lookup(&self, keyword: &str) -> Result<&str> {
        self.entries
            .get(keyword)
            .map(String::as_str)
            .ok_or_else(|| BridgeError::CommandNotAllowed {
                keyword: keyword.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.contains_key(keyword)
    }

    /// Keywords in alphabetical order
    #[must_use]
    pub fn keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keywords.sort_unstable();
        keywords
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for AllowList {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

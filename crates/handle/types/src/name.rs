//! Handle names
//!
//! A handle name is `prefix/suffix`. The prefix is everything before the
//! first `/`; the suffix may itself contain further separators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a handle, e.g. `10876/test-001`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleName(String);

impl HandleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn from_parts(prefix: &str, suffix: &str) -> Self {
        Self(format!("{}/{}", prefix, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Everything before the first `/`, or the whole name when there is none.
    pub fn prefix(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(prefix, _)| prefix)
    }

    /// Everything after the first `/`.
    pub fn suffix(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, suffix)| suffix)
    }

    /// True when no suffix has been assigned yet.
    pub fn is_prefix_only(&self) -> bool {
        !self.0.contains('/')
    }

    /// True when the name has at least one `/` that is not its final character.
    pub fn is_proper(&self) -> bool {
        let len = self.0.len();
        self.0
            .char_indices()
            .any(|(pos, c)| c == '/' && pos + 1 < len)
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.prefix() == prefix
    }
}

impl fmt::Display for HandleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandleName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for HandleName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for HandleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

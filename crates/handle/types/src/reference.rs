//! Request references
//!
//! A request path names a handle and, for some operations, a value index
//! written in front of the name: `index:prefix/suffix`.

use crate::name::HandleName;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("no handle given")]
    Empty,

    #[error("handle '{0}' has an empty prefix")]
    EmptyPrefix(String),

    #[error("invalid handle index: '{0}'")]
    InvalidIndex(String),

    #[error("value indexes not allowed for this operation")]
    IndexNotAllowed,
}

/// A handle plus the value indexes a request addresses (possibly none)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    handle: HandleName,
    indexes: Vec<u32>,
}

impl Reference {
    pub fn new(handle: impl Into<HandleName>, indexes: Vec<u32>) -> Self {
        Self {
            handle: handle.into(),
            indexes,
        }
    }

    /// Parse a request path segment.
    ///
    /// One leading `/` is stripped. A `:` that appears before the first `/`
    /// separates a single value index from the handle name; `allow_indexes`
    /// decides whether the current operation accepts one.
    pub fn parse(segment: &str, allow_indexes: bool) -> Result<Self, ReferenceError> {
        let segment = segment.strip_prefix('/').unwrap_or(segment);
        if segment.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let mut indexes = Vec::new();
        let mut name = segment;

        if let (Some(colon), Some(slash)) = (segment.find(':'), segment.find('/')) {
            if colon < slash {
                if !allow_indexes {
                    return Err(ReferenceError::IndexNotAllowed);
                }
                let raw = &segment[..colon];
                let index = raw
                    .parse::<u32>()
                    .map_err(|_| ReferenceError::InvalidIndex(raw.to_string()))?;
                indexes.push(index);
                name = &segment[colon + 1..];
            }
        }

        if name.is_empty() {
            return Err(ReferenceError::Empty);
        }
        if name.starts_with('/') {
            return Err(ReferenceError::EmptyPrefix(name.to_string()));
        }

        Ok(Self {
            handle: HandleName::new(name),
            indexes,
        })
    }

    pub fn handle(&self) -> &HandleName {
        &self.handle
    }

    pub fn indexes(&self) -> &[u32] {
        &self.indexes
    }

    pub fn has_indexes(&self) -> bool {
        !self.indexes.is_empty()
    }

    pub fn into_handle(self) -> HandleName {
        self.handle
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.indexes.as_slice() {
            [] => write!(f, "{}", self.handle),
            [index] => write!(f, "{}:{}", index, self.handle),
            _ => write!(f, "[...]:{}", self.handle),
        }
    }
}

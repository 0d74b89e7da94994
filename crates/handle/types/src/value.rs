//! Value records attached to a handle
//!
//! Only `type` carries meaning for the mutation rules: an `HS_ADMIN` value
//! grants administrative authority over its handle. Timestamp, TTL and
//! permissions are carried through untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Type tag of administrative values
pub const HS_ADMIN: &str = "HS_ADMIN";

/// Types whose data is binary rather than text
pub const BINARY_TYPES: [&str; 4] = [HS_ADMIN, "HS_SITE", "HS_VLIST", "HS_PUBKEY"];

/// Default time-to-live of a value, in seconds
pub const DEFAULT_TTL_SECS: u32 = 86_400;

pub fn is_binary_type(value_type: &str) -> bool {
    BINARY_TYPES.contains(&value_type)
}

/// Number of `HS_ADMIN` records in a value set
pub fn count_admins(values: &[ValueRecord]) -> usize {
    values.iter().filter(|v| v.is_admin()).count()
}

/// Read/write permissions of a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions {
    pub admin_read: bool,
    pub admin_write: bool,
    pub public_read: bool,
    pub public_write: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            admin_read: true,
            admin_write: true,
            public_read: true,
            public_write: false,
        }
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            flag(self.admin_read, 'r'),
            flag(self.admin_write, 'w'),
            flag(self.public_read, 'r'),
            flag(self.public_write, 'w'),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid permission string '{0}', expected four characters like 'rwr-'")]
pub struct PermissionsParseError(pub String);

impl FromStr for Permissions {
    type Err = PermissionsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 4 {
            return Err(PermissionsParseError(s.to_string()));
        }

        let flag = |c: char, expected: char| match c {
            c if c == expected => Ok(true),
            '-' => Ok(false),
            _ => Err(PermissionsParseError(s.to_string())),
        };

        Ok(Self {
            admin_read: flag(chars[0], 'r')?,
            admin_write: flag(chars[1], 'w')?,
            public_read: flag(chars[2], 'r')?,
            public_write: flag(chars[3], 'w')?,
        })
    }
}

/// Time-to-live of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "seconds", rename_all = "lowercase")]
pub enum Ttl {
    /// Seconds a resolver may cache the value
    Relative(u32),
    /// Expiry as seconds since the Unix epoch
    Absolute(u32),
}

impl Ttl {
    pub fn seconds(&self) -> u32 {
        match self {
            Ttl::Relative(secs) | Ttl::Absolute(secs) => *secs,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Ttl::Relative(_) => "relative",
            Ttl::Absolute(_) => "absolute",
        }
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Ttl::Relative(DEFAULT_TTL_SECS)
    }
}

/// One indexed value attached to a handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub index: u32,
    #[serde(rename = "type")]
    pub value_type: String,
    pub data: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ttl: Ttl,
    #[serde(default)]
    pub permissions: Permissions,
}

impl ValueRecord {
    pub fn new(index: u32, value_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            index,
            value_type: value_type.into(),
            data: data.into(),
            timestamp: Utc::now(),
            ttl: Ttl::default(),
            permissions: Permissions::default(),
        }
    }

    /// Empty type and empty data: a request to delete the value at `index`
    pub fn tombstone(index: u32) -> Self {
        Self::new(index, "", Vec::new())
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.value_type == HS_ADMIN
    }

    pub fn is_tombstone(&self) -> bool {
        self.value_type.is_empty() && self.data.is_empty()
    }

    pub fn is_binary(&self) -> bool {
        is_binary_type(&self.value_type)
    }

    pub fn data_as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

impl fmt::Display for ValueRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_binary() {
            write!(f, "{}:{}<{} bytes>", self.index, self.value_type, self.data.len())
        } else {
            write!(f, "{}:{}={}", self.index, self.value_type, self.data_as_text())
        }
    }
}

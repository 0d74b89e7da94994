//! Administrative values
//!
//! `HS_ADMIN` data is binary: a 2-byte permission mask, the admin handle as
//! a 4-byte length-prefixed string, then the 4-byte index of the admin's key
//! value. All integers are big-endian.

use crate::name::HandleName;
use crate::value::{Permissions, ValueRecord, HS_ADMIN};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PERM_ADD_HANDLE: u16 = 0x0001;
pub const PERM_DELETE_HANDLE: u16 = 0x0002;
pub const PERM_MODIFY_VALUE: u16 = 0x0010;
pub const PERM_REMOVE_VALUE: u16 = 0x0020;
pub const PERM_ADD_VALUE: u16 = 0x0040;
pub const PERM_READ_VALUE: u16 = 0x0080;
pub const PERM_ADD_ADMIN: u16 = 0x0100;
pub const PERM_REMOVE_ADMIN: u16 = 0x0200;
pub const PERM_MODIFY_ADMIN: u16 = 0x0400;
pub const PERM_ALL: u16 = 0x0FFF;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminRecordError {
    #[error("admin record truncated: needed {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("admin handle is not valid UTF-8")]
    InvalidHandle,

    #[error("{0} trailing bytes after admin record")]
    TrailingBytes(usize),
}

/// Decoded payload of an `HS_ADMIN` value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub permissions: u16,
    pub admin_handle: HandleName,
    pub admin_index: u32,
}

impl AdminRecord {
    pub fn encode(&self) -> Vec<u8> {
        let handle = self.admin_handle.as_str().as_bytes();
        let mut out = Vec::with_capacity(2 + 4 + handle.len() + 4);
        out.extend_from_slice(&self.permissions.to_be_bytes());
        out.extend_from_slice(&(handle.len() as u32).to_be_bytes());
        out.extend_from_slice(handle);
        out.extend_from_slice(&self.admin_index.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, AdminRecordError> {
        let mut cursor = Cursor { bytes, pos: 0 };
        let permissions = u16::from_be_bytes(cursor.take::<2>()?);
        let handle_len = u32::from_be_bytes(cursor.take::<4>()?) as usize;
        let handle = cursor.take_slice(handle_len)?;
        let admin_handle = std::str::from_utf8(handle)
            .map_err(|_| AdminRecordError::InvalidHandle)?
            .to_string();
        let admin_index = u32::from_be_bytes(cursor.take::<4>()?);

        let rest = bytes.len() - cursor.pos;
        if rest > 0 {
            return Err(AdminRecordError::TrailingBytes(rest));
        }

        Ok(Self {
            permissions,
            admin_handle: HandleName::new(admin_handle),
            admin_index,
        })
    }

    pub fn has_permission(&self, permission: u16) -> bool {
        self.permissions & permission == permission
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], AdminRecordError> {
        let end = self.pos + len;
        if end > self.bytes.len() {
            return Err(AdminRecordError::Truncated {
                needed: end,
                actual: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], AdminRecordError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take_slice(N)?);
        Ok(buf)
    }
}

/// The identity the service acts as when it synthesizes admin values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    /// Handle holding the administrator's public key, e.g. `0.NA/10876`
    pub handle: HandleName,
    /// Index of the key value within that handle
    pub key_index: u32,
}

impl AdminIdentity {
    pub fn new(handle: impl Into<HandleName>, key_index: u32) -> Self {
        Self {
            handle: handle.into(),
            key_index,
        }
    }

    pub fn admin_record(&self, permissions: u16) -> AdminRecord {
        AdminRecord {
            permissions,
            admin_handle: self.handle.clone(),
            admin_index: self.key_index,
        }
    }

    /// Build an `HS_ADMIN` value at `index` naming this identity
    pub fn admin_value(&self, index: u32, permissions: u16) -> ValueRecord {
        ValueRecord::new(index, HS_ADMIN, self.admin_record(permissions).encode())
            .with_permissions(Permissions::default())
    }
}

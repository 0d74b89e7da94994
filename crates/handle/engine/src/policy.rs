//! Administrative identity used when the engine has to mint an admin value

use handle_types::admin::PERM_ALL;
use handle_types::{AdminIdentity, ValueRecord};

/// How synthesized `HS_ADMIN` values look
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPolicy {
    pub identity: AdminIdentity,
    /// Preferred index of a synthesized admin value
    pub default_index: u32,
    /// Permission mask written into the admin record
    pub permissions: u16,
}

impl AdminPolicy {
    pub const DEFAULT_INDEX: u32 = 100;

    pub fn new(identity: AdminIdentity) -> Self {
        Self {
            identity,
            default_index: Self::DEFAULT_INDEX,
            permissions: PERM_ALL,
        }
    }

    pub fn with_default_index(mut self, index: u32) -> Self {
        self.default_index = index;
        self
    }

    pub fn with_permissions(mut self, permissions: u16) -> Self {
        self.permissions = permissions;
        self
    }

    /// Admin value at the first index at or above the default that `taken`
    /// does not use.
    pub fn admin_value(&self, taken: &[ValueRecord]) -> ValueRecord {
        let index = (self.default_index..=u32::MAX)
            .find(|candidate| taken.iter().all(|v| v.index != *candidate))
            .unwrap_or(self.default_index);
        self.identity.admin_value(index, self.permissions)
    }
}

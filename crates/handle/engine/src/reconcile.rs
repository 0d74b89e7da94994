//! Reconciliation of a handle's current value set with a requested one
//!
//! Planning is pure: it looks at the current records and the request and
//! produces the add/update/delete sets to hand to the identifier service.
//! The admin invariant is checked over the planned result before anything
//! is applied, so a rejected plan never touches the service.
//!
//! Applying a plan is a sequence of up to three service calls. When a later
//! call fails, the calls that already went through are reversed.

use crate::codec::{CodecError, Position};
use crate::error::{EngineError, EngineResult};
use crate::policy::AdminPolicy;
use crate::service::{HandleService, ServiceResult};
use handle_types::{count_admins, HandleName, ValueRecord};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, error, warn};

/// How a requested value set relates to the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Full overwrite of the non-admin values
    Replace,
    /// Per-index add, update, or delete
    Merge,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Replace => f.write_str("replace"),
            Mode::Merge => f.write_str("merge"),
        }
    }
}

/// Order in which the three sets of a [`ChangeSet`] reach the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOrder {
    /// Delete, then add, then update. Frees indexes before they are reused
    /// and lands new admins before a retained admin index is overwritten.
    DeleteAddUpdate,
    /// Add, then update, then delete. New admins land before old ones go.
    AddUpdateDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Update,
    Add,
    Delete,
}

impl ApplyOrder {
    fn steps(self) -> [Step; 3] {
        match self {
            ApplyOrder::DeleteAddUpdate => [Step::Delete, Step::Add, Step::Update],
            ApplyOrder::AddUpdateDelete => [Step::Add, Step::Update, Step::Delete],
        }
    }
}

/// Disjoint modifications of an existing handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// New contents for indexes that are currently taken
    pub updates: Vec<ValueRecord>,
    /// Values for indexes that are currently free
    pub adds: Vec<ValueRecord>,
    /// Current records that will be removed
    pub deletes: Vec<ValueRecord>,
    /// Current records that `updates` overwrite, kept for compensation
    pub previous: Vec<ValueRecord>,
    pub order: ApplyOrder,
}

impl ChangeSet {
    fn new(order: ApplyOrder) -> Self {
        Self {
            updates: Vec::new(),
            adds: Vec::new(),
            deletes: Vec::new(),
            previous: Vec::new(),
            order,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.adds.is_empty() && self.deletes.is_empty()
    }

    pub fn delete_indexes(&self) -> Vec<u32> {
        self.deletes.iter().map(|v| v.index).collect()
    }

    fn touches(&self, step: Step) -> bool {
        match step {
            Step::Update => !self.updates.is_empty(),
            Step::Add => !self.adds.is_empty(),
            Step::Delete => !self.deletes.is_empty(),
        }
    }
}

/// What has to happen to bring a handle to its requested state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// The handle is absent and gets created with these values
    Create(Vec<ValueRecord>),
    /// The handle exists and is modified in place
    Modify(ChangeSet),
}

/// Plan a full overwrite.
///
/// An absent handle is created with the requested values plus a synthesized
/// admin value when none was requested. On a present handle every non-admin
/// value is deleted and the requested values are added; existing admin
/// values stay unless a requested value takes over their index.
pub fn plan_replace(
    current: Option<&[ValueRecord]>,
    requested: Vec<ValueRecord>,
    admin: &AdminPolicy,
) -> EngineResult<Plan> {
    if let Some(pos) = requested.iter().position(ValueRecord::is_tombstone) {
        return Err(EngineError::ValueSetParse(CodecError::at(
            Position::Element(pos),
            "a value with empty type and data is only allowed when merging",
        )));
    }

    let Some(current) = current else {
        let mut values = requested;
        if count_admins(&values) == 0 {
            let synthesized = admin.admin_value(&values);
            debug!(index = synthesized.index, "Synthesizing default admin value");
            values.push(synthesized);
        }
        return Ok(Plan::Create(values));
    };

    let mut changes = ChangeSet::new(ApplyOrder::DeleteAddUpdate);
    changes.deletes = current.iter().filter(|v| !v.is_admin()).cloned().collect();

    for record in requested {
        match current
            .iter()
            .find(|v| v.is_admin() && v.index == record.index)
        {
            Some(old) => {
                changes.previous.push(old.clone());
                changes.updates.push(record);
            }
            None => changes.adds.push(record),
        }
    }

    let untouched_admins = current
        .iter()
        .filter(|v| v.is_admin() && !changes.previous.iter().any(|p| p.index == v.index))
        .count();
    let remaining = untouched_admins + count_admins(&changes.updates) + count_admins(&changes.adds);
    if remaining == 0 {
        return Err(EngineError::InvariantViolation(
            "replacement would leave the handle without an HS_ADMIN value".to_string(),
        ));
    }

    Ok(Plan::Modify(changes))
}

/// Plan a partial modification of an existing handle.
///
/// Tombstones delete the value at their index, or do nothing when the index
/// is free. Other values update a taken index or add a free one.
pub fn plan_merge(
    handle: &HandleName,
    current: Option<&[ValueRecord]>,
    requested: Vec<ValueRecord>,
) -> EngineResult<ChangeSet> {
    let current = current
        .ok_or_else(|| EngineError::NotFound(format!("handle {} does not exist", handle)))?;

    let mut changes = ChangeSet::new(ApplyOrder::AddUpdateDelete);
    let mut gained = 0usize;
    let mut lost = 0usize;

    for record in requested {
        let existing = current.iter().find(|v| v.index == record.index);
        match (record.is_tombstone(), existing) {
            (true, Some(old)) => {
                if old.is_admin() {
                    lost += 1;
                }
                changes.deletes.push(old.clone());
            }
            (true, None) => {}
            (false, Some(old)) => {
                if old.is_admin() {
                    lost += 1;
                }
                if record.is_admin() {
                    gained += 1;
                }
                changes.previous.push(old.clone());
                changes.updates.push(record);
            }
            (false, None) => {
                if record.is_admin() {
                    gained += 1;
                }
                changes.adds.push(record);
            }
        }
    }

    check_admins_remain(handle, count_admins(current) + gained, lost)?;
    Ok(changes)
}

/// Plan the removal of specific indexes from an existing handle.
pub fn plan_delete_indexes(
    handle: &HandleName,
    current: &[ValueRecord],
    indexes: &[u32],
) -> EngineResult<ChangeSet> {
    let mut changes = ChangeSet::new(ApplyOrder::AddUpdateDelete);
    let mut lost = 0usize;

    for index in indexes.iter().copied().collect::<BTreeSet<u32>>() {
        let old = current.iter().find(|v| v.index == index).ok_or_else(|| {
            EngineError::NotFound(format!("index {} of handle {} does not exist", index, handle))
        })?;
        if old.is_admin() {
            lost += 1;
        }
        changes.deletes.push(old.clone());
    }

    check_admins_remain(handle, count_admins(current), lost)?;
    Ok(changes)
}

fn check_admins_remain(handle: &HandleName, available: usize, lost: usize) -> EngineResult<()> {
    if available <= lost {
        return Err(EngineError::InvariantViolation(format!(
            "handle {} must keep at least one HS_ADMIN value",
            handle
        )));
    }
    Ok(())
}

/// Send a plan to the identifier service.
pub async fn apply(service: &dyn HandleService, handle: &HandleName, plan: &Plan) -> EngineResult<()> {
    match plan {
        Plan::Create(values) => {
            service.create_handle(handle, values).await?;
            Ok(())
        }
        Plan::Modify(changes) => apply_changes(service, handle, changes).await,
    }
}

async fn apply_changes(
    service: &dyn HandleService,
    handle: &HandleName,
    changes: &ChangeSet,
) -> EngineResult<()> {
    debug!(
        handle = %handle,
        updates = changes.updates.len(),
        adds = changes.adds.len(),
        deletes = changes.deletes.len(),
        "Applying change set"
    );

    let mut done = Vec::with_capacity(3);
    for step in changes.order.steps() {
        if !changes.touches(step) {
            continue;
        }
        if let Err(err) = run_step(service, handle, changes, step).await {
            error!(handle = %handle, step = ?step, error = %err, "Identifier service rejected change");
            for applied in done.iter().rev() {
                if let Err(undo_err) = undo_step(service, handle, changes, *applied).await {
                    warn!(handle = %handle, step = ?applied, error = %undo_err, "Compensation failed");
                }
            }
            return Err(err.into());
        }
        done.push(step);
    }
    Ok(())
}

async fn run_step(
    service: &dyn HandleService,
    handle: &HandleName,
    changes: &ChangeSet,
    step: Step,
) -> ServiceResult<()> {
    match step {
        Step::Update => service.update_values(handle, &changes.updates).await,
        Step::Add => service.add_values(handle, &changes.adds).await,
        Step::Delete => service.delete_values(handle, &changes.delete_indexes()).await,
    }
}

async fn undo_step(
    service: &dyn HandleService,
    handle: &HandleName,
    changes: &ChangeSet,
    step: Step,
) -> ServiceResult<()> {
    match step {
        Step::Update => service.update_values(handle, &changes.previous).await,
        Step::Add => {
            let added: Vec<u32> = changes.adds.iter().map(|v| v.index).collect();
            service.delete_values(handle, &added).await
        }
        Step::Delete => service.add_values(handle, &changes.deletes).await,
    }
}

//! Existence preconditions around create-or-replace

use crate::error::{EngineError, EngineResult};
use crate::policy::AdminPolicy;
use crate::reconcile::{apply, plan_replace, Plan};
use crate::service::HandleService;
use handle_types::{HandleName, ValueRecord};
use serde::Serialize;
use tracing::{info, warn};

/// `If-Match: *` / `If-None-Match: *` in engine terms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Preconditions {
    pub must_exist: bool,
    pub must_not_exist: bool,
}

impl Preconditions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn must_not_exist() -> Self {
        Self {
            must_exist: false,
            must_not_exist: true,
        }
    }

    /// Only the `*` wildcard is meaningful; other header values are ignored.
    pub fn from_headers(if_match: Option<&str>, if_none_match: Option<&str>) -> Self {
        let wildcard = |value: Option<&str>| value.is_some_and(|v| v.trim() == "*");
        Self {
            must_exist: wildcard(if_match),
            must_not_exist: wildcard(if_none_match),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.must_exist && !self.must_not_exist
    }

    pub fn check(&self, handle: &HandleName, exists: bool) -> EngineResult<()> {
        if self.must_exist && !exists {
            return Err(EngineError::PreconditionFailed(format!(
                "handle {} does not exist",
                handle
            )));
        }
        if self.must_not_exist && exists {
            return Err(EngineError::PreconditionFailed(format!(
                "handle {} already exists",
                handle
            )));
        }
        Ok(())
    }
}

/// Whether a replace produced a new handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOutcome {
    Created,
    Updated,
}

/// Resolve once, check the preconditions, then plan and apply a replace.
///
/// The caller holds the handle's lock.
pub async fn replace_conditionally(
    service: &dyn HandleService,
    handle: &HandleName,
    values: Vec<ValueRecord>,
    preconditions: Preconditions,
    admin: &AdminPolicy,
) -> EngineResult<MutationOutcome> {
    let current = service.resolve(handle, &[]).await?;

    if let Err(err) = preconditions.check(handle, current.is_some()) {
        warn!(handle = %handle, error = %err, "Replace rejected");
        return Err(err);
    }

    let plan = plan_replace(current.as_deref(), values, admin)?;
    let outcome = match plan {
        Plan::Create(_) => MutationOutcome::Created,
        Plan::Modify(_) => MutationOutcome::Updated,
    };

    apply(service, handle, &plan).await?;
    info!(handle = %handle, outcome = ?outcome, "Handle replaced");
    Ok(outcome)
}

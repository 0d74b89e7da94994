//! The engine context object handed to request handlers

use crate::conditional::{replace_conditionally, MutationOutcome, Preconditions};
use crate::error::{EngineError, EngineResult};
use crate::generator::GeneratorRegistry;
use crate::locks::HandleLocks;
use crate::policy::AdminPolicy;
use crate::reconcile::{apply, plan_delete_indexes, plan_merge, Mode, Plan};
use crate::service::HandleService;
use handle_types::{HandleName, Reference, ValueRecord};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of names drawn before a generated creation gives up
pub const DEFAULT_GENERATION_ATTEMPTS: usize = 3;

/// Resolves and mutates handles through an identifier service.
///
/// Constructed once at startup and shared by reference. Every mutation
/// holds its handle's lock from the first resolve to the last service call.
pub struct HandleEngine {
    service: Arc<dyn HandleService>,
    locks: HandleLocks,
    admin: AdminPolicy,
    generators: GeneratorRegistry,
    max_generation_attempts: usize,
}

impl HandleEngine {
    pub fn new(service: Arc<dyn HandleService>, admin: AdminPolicy) -> Self {
        Self {
            service,
            locks: HandleLocks::new(),
            admin,
            generators: GeneratorRegistry::default(),
            max_generation_attempts: DEFAULT_GENERATION_ATTEMPTS,
        }
    }

    pub fn with_generators(mut self, generators: GeneratorRegistry) -> Self {
        self.generators = generators;
        self
    }

    pub fn with_max_generation_attempts(mut self, attempts: usize) -> Self {
        self.max_generation_attempts = attempts.max(1);
        self
    }

    pub fn service(&self) -> &Arc<dyn HandleService> {
        &self.service
    }

    pub fn admin_policy(&self) -> &AdminPolicy {
        &self.admin
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    pub fn locks(&self) -> &HandleLocks {
        &self.locks
    }

    pub fn max_generation_attempts(&self) -> usize {
        self.max_generation_attempts
    }

    /// Values of a handle, restricted to the reference's indexes if it has any.
    /// Every explicitly named index must exist.
    pub async fn resolve(&self, reference: &Reference) -> EngineResult<Vec<ValueRecord>> {
        let handle = reference.handle();
        let values = self
            .service
            .resolve(handle, reference.indexes())
            .await?
            .ok_or_else(|| not_found(handle))?;

        if let Some(missing) = reference
            .indexes()
            .iter()
            .find(|index| values.iter().all(|v| v.index != **index))
        {
            return Err(EngineError::NotFound(format!(
                "index {} of handle {} does not exist",
                missing, handle
            )));
        }

        Ok(values)
    }

    /// Create or fully replace a handle
    pub async fn replace(
        &self,
        handle: &HandleName,
        values: Vec<ValueRecord>,
        preconditions: Preconditions,
    ) -> EngineResult<MutationOutcome> {
        let _guard = self.locks.lock(handle).await;
        replace_conditionally(self.service.as_ref(), handle, values, preconditions, &self.admin)
            .await
    }

    /// Add, update, or delete individual values of an existing handle
    pub async fn merge(&self, handle: &HandleName, values: Vec<ValueRecord>) -> EngineResult<()> {
        let _guard = self.locks.lock(handle).await;

        let current = self.service.resolve(handle, &[]).await?;
        let changes = plan_merge(handle, current.as_deref(), values)
            .map_err(|err| rejected(handle, Mode::Merge, err))?;

        if changes.is_empty() {
            debug!(handle = %handle, "Merge changes nothing");
            return Ok(());
        }

        apply(self.service.as_ref(), handle, &Plan::Modify(changes)).await?;
        info!(handle = %handle, mode = %Mode::Merge, "Handle modified");
        Ok(())
    }

    /// Delete a whole handle, or only the indexes the reference names
    pub async fn delete(&self, reference: &Reference) -> EngineResult<()> {
        let handle = reference.handle();
        let _guard = self.locks.lock(handle).await;

        let current = self
            .service
            .resolve(handle, &[])
            .await?
            .ok_or_else(|| not_found(handle))?;

        if !reference.has_indexes() {
            self.service.delete_handle(handle).await?;
            info!(handle = %handle, "Handle deleted");
            return Ok(());
        }

        let changes = plan_delete_indexes(handle, &current, reference.indexes())
            .map_err(|err| rejected(handle, Mode::Merge, err))?;
        apply(self.service.as_ref(), handle, &Plan::Modify(changes)).await?;
        info!(handle = %handle, indexes = ?reference.indexes(), "Values deleted");
        Ok(())
    }
}

impl std::fmt::Debug for HandleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleEngine")
            .field("admin", &self.admin)
            .field("generators", &self.generators)
            .field("max_generation_attempts", &self.max_generation_attempts)
            .finish_non_exhaustive()
    }
}

fn not_found(handle: &HandleName) -> EngineError {
    EngineError::NotFound(format!("handle {} does not exist", handle))
}

fn rejected(handle: &HandleName, mode: Mode, err: EngineError) -> EngineError {
    warn!(handle = %handle, mode = %mode, error = %err, "Mutation rejected");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryHandleService;
    use crate::service::ServiceResult;
    use async_trait::async_trait;
    use handle_types::{count_admins, AdminIdentity, HS_ADMIN};
    use std::time::Duration;

    fn engine() -> (HandleEngine, InMemoryHandleService) {
        let service = InMemoryHandleService::new();
        let engine = HandleEngine::new(
            Arc::new(service.clone()),
            AdminPolicy::new(AdminIdentity::new("0.NA/10876", 300)),
        );
        (engine, service)
    }

    fn google() -> Vec<ValueRecord> {
        vec![ValueRecord::new(1, "URL", "http://www.google.de")]
    }

    #[tokio::test]
    async fn test_replace_twice_is_created_then_updated() {
        let (engine, service) = engine();
        let handle = HandleName::new("10876/test-001");

        let first = engine
            .replace(&handle, google(), Preconditions::none())
            .await
            .unwrap();
        assert_eq!(first, MutationOutcome::Created);
        let after_first = service.snapshot(&handle).await.unwrap();
        assert_eq!(after_first.len(), 2);
        assert_eq!(after_first[1].index, 100);
        assert_eq!(after_first[1].value_type, HS_ADMIN);

        let second = engine
            .replace(&handle, google(), Preconditions::none())
            .await
            .unwrap();
        assert_eq!(second, MutationOutcome::Updated);

        let after_second = service.snapshot(&handle).await.unwrap();
        assert_eq!(after_second.len(), 2);
        let admin = after_second.iter().find(|v| v.index == 100).unwrap();
        assert_eq!(admin, &after_first[1]);
        let url = after_second.iter().find(|v| v.index == 1).unwrap();
        assert_eq!(url.value_type, "URL");
        assert!(engine.locks().is_empty());
    }

    #[tokio::test]
    async fn test_merge_tombstone_keeps_admin() {
        let (engine, service) = engine();
        let handle = HandleName::new("10876/test-001");
        engine
            .replace(&handle, google(), Preconditions::none())
            .await
            .unwrap();

        engine
            .merge(&handle, vec![ValueRecord::tombstone(1)])
            .await
            .unwrap();
        let values = service.snapshot(&handle).await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(count_admins(&values), 1);
    }

    #[tokio::test]
    async fn test_merge_removing_sole_admin_changes_nothing() {
        let (engine, service) = engine();
        let handle = HandleName::new("10876/test-001");
        engine
            .replace(&handle, google(), Preconditions::none())
            .await
            .unwrap();
        let before = service.snapshot(&handle).await.unwrap();

        let err = engine
            .merge(
                &handle,
                vec![ValueRecord::new(2, "EMAIL", "a@b.c"), ValueRecord::tombstone(100)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
        assert_eq!(service.snapshot(&handle).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_resolve_missing_handle_and_index() {
        let (engine, _) = engine();
        let missing = Reference::parse("10876/never", true).unwrap();
        assert!(matches!(
            engine.resolve(&missing).await,
            Err(EngineError::NotFound(_))
        ));

        let handle = HandleName::new("10876/a");
        engine
            .replace(&handle, google(), Preconditions::none())
            .await
            .unwrap();
        let reference = Reference::parse("1:10876/a", true).unwrap();
        assert_eq!(engine.resolve(&reference).await.unwrap().len(), 1);
        let reference = Reference::parse("7:10876/a", true).unwrap();
        assert!(matches!(
            engine.resolve(&reference).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_handle_and_indexes() {
        let (engine, service) = engine();
        let handle = HandleName::new("10876/a");
        engine
            .replace(&handle, google(), Preconditions::none())
            .await
            .unwrap();

        let admin_only = Reference::parse("100:10876/a", true).unwrap();
        assert!(matches!(
            engine.delete(&admin_only).await,
            Err(EngineError::InvariantViolation(_))
        ));

        engine
            .delete(&Reference::parse("1:10876/a", true).unwrap())
            .await
            .unwrap();
        assert_eq!(service.snapshot(&handle).await.unwrap().len(), 1);

        let whole = Reference::parse("10876/a", true).unwrap();
        engine.delete(&whole).await.unwrap();
        assert!(service.is_empty().await);
        assert!(matches!(
            engine.delete(&whole).await,
            Err(EngineError::NotFound(_))
        ));
    }

    /// Pauses inside every resolve so concurrent callers interleave
    struct SlowResolve {
        inner: InMemoryHandleService,
    }

    #[async_trait]
    impl HandleService for SlowResolve {
        async fn resolve(
            &self,
            handle: &HandleName,
            indexes: &[u32],
        ) -> ServiceResult<Option<Vec<ValueRecord>>> {
            let values = self.inner.resolve(handle, indexes).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            values
        }

        async fn create_handle(&self, handle: &HandleName, values: &[ValueRecord]) -> ServiceResult<()> {
            self.inner.create_handle(handle, values).await
        }

        async fn add_values(&self, handle: &HandleName, values: &[ValueRecord]) -> ServiceResult<()> {
            self.inner.add_values(handle, values).await
        }

        async fn update_values(&self, handle: &HandleName, values: &[ValueRecord]) -> ServiceResult<()> {
            self.inner.update_values(handle, values).await
        }

        async fn delete_values(&self, handle: &HandleName, indexes: &[u32]) -> ServiceResult<()> {
            self.inner.delete_values(handle, indexes).await
        }

        async fn delete_handle(&self, handle: &HandleName) -> ServiceResult<()> {
            self.inner.delete_handle(handle).await
        }
    }

    async fn slow_engine_with_two_admins(handle: &HandleName) -> (HandleEngine, InMemoryHandleService) {
        let inner = InMemoryHandleService::new();
        let identity = AdminIdentity::new("0.NA/10876", 300);
        inner
            .create_handle(
                handle,
                &[identity.admin_value(100, 0x0FFF), identity.admin_value(101, 0x0FFF)],
            )
            .await
            .unwrap();
        let engine = HandleEngine::new(
            Arc::new(SlowResolve {
                inner: inner.clone(),
            }),
            AdminPolicy::new(identity),
        );
        (engine, inner)
    }

    #[tokio::test]
    async fn test_concurrent_merges_on_one_handle_serialize() {
        let handle = HandleName::new("10876/shared");
        let (engine, service) = slow_engine_with_two_admins(&handle).await;

        let (first, second) = tokio::join!(
            engine.merge(&handle, vec![ValueRecord::tombstone(100)]),
            engine.merge(&handle, vec![ValueRecord::tombstone(101)]),
        );

        let rejected = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(EngineError::InvariantViolation(_))))
            .count();
        assert_eq!(rejected, 1);
        assert!(first.is_ok() || second.is_ok());
        assert_eq!(count_admins(&service.snapshot(&handle).await.unwrap()), 1);
        assert!(engine.locks().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_index_deletes_on_one_handle_serialize() {
        let handle = HandleName::new("10876/shared");
        let (engine, service) = slow_engine_with_two_admins(&handle).await;

        let first = Reference::parse("100:10876/shared", true).unwrap();
        let second = Reference::parse("101:10876/shared", true).unwrap();
        let (first, second) = tokio::join!(engine.delete(&first), engine.delete(&second));

        assert!(first.is_ok() ^ second.is_ok());
        assert_eq!(count_admins(&service.snapshot(&handle).await.unwrap()), 1);
    }
}

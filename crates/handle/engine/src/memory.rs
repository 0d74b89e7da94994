//! In-memory identifier service
//!
//! Suitable for development and testing. Each call is atomic on its own;
//! sequencing several calls is the engine's business.

use crate::service::{HandleService, ServiceError, ServiceErrorKind, ServiceResult};
use async_trait::async_trait;
use handle_types::{HandleName, ValueRecord};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory handle store. Values keep the order in which they were stored.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHandleService {
    handles: Arc<RwLock<HashMap<HandleName, Vec<ValueRecord>>>>,
}

impl InMemoryHandleService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored handles
    pub async fn len(&self) -> usize {
        self.handles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handles.read().await.is_empty()
    }

    /// Copy of a handle's values, bypassing the service interface
    pub async fn snapshot(&self, handle: &HandleName) -> Option<Vec<ValueRecord>> {
        self.handles.read().await.get(handle).cloned()
    }
}

fn not_found(handle: &HandleName) -> ServiceError {
    ServiceError::new(
        ServiceErrorKind::HandleNotFound,
        format!("handle {} does not exist", handle),
    )
}

fn check_unique(values: &[ValueRecord]) -> ServiceResult<()> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value.index) {
            return Err(ServiceError::new(
                ServiceErrorKind::InvalidValue,
                format!("duplicate index {}", value.index),
            ));
        }
    }
    Ok(())
}

#[async_trait]
impl HandleService for InMemoryHandleService {
    async fn resolve(
        &self,
        handle: &HandleName,
        indexes: &[u32],
    ) -> ServiceResult<Option<Vec<ValueRecord>>> {
        let handles = self.handles.read().await;
        Ok(handles.get(handle).map(|values| {
            values
                .iter()
                .filter(|v| indexes.is_empty() || indexes.contains(&v.index))
                .cloned()
                .collect()
        }))
    }

    async fn create_handle(&self, handle: &HandleName, values: &[ValueRecord]) -> ServiceResult<()> {
        check_unique(values)?;
        let mut handles = self.handles.write().await;
        if handles.contains_key(handle) {
            return Err(ServiceError::new(
                ServiceErrorKind::HandleAlreadyExists,
                format!("handle {} already exists", handle),
            ));
        }
        handles.insert(handle.clone(), values.to_vec());
        Ok(())
    }

    async fn add_values(&self, handle: &HandleName, values: &[ValueRecord]) -> ServiceResult<()> {
        check_unique(values)?;
        let mut handles = self.handles.write().await;
        let stored = handles.get_mut(handle).ok_or_else(|| not_found(handle))?;

        if let Some(taken) = values
            .iter()
            .find(|v| stored.iter().any(|s| s.index == v.index))
        {
            return Err(ServiceError::new(
                ServiceErrorKind::ValueAlreadyExists,
                format!("index {} of handle {} is already taken", taken.index, handle),
            ));
        }

        stored.extend(values.iter().cloned());
        Ok(())
    }

    async fn update_values(&self, handle: &HandleName, values: &[ValueRecord]) -> ServiceResult<()> {
        check_unique(values)?;
        let mut handles = self.handles.write().await;
        let stored = handles.get_mut(handle).ok_or_else(|| not_found(handle))?;

        if let Some(missing) = values
            .iter()
            .find(|v| !stored.iter().any(|s| s.index == v.index))
        {
            return Err(ServiceError::new(
                ServiceErrorKind::ValuesNotFound,
                format!("index {} of handle {} does not exist", missing.index, handle),
            ));
        }

        for value in values {
            if let Some(slot) = stored.iter_mut().find(|s| s.index == value.index) {
                *slot = value.clone();
            }
        }
        Ok(())
    }

    async fn delete_values(&self, handle: &HandleName, indexes: &[u32]) -> ServiceResult<()> {
        let mut handles = self.handles.write().await;
        let stored = handles.get_mut(handle).ok_or_else(|| not_found(handle))?;
        stored.retain(|v| !indexes.contains(&v.index));
        Ok(())
    }

    async fn delete_handle(&self, handle: &HandleName) -> ServiceResult<()> {
        let mut handles = self.handles.write().await;
        handles
            .remove(handle)
            .map(|_| ())
            .ok_or_else(|| not_found(handle))
    }
}

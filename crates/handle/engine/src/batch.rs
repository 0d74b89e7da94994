//! Creation of several handles in one request
//!
//! The whole batch is validated before anything is written: generator
//! selection, tuple names, and prefix agreement. Once validation passes the
//! tuples run concurrently and independently. A failing tuple is reported in
//! its own result and does not stop the others.

use crate::codec::BatchTuple;
use crate::conditional::{MutationOutcome, Preconditions};
use crate::engine::HandleEngine;
use crate::error::{EngineError, EngineResult};
use crate::generator::NameGenerator;
use futures::future::join_all;
use handle_types::{HandleName, ValueRecord};
use tracing::{info, warn};

/// A decoded creation request
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    /// Prefix the request was posted under; `None` for the root collection
    pub prefix: Option<String>,
    pub tuples: Vec<BatchTuple>,
    /// Generator key for unnamed tuples; `None` selects the default
    pub generator: Option<String>,
    /// Honored only when the batch holds a single tuple
    pub preconditions: Preconditions,
}

/// Outcome of one tuple
#[derive(Debug)]
pub struct TupleResult {
    /// Name the tuple was written to, when one was known or generated
    pub handle: Option<HandleName>,
    pub outcome: EngineResult<MutationOutcome>,
}

impl HandleEngine {
    /// Create or replace every tuple of a batch.
    ///
    /// Fails as a whole only when validation fails. Results are returned in
    /// tuple order.
    pub async fn create_batch(&self, request: BatchRequest) -> EngineResult<Vec<TupleResult>> {
        let BatchRequest {
            prefix,
            tuples,
            generator,
            preconditions,
        } = request;

        let generator = self.generators().resolve(generator.as_deref())?;
        validate_names(prefix.as_deref(), &tuples)?;

        let preconditions = if tuples.len() == 1 {
            preconditions
        } else {
            Preconditions::none()
        };

        let count = tuples.len();
        let runs = tuples.into_iter().map(|tuple| {
            self.run_tuple(prefix.as_deref(), generator.as_ref(), tuple, preconditions)
        });
        let results = join_all(runs).await;

        let failed = results.iter().filter(|r| r.outcome.is_err()).count();
        info!(tuples = count, failed, "Batch processed");
        Ok(results)
    }

    async fn run_tuple(
        &self,
        prefix: Option<&str>,
        generator: &dyn NameGenerator,
        tuple: BatchTuple,
        preconditions: Preconditions,
    ) -> TupleResult {
        match (tuple.handle, prefix) {
            (Some(handle), _) => {
                let outcome = self.replace(&handle, tuple.values, preconditions).await;
                TupleResult {
                    handle: Some(handle),
                    outcome,
                }
            }
            (None, Some(prefix)) => {
                self.create_generated(prefix, generator, tuple.values, preconditions)
                    .await
            }
            (None, None) => TupleResult {
                handle: None,
                outcome: Err(EngineError::MalformedReference(
                    "a handle name is required outside a prefix".to_string(),
                )),
            },
        }
    }

    /// Create under a generated name, drawing a fresh name on collision.
    async fn create_generated(
        &self,
        prefix: &str,
        generator: &dyn NameGenerator,
        values: Vec<ValueRecord>,
        preconditions: Preconditions,
    ) -> TupleResult {
        if preconditions.must_exist {
            return TupleResult {
                handle: None,
                outcome: Err(EngineError::PreconditionFailed(
                    "a newly generated handle cannot already exist".to_string(),
                )),
            };
        }

        let attempts = self.max_generation_attempts();
        let mut last = None;
        for attempt in 1..=attempts {
            let handle = generator.generate_name(prefix);
            match self
                .replace(&handle, values.clone(), Preconditions::must_not_exist())
                .await
            {
                Err(EngineError::PreconditionFailed(_)) => {
                    warn!(handle = %handle, attempt, "Generated handle already exists");
                    last = Some(handle);
                }
                outcome => {
                    return TupleResult {
                        handle: Some(handle),
                        outcome,
                    }
                }
            }
        }

        TupleResult {
            handle: last,
            outcome: Err(EngineError::NameCollision(format!(
                "no free name under prefix {} after {} attempts",
                prefix, attempts
            ))),
        }
    }
}

fn validate_names(prefix: Option<&str>, tuples: &[BatchTuple]) -> EngineResult<()> {
    for (entry, tuple) in tuples.iter().enumerate() {
        match (prefix, &tuple.handle) {
            (_, Some(handle)) if !handle.is_proper() => {
                return Err(EngineError::MalformedReference(format!(
                    "entry {}: handle {} has no suffix",
                    entry, handle
                )));
            }
            (Some(prefix), Some(handle)) if !handle.has_prefix(prefix) => {
                return Err(EngineError::MalformedReference(format!(
                    "entry {}: handle {} is not under prefix {}",
                    entry, handle, prefix
                )));
            }
            (None, None) => {
                return Err(EngineError::MalformedReference(format!(
                    "entry {}: a handle name is required outside a prefix",
                    entry
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

//! Handle Engine - Value-set reconciliation and safe mutation
//!
//! This crate decides what to ask an identifier service for when a client
//! reads or writes a handle:
//!
//! - **Codec**: JSON value arrays to [`ValueRecord`](handle_types::ValueRecord)s and back
//! - **Reconciliation**: add/update/delete sets for replace and merge requests,
//!   checked against the rule that a handle keeps at least one `HS_ADMIN` value
//! - **Conditional mutation**: `If-Match` / `If-None-Match` existence checks
//! - **Batch creation**: several handles per request, explicit or generated names
//!
//! ## Identifier Service
//!
//! Persistence lives behind the [`HandleService`] trait. The crate ships an
//! in-memory implementation suitable for development and testing.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod batch;
pub mod codec;
pub mod conditional;
pub mod engine;
pub mod error;
pub mod generator;
pub mod locks;
pub mod memory;
pub mod policy;
pub mod reconcile;
pub mod service;

// Re-exports
pub use batch::{BatchRequest, TupleResult};
pub use codec::{
    decode_batch, decode_value_set, encode_value_set, BatchTuple, CodecError, Position, WireValue,
};
pub use conditional::{MutationOutcome, Preconditions};
pub use engine::{HandleEngine, DEFAULT_GENERATION_ATTEMPTS};
pub use error::{EngineError, EngineResult};
pub use generator::{CounterGenerator, GeneratorRegistry, NameGenerator, UuidGenerator};
pub use locks::{HandleGuard, HandleLocks};
pub use memory::InMemoryHandleService;
pub use policy::AdminPolicy;
pub use reconcile::{ApplyOrder, ChangeSet, Mode, Plan};
pub use service::{HandleService, ServiceError, ServiceErrorKind, ServiceResult};

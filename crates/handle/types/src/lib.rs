//! Handle Types - Core types for the handle registry
//!
//! A handle is a persistent, globally unique name bound to a small ordered
//! set of typed values. This crate holds the vocabulary shared by the
//! mutation engine and the HTTP daemon.
//!
//! ## Key Concepts
//!
//! - **HandleName**: `prefix/suffix`, or prefix-only before a suffix is assigned
//! - **ValueRecord**: one indexed, typed value attached to a handle
//! - **AdminRecord**: the binary payload of an `HS_ADMIN` value
//! - **Reference**: a request-scoped pointer to a handle and optional value indexes

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod admin;
pub mod name;
pub mod reference;
pub mod value;

// Re-export main types
pub use admin::{AdminIdentity, AdminRecord, AdminRecordError};
pub use name::HandleName;
pub use reference::{Reference, ReferenceError};
pub use value::{
    count_admins, is_binary_type, Permissions, PermissionsParseError, Ttl, ValueRecord,
    BINARY_TYPES, HS_ADMIN,
};

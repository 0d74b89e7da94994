//! Handle Daemon library
//!
//! This module provides the core components of the handle daemon:
//! - REST API handlers over the mutation engine
//! - Configuration loading
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use api::create_router;
pub use api::rest::state::AppState;
pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use server::{build_engine, Server};

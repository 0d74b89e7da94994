//! API layer for the handle daemon

pub mod rest;

pub use rest::router::create_router;

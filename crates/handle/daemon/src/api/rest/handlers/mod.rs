//! API request handlers

mod batch;
mod handles;
mod health;

pub use batch::*;
pub use handles::*;
pub use health::*;

//! Execution Runner Module
//!
//! Turns a source unit and its bindings into a running async function and
//! races it against the caller's timeout signal.

pub mod runner;
pub mod types;

pub use runner::ExecutionRunner;
pub use types::*;

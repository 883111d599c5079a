//! Error types for the execution core.
//!
//! - [`ConstructionError`] — Malformed context or source; raised before anything runs.
//! - [`ExecutionError`] — Every way an execution attempt can fail.
//! - [`ConfigError`] — Configuration loading failures.
//! - [`ErrorContext`] — Structured error metadata (code, retryability, severity).

pub mod config_error;
pub mod error_context;
pub mod execution_error;

pub use config_error::ConfigError;
pub use error_context::{ErrorCode, ErrorContext, ErrorRetryability, ErrorSeverity};
pub use execution_error::{ConstructionError, ExecutionError};

/// Result of a single execution attempt.
pub type ExecutionOutcome = Result<crate::evaluator::Value, ExecutionError>;

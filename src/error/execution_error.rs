//! Construction and execution failures.

use std::time::Duration;

use thiserror::Error;

use super::error_context::{ErrorCode, ErrorContext, ErrorSeverity};
use crate::evaluator::Value;
use crate::script::SyntaxError;

/// The context or source could not be turned into something runnable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    #[error("Invalid binding name: '{0}' is not an identifier")]
    InvalidIdentifier(String),
    #[error("Invalid binding name: '{0}' is a reserved word")]
    ReservedWord(String),
    #[error("Duplicate binding name: '{0}'")]
    DuplicateBinding(String),
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("Source too long: {length} bytes exceeds the limit of {limit}")]
    SourceTooLong { length: usize, limit: usize },
}

/// Why an execution attempt did not produce a value.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    /// Thrown by the executed code; `thrown` is the value exactly as thrown.
    #[error("{name}: {message}")]
    Runtime {
        name: String,
        message: String,
        thrown: Value,
    },
    #[error("Timeout: execution exceeded {after:?}")]
    Timeout { after: Duration },
    #[error("Execution stopped by the caller")]
    Aborted,
    #[error("Step budget of {steps} exhausted")]
    BudgetExhausted { steps: u64 },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExecutionError {
    /// Wrap a value thrown by executed code.
    pub fn thrown(value: Value) -> Self {
        let (name, message) = match &value {
            Value::Error(err) => (err.kind.name().to_string(), err.message.clone()),
            other => ("Uncaught".to_string(), other.to_string()),
        };
        ExecutionError::Runtime {
            name,
            message,
            thrown: value,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. })
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, ExecutionError::Runtime { .. })
    }

    pub fn is_construction(&self) -> bool {
        matches!(self, ExecutionError::Construction(_))
    }

    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            ExecutionError::Runtime { thrown, .. } => Some(thrown),
            _ => None,
        }
    }

    pub fn error_context(&self) -> ErrorContext {
        let message = self.to_string();
        match self {
            ExecutionError::Construction(err) => {
                let code = match err {
                    ConstructionError::Syntax(_) => ErrorCode::SourceSyntaxError,
                    ConstructionError::SourceTooLong { .. } => ErrorCode::SourceTooLong,
                    _ => ErrorCode::InvalidBinding,
                };
                ErrorContext::non_retryable(code, message)
            }
            ExecutionError::Runtime { name, .. } => {
                ErrorContext::retryable(ErrorCode::ScriptError, message)
                    .with_metadata(serde_json::json!({ "name": name }))
            }
            ExecutionError::Timeout { after } => ErrorContext::retryable(ErrorCode::Timeout, message)
                .with_metadata(serde_json::json!({ "after_ms": after.as_millis() as u64 })),
            ExecutionError::Aborted => ErrorContext::retryable(ErrorCode::Stopped, message)
                .with_severity(ErrorSeverity::Warning),
            ExecutionError::BudgetExhausted { .. } => {
                ErrorContext::retryable(ErrorCode::BudgetExhausted, message)
            }
            ExecutionError::Internal(_) => ErrorContext::non_retryable(ErrorCode::InternalError, message)
                .with_severity(ErrorSeverity::Fatal),
        }
    }
}

use serde::{Deserialize, Serialize};

/// Error retryability marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorRetryability {
    Retryable,
    NonRetryable,
    Unknown,
}

/// Error severity marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Warning,
    Error,
    Fatal,
}

/// Error classification code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Construction
    InvalidBinding,
    SourceSyntaxError,
    SourceTooLong,

    // Execution
    ScriptError,
    Timeout,
    Stopped,
    BudgetExhausted,
    InternalError,

    // Configuration
    ConfigError,
}

/// Structured error context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    pub code: ErrorCode,
    pub retryability: ErrorRetryability,
    pub severity: ErrorSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ErrorContext {
    pub fn non_retryable(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            retryability: ErrorRetryability::NonRetryable,
            severity: ErrorSeverity::Error,
            message: message.into(),
            metadata: None,
        }
    }

    /// A failure the learner can fix by editing and re-running.
    pub fn retryable(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            retryability: ErrorRetryability::Retryable,
            severity: ErrorSeverity::Error,
            message: message.into(),
            metadata: None,
        }
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

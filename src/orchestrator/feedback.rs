use serde::Serialize;

use crate::error::{ConstructionError, ExecutionError, ExecutionOutcome};
use crate::evaluator::Value;

/// What the learner is told about an attempt.
///
/// `Solved` means the code ran to completion. Whether the puzzle goal was
/// met is judged by the level, from the board state and the returned value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Feedback {
    Solved {
        #[serde(serialize_with = "serialize_value")]
        value: Value,
    },
    TookTooLong {
        after_ms: u64,
    },
    CodeError {
        name: String,
        message: String,
    },
    Stopped,
    Internal {
        message: String,
    },
}

fn serialize_value<S: serde::Serializer>(value: &Value, serializer: S) -> Result<S::Ok, S::Error> {
    value.to_json().serialize(serializer)
}

impl Feedback {
    pub fn from_outcome(outcome: &ExecutionOutcome) -> Self {
        match outcome {
            Ok(value) => Feedback::Solved {
                value: value.clone(),
            },
            Err(ExecutionError::Timeout { after }) => Feedback::TookTooLong {
                after_ms: after.as_millis() as u64,
            },
            Err(ExecutionError::BudgetExhausted { .. }) => Feedback::TookTooLong { after_ms: 0 },
            Err(ExecutionError::Runtime { name, message, .. }) => Feedback::CodeError {
                name: name.clone(),
                message: message.clone(),
            },
            Err(ExecutionError::Construction(ConstructionError::Syntax(err))) => {
                Feedback::CodeError {
                    name: "SyntaxError".to_string(),
                    message: err.to_string(),
                }
            }
            Err(ExecutionError::Construction(err @ ConstructionError::SourceTooLong { .. })) => {
                Feedback::CodeError {
                    name: "Error".to_string(),
                    message: err.to_string(),
                }
            }
            // A bad binding is a level bug, not the learner's.
            Err(err @ ExecutionError::Construction(_)) | Err(err @ ExecutionError::Internal(_)) => {
                Feedback::Internal {
                    message: err.to_string(),
                }
            }
            Err(ExecutionError::Aborted) => Feedback::Stopped,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Feedback::Solved { .. } => "solved",
            Feedback::TookTooLong { .. } => "took_too_long",
            Feedback::CodeError { .. } => "code_error",
            Feedback::Stopped => "stopped",
            Feedback::Internal { .. } => "internal",
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, Feedback::Solved { .. })
    }

    /// Learner-facing text.
    pub fn message(&self) -> String {
        match self {
            Feedback::Solved { .. } => "Your code ran to the end.".to_string(),
            Feedback::TookTooLong { .. } => {
                "Your code took too long. Is there a loop that never ends?".to_string()
            }
            Feedback::CodeError { name, message } => format!("{}: {}", name, message),
            Feedback::Stopped => "Stopped.".to_string(),
            Feedback::Internal { .. } => {
                "Something went wrong on our side while running your code.".to_string()
            }
        }
    }
}

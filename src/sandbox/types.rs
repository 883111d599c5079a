use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{ExecutionContext, TimeoutSignal};
use crate::error::{ConstructionError, ExecutionOutcome};
use crate::evaluator::Limits;

// ================================
// CodeRunner Trait
// ================================

/// Execution interface the orchestrator drives.
///
/// [`ExecutionRunner`](super::ExecutionRunner) is the built-in implementation;
/// tests and embedders can substitute their own.
#[async_trait::async_trait]
pub trait CodeRunner: Send + Sync {
    /// Run `source` with `context` as its only bindings, racing `signal`.
    ///
    /// Never panics: every failure mode is an [`ExecutionError`](crate::error::ExecutionError).
    async fn execute(
        &self,
        source: &SourceUnit,
        context: ExecutionContext,
        signal: TimeoutSignal,
    ) -> ExecutionOutcome;

    /// Check that `source` would be accepted, without running it.
    async fn validate(&self, source: &SourceUnit) -> Result<(), ConstructionError> {
        let _ = source;
        Ok(())
    }

    /// Get execution statistics
    async fn get_stats(&self) -> ExecutionStats {
        ExecutionStats::default()
    }
}

// ================================
// Source
// ================================

/// Instrumented script text produced by the block compiler.
///
/// Parsed as the body of an async function; nothing is checked before
/// [`CodeRunner::execute`] or [`CodeRunner::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    code: String,
}

impl SourceUnit {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.trim().is_empty()
    }
}

impl From<&str> for SourceUnit {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for SourceUnit {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

// ================================
// Config
// ================================

/// What happens to the execution task once the signal wins the race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbandonPolicy {
    /// Stop awaiting; the task unwinds at its next yield point.
    #[default]
    Detach,
    /// Also abort the task at its next `.await`.
    Abort,
}

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Max source length in bytes
    pub max_code_length: usize,

    /// Interpreter steps between cooperative yields
    pub yield_interval: u64,

    /// Step budget per execution (`None` = unbounded)
    pub max_steps: Option<u64>,

    /// Max script call depth
    pub max_call_depth: usize,

    /// Abandonment policy
    pub abandon: AbandonPolicy,

    /// Expose `Math`, `Error` and the other language intrinsics
    pub intrinsics: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            max_code_length: 1_000_000, // 1MB
            yield_interval: limits.yield_interval,
            max_steps: limits.max_steps,
            max_call_depth: limits.max_call_depth,
            abandon: AbandonPolicy::Detach,
            intrinsics: true,
        }
    }
}

impl RunnerConfig {
    pub fn limits(&self) -> Limits {
        Limits {
            max_call_depth: self.max_call_depth,
            max_steps: self.max_steps,
            yield_interval: self.yield_interval.max(1),
        }
    }
}

// ================================
// Stats
// ================================

/// Runner statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionStats {
    /// Total executions
    pub total_executions: u64,

    /// Executions that returned a value
    pub successful_executions: u64,

    /// Executions that ended in any error, timeouts included
    pub failed_executions: u64,

    /// Executions cut off by the timeout signal
    pub timed_out_executions: u64,

    /// Average execution time
    pub avg_execution_time: Duration,
}

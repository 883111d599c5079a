//! Attempt lifecycle on the caller's side.
//!
//! Each press of "run" is an attempt. The orchestrator starts a new
//! generation (which invalidates whatever attempt was still running),
//! builds the attempt's bindings and its [`TimeoutSignal`], hands both to
//! the runner, and turns the outcome into [`Feedback`].

mod feedback;

pub use feedback::Feedback;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::{
    CapabilitySet, ContextBuilder, GenerationCounter, GenerationLease, IdGenerator,
    RealIdGenerator, TimeoutSignal,
};
use crate::error::{ErrorContext, ExecutionError, ExecutionOutcome};
use crate::sandbox::{CodeRunner, ExecutionRunner, RunnerConfig, SourceUnit};

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Time allowed per attempt, in milliseconds
    pub timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { timeout_ms: 5_000 }
    }
}

impl OrchestratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A started attempt: its id, generation lease and stop token.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub id: String,
    pub lease: GenerationLease,
    stop: CancellationToken,
}

impl Attempt {
    pub fn generation(&self) -> u64 {
        self.lease.generation()
    }

    pub fn is_current(&self) -> bool {
        self.lease.is_current()
    }
}

/// Everything known about a finished attempt.
#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub id: String,
    pub generation: u64,
    pub outcome: ExecutionOutcome,
    pub feedback: Feedback,
    /// Classification of the failure, if the attempt failed.
    pub error: Option<ErrorContext>,
    pub elapsed: Duration,
}

pub struct Orchestrator {
    runner: Arc<dyn CodeRunner>,
    config: OrchestratorConfig,
    generations: GenerationCounter,
    ids: Arc<dyn IdGenerator>,
    current_stop: Mutex<CancellationToken>,
}

impl Orchestrator {
    pub fn new(runner: Arc<dyn CodeRunner>, config: OrchestratorConfig) -> Self {
        Self {
            runner,
            config,
            generations: GenerationCounter::new(),
            ids: Arc::new(RealIdGenerator),
            current_stop: Mutex::new(CancellationToken::new()),
        }
    }

    /// Orchestrator over the built-in [`ExecutionRunner`].
    pub fn with_runner_config(runner: RunnerConfig, config: OrchestratorConfig) -> Self {
        Self::new(Arc::new(ExecutionRunner::new(runner)), config)
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn generations(&self) -> &GenerationCounter {
        &self.generations
    }

    pub fn runner(&self) -> &Arc<dyn CodeRunner> {
        &self.runner
    }

    /// Start a new attempt, superseding the previous one.
    ///
    /// The previous attempt's lease goes stale and its stop token fires, so
    /// its capabilities refuse and its race resolves as stopped.
    pub fn begin_attempt(&self) -> Attempt {
        let lease = self.generations.begin();
        let stop = CancellationToken::new();
        let previous = std::mem::replace(&mut *self.current_stop.lock(), stop.clone());
        previous.cancel();
        Attempt {
            id: self.ids.next_id(),
            lease,
            stop,
        }
    }

    /// The learner pressed "stop".
    pub fn stop(&self) {
        let stop = self.current_stop.lock().clone();
        stop.cancel();
    }

    /// Start an attempt and run `source` against `capabilities`.
    pub async fn run(
        &self,
        source: &SourceUnit,
        capabilities: &[&dyn CapabilitySet],
    ) -> AttemptReport {
        let attempt = self.begin_attempt();
        self.run_attempt(&attempt, source, capabilities).await
    }

    /// Run `source` as the already started `attempt`.
    #[tracing::instrument(skip_all, fields(attempt = %attempt.id, generation = attempt.generation()))]
    pub async fn run_attempt(
        &self,
        attempt: &Attempt,
        source: &SourceUnit,
        capabilities: &[&dyn CapabilitySet],
    ) -> AttemptReport {
        let start = Instant::now();
        let builder = capabilities
            .iter()
            .fold(ContextBuilder::new().lease(attempt.lease.clone()), |builder, set| {
                builder.capabilities(*set, &attempt.lease)
            });

        let outcome = match builder.build() {
            Ok(context) => {
                let signal =
                    TimeoutSignal::after_or_stop(self.config.timeout(), attempt.stop.clone());
                self.runner.execute(source, context, signal).await
            }
            Err(err) => {
                tracing::warn!(error = %err, "attempt bindings rejected");
                Err(ExecutionError::from(err))
            }
        };

        // The task may still be running; anything it does from here on is
        // refused.
        if matches!(
            outcome,
            Err(ExecutionError::Timeout { .. }) | Err(ExecutionError::Aborted)
        ) {
            self.generations.invalidate(&attempt.lease);
        }

        let feedback = Feedback::from_outcome(&outcome);
        let error = outcome.as_ref().err().map(ExecutionError::error_context);
        let elapsed = start.elapsed();
        tracing::info!(
            feedback = feedback.kind(),
            code = ?error.as_ref().map(|ctx| &ctx.code),
            elapsed_ms = elapsed.as_millis() as u64,
            "attempt finished"
        );
        AttemptReport {
            id: attempt.id.clone(),
            generation: attempt.generation(),
            outcome,
            feedback,
            error,
            elapsed,
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::with_runner_config(RunnerConfig::default(), OrchestratorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::RopeBoard;
    use crate::core::FakeIdGenerator;

    fn orchestrator(timeout_ms: u64) -> Orchestrator {
        Orchestrator::with_runner_config(RunnerConfig::default(), OrchestratorConfig { timeout_ms })
            .with_id_generator(Arc::new(FakeIdGenerator::new("attempt")))
    }

    #[tokio::test]
    async fn test_solved_attempt() {
        let orchestrator = orchestrator(1_000);
        let board = RopeBoard::new(10.0);
        let report = orchestrator
            .run(&SourceUnit::new("addCut(4); return cuts().length;"), &[&board])
            .await;
        assert_eq!(report.id, "attempt-1");
        assert!(report.feedback.is_solved());
        assert_eq!(report.outcome.unwrap(), crate::evaluator::Value::from(1));
    }

    #[tokio::test]
    async fn test_timeout_invalidates_attempt() {
        let orchestrator = orchestrator(30);
        let board = RopeBoard::new(10.0);
        let attempt = orchestrator.begin_attempt();
        let report = orchestrator
            .run_attempt(&attempt, &SourceUnit::new("while (true) {}"), &[&board])
            .await;
        assert_eq!(report.feedback.kind(), "took_too_long");
        assert_eq!(
            report.error.map(|ctx| ctx.code),
            Some(crate::error::ErrorCode::Timeout)
        );
        assert!(!attempt.is_current());
    }

    #[tokio::test]
    async fn test_stop_resolves_as_stopped() {
        let orchestrator = Arc::new(orchestrator(10_000));
        let board = RopeBoard::new(10.0);
        let running = {
            let orchestrator = orchestrator.clone();
            let board = board.clone();
            tokio::spawn(async move {
                orchestrator
                    .run(
                        &SourceUnit::new("while (true) { await sleep(1); }"),
                        &[&board, &crate::capabilities::StandardCapabilities::new(
                            Arc::new(crate::core::MemorySink::new()),
                        )],
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        orchestrator.stop();
        let report = running.await.unwrap();
        assert_eq!(report.feedback.kind(), "stopped");
    }

    #[tokio::test]
    async fn test_new_attempt_supersedes_old() {
        let orchestrator = orchestrator(1_000);
        let first = orchestrator.begin_attempt();
        let second = orchestrator.begin_attempt();
        assert!(!first.is_current());
        assert!(first.stop.is_cancelled());
        assert!(second.is_current());
        assert_eq!(second.id, "attempt-2");
    }

    #[tokio::test]
    async fn test_duplicate_binding_is_internal() {
        let orchestrator = orchestrator(1_000);
        let board = RopeBoard::new(10.0);
        let report = orchestrator
            .run(&SourceUnit::new("return 1;"), &[&board, &board])
            .await;
        assert_eq!(report.feedback.kind(), "internal");
        assert!(report.outcome.unwrap_err().is_construction());
    }
}

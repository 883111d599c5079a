//! The execution runner: synthesize, invoke, race.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::types::{AbandonPolicy, CodeRunner, ExecutionStats, RunnerConfig, SourceUnit};
use crate::core::{ExecutionContext, SignalFired, TimeoutSignal};
use crate::error::{ConstructionError, ExecutionError, ExecutionOutcome};
use crate::evaluator::{intrinsics, EvalResult, Interpreter, Interrupt, Scope, Value};
use crate::script::{parse_function_body, FunctionDecl, USE_STRICT};

/// Runs source units inside a fresh interpreter per execution.
///
/// The source becomes the body of a strict async function whose parameters
/// are the context's names; the context's values are its arguments. The
/// interpreter runs in its own task, so a timeout only stops the waiting:
/// the task unwinds at its next yield point once its token or lease says
/// it has been abandoned.
pub struct ExecutionRunner {
    config: RunnerConfig,
    stats: Arc<RwLock<ExecutionStats>>,
}

impl ExecutionRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            stats: Arc::new(RwLock::new(ExecutionStats::default())),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Parse `source` into the entry function taking `params`.
    pub fn compile(
        &self,
        source: &SourceUnit,
        params: &[String],
    ) -> Result<Arc<FunctionDecl>, ConstructionError> {
        if source.len() > self.config.max_code_length {
            return Err(ConstructionError::SourceTooLong {
                length: source.len(),
                limit: self.config.max_code_length,
            });
        }
        let mut body = parse_function_body(source.code())?;
        if !body.is_strict() {
            body.directives.insert(0, USE_STRICT.to_string());
        }
        Ok(Arc::new(FunctionDecl {
            name: None,
            params: params.to_vec(),
            body,
            is_async: true,
        }))
    }

    pub async fn stats(&self) -> ExecutionStats {
        self.stats.read().await.clone()
    }

    fn globals(&self) -> Scope {
        let scope = Scope::root();
        if self.config.intrinsics {
            intrinsics::install(&scope);
        }
        scope
    }

    async fn race(
        &self,
        source: &SourceUnit,
        context: ExecutionContext,
        signal: TimeoutSignal,
    ) -> ExecutionOutcome {
        let (names, values, lease) = context.into_parts();
        let decl = self.compile(source, &names)?;

        let cancel = CancellationToken::new();
        // Whatever way this function is left, the task must see itself abandoned.
        let _abandon = cancel.clone().drop_guard();

        let mut interpreter =
            Interpreter::new(self.config.limits()).with_cancellation(cancel.clone());
        if let Some(lease) = lease {
            interpreter = interpreter.with_lease(lease);
        }
        let globals = self.globals();
        let mut handle = tokio::spawn(async move {
            let result = interpreter.run(decl, globals, values).await;
            (result, interpreter.steps())
        });

        tokio::select! {
            biased;
            joined = &mut handle => settle(joined),
            fired = signal => {
                cancel.cancel();
                if self.config.abandon == AbandonPolicy::Abort {
                    handle.abort();
                }
                match fired {
                    SignalFired::Elapsed(after) => {
                        tracing::debug!(after_ms = after.as_millis() as u64, "execution timed out");
                        Err(ExecutionError::Timeout { after })
                    }
                    SignalFired::Stopped => {
                        tracing::debug!("execution stopped by caller");
                        Err(ExecutionError::Aborted)
                    }
                }
            }
        }
    }

    async fn update_stats(&self, outcome: &ExecutionOutcome, execution_time: Duration) {
        let mut stats = self.stats.write().await;
        stats.total_executions += 1;
        match outcome {
            Ok(_) => stats.successful_executions += 1,
            Err(err) => {
                stats.failed_executions += 1;
                if err.is_timeout() {
                    stats.timed_out_executions += 1;
                }
            }
        }
        if stats.total_executions == 1 {
            stats.avg_execution_time = execution_time;
        } else {
            let total_ns = stats.avg_execution_time.as_nanos() as u64
                * (stats.total_executions - 1)
                + execution_time.as_nanos() as u64;
            stats.avg_execution_time = Duration::from_nanos(total_ns / stats.total_executions);
        }
    }
}

impl Default for ExecutionRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

fn settle(joined: Result<(EvalResult<Value>, u64), JoinError>) -> ExecutionOutcome {
    match joined {
        Ok((Ok(value), steps)) => {
            tracing::debug!(steps, "execution completed");
            Ok(value)
        }
        Ok((Err(Interrupt::Throw(value)), steps)) => {
            tracing::debug!(steps, "execution threw");
            Err(ExecutionError::thrown(value))
        }
        Ok((Err(Interrupt::BudgetExhausted { steps }), _)) => {
            Err(ExecutionError::BudgetExhausted { steps })
        }
        // The lease went stale before the signal fired: a newer attempt
        // took over.
        Ok((Err(Interrupt::Abandoned), _)) => Err(ExecutionError::Aborted),
        Err(err) if err.is_panic() => {
            tracing::error!("execution task panicked");
            Err(ExecutionError::Internal("execution task panicked".to_string()))
        }
        Err(_) => Err(ExecutionError::Aborted),
    }
}

#[async_trait::async_trait]
impl CodeRunner for ExecutionRunner {
    #[tracing::instrument(skip_all, fields(bytes = source.len(), bindings = context.len()))]
    async fn execute(
        &self,
        source: &SourceUnit,
        context: ExecutionContext,
        signal: TimeoutSignal,
    ) -> ExecutionOutcome {
        let start = Instant::now();
        let outcome = self.race(source, context, signal).await;
        self.update_stats(&outcome, start.elapsed()).await;
        outcome
    }

    async fn validate(&self, source: &SourceUnit) -> Result<(), ConstructionError> {
        self.compile(source, &[]).map(|_| ())
    }

    async fn get_stats(&self) -> ExecutionStats {
        self.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContextBuilder, GenerationCounter};
    use crate::evaluator::{host_fn, sync_fn, HostError};

    fn runner() -> ExecutionRunner {
        ExecutionRunner::default()
    }

    async fn run(source: &str, context: ExecutionContext) -> ExecutionOutcome {
        runner()
            .execute(
                &SourceUnit::new(source),
                context,
                TimeoutSignal::after(Duration::from_secs(5)),
            )
            .await
    }

    #[tokio::test]
    async fn test_returns_value_without_bindings() {
        let value = run("return 1 + 2;", ExecutionContext::empty()).await.unwrap();
        assert_eq!(value, Value::from(3));
    }

    #[tokio::test]
    async fn test_missing_return_is_undefined() {
        let value = run("let x = 1;", ExecutionContext::empty()).await.unwrap();
        assert!(value.is_undefined());
    }

    #[tokio::test]
    async fn test_bindings_are_positional_arguments() {
        let ctx = ContextBuilder::new()
            .value("a", 2)
            .value("b", 5)
            .build()
            .unwrap();
        let value = run("return a * 10 + b;", ctx).await.unwrap();
        assert_eq!(value, Value::from(25));
    }

    #[tokio::test]
    async fn test_body_is_strict() {
        let err = run("leaked = 1; return leaked;", ExecutionContext::empty())
            .await
            .unwrap_err();
        match err {
            ExecutionError::Runtime { name, message, .. } => {
                assert_eq!(name, "ReferenceError");
                assert_eq!(message, "leaked is not defined");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_syntax_error_is_construction_error() {
        let err = run("return (1;", ExecutionContext::empty()).await.unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Construction(ConstructionError::Syntax(_))
        ));
    }

    #[tokio::test]
    async fn test_source_length_limit() {
        let runner = ExecutionRunner::new(RunnerConfig {
            max_code_length: 8,
            ..RunnerConfig::default()
        });
        let err = runner
            .validate(&SourceUnit::new("return 123456789;"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ConstructionError::SourceTooLong {
                length: 17,
                limit: 8
            }
        );
    }

    #[tokio::test]
    async fn test_thrown_primitive_is_preserved() {
        let err = run("throw 'nope';", ExecutionContext::empty()).await.unwrap_err();
        assert_eq!(err.thrown_value(), Some(&Value::from("nope")));
    }

    #[tokio::test]
    async fn test_host_error_surfaces_as_runtime() {
        let ctx = ContextBuilder::new()
            .capability(
                "fail",
                sync_fn("fail", |_| Err(HostError::message("rope snapped"))),
            )
            .build()
            .unwrap();
        let err = run("await fail();", ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Error: rope snapped");
    }

    #[tokio::test]
    async fn test_host_error_can_be_caught() {
        let ctx = ContextBuilder::new()
            .capability(
                "fail",
                sync_fn("fail", |_| Err(HostError::message("rope snapped"))),
            )
            .build()
            .unwrap();
        let value = run(
            "try { await fail(); } catch (e) { return e.message; }",
            ctx,
        )
        .await
        .unwrap();
        assert_eq!(value, Value::from("rope snapped"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_host_call_times_out() {
        let ctx = ContextBuilder::new()
            .capability(
                "forever",
                host_fn("forever", |_| futures::future::pending()),
            )
            .build()
            .unwrap();
        let start = Instant::now();
        let err = runner()
            .execute(
                &SourceUnit::new("await forever();"),
                ctx,
                TimeoutSignal::after(Duration::from_millis(200)),
            )
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_tight_loop_times_out() {
        let start = std::time::Instant::now();
        let err = run_with_timeout("while (true) {}", Duration::from_millis(50)).await;
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    async fn run_with_timeout(source: &str, timeout: Duration) -> ExecutionError {
        runner()
            .execute(
                &SourceUnit::new(source),
                ExecutionContext::empty(),
                TimeoutSignal::after(timeout),
            )
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn test_step_budget() {
        let runner = ExecutionRunner::new(RunnerConfig {
            max_steps: Some(500),
            ..RunnerConfig::default()
        });
        let err = runner
            .execute(
                &SourceUnit::new("while (true) {}"),
                ExecutionContext::empty(),
                TimeoutSignal::never(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::BudgetExhausted { steps: 500 }));
    }

    #[tokio::test]
    async fn test_stopped_signal_is_aborted() {
        let stop = CancellationToken::new();
        stop.cancel();
        let err = runner()
            .execute(
                &SourceUnit::new("while (true) {}"),
                ExecutionContext::empty(),
                TimeoutSignal::on_stop(stop),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Aborted));
    }

    #[tokio::test]
    async fn test_stale_lease_unwinds_execution() {
        let counter = GenerationCounter::new();
        let lease = counter.begin();
        counter.bump();
        let ctx = ContextBuilder::new().lease(lease).build().unwrap();
        let err = runner()
            .execute(
                &SourceUnit::new("while (true) {}"),
                ctx,
                TimeoutSignal::never(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Aborted));
    }

    #[tokio::test]
    async fn test_panicking_capability_is_internal() {
        let ctx = ContextBuilder::new()
            .capability("boom", sync_fn("boom", |_| panic!("capability bug")))
            .build()
            .unwrap();
        let err = run("await boom();", ctx).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Internal(_)));
    }

    #[tokio::test]
    async fn test_intrinsics_can_be_disabled() {
        let runner = ExecutionRunner::new(RunnerConfig {
            intrinsics: false,
            ..RunnerConfig::default()
        });
        let err = runner
            .execute(
                &SourceUnit::new("return Math.floor(1.5);"),
                ExecutionContext::empty(),
                TimeoutSignal::never(),
            )
            .await
            .unwrap_err();
        assert!(err.is_runtime());
    }

    #[tokio::test]
    async fn test_stats_track_outcomes() {
        let runner = runner();
        let ok = SourceUnit::new("return 1;");
        let bad = SourceUnit::new("throw new Error('bad');");
        runner
            .execute(&ok, ExecutionContext::empty(), TimeoutSignal::never())
            .await
            .unwrap();
        runner
            .execute(&bad, ExecutionContext::empty(), TimeoutSignal::never())
            .await
            .unwrap_err();
        runner
            .execute(
                &SourceUnit::new("while (true) {}"),
                ExecutionContext::empty(),
                TimeoutSignal::after(Duration::from_millis(20)),
            )
            .await
            .unwrap_err();

        let stats = runner.get_stats().await;
        assert_eq!(stats.total_executions, 3);
        assert_eq!(stats.successful_executions, 1);
        assert_eq!(stats.failed_executions, 2);
        assert_eq!(stats.timed_out_executions, 1);
    }
}

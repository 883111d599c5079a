//! # blockrun — execution core for block-coding puzzles
//!
//! Learners assemble blocks that compile to a small JavaScript-like script.
//! `blockrun` runs that script inside a bounded, time-limited, cancellable
//! interpreter, with nothing visible to it but the bindings the puzzle
//! chooses to expose:
//!
//! - **Context building**: capabilities and state values become a flat,
//!   validated set of bindings ([`ContextBuilder`]).
//! - **Execution**: the script becomes the body of a strict async function
//!   whose parameters are those bindings, run by an async tree-walking
//!   interpreter ([`ExecutionRunner`]).
//! - **Racing**: every execution is raced against a caller-owned
//!   [`TimeoutSignal`]. The loser is abandoned, not killed: a generation
//!   lease makes its capabilities refuse and its interpreter unwind.
//! - **Attempts**: the [`Orchestrator`] owns timeouts, "stop", generation
//!   bumping and learner-facing [`Feedback`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use blockrun::{Orchestrator, RopeBoard, SourceUnit};
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = Orchestrator::default();
//!     let board = RopeBoard::new(10.0);
//!     let report = orchestrator
//!         .run(&SourceUnit::new("await addCut(5); return cuts();"), &[&board])
//!         .await;
//!     println!("{}", report.feedback.message());
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `cli` | Builds the `blockrun` binary (clap, anyhow, tracing-subscriber) |

pub mod capabilities;
pub mod config;
pub mod core;
pub mod error;
pub mod evaluator;
pub mod orchestrator;
pub mod sandbox;
pub mod script;

pub use crate::capabilities::{RopeBoard, StandardCapabilities};
pub use crate::config::{ConfigFormat, EngineConfig};
pub use crate::core::{
    CapabilitySet, ContextBuilder, DiagnosticLevel, DiagnosticRecord, DiagnosticSink,
    ExecutionContext, FakeIdGenerator, GenerationCounter, GenerationLease, IdGenerator,
    MemorySink, RealIdGenerator, SignalFired, TimeoutSignal, TracingSink,
};
pub use crate::error::{ConfigError, ConstructionError, ExecutionError, ExecutionOutcome};
pub use crate::evaluator::{host_fn, sync_fn, HostError, HostFunction, HostResult, Value};
pub use crate::orchestrator::{Attempt, AttemptReport, Feedback, Orchestrator, OrchestratorConfig};
pub use crate::sandbox::{
    AbandonPolicy, CodeRunner, ExecutionRunner, ExecutionStats, RunnerConfig, SourceUnit,
};

pub mod context;
pub mod diagnostics;
pub mod generation;
pub mod runtime_context;
pub mod timeout;

pub use context::{CapabilitySet, ContextBuilder, ExecutionContext};
pub use diagnostics::{
    DiagnosticLevel,
    DiagnosticRecord,
    DiagnosticSink,
    FilteredSink,
    MemorySink,
    TracingSink,
};
pub use generation::{GenerationCounter, GenerationLease};
pub use runtime_context::{FakeIdGenerator, IdGenerator, RealIdGenerator};
pub use timeout::{SignalFired, TimeoutSignal};

//! Capabilities every puzzle gets: `sleep` and `console`.

use std::sync::Arc;
use std::time::Duration;

use super::guard::guard;
use crate::core::{CapabilitySet, DiagnosticLevel, DiagnosticRecord, DiagnosticSink, GenerationLease};
use crate::evaluator::type_coercion::{to_f64, to_string};
use crate::evaluator::{host_fn, sync_fn, HostFunction, PropertyMap, Value};

/// Longest single `sleep`, in milliseconds.
const MAX_SLEEP_MS: f64 = 60_000.0;

/// `sleep(ms)`: suspends the script. Used by generated code to pace
/// animations, and the common suspension point inside learner loops.
pub fn sleep() -> Arc<dyn HostFunction> {
    host_fn("sleep", |args: Vec<Value>| async move {
        let ms = args.first().map(to_f64).unwrap_or(0.0);
        let ms = if ms.is_nan() { 0.0 } else { ms.clamp(0.0, MAX_SLEEP_MS) };
        tokio::time::sleep(Duration::from_micros((ms * 1000.0) as u64)).await;
        Ok(Value::Undefined)
    })
}

fn format_args(args: &[Value]) -> String {
    args.iter().map(to_string).collect::<Vec<_>>().join(" ")
}

fn console_method(level: DiagnosticLevel, sink: Arc<dyn DiagnosticSink>) -> Arc<dyn HostFunction> {
    sync_fn(level.as_str(), move |args| {
        sink.emit(DiagnosticRecord::new(level, format_args(&args)));
        Ok(Value::Undefined)
    })
}

const CONSOLE_LEVELS: [DiagnosticLevel; 4] = [
    DiagnosticLevel::Log,
    DiagnosticLevel::Info,
    DiagnosticLevel::Warn,
    DiagnosticLevel::Error,
];

fn console_with<W>(sink: &Arc<dyn DiagnosticSink>, wrap: W) -> Value
where
    W: Fn(Arc<dyn HostFunction>) -> Arc<dyn HostFunction>,
{
    let methods: PropertyMap = CONSOLE_LEVELS
        .into_iter()
        .map(|level| {
            let method = wrap(console_method(level, sink.clone()));
            (level.as_str(), Value::host(method))
        })
        .collect();
    Value::object(methods)
}

/// The `console` object. Output goes to `sink`, never to the host's stdout.
pub fn console(sink: Arc<dyn DiagnosticSink>) -> Value {
    console_with(&sink, |method| method)
}

/// `sleep` and `console`, guarded by the attempt's lease.
#[derive(Clone)]
pub struct StandardCapabilities {
    sink: Arc<dyn DiagnosticSink>,
}

impl StandardCapabilities {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }
}

impl CapabilitySet for StandardCapabilities {
    fn bindings(&self, lease: &GenerationLease) -> Vec<(String, Value)> {
        vec![
            ("sleep".to_string(), Value::host(guard(sleep(), lease))),
            (
                "console".to_string(),
                console_with(&self.sink, |method| guard(method, lease)),
            ),
        ]
    }
}

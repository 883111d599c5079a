//! Where executed code's `console` output goes.
//!
//! Executed code never touches the host's stdout. Its `console.*` calls are
//! turned into [`DiagnosticRecord`]s and handed to a [`DiagnosticSink`],
//! which the host can filter, capture, or forward to `tracing`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Log,
    Info,
    Warn,
    Error,
}

impl DiagnosticLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticLevel::Log => "log",
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Warn => "warn",
            DiagnosticLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub level: DiagnosticLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticRecord {
    pub fn new(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, record: DiagnosticRecord);
}

/// Forwards records to `tracing` under the `blockrun::script` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, record: DiagnosticRecord) {
        match record.level {
            DiagnosticLevel::Log | DiagnosticLevel::Info => {
                tracing::info!(target: "blockrun::script", kind = record.level.as_str(), "{}", record.message)
            }
            DiagnosticLevel::Warn => {
                tracing::warn!(target: "blockrun::script", "{}", record.message)
            }
            DiagnosticLevel::Error => {
                tracing::error!(target: "blockrun::script", "{}", record.message)
            }
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, record: DiagnosticRecord) {
        self.records.lock().push(record);
    }
}

type Predicate = Box<dyn Fn(&DiagnosticRecord) -> bool + Send + Sync>;

/// Drops records rejected by any of its predicates before forwarding.
pub struct FilteredSink {
    inner: Arc<dyn DiagnosticSink>,
    predicates: Vec<Predicate>,
}

impl FilteredSink {
    pub fn new(inner: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            inner,
            predicates: Vec::new(),
        }
    }

    /// Keep only records for which `keep` returns `true`.
    pub fn filter<F>(mut self, keep: F) -> Self
    where
        F: Fn(&DiagnosticRecord) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Box::new(keep));
        self
    }

    pub fn min_level(self, level: DiagnosticLevel) -> Self {
        self.filter(move |record| record.level >= level)
    }

    /// Drop records whose message contains `pattern`.
    pub fn suppress_containing(self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        self.filter(move |record| !record.message.contains(&pattern))
    }
}

impl DiagnosticSink for FilteredSink {
    fn emit(&self, record: DiagnosticRecord) {
        if self.predicates.iter().all(|keep| keep(&record)) {
            self.inner.emit(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_captures_in_order() {
        let sink = MemorySink::new();
        sink.emit(DiagnosticRecord::new(DiagnosticLevel::Log, "first"));
        sink.emit(DiagnosticRecord::new(DiagnosticLevel::Error, "second"));
        assert_eq!(sink.messages(), vec!["first", "second"]);
        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_filtered_sink_applies_every_predicate() {
        let memory = Arc::new(MemorySink::new());
        let sink = FilteredSink::new(memory.clone())
            .min_level(DiagnosticLevel::Info)
            .suppress_containing("deprecated");

        sink.emit(DiagnosticRecord::new(DiagnosticLevel::Log, "chatty"));
        sink.emit(DiagnosticRecord::new(DiagnosticLevel::Warn, "deprecated block"));
        sink.emit(DiagnosticRecord::new(DiagnosticLevel::Warn, "rope is short"));

        assert_eq!(memory.messages(), vec!["rope is short"]);
    }
}

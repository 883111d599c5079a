use std::sync::atomic::{AtomicU64, Ordering};

/// Source of attempt identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

// --- Real implementation ---

#[derive(Debug, Default)]
pub struct RealIdGenerator;

impl IdGenerator for RealIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

// --- Fake implementation ---

/// Deterministic ids (`prefix-1`, `prefix-2`, ...) for tests.
#[derive(Debug)]
pub struct FakeIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl FakeIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for FakeIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::GenerationLease;
use crate::evaluator::{HostError, HostFunction, HostResult, Value};

/// A host function that refuses to run once its lease is stale.
pub struct Guarded {
    inner: Arc<dyn HostFunction>,
    lease: GenerationLease,
}

impl Guarded {
    pub fn new(inner: Arc<dyn HostFunction>, lease: GenerationLease) -> Self {
        Self { inner, lease }
    }

    pub fn lease(&self) -> &GenerationLease {
        &self.lease
    }
}

#[async_trait]
impl HostFunction for Guarded {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn call(&self, args: Vec<Value>) -> HostResult {
        if self.lease.is_stale() {
            tracing::debug!(
                capability = self.inner.name(),
                generation = self.lease.generation(),
                "refusing call from stale attempt"
            );
            return Err(HostError::Refused);
        }
        self.inner.call(args).await
    }
}

/// Wrap `inner` so it only runs while `lease` is current.
pub fn guard(inner: Arc<dyn HostFunction>, lease: &GenerationLease) -> Arc<dyn HostFunction> {
    Arc::new(Guarded::new(inner, lease.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GenerationCounter;
    use crate::evaluator::sync_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_guard_refuses_after_bump() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let inner = sync_fn("mark", move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Undefined)
        });
        let counter = GenerationCounter::new();
        let lease = counter.begin();
        let guarded = guard(inner, &lease);

        assert!(guarded.call(vec![]).await.is_ok());
        counter.bump();
        assert!(matches!(guarded.call(vec![]).await, Err(HostError::Refused)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(guarded.name(), "mark");
    }
}

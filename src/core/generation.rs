//! Generation counter used to invalidate abandoned attempts.
//!
//! Every attempt takes a [`GenerationLease`] when it starts. Bumping the
//! counter (on timeout, stop, or a newer attempt) makes every outstanding
//! lease stale; capabilities check their lease before producing effects.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Invalidate all leases taken so far. Returns the new generation.
    pub fn bump(&self) -> u64 {
        self.current.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Start a new generation and hand out a lease for it.
    pub fn begin(&self) -> GenerationLease {
        let generation = self.bump();
        GenerationLease {
            generation,
            counter: self.current.clone(),
        }
    }

    /// Bump only if `lease` is still current, so a finished attempt never
    /// invalidates a newer one. Returns whether the bump happened.
    pub fn invalidate(&self, lease: &GenerationLease) -> bool {
        self.current
            .compare_exchange(
                lease.generation,
                lease.generation + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Lease for the current generation without invalidating anything.
    pub fn lease(&self) -> GenerationLease {
        GenerationLease {
            generation: self.current(),
            counter: self.current.clone(),
        }
    }
}

/// Snapshot of the generation an attempt belongs to.
#[derive(Debug, Clone)]
pub struct GenerationLease {
    generation: u64,
    counter: Arc<AtomicU64>,
}

impl GenerationLease {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::Acquire) == self.generation
    }

    pub fn is_stale(&self) -> bool {
        !self.is_current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_only_touches_current_lease() {
        let counter = GenerationCounter::new();
        let old = counter.begin();
        let newer = counter.begin();
        assert!(!counter.invalidate(&old));
        assert!(newer.is_current());
        assert!(counter.invalidate(&newer));
        assert!(newer.is_stale());
    }

    #[test]
    fn test_bump_invalidates_outstanding_leases() {
        let counter = GenerationCounter::new();
        let first = counter.begin();
        assert!(first.is_current());

        let second = counter.begin();
        assert!(first.is_stale());
        assert!(second.is_current());
        assert_eq!(second.generation(), first.generation() + 1);

        counter.bump();
        assert!(second.is_stale());
    }

    #[test]
    fn test_lease_observes_without_bumping() {
        let counter = GenerationCounter::new();
        let before = counter.current();
        let lease = counter.lease();
        assert_eq!(counter.current(), before);
        assert!(lease.is_current());
    }
}

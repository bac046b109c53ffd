//! Concurrent key-presence sets guarding duplicate work.
//!
//! The runner keeps two of these: database ids with a backup job running and
//! instance ids with a binlog download running. The check-and-insert is
//! atomic under one mutex so two ticks can never both observe "absent" and
//! both launch work; the mutex is held only for the membership test, never
//! across a network call.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Membership set preventing duplicate concurrent work on the same key.
#[derive(Debug, Clone, Default)]
pub struct InflightSet {
    inner: Arc<Mutex<HashSet<i64>>>,
}

impl InflightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim a key. Returns a guard whose Drop releases the claim,
    /// or `None` if the key is already in flight.
    pub fn claim(&self, id: i64) -> Option<InflightGuard> {
        let mut set = self.lock();
        if set.insert(id) {
            Some(InflightGuard {
                set: Arc::clone(&self.inner),
                id,
            })
        } else {
            None
        }
    }

    /// Whether a key is currently claimed.
    pub fn contains(&self, id: i64) -> bool {
        self.lock().contains(&id)
    }

    /// Number of keys currently claimed.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<i64>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII claim on one key. The claim clears unconditionally when the guard
/// drops, so a worker that fails or panics still frees its resource.
#[derive(Debug)]
pub struct InflightGuard {
    set: Arc<Mutex<HashSet<i64>>>,
    id: i64,
}

impl InflightGuard {
    pub fn id(&self) -> i64 {
        self.id
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive() {
        let set = InflightSet::new();

        let guard = set.claim(7).expect("first claim succeeds");
        assert!(set.contains(7));
        assert!(set.claim(7).is_none(), "second claim must fail");

        // A different key is independent
        let other = set.claim(8).expect("distinct key claimable");
        assert_eq!(set.len(), 2);

        drop(guard);
        assert!(!set.contains(7));
        assert!(set.claim(7).is_some(), "released key claimable again");
        drop(other);
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let set = InflightSet::new();
        let cloned = set.clone();

        let result = std::panic::catch_unwind(move || {
            let _guard = cloned.claim(1).unwrap();
            panic!("worker died");
        });
        assert!(result.is_err());
        assert!(!set.contains(1), "claim must clear when the worker panics");
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let set = InflightSet::new();
        // Guards are parked here so no claim is released mid-race
        let winners = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let set = set.clone();
            let winners = Arc::clone(&winners);
            handles.push(std::thread::spawn(move || {
                if let Some(guard) = set.claim(42) {
                    winners.lock().unwrap().push(guard);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(winners.lock().unwrap().len(), 1, "exactly one claimant may win");
    }
}

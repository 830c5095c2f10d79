use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tracks which users currently have a verification run in flight.
///
/// A run holds a [`CheckPermit`]; dropping it releases the user's slot, so the
/// slot is freed on every exit path including panics and cancelled futures.
#[derive(Clone, Default)]
pub struct ConcurrencyGuard {
    in_flight: Arc<Mutex<HashSet<i64>>>,
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when a run for `user_id` is already in flight. The
    /// existing permit is left untouched in that case.
    pub fn try_acquire(&self, user_id: i64) -> Option<CheckPermit> {
        if !self.lock().insert(user_id) {
            return None;
        }
        Some(CheckPermit {
            user_id,
            in_flight: self.in_flight.clone(),
        })
    }

    pub fn is_checking(&self, user_id: i64) -> bool {
        self.lock().contains(&user_id)
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<i64>> {
        // The set is always left consistent, so a poisoned lock is still usable
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive right to run a payment check for one user.
#[derive(Debug)]
pub struct CheckPermit {
    user_id: i64,
    in_flight: Arc<Mutex<HashSet<i64>>>,
}

impl CheckPermit {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn release(self) {}
}

impl Drop for CheckPermit {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user_id);
        tracing::debug!("Released payment check slot for user {}", self.user_id);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::MIN_PAUSE_POLL;

/// Cancel and pause flags shared between a running scan and its controllers.
///
/// All three operations only flip a flag and are safe to call from any
/// thread at any time, any number of times.
#[derive(Debug, Default)]
pub struct ScanControl {
    cancelled: AtomicBool,
    paused: Mutex<bool>,
    wake: Condvar,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // Take the lock so a waiter between its flag check and `wait` can't miss this.
        let _paused = self.lock_paused();
        self.wake.notify_all();
    }

    pub fn pause(&self) {
        *self.lock_paused() = true;
    }

    pub fn resume(&self) {
        *self.lock_paused() = false;
        self.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        *self.lock_paused()
    }

    /// Block while paused. Returns `false` if the scan was cancelled,
    /// whether before, during or instead of the pause.
    ///
    /// `poll` bounds each wait so a missed wakeup costs at most one interval.
    pub fn wait_while_paused(&self, poll: Duration) -> bool {
        let poll = poll.max(MIN_PAUSE_POLL);
        let mut paused = self.lock_paused();
        while *paused && !self.is_cancelled() {
            paused = self
                .wake
                .wait_timeout(paused, poll)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        !self.is_cancelled()
    }

    /// Sleep for `delay`, waking early on cancel. Returns `false` if cancelled.
    pub fn sleep_unless_cancelled(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        let mut guard = self.lock_paused();
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            guard = self
                .wake
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn lock_paused(&self) -> MutexGuard<'_, bool> {
        self.paused.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

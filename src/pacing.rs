//! Pause-after-every-N-calls policy for the routing service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::Duration;

use tracing::info;

/// Pause for `pause` whenever the upstream call count reaches a positive
/// multiple of `every`. `every == 0` disables pacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingPolicy {
    pub every: usize,
    pub pause: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            every: 0,
            pause: Duration::from_secs(1),
        }
    }
}

impl PacingPolicy {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.every > 0
    }
}

/// Applies a [`PacingPolicy`] to upstream calls made from any number of threads.
///
/// Calls are admitted one at a time and numbered. Before admitting the call
/// after each threshold, the pacer waits for every call in flight to finish
/// and then sleeps, so no upstream traffic happens during a pause.
#[derive(Debug)]
pub struct Pacer {
    policy: PacingPolicy,
    admitted: Mutex<usize>,
    gate: RwLock<()>,
    pauses: AtomicUsize,
}

impl Pacer {
    pub fn new(policy: PacingPolicy) -> Self {
        Self {
            policy,
            admitted: Mutex::new(0),
            gate: RwLock::new(()),
            pauses: AtomicUsize::new(0),
        }
    }

    /// Runs one upstream call, pausing first if a threshold was just reached.
    pub fn run<T>(&self, call: impl FnOnce() -> T) -> T {
        if !self.policy.is_enabled() {
            return call();
        }

        let _in_flight = {
            let mut admitted = lock(&self.admitted);
            if *admitted > 0 && *admitted % self.policy.every == 0 {
                let _quiet = write(&self.gate);
                self.pauses.fetch_add(1, Ordering::Relaxed);
                info!(
                    calls = *admitted,
                    pause_ms = self.policy.pause.as_millis() as u64,
                    "pausing routing requests"
                );
                thread::sleep(self.policy.pause);
            }
            *admitted += 1;
            read(&self.gate)
        };

        call()
    }

    /// Number of pauses taken so far.
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::Relaxed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

//! # Wake Bridge
//!
//! Interrupt-driven wake scheduling for blocked waits.
//!
//! A caller about to sleep on a counter threshold registers a wake action
//! with the bridge; the interrupt dispatch path wakes the waiter when the
//! counter reaches the threshold. Registrations are explicit resources
//! and must be released exactly once regardless of the wait outcome.

use alloc::sync::Arc;

use ember_core::{CounterId, Result};

// =============================================================================
// WAITER
// =============================================================================

/// Outcome of a single timed block on a waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Woken by the interrupt path (or another producer)
    Woken,
    /// The block period elapsed without a wake
    TimedOut,
    /// Interrupted by the caller's environment
    Interrupted,
}

/// A per-wait parking spot the interrupt path can wake.
///
/// Spurious wakes are allowed; callers re-check their condition after
/// every return from `block`.
pub trait Waiter: Send + Sync {
    /// Block the calling thread until woken, interrupted, or
    /// `timeout_ms` elapses, whichever comes first.
    fn block(&self, timeout_ms: u32) -> WaitOutcome;

    /// Wake every thread blocked on this waiter.
    fn wake(&self);

    /// Interrupt every thread blocked on this waiter.
    fn interrupt(&self);
}

// =============================================================================
// WAKE TOKEN
// =============================================================================

/// Opaque wake-registration handle.
///
/// Returned by [`WakeBridge::register_wake`] and consumed by
/// [`WakeBridge::release`]; released exactly once per registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct WakeToken(u64);

impl WakeToken {
    /// Create a token from a raw bridge-assigned value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

// =============================================================================
// WAKE BRIDGE TRAIT
// =============================================================================

/// Wake-action registration service backed by the interrupt dispatcher.
pub trait WakeBridge: Send + Sync {
    /// Concrete waiter type this bridge can wake.
    type Waiter: Waiter + 'static;

    /// Allocate a waiter usable with `register_wake`.
    fn waiter(&self) -> Arc<Self::Waiter>;

    /// Schedule a wake of `waiter` once counter `id` reaches `thresh`.
    ///
    /// Fails with a resource-exhaustion error when the dispatcher is out
    /// of action slots.
    fn register_wake(
        &self,
        id: CounterId,
        thresh: u32,
        waiter: &Arc<Self::Waiter>,
    ) -> Result<WakeToken>;

    /// Release a registration obtained from `register_wake`.
    fn release(&self, token: WakeToken);
}

// =============================================================================
// STD WAITER
// =============================================================================

#[cfg(feature = "std")]
mod std_waiter {
    use std::sync::{Condvar, Mutex};
    use std::time::{Duration, Instant};

    use super::{WaitOutcome, Waiter};

    #[derive(Default)]
    struct State {
        woken: bool,
        interrupted: bool,
    }

    /// Condvar-backed waiter for hosted environments.
    ///
    /// Wake and interrupt signals arriving while no thread is blocked are
    /// latched and consumed by the next `block`.
    #[derive(Default)]
    pub struct StdWaiter {
        state: Mutex<State>,
        cv: Condvar,
    }

    impl StdWaiter {
        /// Create a waiter with no pending signal.
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Waiter for StdWaiter {
        fn block(&self, timeout_ms: u32) -> WaitOutcome {
            let start = Instant::now();
            let timeout = Duration::from_millis(u64::from(timeout_ms));
            let mut state = self.state.lock().expect("waiter mutex poisoned");
            loop {
                if state.interrupted {
                    state.interrupted = false;
                    return WaitOutcome::Interrupted;
                }
                if state.woken {
                    state.woken = false;
                    return WaitOutcome::Woken;
                }
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    return WaitOutcome::TimedOut;
                }
                let (guard, _) = self
                    .cv
                    .wait_timeout(state, timeout - elapsed)
                    .expect("waiter condvar poisoned");
                state = guard;
            }
        }

        fn wake(&self) {
            let mut state = self.state.lock().expect("waiter mutex poisoned");
            state.woken = true;
            self.cv.notify_all();
        }

        fn interrupt(&self) {
            let mut state = self.state.lock().expect("waiter mutex poisoned");
            state.interrupted = true;
            self.cv.notify_all();
        }
    }
}

#[cfg(feature = "std")]
pub use std_waiter::StdWaiter;

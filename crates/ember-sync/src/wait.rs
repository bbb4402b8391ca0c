//! # Wait Engine
//!
//! Blocking waits on counter thresholds.
//!
//! A wait runs through a fixed sequence, each step short-circuiting on
//! success: keep-alive acquisition, shadow cache check, live hardware
//! re-check, zero-timeout fast fail, wake registration, then a
//! bounded-period sleep loop. The loop re-checks the shadow after every
//! wake; the interrupt dispatch path is expected to publish the reached
//! value to the shadow before firing the wake action.
//!
//! Sleeping is chopped into fixed periods so a stalled counter surfaces
//! as periodic diagnostics instead of a silent hang.

use ember_core::{ConsistencyKind, CounterId, Error, Result, NO_TIMEOUT};
use ember_hal::{BusyGuard, Host, WaitOutcome, Waiter, WakeBridge};

use crate::bank::SyncptBank;
use crate::wrap;

/// Longest single sleep before a stalled wait re-checks and logs, in
/// milliseconds.
pub const STALL_CHECK_PERIOD_MS: u32 = 2_000;

impl<H: Host> SyncptBank<H> {
    /// Block until counter `id` reaches `thresh`, or `timeout_ms`
    /// elapses, or the caller is interrupted.
    ///
    /// `timeout_ms` of zero never blocks; [`NO_TIMEOUT`] waits forever.
    /// Unmet thresholds surface as [`Error::Timeout`], interruption as
    /// [`Error::Interrupted`]. The threshold must be within the
    /// authorized max for host-managed counters; waiting past the
    /// reservation is a caller bug and reports a consistency error.
    pub fn wait(&self, id: CounterId, thresh: u32, timeout_ms: u32) -> Result<()> {
        self.check_id(id)?;
        if !self.check_max(id, thresh) {
            return Err(self.consistency(ConsistencyKind::ThresholdBeyondMax, id));
        }

        // keep the device alive for the rest of the call
        let _busy = BusyGuard::new(self.host().power());

        // check cache
        if self.store().min_reaches(id, thresh) {
            return Ok(());
        }

        // try to read from the register
        if self.client_managed(id) || !self.store().min_eq_max(id) {
            let live = self.refresh_min(id)?;
            if wrap::reaches_or_passed(live, thresh) {
                return Ok(());
            }
        }

        if timeout_ms == 0 {
            return Err(Error::Timeout);
        }

        // schedule a wakeup when the counter value is reached
        let bridge = self.host().bridge();
        let waiter = bridge.waiter();
        let token = bridge.register_wake(id, thresh, &waiter)?;

        // wait for the counter, or timeout, or interruption
        let mut remaining = timeout_ms;
        let result = loop {
            let check = if remaining == NO_TIMEOUT {
                STALL_CHECK_PERIOD_MS
            } else {
                remaining.min(STALL_CHECK_PERIOD_MS)
            };
            let outcome = waiter.block(check);
            if self.store().min_reaches(id, thresh) {
                break Ok(());
            }
            if outcome == WaitOutcome::Interrupted {
                break Err(Error::Interrupted);
            }
            if remaining != NO_TIMEOUT {
                remaining = remaining.saturating_sub(STALL_CHECK_PERIOD_MS);
                if remaining == 0 {
                    break Err(Error::Timeout);
                }
            }
            // quiesced during suspend/resume, when parked waiters are
            // expected to stall and a warning per period per waiter
            // would flood the transition
            if !self.quiesced() {
                log::warn!(
                    "counter {} ({}) stuck waiting for {} remaining {} ms",
                    id,
                    self.config().name_of(id),
                    thresh,
                    remaining
                );
            }
        };
        bridge.release(token);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BankConfig;
    use ember_hal::sim::SimHost;
    use std::thread;
    use std::time::Duration;

    fn bank() -> SyncptBank<SimHost> {
        SyncptBank::new(SimHost::new(), BankConfig::reference())
    }

    const ID: CounterId = CounterId::new(20);

    #[test]
    fn test_wait_satisfied_from_cache() {
        let bank = bank();
        bank.wait(ID, 0, NO_TIMEOUT).unwrap();
        assert_eq!(bank.host().read_count(), 0);
        assert_eq!(bank.host().registration_count(), 0);
        assert_eq!(bank.host().busy_count(), 1);
        assert_eq!(bank.host().idle_count(), 1);
    }

    #[test]
    fn test_wait_satisfied_from_live_recheck() {
        let bank = bank();
        bank.incr_max(ID, 3).unwrap();
        bank.host().set_counter(ID, 3);
        bank.wait(ID, 3, NO_TIMEOUT).unwrap();
        assert_eq!(bank.host().read_count(), 1);
        assert_eq!(bank.host().registration_count(), 0);
    }

    #[test]
    fn test_zero_timeout_fails_fast_without_registration() {
        let bank = bank();
        bank.incr_max(ID, 5).unwrap();
        assert_eq!(bank.wait(ID, 5, 0), Err(Error::Timeout));
        assert_eq!(bank.host().registration_count(), 0);
        assert_eq!(bank.host().busy_count(), 1);
        assert_eq!(bank.host().idle_count(), 1);
    }

    #[test]
    fn test_wait_satisfied_by_interrupt_wake() {
        let bank = bank();
        bank.incr_max(ID, 5).unwrap();

        thread::scope(|scope| {
            scope.spawn(|| {
                thread::sleep(Duration::from_millis(30));
                // dispatch order: hardware advances, the handler
                // publishes the value to the shadow, then wakes
                bank.host().set_counter(ID, 5);
                bank.refresh_min(ID).unwrap();
                bank.host().wake_counter(ID);
            });
            bank.wait(ID, 5, 10_000).unwrap();
        });

        assert_eq!(bank.host().registration_count(), 1);
        assert_eq!(bank.host().release_count(), 1);
        assert_eq!(bank.host().active_registrations(), 0);
        assert_eq!(bank.host().busy_count(), bank.host().idle_count());
    }

    #[test]
    fn test_infinite_wait_completes_on_wake() {
        let bank = bank();
        bank.incr_max(ID, 1).unwrap();

        thread::scope(|scope| {
            scope.spawn(|| {
                thread::sleep(Duration::from_millis(30));
                bank.host().set_counter(ID, 1);
                bank.refresh_min(ID).unwrap();
                bank.host().wake_counter(ID);
            });
            bank.wait(ID, 1, NO_TIMEOUT).unwrap();
        });
        assert_eq!(bank.host().release_count(), 1);
    }

    #[test]
    fn test_wait_interrupted() {
        let bank = bank();
        bank.incr_max(ID, 5).unwrap();

        thread::scope(|scope| {
            scope.spawn(|| {
                thread::sleep(Duration::from_millis(30));
                bank.host().interrupt_waiters();
            });
            assert_eq!(bank.wait(ID, 5, 10_000), Err(Error::Interrupted));
        });

        assert_eq!(bank.host().release_count(), 1);
        assert_eq!(bank.host().busy_count(), bank.host().idle_count());
    }

    #[test]
    fn test_wait_times_out() {
        let bank = bank();
        bank.incr_max(ID, 5).unwrap();
        assert_eq!(bank.wait(ID, 5, 50), Err(Error::Timeout));
        assert_eq!(bank.host().registration_count(), 1);
        assert_eq!(bank.host().release_count(), 1);
        assert_eq!(bank.host().busy_count(), bank.host().idle_count());
    }

    #[test]
    fn test_quiesced_wait_still_times_out() {
        let bank = bank();
        bank.incr_max(ID, 5).unwrap();
        bank.set_quiesced(true);
        assert_eq!(bank.wait(ID, 5, 50), Err(Error::Timeout));
        bank.set_quiesced(false);
    }

    #[test]
    fn test_registration_failure_propagates_and_balances_power() {
        let bank = SyncptBank::new(SimHost::with_wake_capacity(0), BankConfig::reference());
        bank.incr_max(ID, 5).unwrap();
        assert_eq!(bank.wait(ID, 5, 1_000), Err(Error::NoWakeSlots));
        assert_eq!(bank.host().registration_count(), 0);
        assert_eq!(bank.host().busy_count(), 1);
        assert_eq!(bank.host().idle_count(), 1);
    }

    #[test]
    fn test_threshold_beyond_reservation_is_consistency_error() {
        let bank = bank();
        let err = bank.wait(ID, 1, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::Consistency(e) if e.kind == ConsistencyKind::ThresholdBeyondMax
        ));
        // rejected before any device activity
        assert_eq!(bank.host().busy_count(), 0);
    }

    #[test]
    fn test_client_managed_wait_ignores_reservations() {
        let bank = bank();
        let id = CounterId::new(26);
        bank.host().set_counter(id, 2);
        // no reservation exists, the live re-check still runs
        bank.wait(id, 2, NO_TIMEOUT).unwrap();
        assert_eq!(bank.host().read_count(), 1);
    }
}

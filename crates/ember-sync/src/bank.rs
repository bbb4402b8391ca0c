//! # Syncpoint Bank
//!
//! The owning type for one sync block: shadow store, hardware
//! description, and the platform service bundle, plus the bridge
//! operations that keep shadow and hardware consistent.
//!
//! Contract violations (a threshold beyond what was reserved, an
//! increment with nothing outstanding, an id outside the bank) are
//! reported as consistency errors with a full counter snapshot; they
//! indicate a broken caller or lost hardware state, not a transient
//! condition, and are never retried internally.

use core::sync::atomic::{AtomicBool, Ordering};

use ember_core::{
    ConsistencyError, ConsistencyKind, CounterDiag, CounterId, Error, Result, NUM_COUNTERS,
    NUM_WAIT_BASES,
};
use ember_hal::regs::{counter_value, registers, wait_base_value};
use ember_hal::{barrier, BusyGuard, Host, RegisterBus};

use crate::config::BankConfig;
use crate::store::ShadowStore;
use crate::wrap;

// =============================================================================
// SYNCPT BANK
// =============================================================================

/// Shadowed syncpoint bank bound to one device.
pub struct SyncptBank<H: Host> {
    host: H,
    config: BankConfig,
    store: ShadowStore,
    quiesced: AtomicBool,
}

impl<H: Host> SyncptBank<H> {
    /// Create a bank over `host` with the given hardware description.
    pub fn new(host: H, config: BankConfig) -> Self {
        Self {
            host,
            config,
            store: ShadowStore::new(),
            quiesced: AtomicBool::new(false),
        }
    }

    /// Get the platform service bundle.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Get the hardware description.
    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Shadow accessors
    // -------------------------------------------------------------------------

    /// Last hardware-confirmed value of counter `id`.
    pub fn read_min(&self, id: CounterId) -> u32 {
        self.store.read_min(id)
    }

    /// Highest authorized value of counter `id`.
    pub fn read_max(&self, id: CounterId) -> u32 {
        self.store.read_max(id)
    }

    /// Whether the shadow min of `id` has reached `thresh`.
    pub fn min_reaches(&self, id: CounterId, thresh: u32) -> bool {
        self.store.min_reaches(id, thresh)
    }

    /// Whether all authorized work on `id` has been confirmed complete.
    pub fn min_eq_max(&self, id: CounterId) -> bool {
        self.store.min_eq_max(id)
    }

    /// Reserve `delta` future increments on `id`; returns the new max.
    pub fn incr_max(&self, id: CounterId, delta: u32) -> Result<u32> {
        self.check_id(id)?;
        Ok(self.store.incr_max(id, delta))
    }

    /// Symbolic name of counter `id`, or the empty string.
    pub fn name(&self, id: CounterId) -> Result<&'static str> {
        self.check_id(id)?;
        Ok(self.config.name_of(id))
    }

    // -------------------------------------------------------------------------
    // Suspend/resume quiescing
    // -------------------------------------------------------------------------

    /// Suppress stall diagnostics during power-state transitions.
    ///
    /// Waits keep running and timing out normally; only the periodic
    /// stall warning is muted, so a suspend path is not stalled by a log
    /// storm from every parked waiter.
    pub fn set_quiesced(&self, quiesced: bool) {
        self.quiesced.store(quiesced, Ordering::Relaxed);
    }

    pub(crate) fn quiesced(&self) -> bool {
        self.quiesced.load(Ordering::Relaxed)
    }

    // -------------------------------------------------------------------------
    // Hardware sync bridge
    // -------------------------------------------------------------------------

    /// Write every shadow value back to hardware.
    ///
    /// Used after a reset to restore the last known state. The caller is
    /// responsible for the device being powered.
    pub fn reset(&self) {
        let bus = self.host.bus();
        for index in 0..NUM_COUNTERS {
            let id = CounterId::new(index as u32);
            bus.write32(counter_value(id), self.store.read_min(id));
        }
        for index in 0..NUM_WAIT_BASES {
            bus.write32(
                wait_base_value(index as u32),
                self.store.read_base(index),
            );
        }
        barrier::mb();
    }

    /// Pull client-managed counters and all wait bases into the shadow.
    ///
    /// Host-managed counters must be fully confirmed (`min == max`) at
    /// this point; anything else means outstanding work was lost across
    /// the power transition. The caller is responsible for the device
    /// being powered.
    pub fn save(&self) -> Result<()> {
        for index in 0..NUM_COUNTERS {
            let id = CounterId::new(index as u32);
            if self.config.client_managed(id) {
                self.refresh_min(id)?;
            } else if !self.store.min_eq_max(id) {
                return Err(self.consistency(ConsistencyKind::ShadowOutOfSync, id));
            }
        }
        let bus = self.host.bus();
        for index in 0..NUM_WAIT_BASES {
            self.store
                .set_base(index, bus.read32(wait_base_value(index as u32)));
        }
        Ok(())
    }

    /// Refresh the shadow min of `id` from the live hardware value.
    ///
    /// Loops the compare-and-swap against concurrent refreshers until one
    /// observation sticks, then verifies the live value against the
    /// authorized max. The caller is responsible for the device being
    /// powered. Returns the live value.
    pub fn refresh_min(&self, id: CounterId) -> Result<u32> {
        self.check_id(id)?;
        let bus = self.host.bus();
        let live = loop {
            let old = self.store.read_min(id);
            let live = bus.read32(counter_value(id));
            if self.store.cas_min(id, old, live) {
                break live;
            }
        };
        if !self.check_max(id, live) {
            return Err(self.consistency(ConsistencyKind::MaxExceeded, id));
        }
        Ok(live)
    }

    /// Read the current value of counter `id`, powering the device up
    /// and down around the access.
    pub fn read(&self, id: CounterId) -> Result<u32> {
        self.check_id(id)?;
        let _busy = BusyGuard::new(self.host.power());
        self.refresh_min(id)
    }

    /// Step counter `id` once in hardware, without touching the shadow.
    ///
    /// The caller is responsible for the device being powered. For
    /// host-managed counters there must be outstanding authorized work;
    /// a step with nothing outstanding has no matching reservation.
    pub fn cpu_incr(&self, id: CounterId) -> Result<()> {
        self.check_id(id)?;
        if !self.config.client_managed(id) && self.store.min_eq_max(id) {
            return Err(self.consistency(ConsistencyKind::IncrementWithoutReservation, id));
        }
        self.host
            .bus()
            .write32(registers::COUNTER_CPU_INCR, id.bit());
        barrier::wmb();
        Ok(())
    }

    /// Reserve one increment on `id` and step the hardware.
    pub fn incr(&self, id: CounterId) -> Result<()> {
        self.incr_max(id, 1)?;
        let _busy = BusyGuard::new(self.host.power());
        self.cpu_incr(id)
    }

    /// Log every counter with a non-zero max: id, name, min, max.
    ///
    /// Values are refreshed from hardware as they are dumped. The caller
    /// is responsible for the device being powered.
    pub fn debug_dump(&self) -> Result<()> {
        for index in 0..NUM_COUNTERS {
            let id = CounterId::new(index as u32);
            let max = self.store.read_max(id);
            if max == 0 {
                continue;
            }
            let min = self.refresh_min(id)?;
            log::info!(
                "counter {} ({}) min {} max {}",
                id,
                self.config.name_of(id),
                min,
                max
            );
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internal checks
    // -------------------------------------------------------------------------

    pub(crate) fn check_id(&self, id: CounterId) -> Result<()> {
        if id.is_valid() {
            Ok(())
        } else {
            Err(self.consistency(ConsistencyKind::CounterOutOfRange, id))
        }
    }

    /// Whether `real` is within the authorized bound of `id`.
    /// Client-managed counters have no enforced bound.
    pub(crate) fn check_max(&self, id: CounterId, real: u32) -> bool {
        if self.config.client_managed(id) {
            return true;
        }
        wrap::reaches_or_passed(self.store.read_max(id), real)
    }

    pub(crate) fn client_managed(&self, id: CounterId) -> bool {
        self.config.client_managed(id)
    }

    pub(crate) fn store(&self) -> &ShadowStore {
        &self.store
    }

    /// Build a consistency error, logging the counter snapshot at the
    /// detection site.
    pub(crate) fn consistency(&self, kind: ConsistencyKind, id: CounterId) -> Error {
        let (name, min, max) = if id.is_valid() {
            (
                self.config.name_of(id),
                self.store.read_min(id),
                self.store.read_max(id),
            )
        } else {
            ("", 0, 0)
        };
        log::error!(
            "sync consistency failure: {} on counter {} ({}) min {:#x} max {:#x}",
            kind,
            id,
            name,
            min,
            max
        );
        Error::Consistency(ConsistencyError {
            kind,
            diag: CounterDiag { id, name, min, max },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_hal::sim::SimHost;
    use std::thread;

    fn bank() -> SyncptBank<SimHost> {
        SyncptBank::new(SimHost::new(), BankConfig::reference())
    }

    const CLIENT_MANAGED: CounterId = CounterId::new(26);
    const HOST_MANAGED: CounterId = CounterId::new(20);

    #[test]
    fn test_reserved_then_confirmed_work_reaches_max() {
        let bank = bank();
        bank.incr_max(HOST_MANAGED, 3).unwrap();
        for _ in 0..3 {
            bank.cpu_incr(HOST_MANAGED).unwrap();
        }
        bank.refresh_min(HOST_MANAGED).unwrap();
        assert!(bank.min_eq_max(HOST_MANAGED));
    }

    #[test]
    fn test_incr_reserves_and_steps_hardware() {
        let bank = bank();
        bank.incr(HOST_MANAGED).unwrap();
        assert_eq!(bank.read_max(HOST_MANAGED), 1);
        assert_eq!(bank.host().counter_register(HOST_MANAGED), 1);
        assert_eq!(bank.host().busy_count(), bank.host().idle_count());
    }

    #[test]
    fn test_raw_incr_without_reservation_is_consistency_error() {
        let bank = bank();
        let err = bank.cpu_incr(HOST_MANAGED).unwrap_err();
        assert!(matches!(
            err,
            Error::Consistency(e) if e.kind == ConsistencyKind::IncrementWithoutReservation
        ));
    }

    #[test]
    fn test_client_managed_incr_needs_no_reservation() {
        let bank = bank();
        bank.cpu_incr(CLIENT_MANAGED).unwrap();
        assert_eq!(bank.host().counter_register(CLIENT_MANAGED), 1);
    }

    #[test]
    fn test_read_pairs_busy_with_idle() {
        let bank = bank();
        bank.host().set_counter(HOST_MANAGED, 7);
        bank.incr_max(HOST_MANAGED, 7).unwrap();
        assert_eq!(bank.read(HOST_MANAGED).unwrap(), 7);
        assert_eq!(bank.host().busy_count(), 1);
        assert_eq!(bank.host().idle_count(), 1);
    }

    #[test]
    fn test_refresh_past_max_is_consistency_error() {
        let bank = bank();
        bank.host().set_counter(HOST_MANAGED, 5);
        let err = bank.refresh_min(HOST_MANAGED).unwrap_err();
        assert!(matches!(
            err,
            Error::Consistency(e) if e.kind == ConsistencyKind::MaxExceeded
        ));
    }

    #[test]
    fn test_refresh_past_max_tolerated_when_client_managed() {
        let bank = bank();
        bank.host().set_counter(CLIENT_MANAGED, 5);
        assert_eq!(bank.refresh_min(CLIENT_MANAGED).unwrap(), 5);
    }

    #[test]
    fn test_out_of_range_id_is_consistency_error() {
        let bank = bank();
        let err = bank.name(CounterId::new(32)).unwrap_err();
        assert!(matches!(
            err,
            Error::Consistency(e) if e.kind == ConsistencyKind::CounterOutOfRange
        ));
    }

    #[test]
    fn test_reset_restores_shadow_to_hardware() {
        let bank = bank();
        bank.incr_max(HOST_MANAGED, 2).unwrap();
        bank.host().set_counter(HOST_MANAGED, 2);
        bank.refresh_min(HOST_MANAGED).unwrap();
        // hardware forgets across reset; shadow restores it
        bank.host().set_counter(HOST_MANAGED, 0);
        let writes_before = bank.host().write_count();
        bank.reset();
        assert_eq!(bank.host().counter_register(HOST_MANAGED), 2);
        // one write per counter and per wait base
        assert_eq!(bank.host().write_count() - writes_before, 32 + 8);
    }

    #[test]
    fn test_save_pulls_client_managed_and_bases() {
        let bank = bank();
        bank.host().set_counter(CLIENT_MANAGED, 9);
        bank.host().set_wait_base(2, 0x40);
        bank.save().unwrap();
        assert_eq!(bank.read_min(CLIENT_MANAGED), 9);
        assert_eq!(bank.store().read_base(2), 0x40);
    }

    #[test]
    fn test_save_rejects_desynced_host_managed_counter() {
        let bank = bank();
        bank.incr_max(HOST_MANAGED, 1).unwrap();
        let err = bank.save().unwrap_err();
        assert!(matches!(
            err,
            Error::Consistency(e) if e.kind == ConsistencyKind::ShadowOutOfSync
        ));
    }

    #[test]
    fn test_name_lookup() {
        let bank = bank();
        assert_eq!(bank.name(CounterId::new(20)).unwrap(), "3d");
        assert_eq!(bank.name(CounterId::new(1)).unwrap(), "");
    }

    #[test]
    fn test_concurrent_refresh_converges_without_lost_updates() {
        let bank = bank();
        let id = HOST_MANAGED;
        const STEPS: u32 = 1_000;
        bank.incr_max(id, STEPS).unwrap();

        thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..STEPS {
                    bank.host().advance_counter(id, 1);
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..STEPS {
                        let live = bank.refresh_min(id).unwrap();
                        // the shadow never runs ahead of hardware
                        assert!(crate::wrap::reaches_or_passed(
                            bank.host().counter_register(id),
                            live
                        ));
                    }
                });
            }
        });

        let live = bank.refresh_min(id).unwrap();
        assert_eq!(live, STEPS);
        assert_eq!(bank.read_min(id), STEPS);
        assert!(bank.min_eq_max(id));
    }
}

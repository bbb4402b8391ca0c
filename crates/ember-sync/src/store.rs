//! # Shadow Counter Store
//!
//! Host-side shadow of the hardware counter bank.
//!
//! One slot per counter id holds `min` (the last hardware-confirmed
//! value) and `max` (the highest value producers have been authorized to
//! reach); wait bases are shadowed alongside without max tracking. Slots
//! live for the process lifetime, only their values mutate.
//!
//! All mutation is atomic read-modify-write, so concurrent readers see
//! consistent snapshots without locking. Reads that gate hardware access
//! take a read barrier first; the previous shadow value must be visible
//! across threads before a hardware read replaces it.

use core::sync::atomic::{AtomicU32, Ordering};

use ember_hal::barrier;

use ember_core::{CounterId, NUM_COUNTERS, NUM_WAIT_BASES};

use crate::wrap;

// =============================================================================
// SHADOW SLOT
// =============================================================================

struct Shadow {
    min: AtomicU32,
    max: AtomicU32,
}

#[allow(clippy::declare_interior_mutable_const)]
const SHADOW_ZERO: Shadow = Shadow {
    min: AtomicU32::new(0),
    max: AtomicU32::new(0),
};

#[allow(clippy::declare_interior_mutable_const)]
const BASE_ZERO: AtomicU32 = AtomicU32::new(0);

// =============================================================================
// SHADOW STORE
// =============================================================================

/// Shadowed counter and wait-base values for the whole bank.
///
/// Ids are array indices; callers validate them against the bank
/// geometry before calling in.
pub struct ShadowStore {
    counters: [Shadow; NUM_COUNTERS],
    bases: [AtomicU32; NUM_WAIT_BASES],
}

impl ShadowStore {
    /// Create a store with every shadow at zero.
    pub const fn new() -> Self {
        Self {
            counters: [SHADOW_ZERO; NUM_COUNTERS],
            bases: [BASE_ZERO; NUM_WAIT_BASES],
        }
    }

    #[inline]
    fn slot(&self, id: CounterId) -> &Shadow {
        &self.counters[id.index()]
    }

    /// Last hardware-confirmed value of counter `id`.
    #[inline]
    pub fn read_min(&self, id: CounterId) -> u32 {
        barrier::rmb();
        self.slot(id).min.load(Ordering::Relaxed)
    }

    /// Highest authorized value of counter `id`.
    #[inline]
    pub fn read_max(&self, id: CounterId) -> u32 {
        barrier::rmb();
        self.slot(id).max.load(Ordering::Relaxed)
    }

    /// Reserve `delta` future increments on counter `id`; returns the new
    /// max.
    pub fn incr_max(&self, id: CounterId, delta: u32) -> u32 {
        self.slot(id)
            .max
            .fetch_add(delta, Ordering::AcqRel)
            .wrapping_add(delta)
    }

    /// Replace the shadow min of `id` if it is still `old`. Returns false
    /// when a concurrent update won and the caller must re-observe.
    pub fn cas_min(&self, id: CounterId, old: u32, new: u32) -> bool {
        self.slot(id)
            .min
            .compare_exchange(old, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the shadow min of `id` has reached `thresh` on the circle.
    #[inline]
    pub fn min_reaches(&self, id: CounterId, thresh: u32) -> bool {
        wrap::reaches_or_passed(self.read_min(id), thresh)
    }

    /// Whether all authorized work on `id` has been confirmed complete.
    #[inline]
    pub fn min_eq_max(&self, id: CounterId) -> bool {
        barrier::rmb();
        let slot = self.slot(id);
        slot.min.load(Ordering::Relaxed) == slot.max.load(Ordering::Relaxed)
    }

    /// Shadowed wait-base value at `index`.
    #[inline]
    pub fn read_base(&self, index: usize) -> u32 {
        self.bases[index].load(Ordering::Relaxed)
    }

    /// Overwrite the shadowed wait-base value at `index`.
    #[inline]
    pub fn set_base(&self, index: usize, value: u32) {
        self.bases[index].store(value, Ordering::Relaxed);
    }
}

impl Default for ShadowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incr_max_returns_new_value() {
        let store = ShadowStore::new();
        let id = CounterId::new(3);
        assert_eq!(store.incr_max(id, 5), 5);
        assert_eq!(store.incr_max(id, 2), 7);
        assert_eq!(store.read_max(id), 7);
    }

    #[test]
    fn test_incr_max_wraps() {
        let store = ShadowStore::new();
        let id = CounterId::new(0);
        store.incr_max(id, u32::MAX);
        assert_eq!(store.incr_max(id, 2), 1);
    }

    #[test]
    fn test_cas_min_detects_concurrent_update() {
        let store = ShadowStore::new();
        let id = CounterId::new(1);
        assert!(store.cas_min(id, 0, 10));
        assert!(!store.cas_min(id, 0, 20));
        assert_eq!(store.read_min(id), 10);
    }

    #[test]
    fn test_min_eq_max_tracks_confirmation() {
        let store = ShadowStore::new();
        let id = CounterId::new(2);
        assert!(store.min_eq_max(id));
        store.incr_max(id, 1);
        assert!(!store.min_eq_max(id));
        assert!(store.cas_min(id, 0, 1));
        assert!(store.min_eq_max(id));
    }

    #[test]
    fn test_min_reaches_uses_wrapping_compare() {
        let store = ShadowStore::new();
        let id = CounterId::new(4);
        assert!(store.cas_min(id, 0, 0x0000_0002));
        // threshold issued just before the wrap is already passed
        assert!(store.min_reaches(id, 0xFFFF_FFF0));
        assert!(!store.min_reaches(id, 0x1000));
    }
}

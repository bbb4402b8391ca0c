//! # EMBER Core Types
//!
//! Fundamental type definitions used across the sync engine stack.
//!
//! These types provide:
//! - Strong typing for counter identifiers and buffer handles
//! - Bitmask selection over the counter bank
//! - Per-counter attribute flags

use core::fmt;

// =============================================================================
// BANK GEOMETRY
// =============================================================================

/// Number of hardware counters in the sync block.
pub const NUM_COUNTERS: usize = 32;

/// Number of hardware wait-base registers in the sync block.
pub const NUM_WAIT_BASES: usize = 8;

/// Infinite-wait sentinel for wait timeouts, in milliseconds.
pub const NO_TIMEOUT: u32 = u32::MAX;

// =============================================================================
// COUNTER ID
// =============================================================================

/// Hardware counter index.
///
/// Valid ids are below [`NUM_COUNTERS`]; operations that accept untrusted
/// ids validate them and report out-of-range ids as consistency errors.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct CounterId(u32);

impl CounterId {
    /// Create a new counter id.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the id as an array index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Single-bit mask for this counter. Only meaningful for valid ids.
    #[inline]
    pub const fn bit(self) -> u32 {
        1 << self.0
    }

    /// Check that the id addresses a slot in the bank.
    #[inline]
    pub const fn is_valid(self) -> bool {
        (self.0 as usize) < NUM_COUNTERS
    }
}

impl fmt::Debug for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CounterId({})", self.0)
    }
}

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// COUNTER MASK
// =============================================================================

/// Bitmask selecting a subset of the counter bank.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct CounterMask(u32);

impl CounterMask {
    /// Mask selecting no counters.
    pub const EMPTY: Self = Self(0);

    /// Mask selecting the whole bank.
    pub const ALL: Self = Self(u32::MAX);

    /// Create from raw bits (bit `n` selects counter `n`).
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Get the raw bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check whether `id` is selected.
    #[inline]
    pub const fn contains(self, id: CounterId) -> bool {
        id.is_valid() && (self.0 & id.bit()) != 0
    }

    /// Add `id` to the selection.
    #[inline]
    pub const fn with(self, id: CounterId) -> Self {
        Self(self.0 | id.bit())
    }

    /// Check whether the mask is empty.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the selected counter ids, lowest first.
    #[inline]
    pub const fn iter(self) -> CounterMaskIter {
        CounterMaskIter { bits: self.0 }
    }
}

impl fmt::Debug for CounterMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CounterMask({:#010x})", self.0)
    }
}

/// Iterator over the set bits of a [`CounterMask`].
#[derive(Clone)]
pub struct CounterMaskIter {
    bits: u32,
}

impl Iterator for CounterMaskIter {
    type Item = CounterId;

    fn next(&mut self) -> Option<CounterId> {
        if self.bits == 0 {
            return None;
        }
        let id = self.bits.trailing_zeros();
        self.bits &= self.bits - 1;
        Some(CounterId::new(id))
    }
}

// =============================================================================
// COUNTER FLAGS
// =============================================================================

bitflags::bitflags! {
    /// Per-counter attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CounterFlags: u32 {
        /// Increments are driven by a client, not reserved by the host;
        /// exempt from max-bound checking.
        const CLIENT_MANAGED = 1 << 0;
        /// Reserved host counter, held at zero and used as the no-op
        /// wait target.
        const RESERVED = 1 << 1;
    }
}

// =============================================================================
// BUFFER HANDLE
// =============================================================================

/// Opaque handle to a GPU-bound command buffer.
///
/// The sync engine never dereferences this; it is passed through to the
/// external patch operation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct BufferHandle(u64);

impl BufferHandle {
    /// Create a new buffer handle.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Create a null handle.
    #[inline]
    pub const fn null() -> Self {
        Self(0)
    }

    /// Get the raw u64 value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Check if null.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferHandle(0x{:016x})", self.0)
    }
}

// =============================================================================
// STATIC ASSERTIONS
// =============================================================================

// Ensure key types are Send + Sync
static_assertions::assert_impl_all!(CounterId: Send, Sync, Copy);
static_assertions::assert_impl_all!(CounterMask: Send, Sync, Copy);
static_assertions::assert_impl_all!(CounterFlags: Send, Sync, Copy);
static_assertions::assert_impl_all!(BufferHandle: Send, Sync, Copy);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_iteration() {
        let mask = CounterMask::from_bits(0b1010_0001);
        let ids: std::vec::Vec<u32> = mask.iter().map(CounterId::raw).collect();
        assert_eq!(ids, std::vec![0, 5, 7]);
    }

    #[test]
    fn test_mask_contains() {
        let mask = CounterMask::EMPTY.with(CounterId::new(3));
        assert!(mask.contains(CounterId::new(3)));
        assert!(!mask.contains(CounterId::new(4)));
        assert!(!mask.contains(CounterId::new(64)));
    }

    #[test]
    fn test_counter_id_bounds() {
        assert!(CounterId::new(0).is_valid());
        assert!(CounterId::new(31).is_valid());
        assert!(!CounterId::new(32).is_valid());
    }

    #[test]
    fn test_counter_flags() {
        let flags = CounterFlags::CLIENT_MANAGED;
        assert!(flags.contains(CounterFlags::CLIENT_MANAGED));
        assert!(!flags.contains(CounterFlags::RESERVED));
    }
}

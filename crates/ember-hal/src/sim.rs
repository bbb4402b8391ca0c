//! # Simulated Host
//!
//! In-memory implementation of every platform seam, for tests and
//! bring-up.
//!
//! The register file models the sync block's hardware behavior: counter
//! value registers advance on writes to the CPU increment trigger, and
//! advancing a counter fires the wake actions registered against it,
//! standing in for the interrupt dispatch path. Collaborator calls are
//! counted so tests can assert pairing and call-count properties.

use alloc::sync::Arc;
use alloc::vec::Vec;

use core::sync::atomic::{AtomicU32, Ordering};

use spin::Mutex;

use ember_core::{BufferHandle, CounterId, Error, Result};

use crate::host::Host;
use crate::patch::CommandPatcher;
use crate::power::PowerManager;
use crate::regs::{counter_value, registers, RegisterBus};
use crate::wake::{StdWaiter, WakeBridge, WakeToken, Waiter};

// Register file covers the sync block (one word per 4-byte offset).
const REG_WORDS: usize = 0x800 / 4;

// Forward half-circle test, mirroring the engine's wrapping comparison.
fn reached(value: u32, thresh: u32) -> bool {
    value.wrapping_sub(thresh) < (1 << 31)
}

// =============================================================================
// PATCH RECORD
// =============================================================================

/// One recorded patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchRecord {
    /// Target buffer
    pub buffer: BufferHandle,
    /// Byte offset within the buffer
    pub offset: u32,
    /// Word written
    pub value: u32,
}

// =============================================================================
// SIM HOST
// =============================================================================

struct Registration {
    token: u64,
    id: CounterId,
    thresh: u32,
    waiter: Arc<StdWaiter>,
}

#[derive(Default)]
struct BridgeTable {
    next_token: u64,
    slots: Vec<Registration>,
}

/// Simulated host backing all four platform seams.
pub struct SimHost {
    regs: Mutex<[u32; REG_WORDS]>,
    reads: AtomicU32,
    writes: AtomicU32,
    busy_calls: AtomicU32,
    idle_calls: AtomicU32,
    wake: Mutex<BridgeTable>,
    wake_capacity: usize,
    registered: AtomicU32,
    released: AtomicU32,
    patches: Mutex<Vec<PatchRecord>>,
    patch_fail_after: AtomicU32,
}

impl SimHost {
    /// Create a simulated host with unbounded wake slots.
    pub fn new() -> Self {
        Self::with_wake_capacity(usize::MAX)
    }

    /// Create a simulated host with at most `capacity` concurrent wake
    /// registrations.
    pub fn with_wake_capacity(capacity: usize) -> Self {
        Self {
            regs: Mutex::new([0; REG_WORDS]),
            reads: AtomicU32::new(0),
            writes: AtomicU32::new(0),
            busy_calls: AtomicU32::new(0),
            idle_calls: AtomicU32::new(0),
            wake: Mutex::new(BridgeTable::default()),
            wake_capacity: capacity,
            registered: AtomicU32::new(0),
            released: AtomicU32::new(0),
            patches: Mutex::new(Vec::new()),
            patch_fail_after: AtomicU32::new(u32::MAX),
        }
    }

    // -------------------------------------------------------------------------
    // Hardware-progress helpers
    // -------------------------------------------------------------------------

    /// Advance counter `id` by `n`, as completing GPU work would, and
    /// fire any wake actions whose threshold is now reached.
    pub fn advance_counter(&self, id: CounterId, n: u32) {
        let value = {
            let mut regs = self.regs.lock();
            let word = (counter_value(id) / 4) as usize;
            regs[word] = regs[word].wrapping_add(n);
            regs[word]
        };
        self.fire_wakes(id, value);
    }

    /// Overwrite counter `id`'s live register without firing wakes.
    pub fn set_counter(&self, id: CounterId, value: u32) {
        self.regs.lock()[(counter_value(id) / 4) as usize] = value;
    }

    /// Read counter `id`'s live register without counting the access.
    pub fn counter_register(&self, id: CounterId) -> u32 {
        self.regs.lock()[(counter_value(id) / 4) as usize]
    }

    /// Overwrite wait-base register `index` without counting the access.
    pub fn set_wait_base(&self, index: u32, value: u32) {
        self.regs.lock()[(crate::regs::wait_base_value(index) / 4) as usize] = value;
    }

    /// Fire the wake actions on `id` that the current register value
    /// satisfies, without advancing the counter. Lets a test interleave
    /// the dispatch steps (advance, shadow refresh, wake) explicitly.
    pub fn wake_counter(&self, id: CounterId) {
        let value = self.counter_register(id);
        self.fire_wakes(id, value);
    }

    /// Interrupt every registered waiter, as a signal delivery would.
    pub fn interrupt_waiters(&self) {
        let table = self.wake.lock();
        for slot in table.slots.iter() {
            slot.waiter.interrupt();
        }
    }

    fn fire_wakes(&self, id: CounterId, value: u32) {
        let table = self.wake.lock();
        for slot in table.slots.iter() {
            if slot.id == id && reached(value, slot.thresh) {
                slot.waiter.wake();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Instrumentation
    // -------------------------------------------------------------------------

    /// Number of register reads performed.
    pub fn read_count(&self) -> u32 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of register writes performed.
    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of busy references taken.
    pub fn busy_count(&self) -> u32 {
        self.busy_calls.load(Ordering::Relaxed)
    }

    /// Number of busy references dropped.
    pub fn idle_count(&self) -> u32 {
        self.idle_calls.load(Ordering::Relaxed)
    }

    /// Number of wake registrations made.
    pub fn registration_count(&self) -> u32 {
        self.registered.load(Ordering::Relaxed)
    }

    /// Number of wake registrations released.
    pub fn release_count(&self) -> u32 {
        self.released.load(Ordering::Relaxed)
    }

    /// Number of currently outstanding wake registrations.
    pub fn active_registrations(&self) -> usize {
        self.wake.lock().slots.len()
    }

    /// Snapshot of every patch performed so far, in order.
    pub fn patches(&self) -> Vec<PatchRecord> {
        self.patches.lock().clone()
    }

    /// Make every patch after the first `n` fail.
    pub fn fail_patches_after(&self, n: u32) {
        self.patch_fail_after.store(n, Ordering::Relaxed);
    }
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SEAM IMPLEMENTATIONS
// =============================================================================

impl RegisterBus for SimHost {
    fn read32(&self, offset: u32) -> u32 {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.regs.lock()[(offset / 4) as usize]
    }

    fn write32(&self, offset: u32, value: u32) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        if offset == registers::COUNTER_CPU_INCR {
            // Increment trigger: step every selected counter once.
            let mut bumped: Vec<(CounterId, u32)> = Vec::new();
            {
                let mut regs = self.regs.lock();
                let mut bits = value;
                while bits != 0 {
                    let id = CounterId::new(bits.trailing_zeros());
                    bits &= bits - 1;
                    let word = (counter_value(id) / 4) as usize;
                    regs[word] = regs[word].wrapping_add(1);
                    bumped.push((id, regs[word]));
                }
            }
            for (id, new_value) in bumped {
                self.fire_wakes(id, new_value);
            }
        } else {
            self.regs.lock()[(offset / 4) as usize] = value;
        }
    }
}

impl PowerManager for SimHost {
    fn busy(&self) {
        self.busy_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn idle(&self) {
        self.idle_calls.fetch_add(1, Ordering::Relaxed);
    }
}

impl WakeBridge for SimHost {
    type Waiter = StdWaiter;

    fn waiter(&self) -> Arc<StdWaiter> {
        Arc::new(StdWaiter::new())
    }

    fn register_wake(
        &self,
        id: CounterId,
        thresh: u32,
        waiter: &Arc<StdWaiter>,
    ) -> Result<WakeToken> {
        let mut table = self.wake.lock();
        if table.slots.len() >= self.wake_capacity {
            return Err(Error::NoWakeSlots);
        }
        table.next_token += 1;
        let token = table.next_token;
        table.slots.push(Registration {
            token,
            id,
            thresh,
            waiter: waiter.clone(),
        });
        drop(table);
        self.registered.fetch_add(1, Ordering::Relaxed);
        log::debug!("sim: wake action on counter {} thresh {:#x}", id, thresh);
        // Registration races with hardware progress; catch up immediately
        // so a wake arriving before the registration is not lost.
        let value = self.counter_register(id);
        if reached(value, thresh) {
            waiter.wake();
        }
        Ok(WakeToken::new(token))
    }

    fn release(&self, token: WakeToken) {
        let mut table = self.wake.lock();
        if let Some(pos) = table.slots.iter().position(|s| s.token == token.raw()) {
            table.slots.remove(pos);
            self.released.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl CommandPatcher for SimHost {
    fn patch(&self, buffer: BufferHandle, offset: u32, value: u32) -> Result<()> {
        let mut patches = self.patches.lock();
        if patches.len() as u32 >= self.patch_fail_after.load(Ordering::Relaxed) {
            return Err(Error::PatchFailed);
        }
        patches.push(PatchRecord {
            buffer,
            offset,
            value,
        });
        Ok(())
    }
}

impl Host for SimHost {
    type Bus = Self;
    type Power = Self;
    type Bridge = Self;
    type Patcher = Self;

    fn bus(&self) -> &Self {
        self
    }

    fn power(&self) -> &Self {
        self
    }

    fn bridge(&self) -> &Self {
        self
    }

    fn patcher(&self) -> &Self {
        self
    }
}

//! # Stale-Wait Sweep
//!
//! Removal of already-satisfied wait instructions from reused command
//! buffers.
//!
//! Command buffers are resubmitted with thresholds captured earlier;
//! with a wrapping counter, a satisfied wait left in place can read as
//! unsatisfied again half a cycle later and stall the hardware
//! indefinitely. Before resubmission, the sweep refreshes the referenced
//! counters and rewrites every satisfied wait to a no-op wait on the
//! reserved host counter, which sits at zero forever.

use ember_core::{BufferHandle, CounterId, CounterMask, Result};
use ember_hal::{CommandPatcher, Host};

use crate::bank::SyncptBank;
use crate::wrap;

// =============================================================================
// WAIT DESCRIPTOR
// =============================================================================

/// A pending wait instruction embedded in a command buffer.
#[derive(Debug, Clone, Copy)]
pub struct WaitCheck {
    /// Counter the instruction stalls on
    pub id: CounterId,
    /// Threshold captured at buffer construction
    pub thresh: u32,
    /// Buffer holding the instruction
    pub buffer: BufferHandle,
    /// Byte offset of the instruction word within the buffer
    pub offset: u32,
}

/// Encode a host-class wait on `id` at `thresh`.
///
/// The command word packs the counter index into the top byte and the
/// threshold into the low 24 bits.
#[inline]
pub const fn host_wait_op(id: CounterId, thresh: u32) -> u32 {
    (id.raw() << 24) | (thresh & 0x00FF_FFFF)
}

// =============================================================================
// SWEEP
// =============================================================================

impl<H: Host> SyncptBank<H> {
    /// Rewrite already-satisfied waits in `waits` to no-op waits.
    ///
    /// Counters selected by `mask` are refreshed from hardware up front,
    /// one read each, before any descriptor is examined. Descriptors are
    /// then processed in order against the refreshed shadow. A patch
    /// failure aborts the sweep as-is: earlier rewrites stay in place,
    /// the failure propagates. The caller is responsible for the device
    /// being powered.
    pub fn sweep(&self, mask: CounterMask, waits: &[WaitCheck]) -> Result<()> {
        // get current counter values
        for id in mask.iter() {
            self.refresh_min(id)?;
        }

        // compare counters against wait thresholds
        for wait in waits {
            self.check_id(wait.id)?;
            let min = self.store().read_min(wait.id);
            if !wrap::reaches_or_passed(min, wait.thresh) {
                continue;
            }

            // wait has completed already, so it can be removed
            log::debug!(
                "drop wait: counter {} ({}) thresh {:#x} min {:#x}",
                wait.id,
                self.config().name_of(wait.id),
                wait.thresh,
                min
            );
            let noop = host_wait_op(self.config().host_counter, 0);
            self.host().patcher().patch(wait.buffer, wait.offset, noop)?;
        }
        Ok(())
    }
}

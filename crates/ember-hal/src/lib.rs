//! # EMBER HAL
//!
//! Hardware-facing trait seams for the EMBER host synchronization engine.
//!
//! The sync engine never touches hardware directly. Everything it needs
//! from the platform goes through four narrow interfaces:
//! - [`RegisterBus`] - raw register access into the sync aperture
//! - [`PowerManager`] - busy/idle keep-alive reference counting
//! - [`WakeBridge`] - interrupt-driven wake scheduling for blocked waits
//! - [`CommandPatcher`] - in-place rewrite of words in GPU-bound buffers
//!
//! The [`Host`] trait bundles concrete implementations of all four, so
//! the engine can be generic over one type parameter.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod barrier;
pub mod host;
pub mod patch;
pub mod power;
pub mod regs;
pub mod wake;

#[cfg(feature = "sim")]
pub mod sim;

// Re-exports for convenience
pub use host::Host;
pub use patch::CommandPatcher;
pub use power::{BusyGuard, PowerManager};
pub use regs::RegisterBus;
pub use wake::{WaitOutcome, Waiter, WakeBridge, WakeToken};

#[cfg(feature = "std")]
pub use wake::StdWaiter;

//! # EMBER Sync
//!
//! Syncpoint management for a command-processing GPU front end.
//!
//! The hardware exposes a fixed bank of 32-bit counters that increment as
//! GPU work completes. This crate shadows that bank on the host, defines
//! ordering on the wrapping value space, blocks callers until a counter
//! reaches a threshold, and rewrites already-satisfied wait instructions
//! out of reused command buffers.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ember-sync                           │
//! │  ┌──────────┐  ┌───────────┐  ┌──────────┐  ┌───────────┐   │
//! │  │  Shadow  │  │ Wrapping  │  │   Wait   │  │ Stale-Wait│   │
//! │  │  Store   │  │ Compare   │  │  Engine  │  │   Sweep   │   │
//! │  └──────────┘  └───────────┘  └──────────┘  └───────────┘   │
//! └───────────────┬─────────────────────────────────────────────┘
//!                 │ ember-hal seams (bus, power, wake, patch)
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(test)]
extern crate std;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod bank;
pub mod config;
pub mod store;
pub mod sweep;
pub mod wait;
pub mod wrap;

// Re-exports for convenience
pub use bank::SyncptBank;
pub use config::BankConfig;
pub use store::ShadowStore;
pub use sweep::{host_wait_op, WaitCheck};
pub use wait::STALL_CHECK_PERIOD_MS;

//! # EMBER Core
//!
//! Foundational types and error handling for the EMBER host
//! synchronization engine.
//!
//! The sync engine tracks a fixed bank of monotonically-incrementing
//! hardware counters ("syncpoints"). This crate provides the identifiers,
//! masks, and per-counter attribute flags shared by every layer, plus the
//! unified error type.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "std")]
extern crate std;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod error;
pub mod types;

// Re-exports for convenience
pub use error::{ConsistencyError, ConsistencyKind, CounterDiag, Error, Result};
pub use types::*;

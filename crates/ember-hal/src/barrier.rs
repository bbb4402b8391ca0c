//! # Memory Barriers
//!
//! Ordering fences around hardware-facing accesses.
//!
//! The shadow store is read and written concurrently with register
//! traffic. A read barrier must precede every observation of a shadow
//! value that gates a hardware access, and a write barrier must follow
//! hardware writes before normal operation resumes, so the previous
//! shadow value is visible across threads before hardware state replaces
//! it.

use core::sync::atomic::{fence, Ordering};

/// Read barrier: order prior loads before subsequent loads.
#[inline(always)]
pub fn rmb() {
    fence(Ordering::Acquire);
}

/// Write barrier: order prior stores before subsequent stores.
#[inline(always)]
pub fn wmb() {
    fence(Ordering::Release);
}

/// Full barrier: order everything before against everything after.
#[inline(always)]
pub fn mb() {
    fence(Ordering::SeqCst);
}

//! # Host Bundle
//!
//! One trait bundling the platform services the sync engine consumes.
//!
//! Each target platform implements [`Host`] to hand the engine its
//! register bus, power service, wake bridge, and command patcher. The
//! engine takes the bundle by value at construction and is generic over
//! it, so all collaborator dispatch is static.

use crate::patch::CommandPatcher;
use crate::power::PowerManager;
use crate::regs::RegisterBus;
use crate::wake::WakeBridge;

// =============================================================================
// HOST TRAIT
// =============================================================================

/// Platform services consumed by the sync engine.
pub trait Host: Send + Sync {
    /// Register bus type
    type Bus: RegisterBus;
    /// Power keep-alive type
    type Power: PowerManager;
    /// Wake bridge type
    type Bridge: WakeBridge;
    /// Command patcher type
    type Patcher: CommandPatcher;

    /// Get the register bus.
    fn bus(&self) -> &Self::Bus;

    /// Get the power keep-alive service.
    fn power(&self) -> &Self::Power;

    /// Get the wake bridge.
    fn bridge(&self) -> &Self::Bridge;

    /// Get the command patcher.
    fn patcher(&self) -> &Self::Patcher;
}

//! # EMBER Error Handling
//!
//! Error types for the host synchronization stack.
//!
//! Errors fall into two tiers:
//! - Recoverable conditions a caller is expected to handle: wait timeout,
//!   caller interruption, wake-slot exhaustion, patch failure.
//! - Internal consistency violations: a caller or hardware contract was
//!   broken. These carry a full counter diagnostic snapshot and must not
//!   be silently swallowed or retried.

use core::fmt;

use crate::types::CounterId;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// EMBER Result type alias
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// EMBER unified error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Wait would block: the threshold was unmet within the allowed time
    /// (including zero-timeout fast-fail)
    Timeout,
    /// Wait cancelled by caller interruption
    Interrupted,
    /// Wake-action slots exhausted in the interrupt bridge
    NoWakeSlots,
    /// Command-buffer patch operation failed
    PatchFailed,
    /// Internal consistency violated
    Consistency(ConsistencyError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "wait would block"),
            Self::Interrupted => write!(f, "wait interrupted"),
            Self::NoWakeSlots => write!(f, "no wake slots available"),
            Self::PatchFailed => write!(f, "command buffer patch failed"),
            Self::Consistency(e) => write!(f, "consistency violated: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

// =============================================================================
// CONSISTENCY ERRORS
// =============================================================================

/// Kinds of internal consistency violations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConsistencyKind {
    /// A live hardware value passed the authorized max
    MaxExceeded,
    /// Hardware increment requested with no outstanding reservation
    IncrementWithoutReservation,
    /// Counter id outside the bank
    CounterOutOfRange,
    /// Shadow state diverged from outstanding work accounting
    ShadowOutOfSync,
    /// Wait threshold beyond the authorized max
    ThresholdBeyondMax,
}

impl fmt::Display for ConsistencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxExceeded => write!(f, "live value exceeds max"),
            Self::IncrementWithoutReservation => {
                write!(f, "increment without reservation")
            }
            Self::CounterOutOfRange => write!(f, "counter id out of range"),
            Self::ShadowOutOfSync => write!(f, "shadow out of sync"),
            Self::ThresholdBeyondMax => write!(f, "threshold beyond max"),
        }
    }
}

/// Counter state snapshot taken at the detection site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDiag {
    /// Counter id
    pub id: CounterId,
    /// Symbolic counter name; empty when unnamed
    pub name: &'static str,
    /// Shadow min value
    pub min: u32,
    /// Shadow max value
    pub max: u32,
}

/// An internal consistency violation with diagnostic context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyError {
    /// What contract was broken
    pub kind: ConsistencyKind,
    /// Counter state at the detection site
    pub diag: CounterDiag,
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (counter {} ({}) min {:#x} max {:#x})",
            self.kind, self.diag.id, self.diag.name, self.diag.min, self.diag.max
        )
    }
}

impl From<ConsistencyError> for Error {
    fn from(e: ConsistencyError) -> Self {
        Error::Consistency(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_distinguishes_timeout_and_interrupt() {
        assert_ne!(
            std::format!("{}", Error::Timeout),
            std::format!("{}", Error::Interrupted)
        );
    }

    #[test]
    fn test_consistency_display_carries_diag() {
        let err = Error::from(ConsistencyError {
            kind: ConsistencyKind::MaxExceeded,
            diag: CounterDiag {
                id: CounterId::new(22),
                name: "3d",
                min: 0x10,
                max: 0x8,
            },
        });
        let text = std::format!("{}", err);
        assert!(text.contains("22"));
        assert!(text.contains("3d"));
    }
}

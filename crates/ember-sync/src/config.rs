//! # Bank Configuration
//!
//! Hardware description injected at bank construction: per-counter
//! attribute flags, the symbolic name table, and the reserved host
//! counter used as the no-op wait target.
//!
//! The exact counter assignment is board-specific; [`BankConfig::reference`]
//! describes the reference hardware and is the default.

use ember_core::{CounterFlags, CounterId, NUM_COUNTERS};

// =============================================================================
// BANK CONFIG
// =============================================================================

/// Injectable hardware description for one sync block.
#[derive(Debug, Clone)]
pub struct BankConfig {
    /// Per-counter attribute flags.
    pub flags: [CounterFlags; NUM_COUNTERS],
    /// Symbolic counter names; empty string when unnamed.
    pub names: [&'static str; NUM_COUNTERS],
    /// Reserved always-zero counter used as the no-op wait target.
    pub host_counter: CounterId,
}

impl BankConfig {
    /// Configuration for the reference sync block.
    pub const fn reference() -> Self {
        let mut names = [""; NUM_COUNTERS];
        names[0] = "host";
        names[10] = "vin_0";
        names[11] = "vin_1";
        names[12] = "vin_2";
        names[13] = "vin_3";
        names[16] = "blit_0";
        names[17] = "blit_1";
        names[20] = "3d";
        names[21] = "video";
        names[24] = "disp_0";
        names[25] = "disp_1";
        names[26] = "vblank_0";
        names[27] = "vblank_1";
        names[30] = "blit_lite";
        names[31] = "dsi";

        let mut flags = [CounterFlags::empty(); NUM_COUNTERS];
        flags[0] = CounterFlags::RESERVED;
        // Display-path counters advance without host reservations.
        flags[24] = CounterFlags::CLIENT_MANAGED;
        flags[25] = CounterFlags::CLIENT_MANAGED;
        flags[26] = CounterFlags::CLIENT_MANAGED;
        flags[27] = CounterFlags::CLIENT_MANAGED;
        flags[31] = CounterFlags::CLIENT_MANAGED;

        Self {
            flags,
            names,
            host_counter: CounterId::new(0),
        }
    }

    /// Whether `id`'s increments bypass host reservation accounting.
    #[inline]
    pub fn client_managed(&self, id: CounterId) -> bool {
        self.flags[id.index()].contains(CounterFlags::CLIENT_MANAGED)
    }

    /// Symbolic name of `id`; empty when unnamed. `id` must be valid.
    #[inline]
    pub fn name_of(&self, id: CounterId) -> &'static str {
        self.names[id.index()]
    }
}

impl Default for BankConfig {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_host_counter_is_reserved() {
        let config = BankConfig::reference();
        assert!(config.flags[config.host_counter.index()].contains(CounterFlags::RESERVED));
        assert_eq!(config.name_of(config.host_counter), "host");
    }

    #[test]
    fn test_reference_display_counters_are_client_managed() {
        let config = BankConfig::reference();
        assert!(config.client_managed(CounterId::new(26)));
        assert!(!config.client_managed(CounterId::new(20)));
    }
}

//! Governor statistics.

use super::pressure::PressureLevel;
use crate::MIB;

/// Snapshot of the governor's state and lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GovernorStats {
    /// Last reported usage.
    pub current_usage_bytes: u64,
    /// Highest usage ever reported.
    pub peak_usage_bytes: u64,
    /// Hard ceiling.
    pub cap_bytes: u64,
    /// `current_usage_bytes / cap_bytes`.
    pub usage_percentage: f64,
    /// Pressure level for the current usage.
    pub pressure_level: PressureLevel,
    /// Cleanup passes executed.
    pub cleanup_count: u32,
    /// Emergency purges executed.
    pub emergency_purge_count: u32,
    /// Bytes reported freed by cleanup callbacks.
    pub total_bytes_freed: u64,
    /// Frames ticked so far.
    pub current_frame: u64,
}

impl GovernorStats {
    /// Current usage in whole MiB.
    #[must_use]
    pub const fn current_usage_mb(&self) -> u64 {
        self.current_usage_bytes / MIB
    }

    /// Cap in whole MiB.
    #[must_use]
    pub const fn cap_mb(&self) -> u64 {
        self.cap_bytes / MIB
    }

    /// Headroom below the cap in bytes.
    #[must_use]
    pub const fn available_bytes(&self) -> u64 {
        self.cap_bytes.saturating_sub(self.current_usage_bytes)
    }
}

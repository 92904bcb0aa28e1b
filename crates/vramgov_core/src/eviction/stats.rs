//! Eviction policy statistics.

use crate::MIB;

/// Snapshot of the eviction policy's tracked set and lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionStats {
    /// Resources currently tracked.
    pub tracked_resources: usize,
    /// The policy's own usage accumulator.
    pub tracked_bytes: u64,
    /// Resources ever handed out as purge candidates.
    pub resources_purged: u64,
    /// Bytes ever handed out as purge candidates.
    pub bytes_purged: u64,
    /// Frames ticked so far.
    pub current_frame: u64,
}

impl EvictionStats {
    /// Tracked bytes in whole MiB.
    #[must_use]
    pub const fn tracked_mb(&self) -> u64 {
        self.tracked_bytes / MIB
    }

    /// Purged bytes in whole MiB.
    #[must_use]
    pub const fn purged_mb(&self) -> u64 {
        self.bytes_purged / MIB
    }
}

/// Result of a forced cleanup.
///
/// The listed resources are no longer tracked; the caller must destroy the
/// matching GPU objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForcedCleanup {
    /// Resources removed from tracking, oldest first.
    pub evicted: Vec<super::ResourceId>,
    /// Sum of the evicted resources' sizes.
    pub freed_bytes: u64,
}

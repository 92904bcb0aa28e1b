//! # Resource Eviction Policy
//!
//! Tracks every live GPU resource (size, last-use frame, use count,
//! render-target flag) and decides which ones are idle enough to delete.
//! The policy never deletes anything itself: it hands the caller an
//! ordered list of ids and the caller destroys them through the graphics
//! layer.
//!
//! ## Eligibility
//!
//! With `t` the effective threshold and `idle` the frames since last use:
//!
//! ```text
//!   idle <  t                 → keep
//!   render target             → purge if idle > 2t
//!   use count > 100           → purge if idle > t + 30
//!   high memory pressure      → purge if idle > t / 2
//!   otherwise                 → purge if idle >= t
//! ```
//!
//! Candidates come back "most beneficial first": non-render-targets before
//! render targets, larger before smaller, rarely-used before often-used.
//!
//! ## Usage accounting
//!
//! The policy keeps its own byte accumulator, fed by registration and
//! unregistration. It is independent from the usage reported to the
//! governor; [`EvictionPolicy::update_memory_usage`] overwrites it with a
//! measured value when the caller wants the two reconciled.
//!
//! ## Thread Safety
//!
//! NOT thread-safe. Drive it from the render thread or wrap it in a mutex.

mod stats;

pub use stats::{EvictionStats, ForcedCleanup};

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;

use crate::error::{GovernorError, GovernorResult};
use crate::MIB;

/// Use count above which a resource counts as frequently used.
pub const FREQUENT_USE_COUNT: u32 = 100;

/// Extra idle frames granted to frequently used resources.
pub const FREQUENT_USE_GRACE_FRAMES: u64 = 30;

/// Under high pressure, candidate lists longer than this are capped.
pub const PRESSURE_CAP_TRIGGER: usize = 10;

/// Maximum candidates returned per call under high pressure.
pub const PRESSURE_CAP_LEN: usize = 50;

/// Forced cleanup never touches resources used within this many frames.
pub const FORCE_CLEANUP_MIN_IDLE_FRAMES: u64 = 10;

/// Default target for [`EvictionPolicy::force_cleanup`].
pub const DEFAULT_FORCE_CLEANUP_TARGET: u64 = 256 * MIB;

/// Opaque identifier of a live GPU resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u64);

impl From<u64> for ResourceId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Eviction policy configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// Idle frames before a resource becomes a candidate.
    pub unused_frame_threshold: u64,
    /// Use `aggressive_threshold` while memory pressure is high.
    pub aggressive_mode: bool,
    /// Idle-frame threshold under high pressure.
    pub aggressive_threshold: u64,
    /// Tracked bytes above which pressure is high.
    pub memory_pressure_bytes: u64,
    /// Tracked bytes above which pressure is high regardless of the above.
    pub max_target_bytes: u64,
    /// Frames between periodic statistics lines.
    pub log_interval_frames: u64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            unused_frame_threshold: 60,
            aggressive_mode: true,
            aggressive_threshold: 30,
            memory_pressure_bytes: 512 * MIB,
            max_target_bytes: 1024 * MIB,
            log_interval_frames: 300,
        }
    }
}

impl EvictionConfig {
    /// Checks the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::InvalidConfig`] if a threshold is zero or the
    /// aggressive threshold is laxer than the normal one.
    pub fn validate(&self) -> GovernorResult<()> {
        if self.unused_frame_threshold == 0 || self.aggressive_threshold == 0 {
            return Err(GovernorError::InvalidConfig(
                "eviction frame thresholds must be greater than zero".to_string(),
            ));
        }
        if self.aggressive_threshold > self.unused_frame_threshold {
            return Err(GovernorError::InvalidConfig(format!(
                "aggressive threshold ({}) must not exceed unused frame threshold ({})",
                self.aggressive_threshold, self.unused_frame_threshold
            )));
        }
        if self.log_interval_frames == 0 {
            return Err(GovernorError::InvalidConfig(
                "log_interval_frames must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Metadata kept for one tracked resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedResource {
    /// Size in bytes.
    pub size_bytes: u64,
    /// Frame of the last registration or use.
    pub last_used_frame: u64,
    /// Registrations plus uses.
    pub use_count: u32,
    /// Currently bound as a draw destination.
    pub is_render_target: bool,
}

impl TrackedResource {
    /// Frames elapsed since last use.
    #[inline]
    #[must_use]
    pub const fn frames_unused(&self, current_frame: u64) -> u64 {
        current_frame.saturating_sub(self.last_used_frame)
    }
}

/// Frame-based idle resource tracker and purge planner.
#[derive(Debug)]
pub struct EvictionPolicy {
    config: EvictionConfig,
    current_frame: u64,
    tracked_bytes: u64,
    resources: HashMap<ResourceId, TrackedResource>,
    resources_purged: u64,
    bytes_purged: u64,
}

impl EvictionPolicy {
    /// Creates an empty policy.
    #[must_use]
    pub fn new(config: EvictionConfig) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid eviction config: {config:?}");

        tracing::info!(
            "Eviction policy initialized - Threshold: {} frames, Aggressive: {} ({} frames)",
            config.unused_frame_threshold,
            config.aggressive_mode,
            config.aggressive_threshold
        );

        Self {
            config,
            current_frame: 0,
            tracked_bytes: 0,
            resources: HashMap::new(),
            resources_purged: 0,
            bytes_purged: 0,
        }
    }

    /// Starts tracking a resource as used this frame.
    ///
    /// Re-registering a known id replaces its metadata and corrects the
    /// accumulator for the old size.
    pub fn register_resource(&mut self, id: ResourceId, size_bytes: u64, is_render_target: bool) {
        let info = TrackedResource {
            size_bytes,
            last_used_frame: self.current_frame,
            use_count: 1,
            is_render_target,
        };

        if let Some(previous) = self.resources.insert(id, info) {
            self.tracked_bytes = self.tracked_bytes.saturating_sub(previous.size_bytes);
        }
        self.tracked_bytes = self.tracked_bytes.saturating_add(size_bytes);

        tracing::trace!(
            "Registered resource {} - Size: {}KB, RT: {}",
            id,
            size_bytes / 1024,
            is_render_target
        );
    }

    /// Stops tracking a resource. Unknown ids are ignored.
    ///
    /// Returns the removed metadata, if any.
    pub fn unregister_resource(&mut self, id: ResourceId) -> Option<TrackedResource> {
        let info = self.resources.remove(&id)?;
        self.tracked_bytes = self.tracked_bytes.saturating_sub(info.size_bytes);
        Some(info)
    }

    /// Records a use of a resource this frame. Unknown ids are ignored.
    #[inline]
    pub fn mark_used(&mut self, id: ResourceId) {
        if let Some(info) = self.resources.get_mut(&id) {
            info.last_used_frame = self.current_frame;
            info.use_count = info.use_count.saturating_add(1);
        }
    }

    /// Returns the resources to delete this frame, most beneficial first.
    ///
    /// Every returned candidate is counted in the lifetime purge statistics
    /// immediately, whether or not the caller deletes it. The resources stay
    /// tracked until the caller unregisters them.
    pub fn purge_candidates(&mut self) -> Vec<ResourceId> {
        let pressure_high = self.is_memory_pressure_high();
        let threshold = self.effective_threshold();

        let mut candidates: Vec<(ResourceId, TrackedResource)> = self
            .resources
            .iter()
            .filter(|(_, info)| {
                Self::is_purge_eligible(info, info.frames_unused(self.current_frame), threshold, pressure_high)
            })
            .map(|(id, info)| (*id, *info))
            .collect();

        candidates.sort_unstable_by_key(|(id, info)| {
            (info.is_render_target, Reverse(info.size_bytes), info.use_count, *id)
        });

        if pressure_high && candidates.len() > PRESSURE_CAP_TRIGGER {
            candidates.truncate(PRESSURE_CAP_LEN);
        }

        if !candidates.is_empty() {
            tracing::debug!(
                "Marking {} resources for purge (threshold: {} frames, pressure high: {})",
                candidates.len(),
                threshold,
                pressure_high
            );
        }

        for (_, info) in &candidates {
            self.resources_purged += 1;
            self.bytes_purged = self.bytes_purged.saturating_add(info.size_bytes);
        }

        candidates.into_iter().map(|(id, _)| id).collect()
    }

    /// Unregisters idle non-render-target resources, oldest first, until
    /// `target_free_bytes` have been freed or no candidates remain.
    ///
    /// Only resources idle for more than 10 frames are considered.
    pub fn force_cleanup(&mut self, target_free_bytes: u64) -> ForcedCleanup {
        tracing::info!("Force cleanup requested - Target: {}MB", target_free_bytes / MIB);

        let mut candidates: Vec<(ResourceId, u64)> = self
            .resources
            .iter()
            .filter_map(|(id, info)| {
                let idle = info.frames_unused(self.current_frame);
                (!info.is_render_target && idle > FORCE_CLEANUP_MIN_IDLE_FRAMES).then_some((*id, idle))
            })
            .collect();

        candidates.sort_unstable_by_key(|(id, idle)| (Reverse(*idle), *id));

        let mut report = ForcedCleanup::default();
        for (id, _) in candidates {
            if report.freed_bytes >= target_free_bytes {
                break;
            }
            if let Some(info) = self.unregister_resource(id) {
                report.freed_bytes = report.freed_bytes.saturating_add(info.size_bytes);
                report.evicted.push(id);
            }
        }

        tracing::info!(
            "Force cleanup freed ~{}MB across {} resources",
            report.freed_bytes / MIB,
            report.evicted.len()
        );
        report
    }

    /// Returns true if the accumulator exceeds either configured limit.
    #[must_use]
    pub const fn is_memory_pressure_high(&self) -> bool {
        self.tracked_bytes > self.config.memory_pressure_bytes
            || self.tracked_bytes > self.config.max_target_bytes
    }

    /// Overwrites the accumulator with an externally measured usage.
    pub fn update_memory_usage(&mut self, current_bytes: u64) {
        self.tracked_bytes = current_bytes;
    }

    /// Advances the frame counter and periodically logs statistics.
    pub fn tick_frame(&mut self) {
        self.current_frame += 1;

        if self.current_frame % self.config.log_interval_frames.max(1) == 0 {
            let stats = self.stats();
            tracing::debug!(
                "Eviction - Tracked: {}, VRAM: {}MB, Purged: {}, Freed: {}MB",
                stats.tracked_resources,
                stats.tracked_mb(),
                stats.resources_purged,
                stats.purged_mb()
            );
        }
    }

    /// Returns a statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> EvictionStats {
        EvictionStats {
            tracked_resources: self.resources.len(),
            tracked_bytes: self.tracked_bytes,
            resources_purged: self.resources_purged,
            bytes_purged: self.bytes_purged,
            current_frame: self.current_frame,
        }
    }

    /// Metadata for a tracked resource.
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<&TrackedResource> {
        self.resources.get(&id)
    }

    /// Returns true if the resource is tracked.
    #[must_use]
    pub fn contains(&self, id: ResourceId) -> bool {
        self.resources.contains_key(&id)
    }

    /// Number of tracked resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// The policy's usage accumulator in bytes.
    #[inline]
    #[must_use]
    pub const fn tracked_bytes(&self) -> u64 {
        self.tracked_bytes
    }

    /// Frames ticked so far.
    #[inline]
    #[must_use]
    pub const fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &EvictionConfig {
        &self.config
    }

    /// Idle-frame threshold in force right now.
    #[must_use]
    pub const fn effective_threshold(&self) -> u64 {
        if self.config.aggressive_mode && self.is_memory_pressure_high() {
            self.config.aggressive_threshold
        } else {
            self.config.unused_frame_threshold
        }
    }

    fn is_purge_eligible(
        info: &TrackedResource,
        frames_unused: u64,
        threshold: u64,
        pressure_high: bool,
    ) -> bool {
        if frames_unused < threshold {
            return false;
        }

        if info.is_render_target {
            return frames_unused > threshold * 2;
        }

        if info.use_count > FREQUENT_USE_COUNT {
            return frames_unused > threshold + FREQUENT_USE_GRACE_FRAMES;
        }

        if pressure_high {
            return frames_unused > threshold / 2;
        }

        frames_unused >= threshold
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::new(EvictionConfig::default())
    }
}

impl Drop for EvictionPolicy {
    fn drop(&mut self) {
        tracing::info!(
            "Eviction policy shut down - Tracked: {}, Purged: {} ({}MB)",
            self.resources.len(),
            self.resources_purged,
            self.bytes_purged / MIB
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relaxed_policy() -> EvictionPolicy {
        EvictionPolicy::new(EvictionConfig {
            memory_pressure_bytes: u64::MAX,
            max_target_bytes: u64::MAX,
            ..EvictionConfig::default()
        })
    }

    fn advance(policy: &mut EvictionPolicy, frames: u64) {
        for _ in 0..frames {
            policy.tick_frame();
        }
    }

    #[test]
    fn test_register_and_unregister() {
        let mut policy = relaxed_policy();
        policy.register_resource(ResourceId(1), 4096, false);
        policy.register_resource(ResourceId(2), 1024, true);

        assert_eq!(policy.len(), 2);
        assert_eq!(policy.tracked_bytes(), 5120);
        assert_eq!(policy.get(ResourceId(1)).unwrap().use_count, 1);

        assert!(policy.unregister_resource(ResourceId(1)).is_some());
        assert!(policy.unregister_resource(ResourceId(99)).is_none());
        assert_eq!(policy.tracked_bytes(), 1024);
        assert!(!policy.contains(ResourceId(1)));
    }

    #[test]
    fn test_reregister_corrects_accumulator() {
        let mut policy = relaxed_policy();
        policy.register_resource(ResourceId(1), 4096, false);
        policy.register_resource(ResourceId(1), 1000, false);

        assert_eq!(policy.len(), 1);
        assert_eq!(policy.tracked_bytes(), 1000);
    }

    #[test]
    fn test_mark_used_refreshes() {
        let mut policy = relaxed_policy();
        policy.register_resource(ResourceId(1), 64, false);
        advance(&mut policy, 5);
        policy.mark_used(ResourceId(1));
        policy.mark_used(ResourceId(42));

        let info = policy.get(ResourceId(1)).unwrap();
        assert_eq!(info.last_used_frame, 5);
        assert_eq!(info.use_count, 2);
    }

    #[test]
    fn test_candidate_order() {
        let mut policy = relaxed_policy();
        let (a, b, c) = (ResourceId(1), ResourceId(2), ResourceId(3));

        policy.register_resource(c, 50, true);
        advance(&mut policy, 100);
        policy.register_resource(a, 100, false);
        policy.register_resource(b, 200, false);
        advance(&mut policy, 100);

        assert_eq!(policy.purge_candidates(), vec![b, a, c]);

        let stats = policy.stats();
        assert_eq!(stats.resources_purged, 3);
        assert_eq!(stats.bytes_purged, 350);
        // Candidates stay tracked until the caller unregisters them
        assert_eq!(stats.tracked_resources, 3);
    }

    #[test]
    fn test_equal_sizes_prefer_rarely_used() {
        let mut policy = relaxed_policy();
        let (busy, rare) = (ResourceId(10), ResourceId(11));

        policy.register_resource(busy, 256, false);
        policy.register_resource(rare, 256, false);
        for _ in 0..3 {
            policy.mark_used(busy);
        }
        advance(&mut policy, 60);

        assert_eq!(policy.get(busy).unwrap().use_count, 4);
        assert_eq!(policy.purge_candidates(), vec![rare, busy]);
    }

    #[test]
    fn test_render_target_grace() {
        let mut policy = relaxed_policy();
        policy.register_resource(ResourceId(7), 1024, true);

        advance(&mut policy, 120);
        assert!(policy.purge_candidates().is_empty());

        advance(&mut policy, 1);
        assert_eq!(policy.purge_candidates(), vec![ResourceId(7)]);
    }

    #[test]
    fn test_frequent_use_grace() {
        let mut policy = relaxed_policy();
        policy.register_resource(ResourceId(1), 1024, false);
        for _ in 0..FREQUENT_USE_COUNT {
            policy.mark_used(ResourceId(1));
        }

        advance(&mut policy, 90);
        assert!(policy.purge_candidates().is_empty());

        advance(&mut policy, 1);
        assert_eq!(policy.purge_candidates(), vec![ResourceId(1)]);
    }

    #[test]
    fn test_plain_resource_at_threshold() {
        let mut policy = relaxed_policy();
        policy.register_resource(ResourceId(1), 1024, false);

        advance(&mut policy, 59);
        assert!(policy.purge_candidates().is_empty());

        advance(&mut policy, 1);
        assert_eq!(policy.purge_candidates(), vec![ResourceId(1)]);
    }

    #[test]
    fn test_aggressive_threshold_under_pressure() {
        let mut policy = EvictionPolicy::new(EvictionConfig {
            memory_pressure_bytes: 1000,
            ..EvictionConfig::default()
        });
        policy.register_resource(ResourceId(1), 2000, false);

        assert!(policy.is_memory_pressure_high());
        assert_eq!(policy.effective_threshold(), 30);

        advance(&mut policy, 30);
        assert_eq!(policy.purge_candidates(), vec![ResourceId(1)]);
    }

    #[test]
    fn test_threshold_unchanged_without_aggressive_mode() {
        let mut policy = EvictionPolicy::new(EvictionConfig {
            aggressive_mode: false,
            memory_pressure_bytes: 1000,
            ..EvictionConfig::default()
        });
        policy.register_resource(ResourceId(1), 2000, false);

        assert!(policy.is_memory_pressure_high());
        assert_eq!(policy.effective_threshold(), 60);

        advance(&mut policy, 59);
        assert!(policy.purge_candidates().is_empty());

        advance(&mut policy, 1);
        assert_eq!(policy.purge_candidates(), vec![ResourceId(1)]);
    }

    #[test]
    fn test_pressure_caps_candidate_list() {
        let mut policy = EvictionPolicy::new(EvictionConfig {
            memory_pressure_bytes: 0,
            ..EvictionConfig::default()
        });
        for raw in 0..80u64 {
            policy.register_resource(ResourceId(raw), 1 + raw, false);
        }
        advance(&mut policy, 60);

        let candidates = policy.purge_candidates();
        assert_eq!(candidates.len(), PRESSURE_CAP_LEN);
        // Largest first
        assert_eq!(candidates[0], ResourceId(79));
    }

    #[test]
    fn test_force_cleanup_oldest_first() {
        let mut policy = relaxed_policy();
        policy.register_resource(ResourceId(1), 100, false);
        advance(&mut policy, 5);
        policy.register_resource(ResourceId(2), 100, false);
        policy.register_resource(ResourceId(3), 500, true);
        advance(&mut policy, 20);
        policy.register_resource(ResourceId(4), 100, false);

        let report = policy.force_cleanup(150);

        assert_eq!(report.evicted, vec![ResourceId(1), ResourceId(2)]);
        assert_eq!(report.freed_bytes, 200);
        assert!(policy.contains(ResourceId(3)));
        assert!(policy.contains(ResourceId(4)));
        assert_eq!(policy.tracked_bytes(), 600);
    }

    #[test]
    fn test_force_cleanup_needs_more_than_ten_idle_frames() {
        let mut policy = relaxed_policy();
        policy.register_resource(ResourceId(1), 100, false);

        advance(&mut policy, FORCE_CLEANUP_MIN_IDLE_FRAMES);
        let report = policy.force_cleanup(u64::MAX);
        assert!(report.evicted.is_empty());
        assert_eq!(report.freed_bytes, 0);

        advance(&mut policy, 1);
        assert_eq!(policy.force_cleanup(u64::MAX).evicted, vec![ResourceId(1)]);
    }

    #[test]
    fn test_update_memory_usage_overrides_accumulator() {
        let mut policy = relaxed_policy();
        policy.register_resource(ResourceId(1), 100, false);
        policy.update_memory_usage(5 * MIB);
        assert_eq!(policy.stats().tracked_mb(), 5);
    }

    #[test]
    fn test_config_validation() {
        assert!(EvictionConfig::default().validate().is_ok());

        let config = EvictionConfig {
            aggressive_threshold: 90,
            ..EvictionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

//! # Frame Memory Director
//!
//! Owns one governor, one eviction policy and one buffer pool and drives
//! them around the renderer's frame:
//!
//! ```text
//! Frame N:
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ 1. BEGIN FRAME                                                   │
//! │    ├─ Read VRAM usage from the backend                           │
//! │    ├─ Governor.update_usage  ──> cleanup callback                │
//! │    │                              ├─ EvictionPolicy.purge_candidates
//! │    │                              ├─ Backend.destroy_resource     │
//! │    │                              └─ bytes freed → Governor       │
//! │    └─ Compare backend usage with the eviction accumulator        │
//! │                                                                  │
//! │ 2. RENDER (caller)                                               │
//! │    ├─ register_resource / mark_used / unregister_resource        │
//! │    └─ pool().acquire_buffer / release_buffer                     │
//! │                                                                  │
//! │ 3. END FRAME                                                     │
//! │    └─ Tick governor, eviction policy and pool                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The eviction policy and backend are shared with the governor's
//! callbacks behind `parking_lot` mutexes. Locks are always taken
//! eviction first, backend second, and never held across
//! `update_usage`.

use std::sync::Arc;

use parking_lot::Mutex;
use vramgov_core::eviction::DEFAULT_FORCE_CLEANUP_TARGET;
use vramgov_core::{
    BufferPool, EvictionPolicy, EvictionStats, GovernorSettings, GovernorStats, PoolStats,
    PressureLevel, ResourceGovernor, ResourceId, TrackedResource, MIB,
};

use crate::backend::GraphicsBackend;

/// Default tolerated gap between backend usage and the eviction accumulator.
pub const DEFAULT_DRIFT_TOLERANCE: u64 = 64 * MIB;

/// Combined statistics of all three components.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectorStats {
    /// Governor snapshot.
    pub governor: GovernorStats,
    /// Eviction policy snapshot.
    pub eviction: EvictionStats,
    /// Buffer pool snapshot.
    pub pool: PoolStats,
    /// `|backend usage - eviction accumulator|` at the last `begin_frame`.
    pub usage_drift_bytes: u64,
}

/// Frame-loop orchestrator for the memory governor.
pub struct FrameMemoryDirector<B: GraphicsBackend + 'static> {
    governor: ResourceGovernor,
    eviction: Arc<Mutex<EvictionPolicy>>,
    backend: Arc<Mutex<B>>,
    pool: BufferPool,
    drift_tolerance: u64,
    usage_drift: u64,
    drift_exceeded: bool,
}

impl<B: GraphicsBackend + 'static> FrameMemoryDirector<B> {
    /// Builds all three components and registers the eviction-backed
    /// cleanup and emergency callbacks.
    #[must_use]
    pub fn new(settings: GovernorSettings, backend: B) -> Self {
        let GovernorSettings {
            budget,
            eviction,
            pool,
        } = settings;

        let mut governor = ResourceGovernor::new(budget);
        let eviction = Arc::new(Mutex::new(EvictionPolicy::new(eviction)));
        let backend = Arc::new(Mutex::new(backend));

        let policy = Arc::clone(&eviction);
        let gpu = Arc::clone(&backend);
        governor.register_cleanup_callback(move || {
            let mut policy = policy.lock();
            let candidates = policy.purge_candidates();
            let mut gpu = gpu.lock();

            let mut freed = 0u64;
            for id in candidates {
                freed = freed.saturating_add(gpu.destroy_resource(id));
                policy.unregister_resource(id);
            }
            freed
        });

        let policy = Arc::clone(&eviction);
        let gpu = Arc::clone(&backend);
        governor.register_emergency_callback(move || {
            let mut policy = policy.lock();
            let report = policy.force_cleanup(DEFAULT_FORCE_CLEANUP_TARGET);
            let mut gpu = gpu.lock();

            let mut freed = gpu.clear_caches();
            for id in &report.evicted {
                freed = freed.saturating_add(gpu.destroy_resource(*id));
            }
            tracing::warn!(
                "Emergency callback released {}MB ({} resources + caches)",
                freed / MIB,
                report.evicted.len()
            );
        });

        Self {
            governor,
            eviction,
            backend,
            pool: BufferPool::new(pool),
            drift_tolerance: DEFAULT_DRIFT_TOLERANCE,
            usage_drift: 0,
            drift_exceeded: false,
        }
    }

    /// Sets the tolerated gap between backend usage and the eviction
    /// accumulator before a warning is logged.
    #[must_use]
    pub fn with_drift_tolerance(mut self, bytes: u64) -> Self {
        self.drift_tolerance = bytes;
        self
    }

    /// Starts a frame: reports backend usage to the governor, which may run
    /// cleanup or emergency passes, then checks accounting drift against
    /// the post-cleanup backend usage.
    ///
    /// Returns the pressure level for the usage reported this frame.
    pub fn begin_frame(&mut self) -> PressureLevel {
        let reported = self.backend.lock().current_usage_bytes();
        self.governor.update_usage(reported);

        // Re-read: callbacks above may have destroyed resources
        let usage = self.backend.lock().current_usage_bytes();
        let tracked = self.eviction.lock().tracked_bytes();
        self.usage_drift = usage.abs_diff(tracked);

        let exceeded = self.usage_drift > self.drift_tolerance;
        if exceeded && !self.drift_exceeded {
            tracing::warn!(
                "VRAM accounting drift {}MB exceeds {}MB (backend {}MB, tracked {}MB)",
                self.usage_drift / MIB,
                self.drift_tolerance / MIB,
                usage / MIB,
                tracked / MIB
            );
        }
        self.drift_exceeded = exceeded;

        self.governor.pressure()
    }

    /// Ends a frame: ticks every component.
    pub fn end_frame(&mut self) {
        self.governor.tick_frame();
        self.eviction.lock().tick_frame();
        self.pool.tick_frame();
    }

    /// Starts tracking a freshly created resource.
    pub fn register_resource(&self, id: ResourceId, size_bytes: u64, is_render_target: bool) {
        self.eviction
            .lock()
            .register_resource(id, size_bytes, is_render_target);
    }

    /// Records that a resource was used this frame.
    pub fn mark_used(&self, id: ResourceId) {
        self.eviction.lock().mark_used(id);
    }

    /// Stops tracking a resource the renderer destroyed on its own.
    pub fn unregister_resource(&self, id: ResourceId) -> Option<TrackedResource> {
        self.eviction.lock().unregister_resource(id)
    }

    /// Returns true if the resource is still tracked.
    #[must_use]
    pub fn is_tracked(&self, id: ResourceId) -> bool {
        self.eviction.lock().contains(id)
    }

    /// Admission check for a new allocation against the last reported usage.
    #[must_use]
    pub fn can_allocate(&self, size_bytes: u64) -> bool {
        self.governor.can_allocate(size_bytes)
    }

    /// Pressure level for the last reported usage.
    #[must_use]
    pub fn pressure(&self) -> PressureLevel {
        self.governor.pressure()
    }

    /// The governor.
    #[must_use]
    pub const fn governor(&self) -> &ResourceGovernor {
        &self.governor
    }

    /// The governor, for manual cleanup or emergency requests.
    pub fn governor_mut(&mut self) -> &mut ResourceGovernor {
        &mut self.governor
    }

    /// The shared buffer pool.
    #[must_use]
    pub const fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Runs `f` with exclusive access to the backend.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut self.backend.lock())
    }

    /// Returns a combined statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> DirectorStats {
        DirectorStats {
            governor: self.governor.stats(),
            eviction: self.eviction.lock().stats(),
            pool: self.pool.stats(),
            usage_drift_bytes: self.usage_drift,
        }
    }
}

impl<B: GraphicsBackend + 'static> std::fmt::Debug for FrameMemoryDirector<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameMemoryDirector")
            .field("governor", &self.governor)
            .field("pool", &self.pool)
            .field("drift_tolerance", &self.drift_tolerance)
            .field("usage_drift", &self.usage_drift)
            .finish_non_exhaustive()
    }
}

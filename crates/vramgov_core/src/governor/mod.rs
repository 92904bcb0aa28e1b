//! # Resource Pressure Governor
//!
//! Owns the VRAM budget, classifies the reported usage into a
//! [`PressureLevel`] and fires registered cleanup/emergency callbacks when
//! usage climbs. It never sees individual resources: callers report an
//! aggregate usage figure each frame and the callbacks do the freeing.
//!
//! ## Hysteresis
//!
//! ```text
//!   cleanup   : enabled && frames since last cleanup   >= 60
//!   emergency : enabled && frames since last emergency >= 120
//! ```
//!
//! The per-update byte path additionally requires usage at or above the
//! matching byte threshold. Before the first execution there is no spacing
//! constraint. The cleanup pass that follows an emergency purge skips the
//! cleanup spacing check and restarts the cleanup clock, unless a cleanup
//! already ran in the same frame.
//!
//! ## Thread Safety
//!
//! The governor holds no lock. Drive it from the render thread, once per
//! frame, or wrap it in a mutex.

mod budget;
mod pressure;
mod stats;
mod tier;

pub use budget::BudgetConfig;
pub use pressure::PressureLevel;
pub use stats::GovernorStats;
pub use tier::{parse_mem_total_kb, DeviceTier, MEMINFO_PATH};

use crate::MIB;

/// Minimum frames between two cleanup passes.
pub const CLEANUP_MIN_FRAME_GAP: u64 = 60;

/// Minimum frames between two emergency purges.
pub const EMERGENCY_MIN_FRAME_GAP: u64 = 120;

/// Cleanup callback. Returns the number of bytes it freed.
pub type CleanupCallback = Box<dyn FnMut() -> u64 + Send>;

/// Emergency callback. Performs drastic caller-side action such as
/// dropping whole caches.
pub type EmergencyCallback = Box<dyn FnMut() + Send>;

/// Adaptive VRAM budget governor.
///
/// # Example
///
/// ```rust,ignore
/// let mut governor = ResourceGovernor::new(BudgetConfig::recommended(DeviceTier::detect()));
/// governor.register_cleanup_callback(move || evict_idle_textures());
///
/// // Every frame
/// governor.update_usage(gpu.allocated_bytes());
/// governor.tick_frame();
/// ```
pub struct ResourceGovernor {
    config: BudgetConfig,

    current_usage: u64,
    peak_usage: u64,
    current_frame: u64,

    cleanup_callbacks: Vec<CleanupCallback>,
    emergency_callbacks: Vec<EmergencyCallback>,

    cleanup_count: u32,
    emergency_purge_count: u32,
    total_bytes_freed: u64,

    last_pressure: PressureLevel,
    last_cleanup_frame: Option<u64>,
    last_emergency_frame: Option<u64>,
}

impl ResourceGovernor {
    /// Creates a governor for the given budget.
    ///
    /// The budget must satisfy the invariants documented on [`BudgetConfig`].
    #[must_use]
    pub fn new(config: BudgetConfig) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid budget: {config:?}");

        tracing::info!(
            "Governor initialized - Cap: {}MB, Tier: {:?}, Cleanup: {}MB, Emergency: {}MB, Auto cleanup: {}, Emergency purge: {}",
            config.vram_cap_bytes / MIB,
            config.device_tier,
            config.cleanup_threshold_bytes / MIB,
            config.emergency_threshold_bytes / MIB,
            config.enable_auto_cleanup,
            config.enable_emergency_purge,
        );

        Self {
            config,
            current_usage: 0,
            peak_usage: 0,
            current_frame: 0,
            cleanup_callbacks: Vec::new(),
            emergency_callbacks: Vec::new(),
            cleanup_count: 0,
            emergency_purge_count: 0,
            total_bytes_freed: 0,
            last_pressure: PressureLevel::None,
            last_cleanup_frame: None,
            last_emergency_frame: None,
        }
    }

    /// Creates a governor with the recommended budget for the running device.
    #[must_use]
    pub fn for_this_device() -> Self {
        Self::new(Self::recommended_config(Self::detect_device_tier()))
    }

    /// Detects the device tier from the system memory probe.
    #[must_use]
    pub fn detect_device_tier() -> DeviceTier {
        DeviceTier::detect()
    }

    /// Returns the recommended budget for a device tier.
    #[must_use]
    pub const fn recommended_config(tier: DeviceTier) -> BudgetConfig {
        BudgetConfig::recommended(tier)
    }

    /// Records the current VRAM usage and reacts to it.
    ///
    /// A change of pressure level is logged; entering `High` or above
    /// attempts a cleanup and entering `Critical` attempts an emergency
    /// purge. Independently, the byte thresholds are re-checked on every
    /// call. All paths are hysteresis-gated.
    pub fn update_usage(&mut self, current_bytes: u64) {
        self.current_usage = current_bytes;
        self.peak_usage = self.peak_usage.max(current_bytes);

        let new_pressure = self.pressure();
        if new_pressure != self.last_pressure {
            self.handle_pressure_change(new_pressure);
        }

        if self.should_cleanup() {
            self.execute_cleanup();
        }

        if self.should_emergency_purge() {
            self.execute_emergency_purge();
        }
    }

    /// Appends a cleanup callback. Callbacks run in registration order.
    pub fn register_cleanup_callback<F>(&mut self, callback: F)
    where
        F: FnMut() -> u64 + Send + 'static,
    {
        self.cleanup_callbacks.push(Box::new(callback));
    }

    /// Appends an emergency callback. Callbacks run in registration order.
    pub fn register_emergency_callback<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.emergency_callbacks.push(Box::new(callback));
    }

    /// Requests a cleanup pass regardless of pressure level.
    ///
    /// Returns true if the pass ran; it is still subject to frame spacing.
    pub fn request_cleanup(&mut self) -> bool {
        self.execute_cleanup()
    }

    /// Requests an emergency purge regardless of pressure level.
    ///
    /// Returns true if the purge ran; it is still subject to frame spacing.
    pub fn force_emergency_purge(&mut self) -> bool {
        self.execute_emergency_purge()
    }

    /// Returns true if `size_bytes` more would stay within the cap.
    #[inline]
    #[must_use]
    pub fn can_allocate(&self, size_bytes: u64) -> bool {
        self.current_usage.saturating_add(size_bytes) <= self.config.vram_cap_bytes
    }

    /// Returns the pressure level for the current usage.
    #[inline]
    #[must_use]
    pub fn pressure(&self) -> PressureLevel {
        PressureLevel::classify(self.usage_percentage(), &self.config)
    }

    /// Returns usage as a fraction of the cap (1.0 = at the cap).
    #[must_use]
    pub fn usage_percentage(&self) -> f64 {
        self.current_usage as f64 / self.config.vram_cap_bytes.max(1) as f64
    }

    /// Returns the headroom below the cap in bytes.
    #[inline]
    #[must_use]
    pub const fn available_vram(&self) -> u64 {
        self.config.vram_cap_bytes.saturating_sub(self.current_usage)
    }

    /// Returns true if usage exceeds the cap.
    #[inline]
    #[must_use]
    pub const fn is_over_limit(&self) -> bool {
        self.current_usage > self.config.vram_cap_bytes
    }

    /// Advances the frame counter and periodically logs statistics.
    pub fn tick_frame(&mut self) {
        self.current_frame += 1;

        if self.current_frame % self.config.log_interval_frames.max(1) == 0 {
            let stats = self.stats();
            tracing::debug!(
                "Governor - Usage: {}MB / {}MB ({:.1}%), Pressure: {}, Available: {}MB",
                stats.current_usage_mb(),
                stats.cap_mb(),
                stats.usage_percentage * 100.0,
                stats.pressure_level,
                stats.available_bytes() / MIB,
            );
        }
    }

    /// Returns a statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> GovernorStats {
        GovernorStats {
            current_usage_bytes: self.current_usage,
            peak_usage_bytes: self.peak_usage,
            cap_bytes: self.config.vram_cap_bytes,
            usage_percentage: self.usage_percentage(),
            pressure_level: self.pressure(),
            cleanup_count: self.cleanup_count,
            emergency_purge_count: self.emergency_purge_count,
            total_bytes_freed: self.total_bytes_freed,
            current_frame: self.current_frame,
        }
    }

    /// Last reported usage in bytes.
    #[inline]
    #[must_use]
    pub const fn current_usage(&self) -> u64 {
        self.current_usage
    }

    /// Highest usage ever reported.
    #[inline]
    #[must_use]
    pub const fn peak_usage(&self) -> u64 {
        self.peak_usage
    }

    /// The hard ceiling in bytes.
    #[inline]
    #[must_use]
    pub const fn cap(&self) -> u64 {
        self.config.vram_cap_bytes
    }

    /// Frames ticked so far.
    #[inline]
    #[must_use]
    pub const fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// The active budget.
    #[must_use]
    pub const fn config(&self) -> &BudgetConfig {
        &self.config
    }

    fn handle_pressure_change(&mut self, new_pressure: PressureLevel) {
        let old_pressure = std::mem::replace(&mut self.last_pressure, new_pressure);

        tracing::info!(
            "Memory pressure changed: {} -> {} ({:.1}%)",
            old_pressure,
            new_pressure,
            self.usage_percentage() * 100.0
        );

        if new_pressure.requires_cleanup() {
            tracing::warn!("High memory pressure detected, requesting cleanup");
            self.execute_cleanup();
        }

        if new_pressure == PressureLevel::Critical {
            tracing::warn!("Critical memory pressure, requesting emergency purge");
            self.execute_emergency_purge();
        }
    }

    fn spacing_elapsed(&self, last: Option<u64>, min_gap: u64) -> bool {
        match last {
            Some(frame) => self.current_frame.saturating_sub(frame) >= min_gap,
            None => true,
        }
    }

    fn should_cleanup(&self) -> bool {
        self.config.enable_auto_cleanup
            && self.current_usage >= self.config.cleanup_threshold_bytes
            && self.spacing_elapsed(self.last_cleanup_frame, CLEANUP_MIN_FRAME_GAP)
    }

    fn should_emergency_purge(&self) -> bool {
        self.config.enable_emergency_purge
            && self.current_usage >= self.config.emergency_threshold_bytes
            && self.spacing_elapsed(self.last_emergency_frame, EMERGENCY_MIN_FRAME_GAP)
    }

    fn execute_cleanup(&mut self) -> bool {
        if !self.config.enable_auto_cleanup
            || !self.spacing_elapsed(self.last_cleanup_frame, CLEANUP_MIN_FRAME_GAP)
        {
            return false;
        }
        self.run_cleanup_pass();
        true
    }

    /// Runs every cleanup callback without checking spacing.
    fn run_cleanup_pass(&mut self) {
        tracing::info!(
            "Executing VRAM cleanup - Current: {}MB / {}MB",
            self.current_usage / MIB,
            self.config.vram_cap_bytes / MIB
        );

        let mut total_freed = 0u64;
        for callback in &mut self.cleanup_callbacks {
            let freed = callback();
            total_freed = total_freed.saturating_add(freed);
            tracing::debug!("Cleanup callback freed: {}MB", freed / MIB);
        }

        self.cleanup_count += 1;
        self.total_bytes_freed = self.total_bytes_freed.saturating_add(total_freed);
        self.last_cleanup_frame = Some(self.current_frame);

        tracing::info!(
            "Cleanup completed - Freed: {}MB, Reported usage: {}MB",
            total_freed / MIB,
            self.current_usage / MIB
        );
    }

    fn execute_emergency_purge(&mut self) -> bool {
        if !self.config.enable_emergency_purge
            || !self.spacing_elapsed(self.last_emergency_frame, EMERGENCY_MIN_FRAME_GAP)
        {
            return false;
        }

        tracing::error!(
            "EMERGENCY PURGE - VRAM usage: {}MB / {}MB ({:.1}%)",
            self.current_usage / MIB,
            self.config.vram_cap_bytes / MIB,
            self.usage_percentage() * 100.0
        );

        for callback in &mut self.emergency_callbacks {
            callback();
        }

        // At most one cleanup pass per frame
        if self.config.enable_auto_cleanup && self.last_cleanup_frame != Some(self.current_frame) {
            self.run_cleanup_pass();
        }

        self.emergency_purge_count += 1;
        self.last_emergency_frame = Some(self.current_frame);

        tracing::warn!("Emergency purge completed");
        true
    }
}

impl std::fmt::Debug for ResourceGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGovernor")
            .field("config", &self.config)
            .field("current_usage", &self.current_usage)
            .field("current_frame", &self.current_frame)
            .field("last_pressure", &self.last_pressure)
            .field("cleanup_callbacks", &self.cleanup_callbacks.len())
            .field("emergency_callbacks", &self.emergency_callbacks.len())
            .finish_non_exhaustive()
    }
}

impl Drop for ResourceGovernor {
    fn drop(&mut self) {
        tracing::info!(
            "Governor shut down - Peak: {}MB, Cleanups: {}, Emergency: {}, Freed: {}MB",
            self.peak_usage / MIB,
            self.cleanup_count,
            self.emergency_purge_count,
            self.total_bytes_freed / MIB
        );
    }
}

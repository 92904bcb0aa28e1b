//! # Pooled Buffer Allocator
//!
//! Reusable byte buffers for transient per-frame data (command encoding,
//! staging) so the frame loop does not allocate and free every frame.
//!
//! ## Buffer states
//!
//! ```text
//!   available ──acquire──> active ──release──> available
//!   (queued, pool-owned)   (caller-owned, id still tracked)
//!
//!   pool at max_pool_size ──acquire──> overflow (never tracked, dropped on release)
//! ```
//!
//! The pool tracks buffers by allocation id. A buffer moves into the
//! caller on acquire and back into the queue on release; a buffer whose id
//! is not tracked (overflow, or shrunk away) is simply dropped on release.
//! Overflow buffers are invisible to `total_buffers`; they are counted in
//! [`PoolStats::overflow_allocations`] instead.
//!
//! ## Thread Safety
//!
//! Every operation takes one `parking_lot` mutex for its whole duration.
//! Critical sections are queue and set manipulation only.

mod buffer;

pub use buffer::CommandBuffer;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::error::{GovernorError, GovernorResult};
use crate::MIB;

/// Buffer pool configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Buffers pre-allocated at construction.
    pub initial_pool_size: usize,
    /// Maximum number of tracked buffers.
    pub max_pool_size: usize,
    /// Initial size of every buffer in bytes.
    pub buffer_size: usize,
    /// Grow the pool when the queue is empty.
    pub auto_expand: bool,
    /// Shrink the pool when it sits mostly idle.
    pub auto_shrink: bool,
    /// Minimum frames between two automatic shrinks.
    pub shrink_delay_frames: u64,
    /// Frames between periodic statistics lines.
    pub log_interval_frames: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_pool_size: 16,
            max_pool_size: 64,
            buffer_size: MIB as usize,
            auto_expand: true,
            auto_shrink: true,
            shrink_delay_frames: 300,
            log_interval_frames: 300,
        }
    }
}

impl PoolConfig {
    /// Checks the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`GovernorError::InvalidConfig`] if sizes are zero or the
    /// initial pool exceeds the maximum.
    pub fn validate(&self) -> GovernorResult<()> {
        if self.buffer_size == 0 || self.max_pool_size == 0 {
            return Err(GovernorError::InvalidConfig(
                "buffer_size and max_pool_size must be greater than zero".to_string(),
            ));
        }
        if self.initial_pool_size > self.max_pool_size {
            return Err(GovernorError::InvalidConfig(format!(
                "initial pool size ({}) exceeds max pool size ({})",
                self.initial_pool_size, self.max_pool_size
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

/// Snapshot of the pool's occupancy and lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tracked buffers (available + active).
    pub total_buffers: usize,
    /// Buffers waiting in the queue.
    pub available_buffers: usize,
    /// Tracked buffers currently checked out.
    pub active_buffers: usize,
    /// Approximate tracked memory in MiB, at the configured buffer size.
    pub total_memory_mb: usize,
    /// Lifetime acquisitions.
    pub total_acquisitions: u64,
    /// Lifetime releases.
    pub total_releases: u64,
    /// Growth events, automatic or manual.
    pub pool_expansions: u64,
    /// Shrink events.
    pub pool_shrinks: u64,
    /// Untracked buffers handed out because the pool was at its maximum.
    pub overflow_allocations: u64,
    /// Frames ticked so far.
    pub current_frame: u64,
}

/// Shared pool state, guarded by the pool mutex.
#[derive(Debug)]
struct PoolState {
    available: VecDeque<CommandBuffer>,
    tracked: HashSet<u64>,
    next_allocation_id: u64,
    total_acquisitions: u64,
    total_releases: u64,
    pool_expansions: u64,
    pool_shrinks: u64,
    overflow_allocations: u64,
    current_frame: u64,
    last_shrink_frame: u64,
}

impl PoolState {
    fn create_buffer(&mut self, size: usize) -> CommandBuffer {
        let buffer = CommandBuffer::new(size, self.next_allocation_id);
        self.next_allocation_id += 1;
        buffer
    }

    fn create_tracked(&mut self, size: usize) -> CommandBuffer {
        let buffer = self.create_buffer(size);
        self.tracked.insert(buffer.allocation_id());
        buffer
    }

    fn should_shrink(&self, config: &PoolConfig) -> bool {
        if self.current_frame - self.last_shrink_frame < config.shrink_delay_frames {
            return false;
        }

        let total = self.tracked.len();
        total > config.initial_pool_size && self.available.len() > total * 3 / 4
    }

    /// Drops idle buffers down to half the initial pool size.
    fn shrink(&mut self, config: &PoolConfig) {
        let target_available = config.initial_pool_size / 2;
        if self.available.len() <= target_available {
            return;
        }

        let to_remove = self.available.len() - target_available;
        for buffer in self.available.drain(..to_remove) {
            self.tracked.remove(&buffer.allocation_id());
        }

        self.pool_shrinks += 1;
        self.last_shrink_frame = self.current_frame;

        tracing::info!(
            "Pool shrunk by {} buffers - Total: {}",
            to_remove,
            self.tracked.len()
        );
    }

    fn stats(&self, config: &PoolConfig) -> PoolStats {
        let total_buffers = self.tracked.len();
        let available_buffers = self.available.len();
        PoolStats {
            total_buffers,
            available_buffers,
            active_buffers: total_buffers.saturating_sub(available_buffers),
            total_memory_mb: total_buffers * config.buffer_size / MIB as usize,
            total_acquisitions: self.total_acquisitions,
            total_releases: self.total_releases,
            pool_expansions: self.pool_expansions,
            pool_shrinks: self.pool_shrinks,
            overflow_allocations: self.overflow_allocations,
            current_frame: self.current_frame,
        }
    }
}

/// Thread-safe pool of reusable [`CommandBuffer`]s.
///
/// # Example
///
/// ```rust,ignore
/// let pool = BufferPool::new(PoolConfig::default());
///
/// let mut buffer = pool.acquire_buffer();
/// buffer.write_value(&draw_command);
/// submit(buffer.written());
/// pool.release_buffer(buffer);
///
/// pool.tick_frame();
/// ```
#[derive(Debug)]
pub struct BufferPool {
    config: PoolConfig,
    state: Mutex<PoolState>,
}

impl BufferPool {
    /// Creates a pool and pre-allocates `initial_pool_size` buffers.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid pool config: {config:?}");

        let mut state = PoolState {
            available: VecDeque::with_capacity(config.max_pool_size),
            tracked: HashSet::with_capacity(config.max_pool_size),
            next_allocation_id: 0,
            total_acquisitions: 0,
            total_releases: 0,
            pool_expansions: 0,
            pool_shrinks: 0,
            overflow_allocations: 0,
            current_frame: 0,
            last_shrink_frame: 0,
        };
        for _ in 0..config.initial_pool_size {
            let buffer = state.create_tracked(config.buffer_size);
            state.available.push_back(buffer);
        }

        tracing::info!(
            "Buffer pool initialized - Size: {}KB, Pool: {}-{} buffers ({}MB pre-allocated)",
            config.buffer_size / 1024,
            config.initial_pool_size,
            config.max_pool_size,
            config.initial_pool_size * config.buffer_size / MIB as usize
        );

        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Takes a buffer with its cursor at zero.
    ///
    /// Reuses a queued buffer when one is available, otherwise grows the
    /// pool, otherwise hands out an untracked overflow buffer.
    pub fn acquire_buffer(&self) -> CommandBuffer {
        let mut state = self.state.lock();
        state.total_acquisitions += 1;

        if let Some(mut buffer) = state.available.pop_front() {
            buffer.reset();
            return buffer;
        }

        if self.config.auto_expand && state.tracked.len() < self.config.max_pool_size {
            let buffer = state.create_tracked(self.config.buffer_size);
            state.pool_expansions += 1;
            tracing::debug!("Pool expanded - Total buffers: {}", state.tracked.len());
            return buffer;
        }

        state.overflow_allocations += 1;
        tracing::warn!(
            "Pool exhausted at {} buffers, handing out an untracked buffer (consider raising max_pool_size)",
            state.tracked.len()
        );
        state.create_buffer(self.config.buffer_size)
    }

    /// Returns a buffer to the pool.
    ///
    /// Tracked buffers are rewound and queued; anything else is dropped.
    pub fn release_buffer(&self, mut buffer: CommandBuffer) {
        let mut state = self.state.lock();
        state.total_releases += 1;

        if state.tracked.contains(&buffer.allocation_id()) {
            buffer.reset();
            state.available.push_back(buffer);
        }
    }

    /// Pre-allocates up to `count` buffers, clamped to the maximum.
    ///
    /// Returns the number of buffers actually added.
    pub fn expand_pool(&self, count: usize) -> usize {
        let mut state = self.state.lock();

        let room = self.config.max_pool_size.saturating_sub(state.tracked.len());
        let count = count.min(room);
        for _ in 0..count {
            let buffer = state.create_tracked(self.config.buffer_size);
            state.available.push_back(buffer);
        }

        state.pool_expansions += 1;
        tracing::info!(
            "Pool manually expanded by {} buffers - Total: {}",
            count,
            state.tracked.len()
        );
        count
    }

    /// Drops idle buffers down to half the initial pool size.
    pub fn shrink_pool(&self) {
        self.state.lock().shrink(&self.config);
    }

    /// Advances the frame counter and runs the automatic shrink check.
    pub fn tick_frame(&self) {
        let mut state = self.state.lock();
        state.current_frame += 1;

        if self.config.auto_shrink && state.should_shrink(&self.config) {
            state.shrink(&self.config);
        }

        if state.current_frame % self.config.log_interval_frames.max(1) == 0 {
            let stats = state.stats(&self.config);
            tracing::debug!(
                "Buffer pool - Total: {}, Available: {}, Active: {}, Memory: {}MB, Overflow: {}",
                stats.total_buffers,
                stats.available_buffers,
                stats.active_buffers,
                stats.total_memory_mb,
                stats.overflow_allocations
            );
        }
    }

    /// Returns a statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.state.lock().stats(&self.config)
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        let stats = self.state.get_mut().stats(&self.config);
        tracing::info!(
            "Buffer pool destroyed - Acquisitions: {}, Releases: {}, Expansions: {}, Shrinks: {}, Overflow: {}",
            stats.total_acquisitions,
            stats.total_releases,
            stats.pool_expansions,
            stats.pool_shrinks,
            stats.overflow_allocations
        );
    }
}

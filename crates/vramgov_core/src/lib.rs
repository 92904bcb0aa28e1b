//! # VRAMGOV Core
//!
//! Adaptive GPU memory governor for renderers on devices with small,
//! variable memory budgets. Three components share a once-per-frame tick:
//!
//! - [`governor::ResourceGovernor`] - owns the budget, classifies usage into
//!   [`PressureLevel`]s and fires cleanup/emergency callbacks with hysteresis
//! - [`eviction::EvictionPolicy`] - tracks per-resource idle time and produces
//!   prioritized purge lists
//! - [`pool::BufferPool`] - reusable byte buffers for per-frame encoding
//!
//! None of them touches the graphics API. They decide *what* and *when*;
//! the caller creates and destroys GPU objects.
//!
//! ## Thread Safety
//!
//! The governor and the eviction policy hold no locks and are meant to be
//! driven from the render thread. The buffer pool is safe to share.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vramgov_core::{GovernorSettings, ResourceGovernor, EvictionPolicy, BufferPool};
//!
//! let settings = GovernorSettings::load("governor.toml")?;
//! let mut governor = ResourceGovernor::new(settings.budget);
//! let mut eviction = EvictionPolicy::new(settings.eviction);
//! let pool = BufferPool::new(settings.pool);
//!
//! // Every frame
//! governor.update_usage(gpu.allocated_bytes());
//! governor.tick_frame();
//! eviction.tick_frame();
//! pool.tick_frame();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod eviction;
pub mod governor;
pub mod pool;

/// Bytes per MiB.
pub const MIB: u64 = 1024 * 1024;

pub use config::GovernorSettings;
pub use error::{GovernorError, GovernorResult};
pub use eviction::{EvictionConfig, EvictionPolicy, EvictionStats, ForcedCleanup, ResourceId, TrackedResource};
pub use governor::{BudgetConfig, DeviceTier, GovernorStats, PressureLevel, ResourceGovernor};
pub use pool::{BufferPool, CommandBuffer, PoolConfig, PoolStats};

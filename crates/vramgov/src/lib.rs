//! # VRAMGOV
//!
//! Frame-loop integration of the GPU memory governor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      FrameMemoryDirector                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌─────────────────┐  cleanup   ┌─────────────────┐             │
//! │  │ ResourceGovernor│───────────>│ EvictionPolicy  │             │
//! │  │                 │  emergency │                 │             │
//! │  │  • Budget       │───────┐    │  • Idle frames  │             │
//! │  │  • Pressure     │       │    │  • Purge lists  │             │
//! │  └─────────────────┘       │    └────────┬────────┘             │
//! │                            │             │ destroy              │
//! │  ┌─────────────────┐       │    ┌────────v────────┐             │
//! │  │   BufferPool    │       └───>│ GraphicsBackend │             │
//! │  └─────────────────┘            └─────────────────┘             │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `backend`: The seam to the renderer's graphics layer
//! - `director`: begin/end frame orchestration
//! - `simulation`: Synthetic backend and workload for soak runs

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod backend;
pub mod director;
pub mod simulation;

pub use vramgov_core as core;

pub use backend::GraphicsBackend;
pub use director::{DirectorStats, FrameMemoryDirector, DEFAULT_DRIFT_TOLERANCE};
pub use simulation::{SimulatedBackend, SoakProfile, SoakWorkload};

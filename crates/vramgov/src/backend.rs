//! # Graphics Backend Seam
//!
//! The governor decides what to free; the renderer's graphics layer does
//! the freeing. The renderer implements this trait to plug its texture
//! cache into the [`FrameMemoryDirector`](crate::FrameMemoryDirector).
//!
//! ```text
//! vramgov defines:              renderer implements:
//! ┌───────────────────────┐    ┌───────────────────────┐
//! │ trait GraphicsBackend │ ←─ │ impl GraphicsBackend  │
//! └───────────────────────┘    └───────────────────────┘
//! ```

use vramgov_core::ResourceId;

/// Interface to the graphics layer that owns the real GPU objects.
///
/// Every method is called from inside governor callbacks on the render
/// thread and must not fail or block.
pub trait GraphicsBackend: Send {
    /// Current aggregate VRAM usage in bytes, as measured by the driver or
    /// the renderer's own allocator.
    fn current_usage_bytes(&self) -> u64;

    /// Destroys a resource. Returns the bytes actually released, zero if
    /// the resource was already gone.
    fn destroy_resource(&mut self, id: ResourceId) -> u64;

    /// Drops whole caches (staging, shader, framebuffer) in an emergency.
    /// Returns the bytes released.
    fn clear_caches(&mut self) -> u64;
}

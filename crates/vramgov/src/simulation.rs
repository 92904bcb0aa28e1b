//! # Synthetic Renderer Workload
//!
//! A fake graphics layer and a seeded texture-streaming workload, used by
//! the `frame_soak` binary and by integration tests to drive the director
//! for thousands of frames without a GPU.
//!
//! Each simulated frame:
//! 1. Streams in a few textures, if the governor admits them
//! 2. Marks the most recently loaded textures and all render targets used
//! 3. Encodes one draw command per hot texture into a pooled buffer
//! 4. Grows the shader/staging cache until it hits its ceiling

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vramgov_core::{ResourceId, MIB};

use crate::backend::GraphicsBackend;
use crate::director::FrameMemoryDirector;

/// In-memory stand-in for a GPU texture cache.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    resources: HashMap<ResourceId, u64>,
    resource_bytes: u64,
    cache_bytes: u64,
    next_id: u64,
    destroyed: u64,
}

impl SimulatedBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resource of `size_bytes` and returns its id.
    pub fn allocate(&mut self, size_bytes: u64) -> ResourceId {
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        self.resources.insert(id, size_bytes);
        self.resource_bytes += size_bytes;
        id
    }

    /// Grows the untracked cache by `bytes`.
    pub fn grow_cache(&mut self, bytes: u64) {
        self.cache_bytes = self.cache_bytes.saturating_add(bytes);
    }

    /// Returns true if the resource is still alive.
    #[must_use]
    pub fn is_alive(&self, id: ResourceId) -> bool {
        self.resources.contains_key(&id)
    }

    /// Live resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Bytes held by the cache.
    #[must_use]
    pub const fn cache_bytes(&self) -> u64 {
        self.cache_bytes
    }

    /// Resources destroyed so far.
    #[must_use]
    pub const fn destroyed_count(&self) -> u64 {
        self.destroyed
    }
}

impl GraphicsBackend for SimulatedBackend {
    fn current_usage_bytes(&self) -> u64 {
        self.resource_bytes + self.cache_bytes
    }

    fn destroy_resource(&mut self, id: ResourceId) -> u64 {
        match self.resources.remove(&id) {
            Some(size) => {
                self.resource_bytes -= size;
                self.destroyed += 1;
                size
            }
            None => 0,
        }
    }

    fn clear_caches(&mut self) -> u64 {
        std::mem::take(&mut self.cache_bytes)
    }
}

/// Shape of the synthetic workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoakProfile {
    /// RNG seed; equal seeds replay equal runs.
    pub seed: u64,
    /// Texture loads attempted per frame.
    pub loads_per_frame: usize,
    /// Smallest texture, in bytes.
    pub min_texture_bytes: u64,
    /// Largest texture, in bytes.
    pub max_texture_bytes: u64,
    /// Most recently loaded textures kept hot every frame.
    pub hot_set_len: usize,
    /// Render targets created on the first frame.
    pub render_targets: usize,
    /// Size of each render target.
    pub render_target_bytes: u64,
    /// Cache growth per frame.
    pub cache_growth_bytes: u64,
    /// Cache ceiling.
    pub cache_limit_bytes: u64,
}

impl Default for SoakProfile {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            loads_per_frame: 4,
            min_texture_bytes: MIB,
            max_texture_bytes: 16 * MIB,
            hot_set_len: 32,
            render_targets: 3,
            render_target_bytes: 8 * MIB,
            cache_growth_bytes: 256 * 1024,
            cache_limit_bytes: 48 * MIB,
        }
    }
}

/// Seeded texture-streaming workload.
#[derive(Debug)]
pub struct SoakWorkload {
    profile: SoakProfile,
    rng: StdRng,
    render_targets: Vec<ResourceId>,
    resident: Vec<ResourceId>,
    frames: u64,
    loaded: u64,
    rejected: u64,
    encoded_bytes: u64,
}

impl SoakWorkload {
    /// Creates a workload for `profile`.
    #[must_use]
    pub fn new(profile: SoakProfile) -> Self {
        Self {
            rng: StdRng::seed_from_u64(profile.seed),
            profile,
            render_targets: Vec::new(),
            resident: Vec::new(),
            frames: 0,
            loaded: 0,
            rejected: 0,
            encoded_bytes: 0,
        }
    }

    /// Runs one full frame against `director`.
    pub fn step(&mut self, director: &mut FrameMemoryDirector<SimulatedBackend>) {
        director.begin_frame();

        if self.frames == 0 {
            self.create_render_targets(director);
        }

        self.resident.retain(|id| director.is_tracked(*id));
        self.stream_textures(director);

        let hot_start = self.resident.len().saturating_sub(self.profile.hot_set_len);
        let hot = &self.resident[hot_start..];
        for id in self.render_targets.iter().chain(hot) {
            director.mark_used(*id);
        }

        let mut buffer = director.pool().acquire_buffer();
        for id in hot {
            buffer.write_value(&id.0);
        }
        self.encoded_bytes += buffer.position() as u64;
        director.pool().release_buffer(buffer);

        let (growth, limit) = (self.profile.cache_growth_bytes, self.profile.cache_limit_bytes);
        director.with_backend(|b| b.grow_cache(growth.min(limit.saturating_sub(b.cache_bytes()))));

        director.end_frame();
        self.frames += 1;
    }

    /// Runs `frames` frames.
    pub fn run(&mut self, director: &mut FrameMemoryDirector<SimulatedBackend>, frames: u64) {
        for _ in 0..frames {
            self.step(director);
        }
    }

    fn create_render_targets(&mut self, director: &FrameMemoryDirector<SimulatedBackend>) {
        let size = self.profile.render_target_bytes;
        for _ in 0..self.profile.render_targets {
            let id = director.with_backend(|b| b.allocate(size));
            director.register_resource(id, size, true);
            self.render_targets.push(id);
        }
    }

    fn stream_textures(&mut self, director: &FrameMemoryDirector<SimulatedBackend>) {
        for _ in 0..self.profile.loads_per_frame {
            let size = self
                .rng
                .gen_range(self.profile.min_texture_bytes..=self.profile.max_texture_bytes);

            if !director.can_allocate(size) {
                self.rejected += 1;
                continue;
            }

            let id = director.with_backend(|b| b.allocate(size));
            director.register_resource(id, size, false);
            self.resident.push(id);
            self.loaded += 1;
        }
    }

    /// Frames run so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Textures loaded so far.
    #[must_use]
    pub const fn loaded(&self) -> u64 {
        self.loaded
    }

    /// Loads refused by the admission check.
    #[must_use]
    pub const fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Bytes encoded into pooled buffers so far.
    #[must_use]
    pub const fn encoded_bytes(&self) -> u64 {
        self.encoded_bytes
    }

    /// Render targets created on the first frame.
    #[must_use]
    pub fn render_targets(&self) -> &[ResourceId] {
        &self.render_targets
    }
}

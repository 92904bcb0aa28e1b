//! # Frame Soak
//!
//! Drives the memory director with a synthetic texture-streaming workload
//! and prints the final statistics.
//!
//! Usage: `frame_soak [frames] [governor.toml]`
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use vramgov::core::{DeviceTier, GovernorSettings};
use vramgov::{FrameMemoryDirector, SimulatedBackend, SoakProfile, SoakWorkload};

const DEFAULT_FRAMES: u64 = 2000;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let frames = match args.get(1) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(frames) => frames,
            Err(e) => {
                eprintln!("Error: invalid frame count '{raw}': {e}");
                eprintln!("Usage: frame_soak [frames] [governor.toml]");
                return ExitCode::FAILURE;
            }
        },
        None => DEFAULT_FRAMES,
    };

    let settings = match args.get(2) {
        Some(path) => match GovernorSettings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => GovernorSettings::for_tier(DeviceTier::detect()),
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         VRAMGOV FRAME SOAK                                       ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "Tier: {:?}  Cap: {}MB  Frames: {}",
        settings.budget.device_tier,
        settings.budget.vram_cap_bytes / vramgov::core::MIB,
        frames
    );
    println!();

    let mut director = FrameMemoryDirector::new(settings, SimulatedBackend::new());
    let mut workload = SoakWorkload::new(SoakProfile::default());
    workload.run(&mut director, frames);

    let stats = director.stats();
    let (alive, destroyed) =
        director.with_backend(|b| (b.resource_count(), b.destroyed_count()));

    println!("┌─ GOVERNOR ───────────────────────────────────────────────────────┐");
    println!("│ Usage:              {}MB / {}MB", stats.governor.current_usage_mb(), stats.governor.cap_mb());
    println!("│ Peak:               {}MB", stats.governor.peak_usage_bytes / vramgov::core::MIB);
    println!("│ Pressure:           {}", stats.governor.pressure_level);
    println!("│ Cleanups:           {}", stats.governor.cleanup_count);
    println!("│ Emergency purges:   {}", stats.governor.emergency_purge_count);
    println!("├─ EVICTION ───────────────────────────────────────────────────────┤");
    println!("│ Tracked:            {} ({}MB)", stats.eviction.tracked_resources, stats.eviction.tracked_mb());
    println!("│ Purged:             {} ({}MB)", stats.eviction.resources_purged, stats.eviction.purged_mb());
    println!("│ Drift:              {}MB", stats.usage_drift_bytes / vramgov::core::MIB);
    println!("├─ POOL ───────────────────────────────────────────────────────────┤");
    println!("│ Buffers:            {} ({} available)", stats.pool.total_buffers, stats.pool.available_buffers);
    println!("│ Acquisitions:       {}", stats.pool.total_acquisitions);
    println!("│ Expansions/Shrinks: {}/{}", stats.pool.pool_expansions, stats.pool.pool_shrinks);
    println!("├─ WORKLOAD ───────────────────────────────────────────────────────┤");
    println!("│ Loaded:             {}", workload.loaded());
    println!("│ Rejected:           {}", workload.rejected());
    println!("│ Alive/Destroyed:    {alive}/{destroyed}");
    println!("│ Encoded:            {}KB", workload.encoded_bytes() / 1024);
    println!("└──────────────────────────────────────────────────────────────────┘");

    ExitCode::SUCCESS
}

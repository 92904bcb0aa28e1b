//! # Director Integration Tests
//!
//! Runs the director against the simulated backend and checks that the
//! governor's callbacks reach the eviction policy and the graphics layer.

use vramgov::core::{BudgetConfig, GovernorSettings, PressureLevel, ResourceId, MIB};
use vramgov::{FrameMemoryDirector, SimulatedBackend, SoakProfile, SoakWorkload};

/// 100 MiB cap, cleanup at 80 MiB, emergency at 95 MiB.
fn small_settings() -> GovernorSettings {
    GovernorSettings {
        budget: BudgetConfig::with_limits(100 * MIB, 80 * MIB, 95 * MIB),
        ..GovernorSettings::default()
    }
}

fn load(
    director: &FrameMemoryDirector<SimulatedBackend>,
    size: u64,
    is_render_target: bool,
) -> ResourceId {
    let id = director.with_backend(|b| b.allocate(size));
    director.register_resource(id, size, is_render_target);
    id
}

fn run_frames(director: &mut FrameMemoryDirector<SimulatedBackend>, frames: u64, hot: &[ResourceId]) {
    for _ in 0..frames {
        director.begin_frame();
        for id in hot {
            director.mark_used(*id);
        }
        director.end_frame();
    }
}

#[test]
fn cleanup_destroys_idle_resources_on_the_backend() {
    let mut director = FrameMemoryDirector::new(small_settings(), SimulatedBackend::new());
    let idle = load(&director, 40 * MIB, false);
    let hot = load(&director, 40 * MIB, false);

    // Frame 0 cleans up at 80 MiB but nothing is idle yet
    run_frames(&mut director, 60, &[hot]);
    assert!(director.is_tracked(idle));
    assert_eq!(director.stats().governor.cleanup_count, 1);

    // Frame 60: spacing elapsed and the idle texture crossed 60 frames
    director.begin_frame();

    assert!(!director.is_tracked(idle));
    assert!(director.is_tracked(hot));
    assert!(!director.with_backend(|b| b.is_alive(idle)));
    assert!(director.with_backend(|b| b.is_alive(hot)));

    let stats = director.stats();
    assert_eq!(stats.governor.cleanup_count, 2);
    assert_eq!(stats.governor.total_bytes_freed, 40 * MIB);
    assert_eq!(stats.eviction.resources_purged, 1);
    assert_eq!(stats.eviction.tracked_bytes, 40 * MIB);
}

#[test]
fn emergency_clears_caches_and_forces_cleanup() {
    let mut director = FrameMemoryDirector::new(small_settings(), SimulatedBackend::new());
    let idle = load(&director, 30 * MIB, false);
    let hot = load(&director, 30 * MIB, false);
    let target = load(&director, 10 * MIB, true);

    run_frames(&mut director, 20, &[hot, target]);
    assert_eq!(director.pressure(), PressureLevel::Low);

    director.with_backend(|b| b.grow_cache(26 * MIB));
    let level = director.begin_frame();
    assert_eq!(level, PressureLevel::Critical);

    // The transition cleanup covers this frame; the emergency adds no second pass
    let stats = director.stats();
    assert_eq!(stats.governor.emergency_purge_count, 1);
    assert_eq!(stats.governor.cleanup_count, 1);

    assert!(!director.is_tracked(idle));
    director.with_backend(|b| {
        assert!(!b.is_alive(idle));
        assert!(b.is_alive(hot));
        assert!(b.is_alive(target));
        assert_eq!(b.cache_bytes(), 0);
    });

    // Backend and accumulator agree again after the purge
    assert_eq!(stats.usage_drift_bytes, 0);
    assert_eq!(stats.eviction.tracked_bytes, 40 * MIB);
}

#[test]
fn drift_between_backend_and_tracking_is_reported() {
    let mut director = FrameMemoryDirector::new(small_settings(), SimulatedBackend::new())
        .with_drift_tolerance(MIB);
    load(&director, 10 * MIB, false);
    director.with_backend(|b| b.grow_cache(5 * MIB));

    director.begin_frame();
    assert_eq!(director.stats().usage_drift_bytes, 5 * MIB);

    director.with_backend(|b| {
        b.allocate(3 * MIB);
    });
    director.begin_frame();
    assert_eq!(director.stats().usage_drift_bytes, 8 * MIB);
}

#[test]
fn admission_uses_last_reported_usage() {
    let mut director = FrameMemoryDirector::new(small_settings(), SimulatedBackend::new());
    let _ = load(&director, 90 * MIB, false);

    // Nothing reported yet
    assert!(director.can_allocate(100 * MIB));

    director.begin_frame();
    assert_eq!(director.pressure(), PressureLevel::High);
    assert!(director.can_allocate(10 * MIB));
    assert!(!director.can_allocate(11 * MIB));
}

#[test]
fn manual_cleanup_runs_the_eviction_callback() {
    let mut director = FrameMemoryDirector::new(small_settings(), SimulatedBackend::new());
    let idle = load(&director, 4 * MIB, false);

    run_frames(&mut director, 61, &[]);
    assert_eq!(director.stats().governor.cleanup_count, 0);

    assert!(director.governor_mut().request_cleanup());
    assert!(!director.is_tracked(idle));
    assert_eq!(director.stats().governor.total_bytes_freed, 4 * MIB);

    // Spacing applies to manual requests too
    assert!(!director.governor_mut().request_cleanup());
}

#[test]
fn renderer_can_unregister_on_its_own() {
    let director = FrameMemoryDirector::new(small_settings(), SimulatedBackend::new());
    let id = load(&director, 2 * MIB, false);

    let info = director.unregister_resource(id);
    assert_eq!(info.map(|i| i.size_bytes), Some(2 * MIB));
    assert!(director.unregister_resource(id).is_none());
    assert!(!director.is_tracked(id));
}

#[test]
fn soak_keeps_render_targets_and_stays_deterministic() {
    let run = || {
        let mut director =
            FrameMemoryDirector::new(GovernorSettings::default(), SimulatedBackend::new());
        let mut workload = SoakWorkload::new(SoakProfile::default());
        workload.run(&mut director, 600);

        for id in workload.render_targets() {
            assert!(director.is_tracked(*id));
            assert!(director.with_backend(|b| b.is_alive(*id)));
        }
        assert_eq!(workload.frames(), 600);
        assert!(workload.loaded() > 0);

        director.stats()
    };

    let first = run();
    let second = run();

    assert!(first.governor.cleanup_count > 0);
    assert!(first.eviction.resources_purged > 0);
    assert_eq!(first.pool.total_acquisitions, 600);
    assert_eq!(first.pool.total_releases, 600);
    assert_eq!(first, second);
}

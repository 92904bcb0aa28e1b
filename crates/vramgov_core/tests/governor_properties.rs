//! # Governor Property Tests
//!
//! End-to-end checks of pressure classification, hysteresis and the
//! frame-loop scenarios the governor must reproduce exactly.
//!
//! Run with: cargo test --package vramgov_core --test governor_properties

use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use vramgov_core::{BudgetConfig, DeviceTier, PressureLevel, ResourceGovernor, MIB};

struct Counters {
    cleanups: Arc<AtomicU32>,
    emergencies: Arc<AtomicU32>,
}

impl Counters {
    fn cleanups(&self) -> u32 {
        self.cleanups.load(Ordering::Relaxed)
    }

    fn emergencies(&self) -> u32 {
        self.emergencies.load(Ordering::Relaxed)
    }
}

fn instrumented(config: BudgetConfig) -> (ResourceGovernor, Counters) {
    let counters = Counters {
        cleanups: Arc::new(AtomicU32::new(0)),
        emergencies: Arc::new(AtomicU32::new(0)),
    };
    let mut governor = ResourceGovernor::new(config);

    let cleanups = Arc::clone(&counters.cleanups);
    governor.register_cleanup_callback(move || {
        cleanups.fetch_add(1, Ordering::Relaxed);
        0
    });
    let emergencies = Arc::clone(&counters.emergencies);
    governor.register_emergency_callback(move || {
        emergencies.fetch_add(1, Ordering::Relaxed);
    });

    (governor, counters)
}

fn run_to_frame(governor: &mut ResourceGovernor, frame: u64) {
    while governor.current_frame() < frame {
        governor.tick_frame();
    }
}

#[test]
fn scenario_cleanup_then_emergency() {
    let config = BudgetConfig::with_limits(1000 * MIB, 800 * MIB, 950 * MIB);
    let (mut governor, counters) = instrumented(config);

    governor.update_usage(850 * MIB);
    assert_eq!((counters.cleanups(), counters.emergencies()), (1, 0));

    run_to_frame(&mut governor, 10);
    governor.update_usage(960 * MIB);
    assert_eq!((counters.cleanups(), counters.emergencies()), (2, 1));

    run_to_frame(&mut governor, 50);
    governor.update_usage(960 * MIB);
    assert_eq!((counters.cleanups(), counters.emergencies()), (2, 1));

    run_to_frame(&mut governor, 69);
    governor.update_usage(960 * MIB);
    assert_eq!(counters.cleanups(), 2);

    run_to_frame(&mut governor, 70);
    governor.update_usage(960 * MIB);
    assert_eq!((counters.cleanups(), counters.emergencies()), (3, 1));

    // Byte path cleanup and emergency both fire, with a single pass
    run_to_frame(&mut governor, 130);
    governor.update_usage(960 * MIB);
    assert_eq!((counters.cleanups(), counters.emergencies()), (4, 2));

    let stats = governor.stats();
    assert_eq!(stats.emergency_purge_count, 2);
    assert_eq!(stats.peak_usage_bytes, 960 * MIB);
    assert_eq!(stats.pressure_level, PressureLevel::Critical);
}

#[test]
fn hysteresis_holds_for_every_frame_in_window() {
    let config = BudgetConfig::with_limits(1000 * MIB, 800 * MIB, 950 * MIB);
    let (mut governor, counters) = instrumented(config);

    run_to_frame(&mut governor, 500);
    governor.update_usage(820 * MIB);
    assert_eq!(counters.cleanups(), 1);

    for frame in 501..560 {
        run_to_frame(&mut governor, frame);
        governor.update_usage(830 * MIB);
        assert_eq!(counters.cleanups(), 1, "second cleanup at frame {frame}");
    }

    run_to_frame(&mut governor, 560);
    governor.update_usage(830 * MIB);
    assert_eq!(counters.cleanups(), 2);
}

#[test]
fn oscillation_does_not_storm() {
    let config = BudgetConfig::with_limits(1000 * MIB, 800 * MIB, 950 * MIB);
    let (mut governor, counters) = instrumented(config);

    for frame in 0..600u64 {
        let usage = if frame % 2 == 0 { 700 * MIB } else { 900 * MIB };
        governor.update_usage(usage);
        governor.tick_frame();
    }

    // One pass per 60-frame window at most
    assert!(counters.cleanups() <= 10);
    assert_eq!(counters.emergencies(), 0);
}

#[test]
fn recommended_configs_classify_their_own_thresholds() {
    for tier in DeviceTier::ALL {
        let config = BudgetConfig::recommended(tier);
        let mut governor = ResourceGovernor::new(config.clone());

        governor.update_usage(config.emergency_threshold_bytes);
        assert!(governor.pressure() >= PressureLevel::High, "{tier:?}");
        assert!(governor.can_allocate(config.vram_cap_bytes - config.emergency_threshold_bytes));
    }
}

proptest! {
    #[test]
    fn pressure_is_monotonic(a in 0u64..2_000, b in 0u64..2_000) {
        let config = BudgetConfig::with_limits(1000 * MIB, 800 * MIB, 950 * MIB);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let level_low = PressureLevel::classify(low as f64 / 1000.0, &config);
        let level_high = PressureLevel::classify(high as f64 / 1000.0, &config);
        prop_assert!(level_low <= level_high);
    }

    #[test]
    fn pressure_is_deterministic(usage in 0u64..4096) {
        let mut governor = ResourceGovernor::new(BudgetConfig::default());
        governor.update_usage(usage * MIB);
        let first = governor.pressure();
        governor.update_usage(usage * MIB);
        prop_assert_eq!(first, governor.pressure());
    }

    #[test]
    fn can_allocate_matches_cap(usage in 0u64..2048, request in 0u64..2048) {
        let mut governor = ResourceGovernor::new(BudgetConfig::default());
        governor.update_usage(usage * MIB);
        prop_assert_eq!(
            governor.can_allocate(request * MIB),
            (usage + request) * MIB <= governor.cap()
        );
    }
}

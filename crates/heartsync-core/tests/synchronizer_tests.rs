use heartsync_core::{Color, SnapshotMailbox, StateSynchronizer, SyncConfig, TelemetrySnapshot, Zone};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn synchronizer_at(bpm: f32) -> StateSynchronizer {
    let mailbox = Arc::new(SnapshotMailbox::new());
    let mut sync = StateSynchronizer::new(mailbox.clone(), &SyncConfig::default()).unwrap();
    mailbox.publish(TelemetrySnapshot::new(bpm, Zone::Rest, Zone::Rest.color()));
    sync.tick(Duration::ZERO);
    sync
}

fn phase_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).abs();
    d.min(1.0 - d)
}

proptest! {
    // At 60 bpm the pulse repeats every second
    #[test]
    fn prop_phase_period_one_second_at_60_bpm(ticks in 0usize..400, step_ms in 1u64..50) {
        let mut sync = synchronizer_at(60.0);
        let step = Duration::from_millis(step_ms);

        for _ in 0..ticks {
            sync.tick(step);
        }
        let before = sync.state().pulse_phase;

        // Advance by exactly one second
        let mut remaining = Duration::from_secs(1);
        while remaining > Duration::ZERO {
            let dt = remaining.min(step);
            sync.tick(dt);
            remaining -= dt;
        }

        prop_assert!(phase_distance(before, sync.state().pulse_phase) < 1e-4);
    }

    #[test]
    fn prop_phase_stays_in_unit_interval(bpm in 30.0f32..220.0, ticks in 1usize..200) {
        let mut sync = synchronizer_at(bpm);
        for _ in 0..ticks {
            sync.tick(Duration::from_millis(16));
            let phase = sync.state().pulse_phase;
            prop_assert!((0.0..1.0).contains(&phase));
            let scale = sync.pulse_scale();
            prop_assert!((1.0..=1.2 + 1e-5).contains(&scale));
        }
    }

    // Color at equilibrium is a fixed point of the blend
    #[test]
    fn prop_equilibrium_color_is_stable(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255, dt_ms in 0u64..1000) {
        let hex = format!("#{:02X}{:02X}{:02X}", r, g, b);
        let color = Color::from_hex(&hex).unwrap();
        let mailbox = Arc::new(SnapshotMailbox::new());
        let config = SyncConfig {
            default_color: hex,
            ..Default::default()
        };
        let mut sync = StateSynchronizer::new(mailbox.clone(), &config).unwrap();
        mailbox.publish(TelemetrySnapshot::new(80.0, Zone::Unknown, color));

        sync.tick(Duration::from_millis(dt_ms));
        prop_assert_eq!(sync.state().display_color, sync.target_color());
        sync.tick(Duration::from_millis(dt_ms));
        prop_assert_eq!(sync.state().display_color, sync.target_color());
    }
}

#[test]
fn test_pulse_keeps_moving_without_updates() {
    let mut sync = synchronizer_at(120.0);
    let mut phases = Vec::new();
    for _ in 0..5 {
        assert!(!sync.tick(Duration::from_millis(100)));
        phases.push(sync.state().pulse_phase);
    }
    // 120 bpm = 2 beats per second, 0.2 beats per 100 ms tick
    for pair in phases.windows(2) {
        let step = (pair[1] - pair[0]).rem_euclid(1.0);
        assert!((step - 0.2).abs() < 1e-4, "step was {}", step);
    }
}

#[test]
fn test_bpm_change_does_not_jump_phase() {
    let mailbox = Arc::new(SnapshotMailbox::new());
    let mut sync = StateSynchronizer::new(mailbox.clone(), &SyncConfig::default()).unwrap();
    sync.tick(Duration::from_millis(250));
    assert!((sync.state().pulse_phase - 0.25).abs() < 1e-6);

    // A new target only changes how fast the phase advances from here on
    mailbox.publish(TelemetrySnapshot::new(180.0, Zone::Vo2Max, Zone::Vo2Max.color()));
    sync.tick(Duration::ZERO);
    assert!((sync.state().pulse_phase - 0.25).abs() < 1e-6);

    sync.tick(Duration::from_millis(250));
    assert!((sync.state().pulse_phase - 1.0).abs() < 1e-6 || sync.state().pulse_phase < 1e-6);
}

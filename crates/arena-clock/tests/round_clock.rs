//! Integration tests for the round clock.
//!
//! Uses paused tokio time so `sleep_until` resolves as soon as the
//! runtime auto-advances.

use std::time::Duration;

use arena_clock::{ClockConfig, RoundClock, TickPolicy};

// =========================================================================
// Helpers
// =========================================================================

fn config_10hz() -> ClockConfig {
    ClockConfig {
        initial_jitter_us: 0,
        ..ClockConfig::with_rate(10)
    }
}

// =========================================================================
// ClockConfig
// =========================================================================

#[test]
fn test_default_config_ticks_once_per_second() {
    let cfg = ClockConfig::default();
    assert_eq!(cfg.tick_rate_hz, 1);
    assert_eq!(cfg.tick_duration(), Some(Duration::from_secs(1)));
    assert_eq!(cfg.policy, TickPolicy::Skip);
}

#[test]
fn test_manual_config_has_no_duration() {
    let cfg = ClockConfig::manual();
    assert_eq!(cfg.tick_duration(), None);
}

#[test]
fn test_validated_clamps_rate_and_threshold() {
    let cfg = ClockConfig {
        tick_rate_hz: 500,
        budget_warn_threshold: 3.0,
        ..Default::default()
    }
    .validated();
    assert_eq!(cfg.tick_rate_hz, ClockConfig::MAX_TICK_RATE_HZ);
    assert_eq!(cfg.budget_warn_threshold, 1.0);
}

#[test]
fn test_config_deserializes_with_defaults() {
    let cfg: ClockConfig = serde_json::from_str(r#"{"tick_rate_hz": 4}"#).unwrap();
    assert_eq!(cfg.tick_rate_hz, 4);
    assert_eq!(cfg.initial_jitter_us, 2_000);
}

// =========================================================================
// Clock creation and accessors
// =========================================================================

#[test]
fn test_clock_initial_state() {
    let c = RoundClock::new(config_10hz());
    assert_eq!(c.tick_count(), 0);
    assert_eq!(c.tick_rate_hz(), 10);
    assert!(!c.is_manual());
    assert!(!c.is_paused());
    assert_eq!(c.tick_duration(), Some(Duration::from_millis(100)));
}

#[test]
fn test_clock_manual_mode() {
    let c = RoundClock::new(ClockConfig::manual());
    assert!(c.is_manual());
    assert_eq!(c.tick_duration(), None);
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_and_increments() {
    let mut c = RoundClock::new(config_10hz());

    let info = c.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert!(!info.late);
    assert_eq!(info.ticks_skipped, 0);
    assert_eq!(c.tick_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_increment_monotonically() {
    let mut c = RoundClock::new(config_10hz());

    for expected in 1..=5 {
        let info = c.wait_for_tick().await;
        assert_eq!(info.tick, expected);
    }
}

#[tokio::test(start_paused = true)]
async fn test_manual_clock_never_fires() {
    let mut c = RoundClock::new(ClockConfig::manual());

    let result = tokio::time::timeout(Duration::from_secs(5), c.wait_for_tick()).await;
    assert!(result.is_err(), "manual clock should pend forever");
}

#[tokio::test(start_paused = true)]
async fn test_skip_policy_reports_skipped_ticks_when_late() {
    let mut c = RoundClock::new(config_10hz());
    c.wait_for_tick().await;

    // Stall for 3.5 ticks before polling again.
    tokio::time::advance(Duration::from_millis(450)).await;
    let info = c.wait_for_tick().await;
    assert!(info.late);
    assert_eq!(info.tick, 2);
    assert!(info.ticks_skipped >= 3);
}

#[tokio::test(start_paused = true)]
async fn test_catchup_policy_within_cap_skips_nothing() {
    let mut c = RoundClock::new(ClockConfig {
        policy: TickPolicy::CatchUp { max_catchup: 5 },
        ..config_10hz()
    });
    c.wait_for_tick().await;

    tokio::time::advance(Duration::from_millis(250)).await;
    let info = c.wait_for_tick().await;
    assert!(info.late);
    assert_eq!(info.ticks_skipped, 0);
}

// =========================================================================
// Pause / Resume
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_prevents_ticks() {
    let mut c = RoundClock::new(config_10hz());
    c.wait_for_tick().await;

    c.pause();
    assert!(c.is_paused());

    let result = tokio::time::timeout(Duration::from_secs(1), c.wait_for_tick()).await;
    assert!(result.is_err(), "paused clock should pend");
}

#[tokio::test(start_paused = true)]
async fn test_resume_allows_ticks_again() {
    let mut c = RoundClock::new(config_10hz());
    c.wait_for_tick().await;
    c.pause();
    c.pause();
    c.resume();
    c.resume();
    assert!(!c.is_paused());

    let info = c.wait_for_tick().await;
    assert_eq!(info.tick, 2);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_wait_is_noop() {
    let mut c = RoundClock::new(config_10hz());
    c.record_tick_end();
    assert_eq!(c.tick_count(), 0);
}

// =========================================================================
// select! loop pattern (mirrors the registry host loop)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_pattern() {
    let mut c = RoundClock::new(config_10hz());
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(4);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        tx.send("stop").await.ok();
    });

    let mut fired = 0u64;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "stop");
                break;
            }
            info = c.wait_for_tick() => {
                fired += 1;
                c.record_tick_end();
                assert_eq!(info.tick, fired);
            }
        }
    }

    assert!(fired >= 3, "expected at least 3 ticks, got {fired}");
}

//! Dead-man's switch scenarios: the host must keep talking while the
//! lasers are on, or the controller locks the outputs by itself.

use crate::mock_hw::{Bench, HwCall};

use laserctl::app::events::AppEvent;
use laserctl::fsm::StateId;
use laserctl::protocol::Mode;
use laserctl::safety::InterlockState;

fn bench(allowed_silence_ms: u64) -> Bench {
    let mut config = Bench::config();
    config.allowed_silence_ms = allowed_silence_ms;
    Bench::with_config(config)
}

#[test]
fn silence_forces_off() {
    let mut bench = bench(100);
    bench.send(b"1");

    bench.advance_to(99);
    assert_eq!(bench.ctrl.state(), StateId::On);

    bench.advance_to(100);
    assert_eq!(bench.ctrl.state(), StateId::Off);
    assert_eq!(bench.ctrl.interlock_state(), InterlockState::Locked);
    assert_eq!(bench.hw.power_enabled(), Some(false));
    assert!(bench.sink.contains(&AppEvent::WatchdogExpired { silent_ms: 100 }));
    assert!(bench.sink.contains(&AppEvent::ModeChanged {
        from: StateId::On,
        to: StateId::Off,
    }));
}

#[test]
fn ping_keeps_lasers_on() {
    let mut bench = bench(100);
    bench.send(b"1");

    bench.now = 80;
    bench.send(b"3");
    assert!(bench.sink.contains(&AppEvent::WatchdogPing));

    bench.advance_to(150);
    assert_eq!(bench.ctrl.state(), StateId::On);
    bench.advance_to(180);
    assert_eq!(bench.ctrl.state(), StateId::Off);
}

#[test]
fn ping_is_ignored_without_continuous_measurement() {
    let mut config = Bench::config();
    config.allowed_silence_ms = 100;
    config.continuous_measurement = false;
    let mut bench = Bench::with_config(config);
    bench.send(b"1");

    bench.now = 80;
    bench.send(b"3");
    assert!(!bench.sink.contains(&AppEvent::WatchdogPing));

    bench.advance_to(100);
    assert_eq!(bench.ctrl.state(), StateId::Off);
}

#[test]
fn host_can_turn_back_on_after_expiry() {
    let mut bench = bench(100);
    bench.send(b"1");
    bench.advance_to(100);
    assert_eq!(bench.ctrl.decoder_mode(), Some(Mode::Off));

    bench.now = 150;
    bench.send(b"1");
    assert_eq!(bench.ctrl.state(), StateId::On);
    assert_eq!(bench.hw.count(&HwCall::PowerEnable(true)), 2);
}

#[test]
fn zero_allowed_silence_expires_on_the_same_tick() {
    let mut bench = bench(0);
    bench.send(b"1");

    assert_eq!(bench.ctrl.state(), StateId::Off);
    assert!(bench.hw.calls.contains(&HwCall::PowerEnable(true)));
    assert_eq!(bench.hw.power_enabled(), Some(false));
    assert!(bench.sink.contains(&AppEvent::WatchdogExpired { silent_ms: 0 }));
}

#[test]
fn configuring_with_lasers_on_is_still_guarded() {
    let mut bench = bench(100);
    bench.send(b"1");
    bench.now = 10;
    bench.send(b"2");
    assert_eq!(bench.ctrl.state(), StateId::Configuring);

    bench.advance_to(100);
    assert_eq!(bench.ctrl.state(), StateId::Off);
    assert!(!bench.ctrl.lasers_on());
}

#[test]
fn raised_silence_window_applies_immediately() {
    let mut bench = bench(100);
    bench.send(b"2ExpDel:5000\n");
    bench.send(b"1");

    bench.advance_to(4_999);
    assert_eq!(bench.ctrl.state(), StateId::On);
    bench.advance_to(5_000);
    assert_eq!(bench.ctrl.state(), StateId::Off);
}

#[test]
fn idle_controller_never_expires() {
    let mut bench = bench(100);
    bench.advance_to(1_000_000);
    assert!(!bench
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::WatchdogExpired { .. })));
}

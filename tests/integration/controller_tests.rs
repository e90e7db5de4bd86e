//! Integration tests for the serial → decoder → FSM → outputs pipeline.
//!
//! These run on the host (x86_64) and drive a full [`LaserController`]
//! through scripted serial bytes, asserting on the hardware calls it makes.

use crate::mock_hw::{Bench, HwCall, MockHardware};

use laserctl::app::events::AppEvent;
use laserctl::config::{Drive445, LaserChannel, OneShotConfig};
use laserctl::drivers::pwm::OutputState;
use laserctl::error::{CommandError, Error, HalError};
use laserctl::fsm::StateId;
use laserctl::protocol::{DropReason, Key, LedColour, Mode, Setting};
use laserctl::safety::InterlockState;

// ── Bring-up ──────────────────────────────────────────────────

#[test]
fn start_attaches_then_locks() {
    let bench = Bench::new();

    assert_eq!(bench.ctrl.state(), StateId::Off);
    assert_eq!(bench.ctrl.interlock_state(), InterlockState::Locked);
    assert!(!bench.ctrl.lasers_on());
    assert_eq!(bench.hw.kill_switch_asserted(), Some(true));
    assert_eq!(bench.hw.power_enabled(), Some(false));

    let attach = bench
        .hw
        .position(&HwCall::Attach(LaserChannel::Nitrogen, 10, 14))
        .expect("nitrogen attached");
    let kill = bench.hw.position(&HwCall::KillSwitch(true)).unwrap();
    assert!(attach < kill, "lock must follow the attach");

    for ch in LaserChannel::ALL {
        assert_eq!(bench.ctrl.output(ch), OutputState::Detached);
        assert!(bench.hw.calls.contains(&HwCall::DrivePin(ch, false)));
    }
    assert_eq!(bench.sink.events.last(), Some(&AppEvent::Started(StateId::Off)));
}

#[test]
fn start_with_rgb_led_turns_it_off() {
    let mut config = Bench::config();
    config.use_rgb_led = true;
    let bench = Bench::with_config(config);
    assert!(bench.hw.calls.contains(&HwCall::SetRgb(0, 0, 0)));
}

// ── Mode bytes ────────────────────────────────────────────────

#[test]
fn on_releases_kill_switch_before_power() {
    let mut bench = Bench::new();
    bench.hw.clear();
    bench.send(b"1");

    assert_eq!(bench.ctrl.state(), StateId::On);
    assert_eq!(bench.ctrl.interlock_state(), InterlockState::Energized);
    assert!(bench.sink.contains(&AppEvent::ModeChanged {
        from: StateId::Off,
        to: StateId::On,
    }));

    let release = bench.hw.position(&HwCall::KillSwitch(false)).unwrap();
    let power = bench.hw.position(&HwCall::PowerEnable(true)).unwrap();
    let stage_445 = bench
        .hw
        .position(&HwCall::Attach(LaserChannel::Laser445, 2_000, 13))
        .unwrap();
    let nitrogen = bench.hw.position(&HwCall::Duty(LaserChannel::Nitrogen, 9)).unwrap();
    assert!(release < power);
    assert!(nitrogen < power);
    assert!(power < stage_445);

    for ch in LaserChannel::ALL {
        assert_eq!(bench.ctrl.output(ch), OutputState::Pwm);
    }
}

#[test]
fn off_locks_everything() {
    let mut bench = Bench::new();
    bench.send(b"1");
    bench.hw.clear();
    bench.send(b"0");

    assert_eq!(bench.ctrl.state(), StateId::Off);
    assert_eq!(bench.ctrl.interlock_state(), InterlockState::Locked);
    assert_eq!(bench.hw.kill_switch_asserted(), Some(true));
    assert_eq!(bench.hw.power_enabled(), Some(false));
    for ch in LaserChannel::ALL {
        assert!(bench.hw.calls.contains(&HwCall::Detach(ch)));
        assert_eq!(bench.ctrl.output(ch), OutputState::Detached);
    }
}

#[test]
fn repeated_on_byte_is_ignored() {
    let mut bench = Bench::new();
    bench.send(b"1");
    bench.hw.clear();
    bench.send(b"1");
    assert!(bench.hw.calls.is_empty());
}

#[test]
fn stray_bytes_change_nothing() {
    let mut bench = Bench::new();
    bench.hw.clear();
    bench.send(b"x\r 9");
    assert_eq!(bench.ctrl.state(), StateId::Off);
    assert!(bench.hw.calls.is_empty());
    assert_eq!(bench.ctrl.decoder_mode(), None);
}

// ── Settings ──────────────────────────────────────────────────

#[test]
fn duty_set_while_off_is_stored_and_applied_on_energise() {
    let mut bench = Bench::new();
    bench.send(b"2Dut405:1200\n");

    assert_eq!(bench.ctrl.state(), StateId::Configuring);
    assert_eq!(bench.ctrl.channel(LaserChannel::Laser405).duty, 1200);
    assert_eq!(bench.hw.last_duty(LaserChannel::Laser405), None);
    assert!(bench.sink.contains(&AppEvent::SettingApplied(Setting::Duty {
        channel: LaserChannel::Laser405,
        value: 1200,
    })));

    bench.send(b"1");
    assert_eq!(bench.hw.last_duty(LaserChannel::Laser405), Some(1200));
}

#[test]
fn settings_write_through_while_energised() {
    let mut bench = Bench::new();
    bench.send(b"1");
    bench.send(b"2PWM405:300\n");

    // Configuring keeps the lasers running.
    assert_eq!(bench.ctrl.state(), StateId::Configuring);
    assert!(bench.ctrl.lasers_on());
    assert_eq!(bench.hw.last_duty(LaserChannel::Laser405), Some(300));

    bench.send(b"2Frq445:3000\n");
    assert!(bench
        .hw
        .calls
        .contains(&HwCall::Frequency(LaserChannel::Laser445, 3_000, 13)));
}

#[test]
fn resolution_change_updates_max_duty() {
    let mut bench = Bench::new();
    bench.send(b"2Res405:10\n");
    let cfg = bench.ctrl.channel(LaserChannel::Laser405);
    assert_eq!(cfg.resolution_bits(), 10);
    assert_eq!(cfg.max_duty(), 1023);
}

#[test]
fn invalid_resolution_is_rejected() {
    let mut bench = Bench::new();
    bench.send(b"2Res405:17\n");

    assert_eq!(bench.ctrl.channel(LaserChannel::Laser405).resolution_bits(), 13);
    assert!(bench.sink.contains(&AppEvent::SettingRejected {
        key: Key::Res405,
        error: Error::Command(CommandError::InvalidResolution(17)),
    }));
}

#[test]
fn nitrogen_frequency_recomputes_duty() {
    let mut bench = Bench::new();
    assert_eq!(bench.ctrl.channel(LaserChannel::Nitrogen).duty, 9);

    bench.send(b"2FrqLTB:20\n");
    let cfg = bench.ctrl.channel(LaserChannel::Nitrogen);
    assert_eq!(cfg.frequency_hz, 20);
    assert_eq!(cfg.duty, 18);
}

#[test]
fn zero_nitrogen_frequency_is_rejected() {
    let mut bench = Bench::new();
    bench.send(b"2FrqLTB:0\n");
    assert_eq!(bench.ctrl.channel(LaserChannel::Nitrogen).frequency_hz, 10);
    assert!(bench.sink.contains(&AppEvent::SettingRejected {
        key: Key::FrqLtb,
        error: Error::Command(CommandError::ZeroFrequency),
    }));
}

#[test]
fn led_code_drives_fitted_led() {
    let mut config = Bench::config();
    config.use_rgb_led = true;
    let mut bench = Bench::with_config(config);

    bench.send(b"2SetLED:159\n");
    assert!(bench.hw.calls.contains(&HwCall::SetRgb(0, 40, 80)));
    assert_eq!(bench.ctrl.led_colour(), LedColour { r: 0, g: 40, b: 80 });

    bench.send(b"2SetLED:105\n");
    assert!(bench.sink.contains(&AppEvent::SettingRejected {
        key: Key::SetLed,
        error: Error::Command(CommandError::InvalidLedCode(105)),
    }));
}

#[test]
fn led_code_without_led_is_stored_only() {
    let mut bench = Bench::new();
    bench.send(b"2SetLED:999\n");
    assert_eq!(bench.ctrl.led_colour(), LedColour { r: 80, g: 80, b: 80 });
    assert!(!bench.hw.calls.iter().any(|c| matches!(c, HwCall::SetRgb(..))));
}

#[test]
fn expdel_and_conmea_update_the_watchdog_settings() {
    let mut bench = Bench::new();
    bench.send(b"2ExpDel:250\n");
    assert_eq!(bench.ctrl.allowed_silence_ms(), 250);

    bench.send(b"2ConMea:0\n");
    assert!(!bench.ctrl.continuous_measurement());
    bench.send(b"3");
    assert!(!bench.sink.contains(&AppEvent::WatchdogPing));
}

// ── Line framing ──────────────────────────────────────────────

#[test]
fn unknown_key_is_dropped() {
    let mut bench = Bench::new();
    bench.send(b"2Foo123:5\n");
    assert!(bench
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::LineDropped(DropReason::UnknownKey(k)) if k.as_bytes() == b"Foo123")));
}

#[test]
fn short_line_is_dropped() {
    let mut bench = Bench::new();
    bench.send(b"2Dut405:\n");
    assert!(bench
        .sink
        .contains(&AppEvent::LineDropped(DropReason::TooShort { len: 7 })));
    assert_eq!(bench.ctrl.channel(LaserChannel::Laser405).duty, 0);
}

#[test]
fn overlong_signed_line_keeps_outputs_locked() {
    let mut bench = Bench::new();
    bench.hw.clear();
    bench.send(b"2ExpDel=-4294967291\n");
    for _ in 0..8 {
        bench.tick();
    }

    assert!(bench.sink.contains(&AppEvent::SettingRejected {
        key: Key::ExpDel,
        error: Error::Command(CommandError::ValueOutOfRange(-4_294_967_291)),
    }));
    assert_eq!(bench.ctrl.state(), StateId::Configuring);
    assert_eq!(bench.ctrl.interlock_state(), InterlockState::Locked);
    assert!(!bench.ctrl.lasers_on());
    assert!(!bench.hw.calls.contains(&HwCall::KillSwitch(false)));
}

#[test]
fn tail_of_overflowed_line_is_not_a_mode_byte() {
    let mut bench = Bench::new();
    bench.send(b"2Dut405=1234567890121\n");

    assert_eq!(bench.ctrl.interlock_state(), InterlockState::Locked);
    assert!(!bench.ctrl.lasers_on());
    assert_eq!(bench.ctrl.state(), StateId::Configuring);

    bench.send(b"1");
    assert_eq!(bench.ctrl.state(), StateId::On);
}

#[test]
fn unterminated_line_completes_on_timeout() {
    let mut bench = Bench::new();
    bench.send(b"2Dut405:77");
    assert_eq!(bench.ctrl.channel(LaserChannel::Laser405).duty, 0);

    bench.advance_to(999);
    assert_eq!(bench.ctrl.channel(LaserChannel::Laser405).duty, 0);
    bench.advance_to(1_000);
    assert_eq!(bench.ctrl.channel(LaserChannel::Laser405).duty, 77);
}

#[test]
fn zero_inside_a_line_is_data_not_off() {
    let mut bench = Bench::new();
    bench.send(b"1");
    bench.send(b"2Dut405:100\n");
    assert!(bench.ctrl.lasers_on());
    assert_eq!(bench.ctrl.channel(LaserChannel::Laser405).duty, 100);
}

// ── 445 nm stage ──────────────────────────────────────────────

#[test]
fn full_output_sentinel_forces_pin_high() {
    let mut bench = Bench::new();
    bench.send(b"2Dut445:1234\n");
    bench.hw.clear();
    bench.send(b"1");

    let power = bench.hw.position(&HwCall::PowerEnable(true)).unwrap();
    let high = bench
        .hw
        .position(&HwCall::DrivePin(LaserChannel::Laser445, true))
        .unwrap();
    assert!(power < high);
    assert_eq!(bench.ctrl.output(LaserChannel::Laser445), OutputState::ForcedHigh);
}

#[test]
fn disabled_pwm_runs_445_at_full_output() {
    let mut config = Bench::config();
    config.disable_pwm_445 = true;
    let mut bench = Bench::with_config(config);
    assert!(!bench
        .hw
        .calls
        .iter()
        .any(|c| matches!(c, HwCall::Attach(LaserChannel::Laser445, ..))));

    bench.send(b"1");
    assert!(bench.hw.calls.contains(&HwCall::DrivePin(LaserChannel::Laser445, true)));
}

#[test]
fn pulse_keys_need_one_shot_drive() {
    let mut bench = Bench::new();
    bench.send(b"2Num445:5\n");
    assert!(bench.sink.contains(&AppEvent::SettingRejected {
        key: Key::Num445,
        error: Error::Command(CommandError::NotApplicable),
    }));
}

fn one_shot_bench(count: u16) -> Bench {
    let mut config = Bench::config();
    config.drive_445 = Drive445::OneShot;
    config.one_shot_445 = OneShotConfig {
        width_cycles: 200,
        count,
        delay_ms: 10,
    };
    Bench::with_config(config)
}

#[test]
fn one_shot_train_fires_configured_count() {
    let mut bench = one_shot_bench(3);
    bench.send(b"1");
    assert!(bench.hw.calls.contains(&HwCall::Load(56)));
    assert_eq!(bench.hw.triggers(), 1);

    for t in 1..=50 {
        bench.advance_to(t);
    }
    assert_eq!(bench.hw.triggers(), 3);
    assert!(!bench.ctrl.pulse().is_running());
    assert!(bench.ctrl.lasers_on());
}

#[test]
fn one_shot_mode_rejects_445_pwm_keys() {
    let mut bench = one_shot_bench(1);
    bench.send(b"2Dut445:100\n");
    assert!(bench.sink.contains(&AppEvent::SettingRejected {
        key: Key::Dut445,
        error: Error::Command(CommandError::NotApplicable),
    }));

    bench.send(b"2Num445:7\n");
    bench.send(b"2Del445:25\n");
    assert_eq!(bench.ctrl.one_shot().count, 7);
    assert_eq!(bench.ctrl.one_shot().delay_ms, 25);
}

#[test]
fn one_shot_sentinel_count_forces_high() {
    let mut bench = one_shot_bench(1234);
    bench.send(b"1");
    assert_eq!(bench.hw.triggers(), 0);
    assert_eq!(bench.ctrl.output(LaserChannel::Laser445), OutputState::ForcedHigh);
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn power_enable_failure_locks_and_forces_off() {
    let hw = MockHardware {
        fail_power_on: true,
        ..MockHardware::default()
    };
    let mut bench = Bench::with_hardware(Bench::config(), hw);
    bench.send(b"1");

    assert!(bench.sink.contains(&AppEvent::OutputFault(Error::Hal(
        HalError::GpioWriteFailed(10)
    ))));
    assert_eq!(bench.ctrl.state(), StateId::Off);
    assert_eq!(bench.ctrl.interlock_state(), InterlockState::Locked);
    assert_eq!(bench.ctrl.decoder_mode(), Some(Mode::Off));
    assert_eq!(bench.hw.kill_switch_asserted(), Some(true));

    // The host can retry straight away.
    bench.send(b"1");
    assert_eq!(bench.hw.count(&HwCall::PowerEnable(true)), 2);
}

#[test]
fn trigger_failure_locks_and_forces_off() {
    let mut config = Bench::config();
    config.drive_445 = Drive445::OneShot;
    let hw = MockHardware {
        fail_trigger: true,
        ..MockHardware::default()
    };
    let mut bench = Bench::with_hardware(config, hw);
    bench.send(b"1");

    assert!(bench.sink.contains(&AppEvent::OutputFault(Error::Hal(
        HalError::OneShotFailed(-1)
    ))));
    assert_eq!(bench.ctrl.state(), StateId::Off);
    assert_eq!(bench.ctrl.interlock_state(), InterlockState::Locked);
}

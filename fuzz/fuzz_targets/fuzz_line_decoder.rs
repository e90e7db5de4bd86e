//! Fuzz target: `SerialCommandDecoder::poll` and `LaserController::tick`
//!
//! Feeds arbitrary bytes through the decoder on its own and through a full
//! controller wired to the host drivers, and asserts that nothing panics,
//! that power is only ever enabled after a `'1'`, and that a `'0'` at the
//! end always leaves the outputs locked.
//!
//! cargo fuzz run fuzz_line_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use laserctl::adapters::hardware::HardwareAdapter;
use laserctl::adapters::uart::UartSerial;
use laserctl::app::events::AppEvent;
use laserctl::app::ports::EventSink;
use laserctl::app::service::LaserController;
use laserctl::config::LaserConfig;
use laserctl::drivers::interlock_lines::InterlockLines;
use laserctl::drivers::ledc::LedcPwm;
use laserctl::drivers::one_shot::EspOneShot;
use laserctl::drivers::status_led::StatusLed;
use laserctl::protocol::{Decoded, SerialCommandDecoder};
use laserctl::safety::InterlockState;

struct Pin;

impl embedded_hal::digital::ErrorType for Pin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: &AppEvent) {}
}

fuzz_target!(|data: &[u8]| {
    // Decoder alone: every framed line fits the buffer.
    let mut serial = UartSerial::new();
    serial.inject(data);
    let mut decoder = SerialCommandDecoder::new(true, 5);
    let mut now = 0u64;
    while serial.pending() > 0 || decoder.line_pending() {
        if let Some(Decoded::Command(cmd)) = decoder.poll(&mut serial, now) {
            assert!(cmd.value.unsigned_abs() <= 9_999_999_999);
        }
        now += 1;
    }

    // Full controller on the host drivers.
    let config = LaserConfig {
        allowed_silence_ms: 50,
        ..LaserConfig::default()
    };
    let mut hw = HardwareAdapter::new(
        LedcPwm::new(),
        InterlockLines::new(Pin, Pin),
        EspOneShot::new(),
        StatusLed::new(config.use_rgb_led),
    );
    let mut sink = Discard;
    let mut ctrl = LaserController::new(config);
    let _ = ctrl.start(0, &mut hw, &mut sink);

    let mut serial = UartSerial::new();
    serial.inject(data);
    let saw_on = data.contains(&b'1');
    let mut now = 0u64;
    while serial.pending() > 0 {
        ctrl.tick(now, &mut serial, &mut hw, &mut sink);
        if !saw_on {
            assert_eq!(ctrl.interlock_state(), InterlockState::Locked);
        }
        now += 1;
    }

    // Close any pending line, then turn off.
    serial.inject(b"\n0");
    for _ in 0..4 {
        ctrl.tick(now, &mut serial, &mut hw, &mut sink);
        now += 1;
    }
    assert!(!ctrl.lasers_on());
    assert_eq!(ctrl.interlock_state(), InterlockState::Locked);
});

//! Mock hardware adapter for integration tests.
//!
//! Records every port call so tests can assert on the full output
//! history without touching real GPIO/LEDC registers.

use laserctl::app::events::AppEvent;
use laserctl::app::ports::{
    EventSink, InterlockPort, OneShotCounter, PwmPort, SerialPort, StatusLedPort,
};
use laserctl::config::LaserChannel;
use laserctl::error::HalError;
use std::collections::VecDeque;

// ── Hardware call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    Attach(LaserChannel, u32, u8),
    Detach(LaserChannel),
    Duty(LaserChannel, u16),
    Frequency(LaserChannel, u32, u8),
    DrivePin(LaserChannel, bool),
    KillSwitch(bool),
    PowerEnable(bool),
    Load(u8),
    Trigger,
    SetRgb(u8, u8, u8),
}

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub calls: Vec<HwCall>,
    /// Refuse `set_power_enable(true)`.
    pub fail_power_on: bool,
    /// Refuse every `trigger`.
    pub fail_trigger: bool,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, call: &HwCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn triggers(&self) -> usize {
        self.count(&HwCall::Trigger)
    }

    /// Last duty written to a channel, if any.
    pub fn last_duty(&self, channel: LaserChannel) -> Option<u16> {
        self.calls.iter().rev().find_map(|c| match c {
            HwCall::Duty(ch, d) if *ch == channel => Some(*d),
            _ => None,
        })
    }

    pub fn kill_switch_asserted(&self) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            HwCall::KillSwitch(a) => Some(*a),
            _ => None,
        })
    }

    pub fn power_enabled(&self) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match c {
            HwCall::PowerEnable(e) => Some(*e),
            _ => None,
        })
    }

    pub fn position(&self, call: &HwCall) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }
}

impl PwmPort for MockHardware {
    fn attach(&mut self, ch: LaserChannel, hz: u32, bits: u8) -> Result<(), HalError> {
        self.calls.push(HwCall::Attach(ch, hz, bits));
        Ok(())
    }

    fn detach(&mut self, ch: LaserChannel) -> Result<(), HalError> {
        self.calls.push(HwCall::Detach(ch));
        Ok(())
    }

    fn write_duty(&mut self, ch: LaserChannel, duty: u16) -> Result<(), HalError> {
        self.calls.push(HwCall::Duty(ch, duty));
        Ok(())
    }

    fn change_frequency(&mut self, ch: LaserChannel, hz: u32, bits: u8) -> Result<(), HalError> {
        self.calls.push(HwCall::Frequency(ch, hz, bits));
        Ok(())
    }

    fn drive_pin(&mut self, ch: LaserChannel, high: bool) -> Result<(), HalError> {
        self.calls.push(HwCall::DrivePin(ch, high));
        Ok(())
    }
}

impl InterlockPort for MockHardware {
    fn set_kill_switch(&mut self, asserted: bool) -> Result<(), HalError> {
        self.calls.push(HwCall::KillSwitch(asserted));
        Ok(())
    }

    fn set_power_enable(&mut self, enabled: bool) -> Result<(), HalError> {
        self.calls.push(HwCall::PowerEnable(enabled));
        if enabled && self.fail_power_on {
            return Err(HalError::GpioWriteFailed(10));
        }
        Ok(())
    }
}

impl OneShotCounter for MockHardware {
    fn load(&mut self, start: u8) -> Result<(), HalError> {
        self.calls.push(HwCall::Load(start));
        Ok(())
    }

    fn trigger(&mut self) -> Result<(), HalError> {
        if self.fail_trigger {
            return Err(HalError::OneShotFailed(-1));
        }
        self.calls.push(HwCall::Trigger);
        Ok(())
    }

    fn finished(&mut self) -> bool {
        true
    }
}

impl StatusLedPort for MockHardware {
    fn set_rgb(&mut self, r: u8, g: u8, b: u8) {
        self.calls.push(HwCall::SetRgb(r, g, b));
    }
}

// ── Scripted serial link ──────────────────────────────────────

#[derive(Default)]
pub struct ScriptedSerial {
    rx: VecDeque<u8>,
}

#[allow(dead_code)]
impl ScriptedSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn is_drained(&self) -> bool {
        self.rx.is_empty()
    }
}

impl SerialPort for ScriptedSerial {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Bench: controller wired to the mocks ──────────────────────

use laserctl::app::service::LaserController;
use laserctl::config::LaserConfig;

pub struct Bench {
    pub ctrl: LaserController,
    pub hw: MockHardware,
    pub serial: ScriptedSerial,
    pub sink: RecordingSink,
    pub now: u64,
}

#[allow(dead_code)]
impl Bench {
    /// Default config with a 1 s silence window, started at t = 0.
    pub fn new() -> Self {
        Self::with_config(Self::config())
    }

    pub fn config() -> LaserConfig {
        LaserConfig {
            allowed_silence_ms: 1_000,
            ..LaserConfig::default()
        }
    }

    pub fn with_config(config: LaserConfig) -> Self {
        Self::with_hardware(config, MockHardware::new())
    }

    pub fn with_hardware(config: LaserConfig, mut hw: MockHardware) -> Self {
        let mut ctrl = LaserController::new(config);
        let mut sink = RecordingSink::new();
        ctrl.start(0, &mut hw, &mut sink)
            .expect("mock attach never fails");
        Self {
            ctrl,
            hw,
            serial: ScriptedSerial::new(),
            sink,
            now: 0,
        }
    }

    pub fn tick(&mut self) {
        self.ctrl
            .tick(self.now, &mut self.serial, &mut self.hw, &mut self.sink);
    }

    /// Queue bytes and tick at the current time until all are consumed.
    pub fn send(&mut self, bytes: &[u8]) {
        self.serial.send(bytes);
        while !self.serial.is_drained() {
            self.tick();
        }
    }

    pub fn advance_to(&mut self, now_ms: u64) {
        self.now = now_ms;
        self.tick();
    }
}

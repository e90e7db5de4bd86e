//! Hardware adapter: bridges the laser board peripherals to the domain
//! port traits.
//!
//! Owns the LEDC back end, the interlock lines, the one-shot pulse counter
//! and the status LED, exposing them together as a
//! [`LaserHardware`](crate::app::ports::LaserHardware).  On non-espidf
//! targets, the underlying drivers use cfg-gated simulation stubs.

use embedded_hal::digital::OutputPin;

use crate::app::ports::{InterlockPort, OneShotCounter, PwmPort, StatusLedPort};
use crate::config::LaserChannel;
use crate::drivers::interlock_lines::InterlockLines;
use crate::drivers::ledc::LedcPwm;
use crate::drivers::one_shot::EspOneShot;
use crate::drivers::status_led::StatusLed;
use crate::error::HalError;

/// Concrete adapter that combines all laser hardware behind port traits.
pub struct HardwareAdapter<K, P> {
    pwm: LedcPwm,
    interlock: InterlockLines<K, P>,
    one_shot: EspOneShot,
    led: StatusLed,
}

impl<K: OutputPin, P: OutputPin> HardwareAdapter<K, P> {
    pub fn new(
        pwm: LedcPwm,
        interlock: InterlockLines<K, P>,
        one_shot: EspOneShot,
        led: StatusLed,
    ) -> Self {
        Self {
            pwm,
            interlock,
            one_shot,
            led,
        }
    }

    pub fn pwm(&self) -> &LedcPwm {
        &self.pwm
    }

    pub fn one_shot(&self) -> &EspOneShot {
        &self.one_shot
    }

    pub fn led(&self) -> &StatusLed {
        &self.led
    }
}

// ── PwmPort implementation ────────────────────────────────────

impl<K: OutputPin, P: OutputPin> PwmPort for HardwareAdapter<K, P> {
    fn attach(
        &mut self,
        channel: LaserChannel,
        frequency_hz: u32,
        resolution_bits: u8,
    ) -> Result<(), HalError> {
        self.pwm.attach(channel, frequency_hz, resolution_bits)
    }

    fn detach(&mut self, channel: LaserChannel) -> Result<(), HalError> {
        self.pwm.detach(channel)
    }

    fn write_duty(&mut self, channel: LaserChannel, duty: u16) -> Result<(), HalError> {
        self.pwm.write_duty(channel, duty)
    }

    fn change_frequency(
        &mut self,
        channel: LaserChannel,
        frequency_hz: u32,
        resolution_bits: u8,
    ) -> Result<(), HalError> {
        self.pwm.change_frequency(channel, frequency_hz, resolution_bits)
    }

    fn drive_pin(&mut self, channel: LaserChannel, high: bool) -> Result<(), HalError> {
        self.pwm.drive_pin(channel, high)
    }
}

// ── InterlockPort implementation ──────────────────────────────

impl<K: OutputPin, P: OutputPin> InterlockPort for HardwareAdapter<K, P> {
    fn set_kill_switch(&mut self, asserted: bool) -> Result<(), HalError> {
        self.interlock.set_kill_switch(asserted)
    }

    fn set_power_enable(&mut self, enabled: bool) -> Result<(), HalError> {
        self.interlock.set_power_enable(enabled)
    }
}

// ── OneShotCounter implementation ─────────────────────────────

impl<K: OutputPin, P: OutputPin> OneShotCounter for HardwareAdapter<K, P> {
    fn load(&mut self, start: u8) -> Result<(), HalError> {
        self.one_shot.load(start)
    }

    fn trigger(&mut self) -> Result<(), HalError> {
        self.one_shot.trigger()
    }

    fn finished(&mut self) -> bool {
        self.one_shot.finished()
    }
}

// ── StatusLedPort implementation ──────────────────────────────

impl<K: OutputPin, P: OutputPin> StatusLedPort for HardwareAdapter<K, P> {
    fn set_rgb(&mut self, r: u8, g: u8, b: u8) {
        self.led.set_rgb(r, g, b);
    }
}

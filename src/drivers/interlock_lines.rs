//! Interlock output lines.
//!
//! Both lines are active low:
//!
//! | Line          | GPIO | LOW                  | HIGH                 |
//! |---------------|------|----------------------|----------------------|
//! | 445 kill      | 9    | stage forced off     | stage may run        |
//! | supercon      | 10   | power enabled        | power disabled (pull-up) |
//!
//! Generic over `embedded-hal` output pins, so `PinDriver`s on the target
//! and plain fakes on the host both fit.

use embedded_hal::digital::OutputPin;
use log::trace;

use crate::app::ports::InterlockPort;
use crate::error::HalError;
use crate::pins;

pub struct InterlockLines<K, P> {
    kill_switch: K,
    power_enable: P,
}

impl<K: OutputPin, P: OutputPin> InterlockLines<K, P> {
    pub fn new(kill_switch: K, power_enable: P) -> Self {
        Self {
            kill_switch,
            power_enable,
        }
    }

    pub fn into_inner(self) -> (K, P) {
        (self.kill_switch, self.power_enable)
    }
}

impl<K: OutputPin, P: OutputPin> InterlockPort for InterlockLines<K, P> {
    fn set_kill_switch(&mut self, asserted: bool) -> Result<(), HalError> {
        trace!("kill switch {}", if asserted { "asserted" } else { "released" });
        if asserted {
            self.kill_switch.set_low()
        } else {
            self.kill_switch.set_high()
        }
        .map_err(|_| HalError::GpioWriteFailed(pins::KILL_SWITCH_445_GPIO))
    }

    fn set_power_enable(&mut self, enabled: bool) -> Result<(), HalError> {
        trace!("supercon power {}", if enabled { "enabled" } else { "disabled" });
        if enabled {
            self.power_enable.set_low()
        } else {
            self.power_enable.set_high()
        }
        .map_err(|_| HalError::GpioWriteFailed(pins::SUPERCON_GPIO))
    }
}

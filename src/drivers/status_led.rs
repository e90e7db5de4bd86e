//! RGB status LED driver.
//!
//! Three LEDC PWM channels on timer 3.  Only fitted on boards that do not
//! route the relay lines; on relay boards every write is dropped so the
//! relay pins are never toggled.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LEDC channels via hw_init.
//! On host/test: tracks state in-memory only.

use crate::app::ports::StatusLedPort;
use crate::drivers::hw_init;
use crate::pins;

pub struct StatusLed {
    fitted: bool,
    current: (u8, u8, u8),
}

impl StatusLed {
    pub fn new(fitted: bool) -> Self {
        Self {
            fitted,
            current: (0, 0, 0),
        }
    }

    pub fn set_colour(&mut self, r: u8, g: u8, b: u8) {
        if !self.fitted {
            return;
        }
        hw_init::ledc_set(pins::LEDC_CH_LED_R, r);
        hw_init::ledc_set(pins::LEDC_CH_LED_G, g);
        hw_init::ledc_set(pins::LEDC_CH_LED_B, b);
        self.current = (r, g, b);
    }

    pub fn off(&mut self) {
        self.set_colour(0, 0, 0);
    }

    pub fn current_colour(&self) -> (u8, u8, u8) {
        self.current
    }
}

impl StatusLedPort for StatusLed {
    fn set_rgb(&mut self, r: u8, g: u8, b: u8) {
        self.set_colour(r, g, b);
    }
}

//! Port traits: the boundary between the controller core and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ LaserController (domain)
//! ```
//!
//! The [`LaserController`](super::service::LaserController) takes these as
//! generics at each call site, so the same decoder and state machine run
//! against the ESP32 peripherals, the host mocks, or another chip's timer
//! back end.

use crate::config::LaserChannel;
use crate::error::HalError;

// ───────────────────────────────────────────────────────────────
// Serial port (driving adapter: host → domain)
// ───────────────────────────────────────────────────────────────

/// Non-blocking byte source for the host link.
pub trait SerialPort {
    /// Next buffered byte, or `None` immediately if nothing is pending.
    fn read_byte(&mut self) -> Option<u8>;
}

// ───────────────────────────────────────────────────────────────
// PWM port (driven adapter: domain → timer peripheral)
// ───────────────────────────────────────────────────────────────

/// PWM timer/channel back end.
///
/// A detached channel's pin is a plain GPIO; [`drive_pin`](Self::drive_pin)
/// is only meaningful while detached.
pub trait PwmPort {
    /// Bind the channel's timer to its pin at the given frequency/resolution.
    fn attach(&mut self, channel: LaserChannel, frequency_hz: u32, resolution_bits: u8)
    -> Result<(), HalError>;

    /// Release the pin from the timer.
    fn detach(&mut self, channel: LaserChannel) -> Result<(), HalError>;

    /// Write the raw duty register.  No range check against the resolution.
    fn write_duty(&mut self, channel: LaserChannel, duty: u16) -> Result<(), HalError>;

    /// Reconfigure an attached channel's timer in place.
    fn change_frequency(
        &mut self,
        channel: LaserChannel,
        frequency_hz: u32,
        resolution_bits: u8,
    ) -> Result<(), HalError>;

    /// Drive the channel's pin as a digital output.
    fn drive_pin(&mut self, channel: LaserChannel, high: bool) -> Result<(), HalError>;
}

// ───────────────────────────────────────────────────────────────
// Interlock port (driven adapter: domain → safety lines)
// ───────────────────────────────────────────────────────────────

/// The two interlock lines, in logical terms.  Polarity is the adapter's
/// problem.
pub trait InterlockPort {
    /// `true` forces the 445 nm stage off.
    fn set_kill_switch(&mut self, asserted: bool) -> Result<(), HalError>;

    /// `true` lets the supercon driver draw power.
    fn set_power_enable(&mut self, enabled: bool) -> Result<(), HalError>;
}

// ───────────────────────────────────────────────────────────────
// One-shot counter (driven adapter: domain → 8-bit counter)
// ───────────────────────────────────────────────────────────────

/// Free-running up-counter that holds its output high from the loaded
/// start value until it overflows at [`MAX`](Self::MAX).
pub trait OneShotCounter {
    /// Overflow value of the counter register.
    const MAX: u8 = u8::MAX;

    fn load(&mut self, start: u8) -> Result<(), HalError>;

    fn trigger(&mut self) -> Result<(), HalError>;

    /// The pulse started by the last `trigger` has ended.
    fn finished(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Status LED (driven adapter: domain → RGB LED)
// ───────────────────────────────────────────────────────────────

pub trait StatusLedPort {
    fn set_rgb(&mut self, r: u8, g: u8, b: u8);
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits [`AppEvent`](super::events::AppEvent)s through this
/// port.  Events never go back to the host.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Combined board capability
// ───────────────────────────────────────────────────────────────

/// Everything a laser board provides.  Passing one `hw` that satisfies
/// every port avoids a double mutable borrow while keeping the boundary
/// explicit.
pub trait LaserHardware: PwmPort + InterlockPort + OneShotCounter + StatusLedPort {}

impl<T: PwmPort + InterlockPort + OneShotCounter + StatusLedPort> LaserHardware for T {}

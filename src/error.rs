//! Unified error types for the laser controller firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! can be logged and passed around without allocation.
//!
//! None of these ever reach the host: the serial protocol has no response
//! channel, so errors end up in the log and in [`AppEvent`]s only.
//!
//! [`AppEvent`]: crate::app::events::AppEvent

use core::fmt;

use crate::config::LaserChannel;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A peripheral call failed.
    Hal(HalError),
    /// An interlock ordering rule was violated.
    Interlock(InterlockError),
    /// A pulse could not be computed or armed.
    Pulse(PulseError),
    /// A decoded setting was rejected.
    Command(CommandError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hal(e) => write!(f, "hal: {e}"),
            Self::Interlock(e) => write!(f, "interlock: {e}"),
            Self::Pulse(e) => write!(f, "pulse: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// LEDC timer/channel configuration failed (ESP-IDF return code).
    PwmAttachFailed(LaserChannel, i32),
    /// Stopping the LEDC channel failed.
    PwmDetachFailed(LaserChannel, i32),
    /// Duty register write failed.
    PwmWriteFailed(LaserChannel, i32),
    /// The timer rejected the frequency/resolution combination.
    FrequencyRejected(LaserChannel, i32),
    /// A digital output could not be driven.
    GpioWriteFailed(i32),
    /// The one-shot timer could not be created or started.
    OneShotFailed(i32),
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmAttachFailed(ch, rc) => write!(f, "{} PWM attach failed (rc={rc})", ch.name()),
            Self::PwmDetachFailed(ch, rc) => write!(f, "{} PWM detach failed (rc={rc})", ch.name()),
            Self::PwmWriteFailed(ch, rc) => write!(f, "{} duty write failed (rc={rc})", ch.name()),
            Self::FrequencyRejected(ch, rc) => {
                write!(f, "{} frequency/resolution rejected (rc={rc})", ch.name())
            }
            Self::GpioWriteFailed(pin) => write!(f, "GPIO {pin} write failed"),
            Self::OneShotFailed(rc) => write!(f, "one-shot timer failed (rc={rc})"),
        }
    }
}

impl From<HalError> for Error {
    fn from(e: HalError) -> Self {
        Self::Hal(e)
    }
}

// ---------------------------------------------------------------------------
// Interlock errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterlockError {
    /// Power-enable requested while the kill switch is still asserted.
    StillLocked,
}

impl fmt::Display for InterlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StillLocked => write!(f, "power enable requested while locked"),
        }
    }
}

impl From<InterlockError> for Error {
    fn from(e: InterlockError) -> Self {
        Self::Interlock(e)
    }
}

// ---------------------------------------------------------------------------
// Pulse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseError {
    /// A zero-width one-shot pulse was requested.
    ZeroWidth,
    /// Repetition frequency of 0 Hz (no period).
    ZeroFrequency,
    /// Frequency above 1 MHz: the period rounds down to 0 µs.
    PeriodTooShort,
    /// The derived duty value rounds down to 0 at this resolution.
    DutyUnderflow,
    /// The derived duty value does not fit the duty register.
    DutyOverflow,
    /// The train was started without arming a width first.
    NotArmed,
}

impl fmt::Display for PulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWidth => write!(f, "pulse width of zero"),
            Self::ZeroFrequency => write!(f, "repetition frequency of zero"),
            Self::PeriodTooShort => write!(f, "period shorter than 1 us"),
            Self::DutyUnderflow => write!(f, "pulse too short for the resolution"),
            Self::DutyOverflow => write!(f, "pulse longer than the period"),
            Self::NotArmed => write!(f, "one-shot not armed"),
        }
    }
}

impl From<PulseError> for Error {
    fn from(e: PulseError) -> Self {
        Self::Pulse(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

/// Why a decoded key/value line was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The value does not fit the target field.
    ValueOutOfRange(i64),
    /// Resolution outside `1..=16` bits.
    InvalidResolution(i64),
    /// A frequency of 0 Hz.
    ZeroFrequency,
    /// `SetLED` needs exactly three non-zero digits.
    InvalidLedCode(i64),
    /// The setting targets a drive mode that is not active.
    NotApplicable,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueOutOfRange(v) => write!(f, "value {v} out of range"),
            Self::InvalidResolution(v) => write!(f, "resolution {v} not in 1..=16"),
            Self::ZeroFrequency => write!(f, "frequency of zero"),
            Self::InvalidLedCode(v) => write!(f, "LED code {v} is not three digits 1-9"),
            Self::NotApplicable => write!(f, "not applicable to the active drive mode"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

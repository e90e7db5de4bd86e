//! Compiled-in configuration.
//!
//! All tunable parameters for the laser stages.  Nothing is persisted:
//! the host re-sends its settings after every reset, so these defaults are
//! what the firmware comes up with on power-on.

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Largest supported LEDC duty resolution.  Keeps `2^bits - 1` inside `u16`.
pub const MAX_RESOLUTION_BITS: u8 = 16;

/// Duty (or pulse-count) value that bypasses PWM on the 445 nm stage and
/// drives its pin HIGH for full continuous output.
pub const FULL_OUTPUT_SENTINEL: u16 = 1234;

/// A PWM-driven laser output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LaserChannel {
    Laser405 = 0,
    Laser445 = 1,
    Nitrogen = 2,
}

impl LaserChannel {
    pub const COUNT: usize = 3;
    pub const ALL: [Self; Self::COUNT] = [Self::Laser405, Self::Laser445, Self::Nitrogen];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Laser405 => "405nm",
            Self::Laser445 => "445nm",
            Self::Nitrogen => "nitrogen",
        }
    }
}

/// `2^bits - 1`, the largest duty value representable at `bits` resolution.
pub const fn max_duty_for(bits: u8) -> u16 {
    ((1u32 << bits) - 1) as u16
}

/// Frequency / resolution / duty of one PWM channel.
///
/// Serialised without `max_duty`; deserialisation goes through the
/// resolution check and recomputes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChannelFields", into = "ChannelFields")]
pub struct ChannelConfig {
    pub frequency_hz: u32,
    resolution_bits: u8,
    pub duty: u16,
    max_duty: u16,
}

impl ChannelConfig {
    /// Panics if `resolution_bits` is outside `1..=16`; only used with
    /// compiled-in constants.
    pub const fn new(frequency_hz: u32, resolution_bits: u8, duty: u16) -> Self {
        assert!(resolution_bits >= 1 && resolution_bits <= MAX_RESOLUTION_BITS);
        Self {
            frequency_hz,
            resolution_bits,
            duty,
            max_duty: max_duty_for(resolution_bits),
        }
    }

    pub fn resolution_bits(&self) -> u8 {
        self.resolution_bits
    }

    /// Derived from the resolution; always `2^resolution_bits - 1`.
    pub fn max_duty(&self) -> u16 {
        self.max_duty
    }

    /// Change the resolution and recompute `max_duty`.  Returns `false`
    /// (and changes nothing) when `bits` is outside `1..=16`.
    ///
    /// The stored duty is deliberately left alone even if it now exceeds
    /// `max_duty`; the hardware truncates it.
    pub fn set_resolution_bits(&mut self, bits: u8) -> bool {
        if bits == 0 || bits > MAX_RESOLUTION_BITS {
            return false;
        }
        self.resolution_bits = bits;
        self.max_duty = max_duty_for(bits);
        true
    }
}

/// Serialised form of [`ChannelConfig`].
#[derive(Serialize, Deserialize)]
pub struct ChannelFields {
    pub frequency_hz: u32,
    pub resolution_bits: u8,
    pub duty: u16,
}

impl TryFrom<ChannelFields> for ChannelConfig {
    type Error = CommandError;

    fn try_from(raw: ChannelFields) -> Result<Self, CommandError> {
        let mut ch = Self::new(raw.frequency_hz, 1, raw.duty);
        if !ch.set_resolution_bits(raw.resolution_bits) {
            return Err(CommandError::InvalidResolution(raw.resolution_bits.into()));
        }
        Ok(ch)
    }
}

impl From<ChannelConfig> for ChannelFields {
    fn from(ch: ChannelConfig) -> Self {
        Self {
            frequency_hz: ch.frequency_hz,
            resolution_bits: ch.resolution_bits,
            duty: ch.duty,
        }
    }
}

/// How the 445 nm stage is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Drive445 {
    /// LEDC PWM channel with host-settable duty/frequency/resolution.
    Pwm,
    /// Hardware one-shot pulses, `OneShotConfig::count` per laser-on.
    OneShot,
}

/// Nitrogen trigger: a short pulse expressed as a duty fraction of a
/// fixed-resolution PWM period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NitrogenConfig {
    /// Trigger pulse width (µs).  The trigger box accepts 2–60 µs.
    pub pulse_width_us: u32,
    /// Repetition rate (Hz).  The laser itself caps at 60 Hz.
    pub frequency_hz: u32,
    /// Fixed; anything below 14 bits makes the derived duty round to 0.
    pub resolution_bits: u8,
}

/// One-shot pulse train for the 445 nm stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneShotConfig {
    /// Pulse width in counter ticks (1–255).
    pub width_cycles: u8,
    /// Pulses per laser-on; 0 repeats until locked, 1234 forces full output.
    pub count: u16,
    /// Gap between pulses (ms).
    pub delay_ms: u32,
}

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaserConfig {
    // --- PWM stages ---
    pub laser_405: ChannelConfig,
    pub laser_445: ChannelConfig,
    pub nitrogen: NitrogenConfig,

    // --- 445 nm drive ---
    pub drive_445: Drive445,
    /// With PWM disabled the 445 stage is driven HIGH (full power) when on.
    pub disable_pwm_445: bool,
    pub one_shot_445: OneShotConfig,

    // --- Board options ---
    /// The RGB LED shares pins with the relays; only one can be fitted.
    pub use_rgb_led: bool,

    // --- Host link ---
    pub serial_baud: u32,
    /// Time allowed for a key/value line to complete after its `'2'` byte.
    pub line_timeout_ms: u64,
    /// Treat `'3'` as a watchdog ping.
    pub continuous_measurement: bool,

    // --- Dead-man's switch ---
    /// Silence (ms) tolerated while lasers are on.  0 trips on the first tick.
    pub allowed_silence_ms: u64,
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            // Above ~4.5 kHz the MOSFET stage stops following; 14 bits
            // misbehaves past ~75 % duty on the 405 driver, hence 13.
            laser_405: ChannelConfig::new(2_000, 13, 0),
            laser_445: ChannelConfig::new(2_000, 13, 0),
            nitrogen: NitrogenConfig {
                pulse_width_us: 55,
                frequency_hz: 10,
                resolution_bits: 14,
            },

            drive_445: if cfg!(feature = "oneshot-445") {
                Drive445::OneShot
            } else {
                Drive445::Pwm
            },
            disable_pwm_445: false,
            one_shot_445: OneShotConfig {
                width_cycles: 200,
                count: 1,
                delay_ms: 10,
            },

            use_rgb_led: false,

            serial_baud: crate::pins::HOST_UART_BAUD,
            line_timeout_ms: 1_000,
            continuous_measurement: true,

            allowed_silence_ms: 0,
        }
    }
}

//! Wire-level vocabulary: mode bytes, keys, values and typed settings.
//!
//! ```text
//! '0'  lasers off        '1'  lasers on
//! '2'  followed by KKKKKK=VVVVVVVVVV\n
//! '3'  watchdog ping (only while continuous measurement is enabled)
//! ```

use crate::config::{LaserChannel, MAX_RESOLUTION_BITS};
use crate::error::CommandError;

/// Number of characters in a key.
pub const KEY_LEN: usize = 6;
/// Key plus the separator byte.
pub const PREFIX_LEN: usize = KEY_LEN + 1;
/// Widest decimal value on the wire (a 32-bit `long`).
pub const MAX_VALUE_DIGITS: usize = 10;
/// Data bytes read for one line before it is cut off: key, separator,
/// sign and ten digits.
pub const MAX_LINE_LEN: usize = PREFIX_LEN + 1 + MAX_VALUE_DIGITS;

// ---------------------------------------------------------------------------
// Mode bytes
// ---------------------------------------------------------------------------

/// Single-byte mode commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Off,
    On,
    Configuring,
    WatchdogPing,
}

impl Mode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'0' => Some(Self::Off),
            b'1' => Some(Self::On),
            b'2' => Some(Self::Configuring),
            b'3' => Some(Self::WatchdogPing),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Off => b'0',
            Self::On => b'1',
            Self::Configuring => b'2',
            Self::WatchdogPing => b'3',
        }
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Recognised six-character keys.  Matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Dut405,
    Dut445,
    Frq405,
    Frq445,
    Res405,
    Res445,
    FrqLtb,
    SetLed,
    ConMea,
    ExpDel,
    /// One-shot board alias of `Dut405`.
    Pwm405,
    Num445,
    Del445,
}

impl Key {
    pub const ALL: [Self; 13] = [
        Self::Dut405,
        Self::Dut445,
        Self::Frq405,
        Self::Frq445,
        Self::Res405,
        Self::Res445,
        Self::FrqLtb,
        Self::SetLed,
        Self::ConMea,
        Self::ExpDel,
        Self::Pwm405,
        Self::Num445,
        Self::Del445,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dut405 => "Dut405",
            Self::Dut445 => "Dut445",
            Self::Frq405 => "Frq405",
            Self::Frq445 => "Frq445",
            Self::Res405 => "Res405",
            Self::Res445 => "Res445",
            Self::FrqLtb => "FrqLTB",
            Self::SetLed => "SetLED",
            Self::ConMea => "ConMea",
            Self::ExpDel => "ExpDel",
            Self::Pwm405 => "PWM405",
            Self::Num445 => "Num445",
            Self::Del445 => "Del445",
        }
    }

    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str().as_bytes() == raw)
    }
}

// ---------------------------------------------------------------------------
// Command (raw key/value)
// ---------------------------------------------------------------------------

/// A decoded key/value pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub key: Key,
    pub value: i64,
}

impl Command {
    /// Split a line (without its `\n`) into key and value.
    ///
    /// The byte after the key is skipped without being checked, so
    /// `Dut405:12` and `Dut405=12` are the same command.  Callers must
    /// already have rejected lines of `PREFIX_LEN` bytes or fewer.
    pub fn parse(line: &[u8]) -> Result<Self, UnknownKey> {
        let raw_key = &line[..KEY_LEN.min(line.len())];
        let key = Key::from_bytes(raw_key).ok_or_else(|| UnknownKey::new(raw_key))?;
        let value = parse_value(line.get(PREFIX_LEN..).unwrap_or_default());
        Ok(Self { key, value })
    }
}

/// The first six bytes of a line that matched no key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownKey {
    bytes: [u8; KEY_LEN],
    len: usize,
}

impl UnknownKey {
    fn new(raw: &[u8]) -> Self {
        let mut bytes = [0; KEY_LEN];
        let len = raw.len().min(KEY_LEN);
        bytes[..len].copy_from_slice(&raw[..len]);
        Self { bytes, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Decimal parse with C `atoi` semantics: leading whitespace, an optional
/// sign, then digits up to the first non-digit.  No digits yields 0.
pub fn parse_value(raw: &[u8]) -> i64 {
    let mut bytes = raw.iter().copied().skip_while(u8::is_ascii_whitespace).peekable();

    let negative = match bytes.peek() {
        Some(b'-') => {
            bytes.next();
            true
        }
        Some(b'+') => {
            bytes.next();
            false
        }
        _ => false,
    };

    let magnitude = bytes
        .take_while(u8::is_ascii_digit)
        .take(MAX_VALUE_DIGITS)
        .fold(0i64, |acc, d| acc * 10 + i64::from(d - b'0'));

    if negative { -magnitude } else { magnitude }
}

// ---------------------------------------------------------------------------
// LED colour code
// ---------------------------------------------------------------------------

/// Intensity step per LED digit.
pub const LED_DIGIT_STEP: u8 = 10;

/// RGB value decoded from a `SetLED` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedColour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl LedColour {
    /// Three decimal digits, one per channel; digit `n` means `(n - 1) * 10`.
    ///
    /// The offset keeps leading zeros from vanishing in the integer
    /// (`002` would parse as `2`), so digit `0` is never valid and `1`
    /// means "off".  Leading zeros before the three digits are ignored:
    /// `000222` is R = G = B = 10.
    pub fn from_code(value: i64) -> Result<Self, CommandError> {
        if !(111..=999).contains(&value) {
            return Err(CommandError::InvalidLedCode(value));
        }
        let digits = [value / 100, value / 10 % 10, value % 10];
        if digits.contains(&0) {
            return Err(CommandError::InvalidLedCode(value));
        }
        let level = |d: i64| (d as u8 - 1) * LED_DIGIT_STEP;
        Ok(Self {
            r: level(digits[0]),
            g: level(digits[1]),
            b: level(digits[2]),
        })
    }
}

// ---------------------------------------------------------------------------
// Typed settings
// ---------------------------------------------------------------------------

/// A validated configuration change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Duty { channel: LaserChannel, value: u16 },
    Frequency { channel: LaserChannel, hz: u32 },
    Resolution { channel: LaserChannel, bits: u8 },
    NitrogenFrequency(u32),
    Led(LedColour),
    ContinuousMeasurement(bool),
    AllowedSilence { ms: u64 },
    PulseCount(u16),
    PulseDelay { ms: u32 },
}

impl TryFrom<Command> for Setting {
    type Error = CommandError;

    fn try_from(cmd: Command) -> Result<Self, CommandError> {
        let v = cmd.value;
        let setting = match cmd.key {
            Key::Dut405 | Key::Pwm405 => Self::Duty {
                channel: LaserChannel::Laser405,
                value: narrow(v)?,
            },
            Key::Dut445 => Self::Duty {
                channel: LaserChannel::Laser445,
                value: narrow(v)?,
            },
            Key::Frq405 => Self::Frequency {
                channel: LaserChannel::Laser405,
                hz: frequency(v)?,
            },
            Key::Frq445 => Self::Frequency {
                channel: LaserChannel::Laser445,
                hz: frequency(v)?,
            },
            Key::Res405 => Self::Resolution {
                channel: LaserChannel::Laser405,
                bits: resolution(v)?,
            },
            Key::Res445 => Self::Resolution {
                channel: LaserChannel::Laser445,
                bits: resolution(v)?,
            },
            Key::FrqLtb => Self::NitrogenFrequency(frequency(v)?),
            Key::SetLed => Self::Led(LedColour::from_code(v)?),
            Key::ConMea => Self::ContinuousMeasurement(v != 0),
            Key::ExpDel => Self::AllowedSilence { ms: narrow::<u32>(v)?.into() },
            Key::Num445 => Self::PulseCount(narrow(v)?),
            Key::Del445 => Self::PulseDelay { ms: narrow(v)? },
        };
        Ok(setting)
    }
}

fn narrow<T: TryFrom<i64>>(v: i64) -> Result<T, CommandError> {
    T::try_from(v).map_err(|_| CommandError::ValueOutOfRange(v))
}

fn frequency(v: i64) -> Result<u32, CommandError> {
    match narrow::<u32>(v)? {
        0 => Err(CommandError::ZeroFrequency),
        hz => Ok(hz),
    }
}

fn resolution(v: i64) -> Result<u8, CommandError> {
    match u8::try_from(v) {
        Ok(bits @ 1..=MAX_RESOLUTION_BITS) => Ok(bits),
        _ => Err(CommandError::InvalidResolution(v)),
    }
}

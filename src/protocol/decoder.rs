//! Streaming decoder for the host serial link.
//!
//! Two framing modes share one byte stream:
//!
//! ```text
//!  idle ──[mode byte]──▶ emit Mode / WatchdogPing
//!    ▲          │
//!    │       ['2']
//!    │          ▼
//!    └──[\n | 18 bytes | timeout]── line pending ──▶ emit Command / Dropped
//! ```
//!
//! The decoder never blocks: each `poll` drains whatever the port has
//! buffered and returns at most one decoded unit.  While a line is pending
//! every byte is line data, including `'0'`.  A line that fills the buffer
//! without a `\n` leaves a tail; everything up to and including the next
//! `\n` (or until the line timeout) is discarded, never read as a mode.

use heapless::Vec;
use log::{debug, trace};

use super::command::{Command, MAX_LINE_LEN, Mode, PREFIX_LEN, UnknownKey};
use crate::app::ports::SerialPort;

/// One decoded unit from the serial stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// The stored mode changed (or `'2'` was repeated).
    Mode(Mode),
    /// `'3'` while continuous measurement is enabled.
    WatchdogPing,
    /// A complete key/value line with a recognised key.
    Command(Command),
    /// A line that was framed and thrown away.
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Not longer than key plus separator.
    TooShort { len: usize },
    UnknownKey(UnknownKey),
}

/// In-flight key/value line.
struct PendingLine {
    started_ms: u64,
    buf: Vec<u8, MAX_LINE_LEN>,
}

pub struct SerialCommandDecoder {
    /// `None` until the first mode byte arrives.
    mode: Option<Mode>,
    line: Option<PendingLine>,
    /// Set after a line filled the buffer; holds when the discard began.
    discard_since: Option<u64>,
    continuous_measurement: bool,
    line_timeout_ms: u64,
}

impl SerialCommandDecoder {
    pub fn new(continuous_measurement: bool, line_timeout_ms: u64) -> Self {
        Self {
            mode: None,
            line: None,
            discard_since: None,
            continuous_measurement,
            line_timeout_ms,
        }
    }

    /// Stored mode; never `WatchdogPing`.
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn line_pending(&self) -> bool {
        self.line.is_some()
    }

    /// True while the tail of an overflowed line is being skipped.
    pub fn discarding(&self) -> bool {
        self.discard_since.is_some()
    }

    pub fn continuous_measurement(&self) -> bool {
        self.continuous_measurement
    }

    pub fn set_continuous_measurement(&mut self, enabled: bool) {
        self.continuous_measurement = enabled;
    }

    /// Overwrite the stored mode without emitting anything.  Used when the
    /// controller leaves a mode on its own (watchdog expiry), so that the
    /// host's next mode byte is not filtered as a repeat.
    pub fn force_mode(&mut self, mode: Mode) {
        if mode != Mode::WatchdogPing {
            self.mode = Some(mode);
        }
        self.line = None;
        self.discard_since = None;
    }

    /// Poll the port once.  Returns `None` when nothing complete is
    /// available yet.
    pub fn poll(&mut self, serial: &mut impl SerialPort, now_ms: u64) -> Option<Decoded> {
        if self.line.is_some() {
            return self.poll_line(serial, now_ms);
        }
        if self.discard_since.is_some() && !self.skip_tail(serial, now_ms) {
            return None;
        }

        let byte = serial.read_byte()?;
        let Some(mode) = Mode::from_byte(byte) else {
            trace!("decoder: ignoring byte 0x{byte:02x}");
            return None;
        };

        match mode {
            Mode::WatchdogPing if self.continuous_measurement => Some(Decoded::WatchdogPing),
            Mode::WatchdogPing => {
                trace!("decoder: ping ignored, continuous measurement off");
                None
            }
            Mode::Configuring => {
                self.mode = Some(mode);
                self.line = Some(PendingLine {
                    started_ms: now_ms,
                    buf: Vec::new(),
                });
                Some(Decoded::Mode(mode))
            }
            _ if self.mode == Some(mode) => None,
            _ => {
                self.mode = Some(mode);
                Some(Decoded::Mode(mode))
            }
        }
    }

    fn poll_line(&mut self, serial: &mut impl SerialPort, now_ms: u64) -> Option<Decoded> {
        let line = self.line.as_mut()?;

        let mut complete = false;
        while !line.buf.is_full() {
            let Some(byte) = serial.read_byte() else {
                break;
            };
            if byte == b'\n' {
                complete = true;
                break;
            }
            // Cannot fail: the loop condition checks capacity.
            let _ = line.buf.push(byte);
        }
        if !complete && line.buf.is_full() {
            complete = true;
            self.discard_since = Some(now_ms);
        }

        if !complete && now_ms.saturating_sub(line.started_ms) < self.line_timeout_ms {
            return None;
        }
        if !complete {
            debug!("decoder: line timed out after {} bytes", line.buf.len());
        }

        let line = self.line.take()?;
        Some(Self::frame(&line.buf))
    }

    /// Skip bytes after an overflowed line.  Returns `true` once the tail
    /// is gone (newline consumed or timeout elapsed).
    fn skip_tail(&mut self, serial: &mut impl SerialPort, now_ms: u64) -> bool {
        let Some(since) = self.discard_since else {
            return true;
        };
        if now_ms.saturating_sub(since) >= self.line_timeout_ms {
            debug!("decoder: overflow tail timed out");
            self.discard_since = None;
            return true;
        }
        let mut skipped = 0usize;
        while let Some(byte) = serial.read_byte() {
            if byte == b'\n' {
                trace!("decoder: skipped {skipped}-byte overflow tail");
                self.discard_since = None;
                return true;
            }
            skipped += 1;
        }
        false
    }

    fn frame(buf: &[u8]) -> Decoded {
        if buf.len() <= PREFIX_LEN {
            debug!("decoder: dropping {}-byte line", buf.len());
            return Decoded::Dropped(DropReason::TooShort { len: buf.len() });
        }
        match Command::parse(buf) {
            Ok(cmd) => Decoded::Command(cmd),
            Err(unknown) => {
                debug!(
                    "decoder: unknown key {:?}",
                    core::str::from_utf8(unknown.as_bytes()).unwrap_or("<non-utf8>")
                );
                Decoded::Dropped(DropReason::UnknownKey(unknown))
            }
        }
    }
}

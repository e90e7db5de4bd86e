//! Dead-man's switch.
//!
//! The host must keep talking while the lasers are on: every `'1'` and
//! every `'3'` ping feeds the timer.  Once the allowed silence has elapsed
//! with outputs energised, the controller forces `Off`.
//!
//! An allowed silence of 0 expires on the first check after turning on,
//! so a host that never raises `ExpDel` gets no continuous output.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogTimer {
    last_activity_ms: u64,
    allowed_silence_ms: u64,
}

impl WatchdogTimer {
    pub fn new(allowed_silence_ms: u64) -> Self {
        Self {
            last_activity_ms: 0,
            allowed_silence_ms,
        }
    }

    pub fn feed(&mut self, now_ms: u64) {
        self.last_activity_ms = now_ms;
    }

    pub fn allowed_silence_ms(&self) -> u64 {
        self.allowed_silence_ms
    }

    pub fn set_allowed_silence(&mut self, ms: u64) {
        self.allowed_silence_ms = ms;
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }

    /// Expired: outputs are energised and the host has been silent too long.
    pub fn check(&self, now_ms: u64, energized: bool) -> bool {
        energized && now_ms.saturating_sub(self.last_activity_ms) >= self.allowed_silence_ms
    }
}

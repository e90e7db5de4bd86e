//! Shared mutable context threaded through every FSM handler.
//!
//! Handlers read the clock and the dead-man timer from here and leave
//! behind what the controller must do to the outputs.

use crate::watchdog::WatchdogTimer;

/// Physical effect requested by a state handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputAction {
    /// Cancel pulses, detach every channel, assert the interlock.
    Lock,
    /// Unlock, re-apply every channel config, enable power.
    Energize,
}

pub struct FsmContext {
    // -- Timing --
    /// Set by the controller before each decode/tick.
    pub now_ms: u64,

    // -- Dead-man's switch --
    pub watchdog: WatchdogTimer,

    // -- Outputs --
    /// The last applied mode energised the lasers.  Survives `Configuring`.
    pub lasers_on: bool,
    action: Option<OutputAction>,
    watchdog_expired: bool,
}

impl FsmContext {
    pub fn new(allowed_silence_ms: u64) -> Self {
        Self {
            now_ms: 0,
            watchdog: WatchdogTimer::new(allowed_silence_ms),
            lasers_on: false,
            action: None,
            watchdog_expired: false,
        }
    }

    /// Replaces any action not yet carried out.
    pub fn request(&mut self, action: OutputAction) {
        self.action = Some(action);
    }

    pub fn take_action(&mut self) -> Option<OutputAction> {
        self.action.take()
    }

    pub(super) fn flag_watchdog_expiry(&mut self) {
        self.watchdog_expired = true;
    }

    /// `true` once per dead-man expiry.
    pub fn take_watchdog_expiry(&mut self) -> bool {
        core::mem::take(&mut self.watchdog_expired)
    }
}

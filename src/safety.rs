//! Safety interlock.
//!
//! Owns the physical lock state of the laser lines and the ordering rules
//! between them:
//!
//! ```text
//!  Locked ──unlock()──▶ Unlocked ──enable_power()──▶ Energized
//!     ▲                                                  │
//!     └──────────────────── lock() ◀─────────────────────┘
//! ```
//!
//! `lock()` detaches every PWM channel and drives its pin LOW *before*
//! asserting the kill switch.  Zeroing the duty of an attached channel is
//! not enough: re-arming the timer later can emit a one-cycle spike.
//!
//! `unlock()` only releases the kill switch.  Channels are re-attached by
//! the caller, and power is enabled last.

use log::{error, info};

use crate::app::ports::{InterlockPort, PwmPort};
use crate::drivers::pwm::PwmChannelManager;
use crate::error::{Error, InterlockError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterlockState {
    /// Kill switch asserted, power disabled, every channel detached and LOW.
    Locked,
    /// Kill switch released; power still disabled.
    Unlocked,
    /// Kill switch released and power enabled.
    Energized,
}

#[derive(Debug)]
pub struct SafetyInterlock {
    state: InterlockState,
}

impl Default for SafetyInterlock {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyInterlock {
    /// Assumes the lines are locked; call [`lock`](Self::lock) at bring-up
    /// to make it true.
    pub fn new() -> Self {
        Self {
            state: InterlockState::Locked,
        }
    }

    pub fn state(&self) -> InterlockState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == InterlockState::Locked
    }

    /// De-energise everything.  Best effort: every step runs even if an
    /// earlier one fails, and the first failure is returned.
    pub fn lock(
        &mut self,
        hw: &mut (impl PwmPort + InterlockPort),
        pwm: &mut PwmChannelManager,
    ) -> Result<()> {
        let detached = pwm.detach_all(hw);
        let killed = hw.set_kill_switch(true).map_err(Error::from);
        let unpowered = hw.set_power_enable(false).map_err(Error::from);
        self.state = InterlockState::Locked;

        let result = detached.and(killed).and(unpowered);
        match &result {
            Ok(()) => info!("interlock: locked"),
            Err(e) => error!("interlock: lock incomplete: {e}"),
        }
        result
    }

    /// Release the kill switch.  Does not energise anything.
    pub fn unlock(&mut self, hw: &mut impl InterlockPort) -> Result<()> {
        hw.set_kill_switch(false)?;
        if self.state == InterlockState::Locked {
            self.state = InterlockState::Unlocked;
        }
        info!("interlock: unlocked");
        Ok(())
    }

    /// Enable supercon power.  Only valid after [`unlock`](Self::unlock).
    pub fn enable_power(&mut self, hw: &mut impl InterlockPort) -> Result<()> {
        if self.state == InterlockState::Locked {
            return Err(InterlockError::StillLocked.into());
        }
        hw.set_power_enable(true)?;
        self.state = InterlockState::Energized;
        info!("interlock: power enabled");
        Ok(())
    }
}

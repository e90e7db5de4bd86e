//! Outbound application events.
//!
//! The [`LaserController`](super::service::LaserController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  They are for
//! the local log only; the host link stays silent.

use crate::error::Error;
use crate::fsm::StateId;
use crate::protocol::{DropReason, Key, Setting};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Bring-up finished; carries the initial state.
    Started(StateId),

    /// The controller changed mode.
    ModeChanged { from: StateId, to: StateId },

    /// `'3'` refreshed the dead-man timer.
    WatchdogPing,

    /// The host went silent with lasers on; outputs were forced off.
    WatchdogExpired { silent_ms: u64 },

    SettingApplied(Setting),

    SettingRejected { key: Key, error: Error },

    /// A key/value line was framed and discarded.
    LineDropped(DropReason),

    /// Energising or pulsing failed; outputs were locked.
    OutputFault(Error),
}

//! Concrete state handlers and table builder.
//!
//! ```text
//!          '1'                    '2'
//!  OFF ──────────▶ ON ─────────────────▶ CONFIGURING ◀─┐
//!   ▲  ◀────────── │  ◀───────────────── │      │      │ '2' (re-entrant)
//!   │     '0'      │         '1'         │      └──────┘
//!   │              │                     │
//!   └──────────────┴──[silence expired]──┘
//! ```
//!
//! Expiry always runs `off_enter`, so the lock is re-applied in full.

use super::context::{FsmContext, OutputAction};
use super::{StateDescriptor, StateId};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Off,
            name: "Off",
            on_enter: Some(off_enter),
            on_exit: None,
            on_update: guard_silence,
        },
        StateDescriptor {
            id: StateId::On,
            name: "On",
            on_enter: Some(on_enter),
            on_exit: None,
            on_update: guard_silence,
        },
        StateDescriptor {
            id: StateId::Configuring,
            name: "Configuring",
            on_enter: Some(configuring_enter),
            on_exit: None,
            on_update: guard_silence,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  OFF
// ═══════════════════════════════════════════════════════════════════════════

fn off_enter(ctx: &mut FsmContext) {
    ctx.request(OutputAction::Lock);
    ctx.watchdog.feed(ctx.now_ms);
    ctx.lasers_on = false;
    info!("OFF: outputs locked");
}

// ═══════════════════════════════════════════════════════════════════════════
//  ON
// ═══════════════════════════════════════════════════════════════════════════

fn on_enter(ctx: &mut FsmContext) {
    ctx.watchdog.feed(ctx.now_ms);
    ctx.request(OutputAction::Energize);
    ctx.lasers_on = true;
    info!(
        "ON: lasers energised, allowed silence {} ms",
        ctx.watchdog.allowed_silence_ms()
    );
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONFIGURING: nothing happens until a key/value line is decoded
// ═══════════════════════════════════════════════════════════════════════════

fn configuring_enter(ctx: &mut FsmContext) {
    info!("CONFIGURING: awaiting key/value line (lasers_on={})", ctx.lasers_on);
}

// ═══════════════════════════════════════════════════════════════════════════
//  Dead-man guard, shared by every state
// ═══════════════════════════════════════════════════════════════════════════

fn guard_silence(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.watchdog.check(ctx.now_ms, ctx.lasers_on) {
        return None;
    }
    warn!(
        "WATCHDOG: {} ms without host activity, forcing Off",
        ctx.now_ms.saturating_sub(ctx.watchdog.last_activity_ms())
    );
    ctx.flag_watchdog_expiry();
    Some(StateId::Off)
}

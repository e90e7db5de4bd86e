//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  StateTable                                                  │
//! │  ┌─────────────┬───────────┬──────────┬───────────────────┐  │
//! │  │ StateId     │ on_enter  │ on_exit  │ on_update         │  │
//! │  ├─────────────┼───────────┼──────────┼───────────────────┤  │
//! │  │ Off         │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ On          │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  │ Configuring │ fn(ctx)   │ -        │ fn(ctx)->Option<> │  │
//! │  └─────────────┴───────────┴──────────┴───────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two ways to move:
//!
//! - [`Fsm::tick`] calls `on_update` for the current state; `Some(next)`
//!   runs `on_exit` / `on_enter` even when `next` is the current state.
//!   The dead-man guard relies on this to re-apply `Off`.
//! - [`Fsm::enter`] jumps unconditionally; used for mode bytes from the
//!   host, which the decoder has already de-duplicated.
//!
//! Handlers never touch hardware.  They record an [`OutputAction`] in the
//! context and the controller carries it out after the call returns.
//!
//! [`OutputAction`]: context::OutputAction

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

use crate::protocol::Mode;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Persistent controller modes.  `WatchdogPing` is an event, not a state.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Off = 0,
    On = 1,
    Configuring = 2,
}

impl StateId {
    pub const COUNT: usize = 3;

    pub fn from_index(idx: usize) -> Self {
        match idx {
            1 => Self::On,
            2 => Self::Configuring,
            _ => {
                debug_assert!(idx == 0, "invalid state index: {idx}");
                Self::Off
            }
        }
    }

    /// The state a mode byte selects, if any.
    pub fn from_mode(mode: Mode) -> Option<Self> {
        match mode {
            Mode::Off => Some(Self::Off),
            Mode::On => Some(Self::On),
            Mode::Configuring => Some(Self::Configuring),
            Mode::WatchdogPing => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// `on_enter` / `on_exit`; run exactly once per transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Per-tick handler.  `Some(next)` triggers a transition.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, row)| row.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run `on_enter` for the initial state.  Call once, before `tick`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    pub fn tick(&mut self, ctx: &mut FsmContext) {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.enter(next_id, ctx);
        }
    }

    /// Transition to `next` unconditionally: `on_exit(current)`, then
    /// `on_enter(next)`.
    pub fn enter(&mut self, next: StateId, ctx: &mut FsmContext) {
        let next_idx = next as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        self.table[self.current].id
    }
}

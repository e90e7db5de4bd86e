//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART0 / USB-CDC).  The host link on UART1 never carries these.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the debug console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {:?} -> {:?}", from, to);
            }
            AppEvent::WatchdogPing => {
                log::debug!("WDOG  | ping");
            }
            AppEvent::WatchdogExpired { silent_ms } => {
                warn!("WDOG  | host silent for {}ms, lasers forced off", silent_ms);
            }
            AppEvent::SettingApplied(setting) => {
                info!("SET   | {:?}", setting);
            }
            AppEvent::SettingRejected { key, error } => {
                warn!("SET   | {} rejected: {}", key.as_str(), error);
            }
            AppEvent::LineDropped(reason) => {
                warn!("LINE  | dropped: {:?}", reason);
            }
            AppEvent::OutputFault(e) => {
                log::error!("FAULT | {}", e);
            }
        }
    }
}

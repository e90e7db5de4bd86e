//! Laser stage controller library.
//!
//! Exposes the pure-logic modules for integration testing and fuzzing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod protocol;
pub mod safety;
pub mod watchdog;

// The hardware modules compile on the host too; the real peripheral code
// is guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;

//! Application core: pure domain logic, zero I/O.
//!
//! Mode handling, setting dispatch and output sequencing for the laser
//! stages.  All interaction with hardware happens through the port traits
//! in [`ports`], keeping this layer testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;

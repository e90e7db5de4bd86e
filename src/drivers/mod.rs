//! Laser output drivers, hardware initialisation, and pulse helpers.

pub mod hw_init;
pub mod interlock_lines;
pub mod ledc;
pub mod one_shot;
pub mod pulse;
pub mod pwm;
pub mod status_led;

//! Host serial link adapter.
//!
//! - **`target_os = "espidf"`**: wraps an `esp-idf-hal` [`UartDriver`] on
//!   UART1 and reads one byte per call without blocking.
//! - **`not(target_os = "espidf")`**: a byte queue fed by
//!   [`inject`](UartSerial::inject), for simulation and tests.

use crate::app::ports::SerialPort;

#[cfg(target_os = "espidf")]
use esp_idf_hal::{delay::NON_BLOCK, uart::UartDriver};

#[cfg(target_os = "espidf")]
pub struct UartSerial<'d> {
    uart: UartDriver<'d>,
}

#[cfg(target_os = "espidf")]
impl<'d> UartSerial<'d> {
    pub fn new(uart: UartDriver<'d>) -> Self {
        Self { uart }
    }
}

#[cfg(target_os = "espidf")]
impl SerialPort for UartSerial<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match self.uart.read(&mut buf, NON_BLOCK) {
            Ok(1) => Some(buf[0]),
            Ok(_) => None,
            Err(e) => {
                log::warn!("uart: read failed: {e}");
                None
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct UartSerial {
    rx: std::collections::VecDeque<u8>,
}

#[cfg(not(target_os = "espidf"))]
impl UartSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if the host had sent them.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(not(target_os = "espidf"))]
impl SerialPort for UartSerial {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }
}

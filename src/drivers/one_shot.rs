//! One-shot pulse counter for the 445 nm stage.
//!
//! Emulates an 8-bit up-counter with an `esp_timer` one-shot: `trigger`
//! raises the 445 pin and arms the timer for `MAX - start + 1` µs; the
//! timer callback drops the pin and flags completion.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! touching the GPIO level register and an atomic from there is fine.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::app::ports::OneShotCounter;
use crate::error::HalError;

#[cfg(target_os = "espidf")]
use crate::pins;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

static PULSE_DONE: AtomicBool = AtomicBool::new(true);

#[cfg(target_os = "espidf")]
static mut PULSE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: PULSE_TIMER is written once in `EspOneShot::ensure_timer()` from
/// the main task before the timer is ever started.
#[cfg(target_os = "espidf")]
unsafe fn pulse_timer() -> esp_timer_handle_t {
    unsafe { PULSE_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn pulse_end_cb(_arg: *mut core::ffi::c_void) {
    // SAFETY: level register write on a pin configured as output by `load`.
    unsafe { gpio_set_level(pins::LASER_445_GPIO, 0) };
    PULSE_DONE.store(true, Ordering::Release);
}

/// Pulse width in µs for a loaded start value.
pub const fn width_us(start: u8) -> u64 {
    (u8::MAX - start) as u64 + 1
}

pub struct EspOneShot {
    start: Option<u8>,
    pulses: u32,
}

impl Default for EspOneShot {
    fn default() -> Self {
        Self::new()
    }
}

impl EspOneShot {
    pub const fn new() -> Self {
        Self {
            start: None,
            pulses: 0,
        }
    }

    /// Pulses triggered since boot.
    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    pub fn loaded(&self) -> Option<u8> {
        self.start
    }

    #[cfg(target_os = "espidf")]
    fn ensure_timer(&mut self) -> Result<(), HalError> {
        // SAFETY: main task only; the handle is created once and never freed.
        unsafe {
            if !pulse_timer().is_null() {
                return Ok(());
            }
            let args = esp_timer_create_args_t {
                callback: Some(pulse_end_cb),
                arg: core::ptr::null_mut(),
                dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: c"pulse445".as_ptr(),
                skip_unhandled_events: false,
            };
            let ret = esp_timer_create(&args, &raw mut PULSE_TIMER);
            if ret != ESP_OK as i32 {
                return Err(HalError::OneShotFailed(ret));
            }
        }
        log::info!("one_shot: pulse timer created");
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl OneShotCounter for EspOneShot {
    fn load(&mut self, start: u8) -> Result<(), HalError> {
        self.ensure_timer()?;
        // SAFETY: hands the 445 pin to the GPIO matrix as a plain output;
        // the channel is not LEDC-driven in one-shot mode.
        let ret = unsafe {
            gpio_reset_pin(pins::LASER_445_GPIO);
            gpio_set_direction(pins::LASER_445_GPIO, gpio_mode_t_GPIO_MODE_OUTPUT)
        };
        if ret != ESP_OK as i32 {
            return Err(HalError::GpioWriteFailed(pins::LASER_445_GPIO));
        }
        self.start = Some(start);
        Ok(())
    }

    fn trigger(&mut self) -> Result<(), HalError> {
        let Some(start) = self.start else {
            return Err(HalError::OneShotFailed(ESP_ERR_INVALID_STATE as i32));
        };
        PULSE_DONE.store(false, Ordering::Release);
        // SAFETY: timer handle created in `load`; main task only.
        let ret = unsafe {
            gpio_set_level(pins::LASER_445_GPIO, 1);
            esp_timer_start_once(pulse_timer(), width_us(start))
        };
        if ret != ESP_OK as i32 {
            // SAFETY: as above.
            unsafe { gpio_set_level(pins::LASER_445_GPIO, 0) };
            PULSE_DONE.store(true, Ordering::Release);
            return Err(HalError::OneShotFailed(ret));
        }
        self.pulses = self.pulses.wrapping_add(1);
        Ok(())
    }

    fn finished(&mut self) -> bool {
        PULSE_DONE.load(Ordering::Acquire)
    }
}

// Host twin: a pulse completes as soon as it is triggered.
#[cfg(not(target_os = "espidf"))]
impl OneShotCounter for EspOneShot {
    fn load(&mut self, start: u8) -> Result<(), HalError> {
        self.start = Some(start);
        Ok(())
    }

    fn trigger(&mut self) -> Result<(), HalError> {
        if self.start.is_none() {
            return Err(HalError::OneShotFailed(-1));
        }
        self.pulses = self.pulses.wrapping_add(1);
        PULSE_DONE.store(true, Ordering::Release);
        Ok(())
    }

    fn finished(&mut self) -> bool {
        PULSE_DONE.load(Ordering::Acquire)
    }
}

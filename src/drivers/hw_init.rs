//! One-shot hardware peripheral initialization.
//!
//! Puts every laser output into a known LOW state and, depending on the
//! board variant, either parks the relay lines or configures the RGB status
//! LED on LEDC.  Called once from `main()` before the controller starts.
//! The laser LEDC channels themselves are attached later by the PWM manager.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::config::LaserConfig;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
pub fn init_peripherals(config: &LaserConfig) -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the main loop; single-threaded.
    unsafe {
        init_gpio_outputs(config)?;
        if config.use_rgb_led {
            init_led_ledc()?;
        }
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals(config: &LaserConfig) -> Result<(), HwInitError> {
    log::info!(
        "hw_init(sim): peripheral init skipped (rgb_led={})",
        config.use_rgb_led
    );
    Ok(())
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs(config: &LaserConfig) -> Result<(), HwInitError> {
    let laser_pins = [pins::LASER_405_GPIO, pins::LASER_445_GPIO, pins::NITROGEN_GPIO];
    let relay_pins = [pins::RELAY_405_GPIO, pins::RELAY_445_GPIO];

    let outputs = laser_pins
        .iter()
        .chain(relay_pins.iter().filter(|_| !config.use_rgb_led));

    for &pin in outputs {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!(
        "hw_init: laser outputs LOW{}",
        if config.use_rgb_led { "" } else { ", relays LOW" }
    );
    Ok(())
}

// ── LEDC PWM (status LED) ─────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_led_ledc() -> Result<(), HwInitError> {
    // Timer 3: RGB LED (1 kHz, 8-bit).  Timers 0-2 belong to the lasers.
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: pins::LEDC_TIMER_LED,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::LED_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    let led = [
        (pins::LEDC_CH_LED_R, pins::LED_R_GPIO),
        (pins::LEDC_CH_LED_G, pins::LED_G_GPIO),
        (pins::LEDC_CH_LED_B, pins::LED_B_GPIO),
    ];
    for (channel, gpio) in led {
        let ret = unsafe {
            ledc_channel_config(&ledc_channel_config_t {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel,
                timer_sel: pins::LEDC_TIMER_LED,
                gpio_num: gpio,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            })
        };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::LedcInitFailed(ret));
        }
    }

    info!("hw_init: LEDC configured (led=CH1/3/5 on timer 3)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) {
    // SAFETY: LED channels were configured in init_led_ledc(); duty register
    // writes are race-free since only the main loop calls this function.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, u32::from(duty));
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u8) {}

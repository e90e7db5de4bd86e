//! LEDC PWM back end for the laser channels.
//!
//! Each laser channel has its own LEDC timer, so frequency and resolution
//! can be changed per channel.  Detaching stops the channel and hands the
//! pin back to the GPIO matrix as a plain output.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: raw `ledc_*` / `gpio_*` sys calls.
//! On host/test: tracks channel state in memory only.

use crate::app::ports::PwmPort;
use crate::config::LaserChannel;
use crate::error::HalError;
use crate::pins;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// LEDC routing for one laser channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedcSlot {
    pub gpio: i32,
    pub channel: u32,
    pub timer: u32,
}

pub const fn slot(channel: LaserChannel) -> LedcSlot {
    match channel {
        LaserChannel::Laser405 => LedcSlot {
            gpio: pins::LASER_405_GPIO,
            channel: pins::LEDC_CH_405,
            timer: pins::LEDC_TIMER_405,
        },
        LaserChannel::Laser445 => LedcSlot {
            gpio: pins::LASER_445_GPIO,
            channel: pins::LEDC_CH_445,
            timer: pins::LEDC_TIMER_445,
        },
        LaserChannel::Nitrogen => LedcSlot {
            gpio: pins::NITROGEN_GPIO,
            channel: pins::LEDC_CH_NITROGEN,
            timer: pins::LEDC_TIMER_NITROGEN,
        },
    }
}

/// In-memory channel state for host builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimChannel {
    pub attached: bool,
    pub frequency_hz: u32,
    pub resolution_bits: u8,
    pub duty: u16,
    pub pin_high: bool,
}

#[derive(Default)]
pub struct LedcPwm {
    #[cfg(not(target_os = "espidf"))]
    sim: [SimChannel; LaserChannel::COUNT],
}

impl LedcPwm {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim(&self, channel: LaserChannel) -> &SimChannel {
        &self.sim[channel.index()]
    }
}

// ── ESP-IDF ──────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
const OK: i32 = ESP_OK as i32;

#[cfg(target_os = "espidf")]
fn timer_config(channel: LaserChannel, frequency_hz: u32, resolution_bits: u8) -> i32 {
    let slot = slot(channel);
    let cfg = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: slot.timer,
        duty_resolution: u32::from(resolution_bits),
        freq_hz: frequency_hz,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: plain config struct; LEDC is only touched from the main task.
    unsafe { ledc_timer_config(&cfg) }
}

#[cfg(target_os = "espidf")]
impl PwmPort for LedcPwm {
    fn attach(
        &mut self,
        channel: LaserChannel,
        frequency_hz: u32,
        resolution_bits: u8,
    ) -> Result<(), HalError> {
        let rc = timer_config(channel, frequency_hz, resolution_bits);
        if rc != OK {
            return Err(HalError::PwmAttachFailed(channel, rc));
        }
        let slot = slot(channel);
        // SAFETY: timer configured above; routes the pin to the LEDC channel.
        let rc = unsafe {
            ledc_channel_config(&ledc_channel_config_t {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel: slot.channel,
                timer_sel: slot.timer,
                gpio_num: slot.gpio,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            })
        };
        if rc != OK {
            return Err(HalError::PwmAttachFailed(channel, rc));
        }
        Ok(())
    }

    fn detach(&mut self, channel: LaserChannel) -> Result<(), HalError> {
        let slot = slot(channel);
        // SAFETY: stopping an LEDC channel with idle level 0.
        let rc = unsafe { ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, slot.channel, 0) };
        if rc != OK {
            return Err(HalError::PwmDetachFailed(channel, rc));
        }
        Ok(())
    }

    fn write_duty(&mut self, channel: LaserChannel, duty: u16) -> Result<(), HalError> {
        let slot = slot(channel);
        // SAFETY: duty register writes on a configured channel, main task only.
        let rc = unsafe {
            let rc = ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, slot.channel, u32::from(duty));
            if rc == OK {
                ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, slot.channel)
            } else {
                rc
            }
        };
        if rc != OK {
            return Err(HalError::PwmWriteFailed(channel, rc));
        }
        Ok(())
    }

    fn change_frequency(
        &mut self,
        channel: LaserChannel,
        frequency_hz: u32,
        resolution_bits: u8,
    ) -> Result<(), HalError> {
        let rc = timer_config(channel, frequency_hz, resolution_bits);
        if rc != OK {
            return Err(HalError::FrequencyRejected(channel, rc));
        }
        Ok(())
    }

    fn drive_pin(&mut self, channel: LaserChannel, high: bool) -> Result<(), HalError> {
        let gpio = slot(channel).gpio;
        // SAFETY: the pin is detached from LEDC (or about to be re-routed to
        // the GPIO matrix here); main task only.
        let rc = unsafe {
            gpio_reset_pin(gpio);
            let rc = gpio_set_direction(gpio, gpio_mode_t_GPIO_MODE_OUTPUT);
            if rc == OK {
                gpio_set_level(gpio, u32::from(high))
            } else {
                rc
            }
        };
        if rc != OK {
            return Err(HalError::GpioWriteFailed(gpio));
        }
        Ok(())
    }
}

// ── Host twin ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl PwmPort for LedcPwm {
    fn attach(
        &mut self,
        channel: LaserChannel,
        frequency_hz: u32,
        resolution_bits: u8,
    ) -> Result<(), HalError> {
        let ch = &mut self.sim[channel.index()];
        ch.attached = true;
        ch.frequency_hz = frequency_hz;
        ch.resolution_bits = resolution_bits;
        ch.duty = 0;
        Ok(())
    }

    fn detach(&mut self, channel: LaserChannel) -> Result<(), HalError> {
        self.sim[channel.index()].attached = false;
        Ok(())
    }

    fn write_duty(&mut self, channel: LaserChannel, duty: u16) -> Result<(), HalError> {
        self.sim[channel.index()].duty = duty;
        Ok(())
    }

    fn change_frequency(
        &mut self,
        channel: LaserChannel,
        frequency_hz: u32,
        resolution_bits: u8,
    ) -> Result<(), HalError> {
        let ch = &mut self.sim[channel.index()];
        ch.frequency_hz = frequency_hz;
        ch.resolution_bits = resolution_bits;
        Ok(())
    }

    fn drive_pin(&mut self, channel: LaserChannel, high: bool) -> Result<(), HalError> {
        self.sim[channel.index()].pin_high = high;
        Ok(())
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn slots_match_pin_map() {
        assert_eq!(slot(LaserChannel::Laser405).gpio, pins::LASER_405_GPIO);
        assert_eq!(slot(LaserChannel::Laser445).channel, pins::LEDC_CH_445);
        assert_eq!(slot(LaserChannel::Nitrogen).timer, pins::LEDC_TIMER_NITROGEN);
    }

    #[test]
    fn every_channel_has_its_own_timer() {
        let timers: Vec<u32> = LaserChannel::ALL.iter().map(|&c| slot(c).timer).collect();
        for (i, t) in timers.iter().enumerate() {
            assert!(!timers[i + 1..].contains(t));
            assert_ne!(*t, pins::LEDC_TIMER_LED);
        }
    }

    #[test]
    fn sim_tracks_state() {
        let mut pwm = LedcPwm::new();
        pwm.attach(LaserChannel::Laser405, 2_000, 13).unwrap();
        pwm.write_duty(LaserChannel::Laser405, 77).unwrap();
        assert_eq!(
            *pwm.sim(LaserChannel::Laser405),
            SimChannel {
                attached: true,
                frequency_hz: 2_000,
                resolution_bits: 13,
                duty: 77,
                pin_high: false,
            }
        );
        pwm.detach(LaserChannel::Laser405).unwrap();
        assert!(!pwm.sim(LaserChannel::Laser405).attached);
    }
}

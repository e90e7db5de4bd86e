//! PWM channel manager.
//!
//! Owns the frequency/resolution/duty of every PWM-driven stage and the
//! attach/detach sequencing towards the timer peripheral.  Settings are
//! always stored; they only reach the hardware while a channel is
//! attached, and are applied in full by [`engage`](PwmChannelManager::engage)
//! on the next laser-on.
//!
//! The 445 nm stage can bypass PWM entirely (compile-time disable, or the
//! `1234` duty sentinel): its pin is then driven HIGH for full output.

use log::{debug, info, warn};

use crate::app::ports::PwmPort;
use crate::config::{ChannelConfig, FULL_OUTPUT_SENTINEL, LaserChannel, LaserConfig};
use crate::error::{CommandError, Error, Result};

/// What a channel's pin is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    /// Plain GPIO, driven LOW.
    Detached,
    /// Bound to its timer.
    Pwm,
    /// Plain GPIO, driven HIGH (445 nm full output).
    ForcedHigh,
}

pub struct PwmChannelManager {
    channels: [ChannelConfig; LaserChannel::COUNT],
    outputs: [OutputState; LaserChannel::COUNT],
    pwm_disabled_445: bool,
}

impl PwmChannelManager {
    pub fn new(config: &LaserConfig) -> Self {
        let mut nitrogen = ChannelConfig::new(config.nitrogen.frequency_hz, 14, 0);
        if !nitrogen.set_resolution_bits(config.nitrogen.resolution_bits) {
            warn!(
                "pwm: nitrogen resolution {} invalid, keeping 14 bits",
                config.nitrogen.resolution_bits
            );
        }
        Self {
            channels: [config.laser_405, config.laser_445, nitrogen],
            outputs: [OutputState::Detached; LaserChannel::COUNT],
            pwm_disabled_445: config.disable_pwm_445,
        }
    }

    pub fn config(&self, channel: LaserChannel) -> &ChannelConfig {
        &self.channels[channel.index()]
    }

    pub fn output(&self, channel: LaserChannel) -> OutputState {
        self.outputs[channel.index()]
    }

    /// The channel's timer is never used: compile-time disabled.
    fn disabled(&self, channel: LaserChannel) -> bool {
        channel == LaserChannel::Laser445 && self.pwm_disabled_445
    }

    /// The channel is driven HIGH instead of by PWM when energised.
    pub fn bypasses_pwm(&self, channel: LaserChannel) -> bool {
        self.disabled(channel)
            || (channel == LaserChannel::Laser445
                && self.config(channel).duty == FULL_OUTPUT_SENTINEL)
    }

    // ── Attach / detach ───────────────────────────────────────

    /// Bind the channel to its timer at the stored frequency/resolution.
    pub fn attach(&mut self, pwm: &mut impl PwmPort, channel: LaserChannel) -> Result<()> {
        if self.disabled(channel) {
            return Ok(());
        }
        let cfg = self.channels[channel.index()];
        pwm.attach(channel, cfg.frequency_hz, cfg.resolution_bits())?;
        self.outputs[channel.index()] = OutputState::Pwm;
        debug!(
            "pwm: {} attached {} Hz / {} bit",
            channel.name(),
            cfg.frequency_hz,
            cfg.resolution_bits()
        );
        Ok(())
    }

    /// Release the pin from its timer and drive it LOW.  Both steps always
    /// run; the first failure is returned.
    pub fn detach(&mut self, pwm: &mut impl PwmPort, channel: LaserChannel) -> Result<()> {
        let released = match self.outputs[channel.index()] {
            OutputState::Pwm => pwm.detach(channel),
            OutputState::Detached | OutputState::ForcedHigh => Ok(()),
        };
        let low = pwm.drive_pin(channel, false);
        self.outputs[channel.index()] = OutputState::Detached;
        released.and(low).map_err(Error::from)
    }

    pub fn detach_all(&mut self, pwm: &mut impl PwmPort) -> Result<()> {
        LaserChannel::ALL
            .into_iter()
            .map(|ch| self.detach(pwm, ch))
            .fold(Ok(()), |first, next| first.and(next))
    }

    /// Bring a channel to its configured output: attach and write the
    /// stored duty, or drive HIGH when it bypasses PWM.
    pub fn engage(&mut self, pwm: &mut impl PwmPort, channel: LaserChannel) -> Result<()> {
        if self.bypasses_pwm(channel) {
            return self.force_high(pwm, channel);
        }
        self.attach(pwm, channel)?;
        pwm.write_duty(channel, self.config(channel).duty)?;
        Ok(())
    }

    /// Take the pin away from its timer and drive it HIGH.
    pub fn force_high(&mut self, pwm: &mut impl PwmPort, channel: LaserChannel) -> Result<()> {
        if self.outputs[channel.index()] == OutputState::Pwm {
            pwm.detach(channel)?;
        }
        pwm.drive_pin(channel, true)?;
        self.outputs[channel.index()] = OutputState::ForcedHigh;
        info!("pwm: {} forced to full output", channel.name());
        Ok(())
    }

    // ── Setters ───────────────────────────────────────────────

    /// Store the duty and write it through if the channel is running.
    /// Not range-checked against `max_duty`; the timer truncates.
    pub fn set_duty(&mut self, pwm: &mut impl PwmPort, channel: LaserChannel, value: u16) -> Result<()> {
        let cfg = &mut self.channels[channel.index()];
        cfg.duty = value;
        if value > cfg.max_duty() && !(channel == LaserChannel::Laser445 && value == FULL_OUTPUT_SENTINEL) {
            warn!(
                "pwm: {} duty {value} above max {} at {} bit",
                channel.name(),
                cfg.max_duty(),
                cfg.resolution_bits()
            );
        }
        if self.outputs[channel.index()] == OutputState::Pwm && !self.disabled(channel) {
            pwm.write_duty(channel, value)?;
        }
        Ok(())
    }

    /// Store the frequency and re-apply it in place (no detach).
    pub fn set_frequency(&mut self, pwm: &mut impl PwmPort, channel: LaserChannel, hz: u32) -> Result<()> {
        if hz == 0 {
            return Err(CommandError::ZeroFrequency.into());
        }
        self.channels[channel.index()].frequency_hz = hz;
        self.reapply_timer(pwm, channel)
    }

    /// Change the resolution: `max_duty` is recomputed first, then the
    /// timer is re-applied at the new resolution.  The stored duty is not
    /// clamped.
    pub fn set_resolution(&mut self, pwm: &mut impl PwmPort, channel: LaserChannel, bits: u8) -> Result<()> {
        let cfg = &mut self.channels[channel.index()];
        if !cfg.set_resolution_bits(bits) {
            return Err(CommandError::InvalidResolution(i64::from(bits)).into());
        }
        if cfg.duty > cfg.max_duty() {
            warn!(
                "pwm: {} keeps duty {} above new max {}",
                channel.name(),
                cfg.duty,
                cfg.max_duty()
            );
        }
        self.reapply_timer(pwm, channel)
    }

    fn reapply_timer(&mut self, pwm: &mut impl PwmPort, channel: LaserChannel) -> Result<()> {
        if self.outputs[channel.index()] != OutputState::Pwm || self.disabled(channel) {
            return Ok(());
        }
        let cfg = self.channels[channel.index()];
        pwm.change_frequency(channel, cfg.frequency_hz, cfg.resolution_bits())?;
        Ok(())
    }
}

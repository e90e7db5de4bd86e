//! Laser controller: the hexagonal core.
//!
//! [`LaserController`] owns the decoder, the mode FSM, the channel manager,
//! the interlock and the one-shot pulse generator.  All I/O flows through
//! port traits injected at each call, so the whole controller runs against
//! mocks on the host.
//!
//! ```text
//!  SerialPort ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!                 │       LaserController        │
//!  LaserHardware ◀│ Decoder · FSM · PWM · Lock   │
//!                 └─────────────────────────────┘
//! ```
//!
//! One [`tick`](LaserController::tick) per main-loop iteration:
//!
//! 1. poll the decoder and act on at most one decoded unit,
//! 2. run the FSM (dead-man guard),
//! 3. carry out any lock/energise the FSM requested,
//! 4. advance a running one-shot pulse train.

use log::{debug, error, info, warn};

use crate::config::{ChannelConfig, Drive445, FULL_OUTPUT_SENTINEL, LaserChannel, LaserConfig, OneShotConfig};
use crate::drivers::pulse::{OneShotPulse, nitrogen_duty};
use crate::drivers::pwm::{OutputState, PwmChannelManager};
use crate::error::{CommandError, Error, Result};
use crate::fsm::context::{FsmContext, OutputAction};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::protocol::{Command, Decoded, LedColour, Mode, SerialCommandDecoder, Setting};
use crate::safety::{InterlockState, SafetyInterlock};

use super::events::AppEvent;
use super::ports::{EventSink, LaserHardware, SerialPort};

// ───────────────────────────────────────────────────────────────
// LaserController
// ───────────────────────────────────────────────────────────────

pub struct LaserController {
    config: LaserConfig,
    decoder: SerialCommandDecoder,
    fsm: Fsm,
    ctx: FsmContext,
    pwm: PwmChannelManager,
    interlock: SafetyInterlock,
    pulse: OneShotPulse,
    led: LedColour,
}

impl LaserController {
    /// Does **not** touch hardware; call [`start`](Self::start) next.
    pub fn new(config: LaserConfig) -> Self {
        let decoder =
            SerialCommandDecoder::new(config.continuous_measurement, config.line_timeout_ms);
        let ctx = FsmContext::new(config.allowed_silence_ms);
        let pwm = PwmChannelManager::new(&config);
        let fsm = Fsm::new(build_state_table(), StateId::Off);

        Self {
            config,
            decoder,
            fsm,
            ctx,
            pwm,
            interlock: SafetyInterlock::new(),
            pulse: OneShotPulse::new(),
            led: LedColour::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring-up: attach every channel, then lock straight away (attaching
    /// drives the pins).  Returns the first attach failure; the lock runs
    /// regardless.
    pub fn start<H: LaserHardware>(
        &mut self,
        now_ms: u64,
        hw: &mut H,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.ctx.now_ms = now_ms;

        if let Err(e) = self.refresh_nitrogen_duty(hw) {
            warn!("nitrogen pulse does not fit its period: {e}");
        }
        let attached = LaserChannel::ALL
            .into_iter()
            .map(|ch| self.pwm.attach(hw, ch))
            .fold(Ok(()), |first, next| first.and(next));

        self.fsm.start(&mut self.ctx);
        self.apply_outputs(hw, sink);

        if self.config.use_rgb_led {
            hw.set_rgb(0, 0, 0);
        }

        info!(
            "controller started: 445 drive {:?}, continuous measurement {}",
            self.config.drive_445,
            self.decoder.continuous_measurement()
        );
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        attached
    }

    // ── Per-loop orchestration ────────────────────────────────

    pub fn tick<H: LaserHardware>(
        &mut self,
        now_ms: u64,
        serial: &mut impl SerialPort,
        hw: &mut H,
        sink: &mut impl EventSink,
    ) {
        self.ctx.now_ms = now_ms;

        // 1. Serial
        if let Some(decoded) = self.decoder.poll(serial, now_ms) {
            self.handle_decoded(decoded, hw, sink);
        }

        // 2. Dead-man guard
        let prev = self.fsm.current_state();
        let silent_ms = now_ms.saturating_sub(self.ctx.watchdog.last_activity_ms());
        self.fsm.tick(&mut self.ctx);
        if self.ctx.take_watchdog_expiry() {
            self.decoder.force_mode(Mode::Off);
            sink.emit(&AppEvent::WatchdogExpired { silent_ms });
            sink.emit(&AppEvent::ModeChanged {
                from: prev,
                to: StateId::Off,
            });
        }

        // 3. Outputs
        self.apply_outputs(hw, sink);

        // 4. Pulse train
        if let Err(e) = self.pulse.poll(hw, now_ms) {
            error!("one-shot pulse failed: {e}");
            sink.emit(&AppEvent::OutputFault(e));
            self.fail_safe(hw, sink);
        }
    }

    // ── Decoded input ─────────────────────────────────────────

    fn handle_decoded<H: LaserHardware>(
        &mut self,
        decoded: Decoded,
        hw: &mut H,
        sink: &mut impl EventSink,
    ) {
        match decoded {
            Decoded::Mode(mode) => {
                if let Some(target) = StateId::from_mode(mode) {
                    self.change_mode(target, hw, sink);
                }
            }
            Decoded::WatchdogPing => {
                self.ctx.watchdog.feed(self.ctx.now_ms);
                debug!("watchdog fed at {} ms", self.ctx.now_ms);
                sink.emit(&AppEvent::WatchdogPing);
            }
            Decoded::Command(cmd) => self.apply_command(cmd, hw, sink),
            Decoded::Dropped(reason) => sink.emit(&AppEvent::LineDropped(reason)),
        }
    }

    fn change_mode<H: LaserHardware>(
        &mut self,
        target: StateId,
        hw: &mut H,
        sink: &mut impl EventSink,
    ) {
        let from = self.fsm.current_state();
        self.fsm.enter(target, &mut self.ctx);
        sink.emit(&AppEvent::ModeChanged { from, to: target });
        self.apply_outputs(hw, sink);
    }

    fn apply_command<H: LaserHardware>(
        &mut self,
        cmd: Command,
        hw: &mut H,
        sink: &mut impl EventSink,
    ) {
        let result = Setting::try_from(cmd)
            .map_err(Error::from)
            .and_then(|setting| self.apply_setting(setting, hw).map(|()| setting));

        match result {
            Ok(setting) => {
                info!("{}={} applied", cmd.key.as_str(), cmd.value);
                sink.emit(&AppEvent::SettingApplied(setting));
            }
            Err(error) => {
                warn!("{}={} rejected: {error}", cmd.key.as_str(), cmd.value);
                sink.emit(&AppEvent::SettingRejected {
                    key: cmd.key,
                    error,
                });
            }
        }
    }

    /// Dispatch one validated setting.  On error nothing has changed.
    fn apply_setting<H: LaserHardware>(&mut self, setting: Setting, hw: &mut H) -> Result<()> {
        match setting {
            Setting::Duty { channel, value } => {
                self.require_pwm_drive(channel)?;
                self.pwm.set_duty(hw, channel, value)
            }
            Setting::Frequency { channel, hz } => {
                self.require_pwm_drive(channel)?;
                self.pwm.set_frequency(hw, channel, hz)
            }
            Setting::Resolution { channel, bits } => {
                self.require_pwm_drive(channel)?;
                self.pwm.set_resolution(hw, channel, bits)
            }
            Setting::NitrogenFrequency(hz) => {
                let max = self.pwm.config(LaserChannel::Nitrogen).max_duty();
                let duty = nitrogen_duty(self.config.nitrogen.pulse_width_us, hz, max)?;
                self.pwm.set_frequency(hw, LaserChannel::Nitrogen, hz)?;
                self.pwm.set_duty(hw, LaserChannel::Nitrogen, duty)
            }
            Setting::Led(colour) => {
                self.led = colour;
                if self.config.use_rgb_led {
                    hw.set_rgb(colour.r, colour.g, colour.b);
                } else {
                    debug!("no RGB LED fitted, colour stored only");
                }
                Ok(())
            }
            Setting::ContinuousMeasurement(enabled) => {
                self.decoder.set_continuous_measurement(enabled);
                Ok(())
            }
            Setting::AllowedSilence { ms } => {
                self.ctx.watchdog.set_allowed_silence(ms);
                Ok(())
            }
            Setting::PulseCount(count) => {
                self.require_one_shot_drive()?;
                self.config.one_shot_445.count = count;
                Ok(())
            }
            Setting::PulseDelay { ms } => {
                self.require_one_shot_drive()?;
                self.config.one_shot_445.delay_ms = ms;
                Ok(())
            }
        }
    }

    fn require_pwm_drive(&self, channel: LaserChannel) -> Result<()> {
        if channel == LaserChannel::Laser445 && self.config.drive_445 == Drive445::OneShot {
            return Err(CommandError::NotApplicable.into());
        }
        Ok(())
    }

    fn require_one_shot_drive(&self) -> Result<()> {
        if self.config.drive_445 != Drive445::OneShot {
            return Err(CommandError::NotApplicable.into());
        }
        Ok(())
    }

    // ── Outputs ───────────────────────────────────────────────

    fn apply_outputs<H: LaserHardware>(&mut self, hw: &mut H, sink: &mut impl EventSink) {
        match self.ctx.take_action() {
            None => {}
            Some(OutputAction::Lock) => self.lock(hw, sink),
            Some(OutputAction::Energize) => {
                if let Err(e) = self.energize(hw) {
                    error!("energise failed: {e}");
                    sink.emit(&AppEvent::OutputFault(e));
                    self.fail_safe(hw, sink);
                }
            }
        }
    }

    fn lock<H: LaserHardware>(&mut self, hw: &mut H, sink: &mut impl EventSink) {
        self.pulse.cancel();
        if let Err(e) = self.interlock.lock(hw, &mut self.pwm) {
            sink.emit(&AppEvent::OutputFault(e));
        }
    }

    /// Unlock, bring up 405 and nitrogen, enable power, then the 445 stage.
    fn energize<H: LaserHardware>(&mut self, hw: &mut H) -> Result<()> {
        self.interlock.unlock(hw)?;
        self.pwm.engage(hw, LaserChannel::Laser405)?;
        self.refresh_nitrogen_duty(hw)?;
        self.pwm.engage(hw, LaserChannel::Nitrogen)?;
        self.interlock.enable_power(hw)?;
        match self.config.drive_445 {
            Drive445::Pwm => self.pwm.engage(hw, LaserChannel::Laser445),
            Drive445::OneShot => self.start_one_shot(hw),
        }
    }

    fn start_one_shot<H: LaserHardware>(&mut self, hw: &mut H) -> Result<()> {
        let shot = self.config.one_shot_445;
        if shot.count == FULL_OUTPUT_SENTINEL {
            return self.pwm.force_high(hw, LaserChannel::Laser445);
        }
        self.pulse.arm::<H>(shot.width_cycles)?;
        self.pulse.start_train(hw, shot.count, shot.delay_ms)
    }

    /// Nitrogen duty from the configured pulse width and current frequency.
    fn refresh_nitrogen_duty<H: LaserHardware>(&mut self, hw: &mut H) -> Result<()> {
        let cfg = self.pwm.config(LaserChannel::Nitrogen);
        let duty = nitrogen_duty(
            self.config.nitrogen.pulse_width_us,
            cfg.frequency_hz,
            cfg.max_duty(),
        )?;
        self.pwm.set_duty(hw, LaserChannel::Nitrogen, duty)
    }

    /// Lock and force `Off` after an output failure.
    fn fail_safe<H: LaserHardware>(&mut self, hw: &mut H, sink: &mut impl EventSink) {
        let from = self.fsm.current_state();
        self.fsm.enter(StateId::Off, &mut self.ctx);
        self.decoder.force_mode(Mode::Off);
        sink.emit(&AppEvent::ModeChanged {
            from,
            to: StateId::Off,
        });
        if self.ctx.take_action() == Some(OutputAction::Lock) {
            self.lock(hw, sink);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn lasers_on(&self) -> bool {
        self.ctx.lasers_on
    }

    pub fn channel(&self, channel: LaserChannel) -> &ChannelConfig {
        self.pwm.config(channel)
    }

    pub fn output(&self, channel: LaserChannel) -> OutputState {
        self.pwm.output(channel)
    }

    pub fn interlock_state(&self) -> InterlockState {
        self.interlock.state()
    }

    /// Last mode byte the decoder accepted.
    pub fn decoder_mode(&self) -> Option<Mode> {
        self.decoder.mode()
    }

    pub fn continuous_measurement(&self) -> bool {
        self.decoder.continuous_measurement()
    }

    pub fn allowed_silence_ms(&self) -> u64 {
        self.ctx.watchdog.allowed_silence_ms()
    }

    pub fn led_colour(&self) -> LedColour {
        self.led
    }

    pub fn one_shot(&self) -> &OneShotConfig {
        &self.config.one_shot_445
    }

    pub fn pulse(&self) -> &OneShotPulse {
        &self.pulse
    }

    pub fn drive_445(&self) -> Drive445 {
        self.config.drive_445
    }
}

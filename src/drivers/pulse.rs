//! Calibrated pulse generation.
//!
//! Two strategies:
//!
//! - **Nitrogen trigger**: a PWM channel at fixed resolution whose duty is
//!   the pulse width as a fraction of the nominal period.  Open loop; the
//!   timer free-runs once written.
//! - **445 nm one-shot**: an 8-bit counter armed with a width in cycles and
//!   fired once per pulse, with a gap between pulses.  Driven by
//!   [`OneShotPulse::poll`] from the main loop instead of busy-waiting, so
//!   serial input and the watchdog keep running during a pulse train.

use log::{debug, warn};

use crate::app::ports::OneShotCounter;
use crate::error::PulseError;

const MICROS_PER_SEC: u32 = 1_000_000;

/// Duty value for a `width_us` pulse repeating at `frequency_hz`:
/// `width * max_duty / (1_000_000 / frequency)`.
pub fn nitrogen_duty(width_us: u32, frequency_hz: u32, max_duty: u16) -> Result<u16, PulseError> {
    if frequency_hz == 0 {
        return Err(PulseError::ZeroFrequency);
    }
    let period_us = MICROS_PER_SEC / frequency_hz;
    if period_us == 0 {
        return Err(PulseError::PeriodTooShort);
    }
    let duty = u64::from(width_us) * u64::from(max_duty) / u64::from(period_us);
    match duty {
        0 => Err(PulseError::DutyUnderflow),
        d if d > u64::from(max_duty) => Err(PulseError::DutyOverflow),
        // Bounded by `max_duty` above.
        d => Ok(d as u16),
    }
}

/// Counter start value for a pulse of `width` cycles: `max - (width - 1)`.
///
/// The counter output is high from the start value through `max`, so the
/// width is `max - start + 1`.  Width 0 has no register value.
pub fn one_shot_register(width: u8, max: u8) -> Result<u8, PulseError> {
    let span = width.checked_sub(1).ok_or(PulseError::ZeroWidth)?;
    max.checked_sub(span).ok_or(PulseError::DutyOverflow)
}

// ---------------------------------------------------------------------------
// One-shot pulse train
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulsePhase {
    Idle,
    /// A pulse is on the pin.
    Firing,
    /// Between pulses, until `resume_at_ms`.
    Waiting { resume_at_ms: u64 },
}

/// Non-blocking one-shot pulse train.
///
/// `arm` computes the register value once; `start_train` fires the first
/// pulse; each `poll` advances at most one phase.
#[derive(Debug)]
pub struct OneShotPulse {
    register: Option<u8>,
    phase: PulsePhase,
    delay_ms: u32,
    /// Pulses left including the one in flight; `None` repeats forever.
    remaining: Option<u16>,
    fired: u32,
}

impl Default for OneShotPulse {
    fn default() -> Self {
        Self::new()
    }
}

impl OneShotPulse {
    pub fn new() -> Self {
        Self {
            register: None,
            phase: PulsePhase::Idle,
            delay_ms: 0,
            remaining: None,
            fired: 0,
        }
    }

    /// Compute and remember the start register for `width_cycles`.
    pub fn arm<C: OneShotCounter>(&mut self, width_cycles: u8) -> Result<u8, PulseError> {
        let register = one_shot_register(width_cycles, C::MAX)?;
        self.register = Some(register);
        debug!("one-shot: armed width={width_cycles} register={register}");
        Ok(register)
    }

    pub fn register(&self) -> Option<u8> {
        self.register
    }

    pub fn phase(&self) -> PulsePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase != PulsePhase::Idle
    }

    /// Pulses fired since the last `start_train`.
    pub fn fired(&self) -> u32 {
        self.fired
    }

    /// Fire `count` pulses `delay_ms` apart (`count == 0` repeats until
    /// cancelled).  The first pulse fires immediately.
    pub fn start_train(
        &mut self,
        counter: &mut impl OneShotCounter,
        count: u16,
        delay_ms: u32,
    ) -> Result<(), crate::error::Error> {
        if self.register.is_none() {
            return Err(PulseError::NotArmed.into());
        }
        self.delay_ms = delay_ms;
        self.remaining = (count != 0).then_some(count);
        self.fired = 0;
        self.fire(counter)
    }

    /// Advance the train.  Cheap when idle.
    pub fn poll(&mut self, counter: &mut impl OneShotCounter, now_ms: u64) -> Result<(), crate::error::Error> {
        match self.phase {
            PulsePhase::Idle => Ok(()),
            PulsePhase::Firing => {
                if !counter.finished() {
                    return Ok(());
                }
                if let Some(left) = self.remaining.as_mut() {
                    *left = left.saturating_sub(1);
                    if *left == 0 {
                        debug!("one-shot: train done after {} pulses", self.fired);
                        self.phase = PulsePhase::Idle;
                        return Ok(());
                    }
                }
                self.phase = PulsePhase::Waiting {
                    resume_at_ms: now_ms.saturating_add(u64::from(self.delay_ms)),
                };
                Ok(())
            }
            PulsePhase::Waiting { resume_at_ms } if now_ms >= resume_at_ms => self.fire(counter),
            PulsePhase::Waiting { .. } => Ok(()),
        }
    }

    /// Stop after the pulse in flight.  The counter itself is left to run
    /// out; the caller locks the pin.
    pub fn cancel(&mut self) {
        if self.is_running() {
            debug!("one-shot: train cancelled after {} pulses", self.fired);
        }
        self.phase = PulsePhase::Idle;
        self.remaining = None;
    }

    fn fire(&mut self, counter: &mut impl OneShotCounter) -> Result<(), crate::error::Error> {
        let Some(register) = self.register else {
            return Err(PulseError::NotArmed.into());
        };
        let result = counter.load(register).and_then(|()| counter.trigger());
        if let Err(e) = result {
            warn!("one-shot: fire failed: {e}");
            self.phase = PulsePhase::Idle;
            return Err(e.into());
        }
        self.fired = self.fired.saturating_add(1);
        self.phase = PulsePhase::Firing;
        Ok(())
    }
}

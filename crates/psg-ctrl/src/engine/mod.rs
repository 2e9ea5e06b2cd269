//! Per-tick sub-engines driven by `Slot::control_psg`.
//!
//! Each engine owns its own small state machine and writes into the slot's
//! register image through the channel it belongs to. Writes made while the
//! channel is muted are quiet (no dirty bit).

pub mod envelope;
pub mod lfo;
pub mod noise_sweep;
pub mod pitch_bend;

pub use envelope::{EnvelopePhase, SoftEnvelope};
pub use lfo::{Lfo, LfoPhase};
pub use noise_sweep::NoiseSweep;
pub use pitch_bend::PitchBend;

use crate::fixed::{note_on_time_q12, rescale_ticks};

/// Timing inputs shared by engines whose durations depend on tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickClock {
    /// Tick rate in Hz.
    pub proc_freq: u16,
    /// Channel tempo (quarter notes per minute).
    pub tempo: u16,
    /// Slot speed factor in percent.
    pub speed: u16,
}

impl TickClock {
    /// Duration of an n-th note in Q12 ticks.
    #[inline]
    pub fn note_q12(&self, len: u16, dots: u8) -> u32 {
        note_on_time_q12(len, self.tempo, dots, self.proc_freq, self.speed)
    }
}

/// Direction of a [`Ramp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RampPhase {
    /// Not started, or started with zero duration or no distance.
    #[default]
    Stop,
    /// Value increasing toward the target.
    Up,
    /// Value decreasing toward the target.
    Down,
    /// Target reached or time ran out.
    End,
}

/// Linear Q6 ramp that reaches its target in a fixed number of ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ramp {
    phase: RampPhase,
    value_q6: u32,
    target: u16,
    delta_q6: u32,
    remaining: u16,
}

impl Ramp {
    /// Begin ramping from `from` to `to` over `ticks` ticks.
    pub fn start(&mut self, from: u16, to: u16, ticks: u16) {
        self.value_q6 = (from as u32) << 6;
        self.target = to;
        self.remaining = ticks;
        if ticks == 0 {
            self.phase = RampPhase::Stop;
            self.delta_q6 = 0;
            return;
        }

        self.phase = match from.cmp(&to) {
            std::cmp::Ordering::Less => RampPhase::Up,
            std::cmp::Ordering::Greater => RampPhase::Down,
            std::cmp::Ordering::Equal => RampPhase::Stop,
        };
        self.delta_q6 = self.distance_q6() / ticks as u32;
    }

    /// Halt without reaching the target.
    pub fn stop(&mut self) {
        self.phase = RampPhase::Stop;
        self.remaining = 0;
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> RampPhase {
        self.phase
    }

    /// Ticks left before the ramp times out.
    #[inline]
    pub fn remaining(&self) -> u16 {
        self.remaining
    }

    /// Current integer value.
    #[inline]
    pub fn value(&self) -> u16 {
        (self.value_q6 >> 6) as u16
    }

    fn distance_q6(&self) -> u32 {
        self.value_q6.abs_diff((self.target as u32) << 6)
    }

    /// Advance one tick. Returns the new value while the ramp is moving.
    ///
    /// The tick that uses up the remaining time lands exactly on the target.
    pub fn tick(&mut self) -> Option<u16> {
        if self.remaining > 0 {
            self.remaining -= 1;
        } else if self.phase != RampPhase::Stop {
            self.phase = RampPhase::End;
        }

        let target_q6 = (self.target as u32) << 6;
        match self.phase {
            RampPhase::Stop | RampPhase::End => return None,
            RampPhase::Up => {
                if self.remaining == 0 || target_q6 - self.value_q6 <= self.delta_q6 {
                    self.value_q6 = target_q6;
                    self.phase = RampPhase::End;
                } else {
                    self.value_q6 += self.delta_q6;
                }
            }
            RampPhase::Down => {
                if self.remaining == 0 || self.value_q6 - target_q6 <= self.delta_q6 {
                    self.value_q6 = target_q6;
                    self.phase = RampPhase::End;
                } else {
                    self.value_q6 -= self.delta_q6;
                }
            }
        }
        Some(self.value())
    }

    /// Stretch the remaining time by a Q12 ratio and re-derive the step so
    /// the target is still reached when the time runs out.
    pub fn rescale(&mut self, ratio_q12: u32) {
        if !matches!(self.phase, RampPhase::Up | RampPhase::Down) {
            return;
        }
        self.remaining = rescale_ticks(self.remaining, ratio_q12);
        if self.remaining > 0 {
            self.delta_q6 = self.distance_q6() / self.remaining as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_reaches_target_on_last_tick() {
        let mut ramp = Ramp::default();
        ramp.start(100, 110, 4);
        assert_eq!(ramp.phase(), RampPhase::Up);
        let values: Vec<_> = std::iter::from_fn(|| ramp.tick()).collect();
        assert_eq!(values.last(), Some(&110));
        assert_eq!(values.len(), 4);
        assert_eq!(ramp.phase(), RampPhase::End);
    }

    #[test]
    fn test_ramp_down() {
        let mut ramp = Ramp::default();
        ramp.start(300, 200, 10);
        assert_eq!(ramp.phase(), RampPhase::Down);
        assert_eq!(ramp.tick(), Some(290));
        for _ in 0..9 {
            ramp.tick();
        }
        assert_eq!(ramp.value(), 200);
        assert_eq!(ramp.tick(), None);
    }

    #[test]
    fn test_ramp_zero_ticks_or_distance_stops() {
        let mut ramp = Ramp::default();
        ramp.start(100, 200, 0);
        assert_eq!(ramp.phase(), RampPhase::Stop);
        assert_eq!(ramp.tick(), None);

        ramp.start(100, 100, 5);
        assert_eq!(ramp.phase(), RampPhase::Stop);
        assert_eq!(ramp.tick(), None);
    }

    #[test]
    fn test_ramp_rescale_keeps_target() {
        let mut ramp = Ramp::default();
        ramp.start(0, 64, 8);
        ramp.tick();
        ramp.rescale(1 << 13); // twice as long
        assert_eq!(ramp.remaining(), 14);
        let mut last = 0;
        while let Some(v) = ramp.tick() {
            last = v;
        }
        assert_eq!(last, 64);
    }
}

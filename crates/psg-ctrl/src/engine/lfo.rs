//! Triangle-wave pitch LFO (vibrato).
//!
//! The phase counter `theta` runs over `4 * depth` steps per cycle. Each step
//! multiplies the tone period by one degree (2^(±1/360)): the middle half of
//! the cycle shortens the period, the outer quarters lengthen it, so the
//! pitch swings `depth` degrees around the note. When a cycle completes and no
//! pitch bend is active, the period snaps back to the note's base period to
//! cancel accumulated rounding.

use super::TickClock;
use crate::constants::{MAX_TONE_PERIOD, Q_PITCHBEND_FACTOR, Q_PITCHBEND_FACTOR_N};
use crate::fixed::rescale_ticks;
use crate::registers::RegisterImage;

/// Cycle length unit for `speed == 0.1 Hz`.
const LFO_PERIOD_UNITS: u64 = 10;

/// LFO run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoPhase {
    /// Disabled or no note yet.
    #[default]
    Stop,
    /// Running (possibly still in its delay).
    Run,
}

/// Per-channel LFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lfo {
    /// `$M1` turns the LFO on.
    pub enabled: bool,
    /// `$L` speed; negative inverts the phase.
    pub speed: i16,
    /// `$J` depth in degrees.
    pub depth: u8,
    /// `$T` delay as a note length (0 = none).
    pub delay_len: u8,
    /// Dots of the delay length.
    pub delay_dots: u8,
    /// `$V` speed unit: 0 = speed in 0.1 Hz, n = cycle of `|speed|` n-th notes.
    pub speed_unit: u16,
    phase: LfoPhase,
    delay: u16,
    theta: u16,
    tp_frac: u8,
    delta_frac: u8,
    base_tp: u16,
    omega_q6: u32,
}

impl Default for Lfo {
    fn default() -> Self {
        Lfo {
            enabled: false,
            speed: crate::constants::DEFAULT_LFO_SPEED as i16,
            depth: 0,
            delay_len: 0,
            delay_dots: 0,
            speed_unit: 0,
            phase: LfoPhase::Stop,
            delay: 0,
            theta: 0,
            tp_frac: 0,
            delta_frac: 0,
            base_tp: 0,
            omega_q6: 0,
        }
    }
}

impl Lfo {
    /// Current run state.
    #[inline]
    pub fn phase(&self) -> LfoPhase {
        self.phase
    }

    /// Ticks left before modulation starts.
    #[inline]
    pub fn delay(&self) -> u16 {
        self.delay
    }

    /// Phase steps per tick in Q6.
    pub fn omega_q6(&self, clock: &TickClock) -> u32 {
        let speed = self.speed.unsigned_abs() as u64;
        let steps = self.depth as u64 * 4;
        if speed == 0 || steps == 0 {
            return 0;
        }

        let omega = if self.speed_unit == 0 {
            (steps * speed << 6) / (clock.proc_freq.max(1) as u64 * LFO_PERIOD_UNITS)
        } else {
            let cycle_q12 = speed * clock.note_q12(self.speed_unit, 0) as u64;
            if cycle_q12 == 0 {
                return 0;
            }
            (steps << 18) / cycle_q12
        };
        omega.min(u32::MAX as u64) as u32
    }

    /// Arm the LFO for a new note with tone period `tp`. A legato note keeps
    /// the running phase and base period.
    pub fn note_on(&mut self, tp: u16, legato: bool, clock: &TickClock) {
        if !self.enabled {
            self.phase = LfoPhase::Stop;
            return;
        }

        self.phase = LfoPhase::Run;
        if !legato {
            self.delay = (clock.note_q12(self.delay_len as u16, self.delay_dots) >> 12)
                .min(u16::MAX as u32) as u16;
            self.theta = 0;
            self.tp_frac = 0;
            self.delta_frac = 0;
            self.base_tp = tp;
        }
        self.omega_q6 = self.omega_q6(clock);
    }

    /// Stop modulating.
    pub fn stop(&mut self) {
        self.phase = LfoPhase::Stop;
    }

    /// Advance one tick, modulating the tone period of `ch`.
    ///
    /// `bend_stopped` allows the end-of-cycle snap back to the base period.
    pub fn tick(&mut self, ch: usize, regs: &mut RegisterImage, bend_stopped: bool) {
        if self.phase != LfoPhase::Run {
            return;
        }
        if self.delay > 0 {
            self.delay -= 1;
            return;
        }

        let mut delta_q6 = self.delta_frac as u32 + self.omega_q6;
        let steps = delta_q6 >> 6;
        if steps == 0 {
            self.delta_frac = (delta_q6 & 0x3F) as u8;
            return;
        }
        // Whole cycles return to the same phase; run at most one of them
        let cycle = (self.depth as u32 * 4).max(1);
        let steps = (steps - 1) % cycle + 1;

        let depth = self.depth as u16;
        let inverted = self.speed < 0;
        let (shorten, lengthen) = if inverted {
            (Q_PITCHBEND_FACTOR, Q_PITCHBEND_FACTOR_N)
        } else {
            (Q_PITCHBEND_FACTOR_N, Q_PITCHBEND_FACTOR)
        };

        let mut tp = regs.tone_period(ch) as u64;
        let mut theta = self.theta;
        for _ in 0..steps {
            let mut q24 = ((tp << 6) | self.tp_frac as u64) << 18;
            if depth <= theta && theta < depth * 3 {
                q24 = (q24 * shorten) >> 24;
            } else if theta == 0 && bend_stopped {
                q24 = (self.base_tp as u64) << 24;
                delta_q6 = 0;
            } else {
                q24 = (q24 * lengthen) >> 24;
            }

            self.tp_frac = ((q24 >> 18) & 0x3F) as u8;
            tp = (q24 >> 24).min(MAX_TONE_PERIOD as u64);

            theta += 1;
            if theta >= depth * 4 {
                theta = 0;
            }
        }

        self.theta = theta;
        self.delta_frac = (delta_q6 & 0x3F) as u8;
        let audible = !regs.is_muted(ch);
        regs.set_tone_period(ch, tp as u16, audible);
    }

    /// Apply a speed change: stretch the delay and re-derive the rate.
    pub fn rescale(&mut self, ratio_q12: u32, clock: &TickClock) {
        self.delay = rescale_ticks(self.delay, ratio_q12);
        self.omega_q6 = self.omega_q6(clock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOCK: TickClock = TickClock {
        proc_freq: 100,
        tempo: 120,
        speed: 100,
    };

    fn running_lfo(depth: u8, speed: i16) -> (Lfo, RegisterImage) {
        let mut regs = RegisterImage::new();
        regs.set_channel_mixer(0, 0x08);
        regs.set_tone_period(0, 1000, true);
        regs.acknowledge();
        let mut lfo = Lfo {
            enabled: true,
            depth,
            speed,
            ..Lfo::default()
        };
        lfo.note_on(1000, false, &CLOCK);
        (lfo, regs)
    }

    #[test]
    fn test_omega() {
        let lfo = Lfo {
            depth: 10,
            speed: 40,
            ..Lfo::default()
        };
        // 40 steps per cycle at 4 Hz over 100 ticks/s = 1.6 steps per tick
        assert_eq!(lfo.omega_q6(&CLOCK), 102);

        let by_note = Lfo {
            speed_unit: 4,
            speed: 2,
            ..lfo
        };
        // One cycle per two quarter notes (100 ticks): 0.4 steps per tick
        assert_eq!(by_note.omega_q6(&CLOCK), 25);
    }

    #[test]
    fn test_disabled_stays_stopped() {
        let mut lfo = Lfo::default();
        lfo.note_on(500, false, &CLOCK);
        assert_eq!(lfo.phase(), LfoPhase::Stop);
    }

    #[test]
    fn test_first_quarter_lowers_pitch() {
        let (mut lfo, mut regs) = running_lfo(20, 100);
        lfo.tick(0, &mut regs, true);
        assert!(regs.tone_period(0) > 1000);
    }

    #[test]
    fn test_inverted_speed_raises_pitch_first() {
        let (mut lfo, mut regs) = running_lfo(20, -100);
        lfo.tick(0, &mut regs, true);
        lfo.tick(0, &mut regs, true);
        assert!(regs.tone_period(0) < 1000);
    }

    #[test]
    fn test_cycle_snaps_to_base() {
        let (mut lfo, mut regs) = running_lfo(4, 50);
        // 16 steps per cycle, under one step per tick
        let mut snapped = 0;
        for _ in 0..200 {
            lfo.tick(0, &mut regs, true);
            if lfo.theta == 1 {
                snapped += 1;
                assert_eq!(regs.tone_period(0), 1000);
            }
        }
        assert!(snapped >= 2);
    }

    #[test]
    fn test_no_snap_while_bending() {
        let (mut lfo, mut regs) = running_lfo(4, 50);
        regs.set_tone_period(0, 1200, true);
        for _ in 0..3 {
            lfo.tick(0, &mut regs, false);
        }
        assert!(regs.tone_period(0) >= 1200);
    }

    #[test]
    fn test_fast_lfo_runs_at_most_one_cycle_per_tick() {
        let (mut lfo, mut regs) = running_lfo(255, 200);
        lfo.omega_q6 = u32::MAX >> 1;
        for _ in 0..50 {
            lfo.tick(0, &mut regs, true);
            assert!(lfo.theta < 255 * 4);
            let tp = regs.tone_period(0);
            // One full swing is a depth of 255 degrees around the base
            assert!((500..=2000).contains(&tp), "tp = {tp}");
        }
    }

    #[test]
    fn test_delay_holds_modulation() {
        let (mut lfo, mut regs) = running_lfo(20, 100);
        lfo.delay_len = 8;
        lfo.note_on(1000, false, &CLOCK);
        assert_eq!(lfo.delay(), 25);
        for _ in 0..25 {
            lfo.tick(0, &mut regs, true);
        }
        assert_eq!(regs.tone_period(0), 1000);
        lfo.tick(0, &mut regs, true);
        assert_ne!(regs.tone_period(0), 1000);
    }
}

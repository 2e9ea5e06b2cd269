//! Software volume envelope.
//!
//! ```text
//! note on ─► attack ─► hold ─► decay ─► fade (toward 0 at the fade rate)
//!                                  │
//! gate off (release set) ─► release ─► end (channel muted)
//! ```
//!
//! Phases with a zero duration are skipped. Durations are kept as written in
//! the MML (milliseconds, or n-th notes when a time unit is set) and resolved
//! to ticks when a phase begins, so tempo and speed changes apply to the next
//! phase. Levels are Q12 fractions of the 4-bit volume.

use super::TickClock;
use crate::constants::MAX_VOLUME;
use crate::fixed::{ms_to_ticks, rescale_ticks};
use crate::registers::RegisterImage;

/// Envelope state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopePhase {
    /// A note just started; resolves on the next transition.
    #[default]
    InitNoteOn,
    /// Rising from 0 to the channel volume.
    Attack,
    /// Holding the channel volume.
    Hold,
    /// Falling to the sustain level.
    Decay,
    /// Falling from the sustain level toward 0 (or holding it without a fade time).
    Fade,
    /// The gate closed; resolves on the next transition.
    InitNoteOff,
    /// Falling from the level at gate-off to 0.
    Release,
    /// Release finished; the channel is silent.
    End,
}

/// Per-channel software envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftEnvelope {
    /// `$E1` turns the envelope on.
    pub enabled: bool,
    /// `$A` attack time.
    pub attack: u16,
    /// `$H` hold time.
    pub hold: u16,
    /// `$D` decay time.
    pub decay: u16,
    /// `$F` fade time.
    pub fade: u16,
    /// `$R` release time.
    pub release: u16,
    /// `$S` sustain level, percent of the channel volume.
    pub sustain: u16,
    /// `$U` time unit: 0 = milliseconds, n = n-th notes.
    pub time_unit: u16,
    phase: EnvelopePhase,
    timer: u16,
    phase_ticks: u16,
    level_q12: u32,
    release_from_q12: u32,
}

impl Default for SoftEnvelope {
    fn default() -> Self {
        SoftEnvelope {
            enabled: false,
            attack: 0,
            hold: 0,
            decay: 0,
            fade: 0,
            release: 0,
            sustain: crate::constants::DEFAULT_SOFT_ENVELOPE_SUSTAIN as u16,
            time_unit: 0,
            phase: EnvelopePhase::InitNoteOn,
            timer: 0,
            phase_ticks: 0,
            level_q12: 0,
            release_from_q12: 0,
        }
    }
}

/// Sustain level for a channel volume, capped at 15.
pub fn sustain_volume(sustain: u16, volume: u8) -> u8 {
    ((sustain as u32 * volume as u32 + 50) / 100).min(MAX_VOLUME as u32) as u8
}

impl SoftEnvelope {
    /// Current phase.
    #[inline]
    pub fn phase(&self) -> EnvelopePhase {
        self.phase
    }

    /// Current 4-bit level.
    #[inline]
    pub fn level(&self) -> u8 {
        ((self.level_q12 >> 12) & 0x0F) as u8
    }

    /// Ticks left in the current phase.
    #[inline]
    pub fn timer(&self) -> u16 {
        self.timer
    }

    fn ticks(&self, time: u16, clock: &TickClock) -> u16 {
        if time == 0 {
            return 0;
        }
        let ticks = if self.time_unit == 0 {
            ms_to_ticks(time as u32, clock.proc_freq) as u64 * 100 / clock.speed.max(1) as u64
        } else {
            (time as u64 * clock.note_q12(self.time_unit, 0) as u64) >> 12
        };
        ticks.min(u16::MAX as u64) as u16
    }

    fn enter(&mut self, phase: EnvelopePhase, ticks: u16) {
        self.phase = phase;
        self.timer = ticks;
        self.phase_ticks = ticks;
    }

    /// Restart from the top for a new (non-legato) note.
    pub fn note_on(&mut self, volume: u8, clock: &TickClock) {
        self.phase = EnvelopePhase::InitNoteOn;
        self.timer = 0;
        self.transition(volume, clock);
    }

    /// The note's gate closed. Returns `true` while the channel should keep
    /// sounding because a release is in progress.
    pub fn note_off(&mut self, volume: u8, clock: &TickClock) -> bool {
        match self.phase {
            EnvelopePhase::InitNoteOff | EnvelopePhase::Release => true,
            EnvelopePhase::End => false,
            _ if self.enabled && self.release != 0 => {
                self.phase = EnvelopePhase::InitNoteOff;
                self.timer = 0;
                self.transition(volume, clock);
                self.phase != EnvelopePhase::End
            }
            _ => false,
        }
    }

    fn transition(&mut self, volume: u8, clock: &TickClock) {
        if self.timer != 0 {
            return;
        }

        let top = (volume as u32) << 12;
        let mut phase = self.phase;
        loop {
            match phase {
                EnvelopePhase::InitNoteOn => {
                    let ticks = self.ticks(self.attack, clock);
                    if ticks != 0 {
                        self.level_q12 = 0;
                        self.enter(EnvelopePhase::Attack, ticks);
                        return;
                    }
                    phase = EnvelopePhase::Attack;
                }
                EnvelopePhase::Attack => {
                    let ticks = self.ticks(self.hold, clock);
                    if ticks != 0 {
                        self.level_q12 = top;
                        self.enter(EnvelopePhase::Hold, ticks);
                        return;
                    }
                    phase = EnvelopePhase::Hold;
                }
                EnvelopePhase::Hold => {
                    let ticks = self.ticks(self.decay, clock);
                    if ticks != 0 {
                        self.level_q12 = top;
                        self.enter(EnvelopePhase::Decay, ticks);
                        return;
                    }
                    phase = EnvelopePhase::Decay;
                }
                EnvelopePhase::Decay => {
                    self.level_q12 = (sustain_volume(self.sustain, volume) as u32) << 12;
                    let ticks = self.ticks(self.fade, clock);
                    self.enter(EnvelopePhase::Fade, ticks);
                    return;
                }
                EnvelopePhase::InitNoteOff => {
                    let ticks = self.ticks(self.release, clock);
                    if ticks != 0 {
                        self.release_from_q12 = self.level_q12;
                        self.enter(EnvelopePhase::Release, ticks);
                    } else {
                        self.level_q12 = 0;
                        self.enter(EnvelopePhase::End, 0);
                    }
                    return;
                }
                EnvelopePhase::Release => {
                    self.level_q12 = 0;
                    self.enter(EnvelopePhase::End, 0);
                    return;
                }
                EnvelopePhase::Fade | EnvelopePhase::End => return,
            }
        }
    }

    fn update_level(&mut self, volume: u8) {
        let top = (volume as i32) << 12;
        let sus = (sustain_volume(self.sustain, volume) as i32) << 12;
        let level = self.level_q12 as i32;
        let len = self.phase_ticks.max(1) as i32;

        let level = match self.phase {
            EnvelopePhase::Attack => {
                let rate = top / len;
                if rate == 0 || top - level <= rate {
                    top
                } else {
                    level + rate
                }
            }
            EnvelopePhase::Hold => top,
            EnvelopePhase::Decay => {
                let rate = (top - sus) / len;
                if rate > 0 {
                    if level - sus <= rate {
                        sus
                    } else {
                        level - rate
                    }
                } else if rate < 0 {
                    if level - sus >= rate {
                        sus
                    } else {
                        level - rate
                    }
                } else {
                    sus
                }
            }
            EnvelopePhase::Fade => {
                let rate = if self.phase_ticks != 0 { sus / len } else { 0 };
                if rate == 0 {
                    sus
                } else if level <= rate {
                    0
                } else {
                    level - rate
                }
            }
            EnvelopePhase::Release => {
                let rate = self.release_from_q12 as i32 / len;
                if rate == 0 || level <= rate {
                    0
                } else {
                    level - rate
                }
            }
            EnvelopePhase::End => 0,
            EnvelopePhase::InitNoteOn | EnvelopePhase::InitNoteOff => level,
        };
        self.level_q12 = level.clamp(0, (MAX_VOLUME << 12) | 0x0FFF) as u32;
    }

    /// Advance one tick: publish the level to the volume register of `ch`,
    /// then step the phase machine.
    pub fn tick(&mut self, ch: usize, regs: &mut RegisterImage, volume: u8, clock: &TickClock) {
        if self.timer > 0 {
            self.timer -= 1;
        }

        let level = self.level();
        let addr = crate::registers::Register::volume(ch).addr();
        if regs.read(addr) & 0x0F != level {
            let audible = !regs.is_muted(ch);
            regs.write_if(addr, level, audible);
        }

        self.transition(volume, clock);
        self.update_level(volume);
    }

    /// Apply a speed change to the phase in progress.
    pub fn rescale(&mut self, ratio_q12: u32) {
        self.timer = rescale_ticks(self.timer, ratio_q12);
        self.phase_ticks = rescale_ticks(self.phase_ticks, ratio_q12);
    }
}

//! Pitch bend: a linear tone-period glide over the note's duration.
//!
//! `$P<level>` sets the bend target relative to the note (360 per octave,
//! positive = up). Legato (`&`) uses the same machinery with the next note as
//! target.

use super::{Ramp, RampPhase};
use crate::registers::RegisterImage;

/// Per-channel pitch-bend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PitchBend {
    /// Bend target relative to the note, 1/360 octave.
    pub level: i16,
    ramp: Ramp,
}

impl PitchBend {
    /// Start gliding from `tp` to `end_tp` over `ticks`. Zero ticks or an
    /// equal target leave the bend stopped.
    pub fn start(&mut self, tp: u16, end_tp: u16, ticks: u16) {
        self.ramp.start(tp, end_tp, ticks);
    }

    /// Cancel any glide in progress.
    pub fn stop(&mut self) {
        self.ramp.stop();
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> RampPhase {
        self.ramp.phase()
    }

    /// No bend was started for the current note.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.ramp.phase() == RampPhase::Stop
    }

    /// Advance one tick, writing the tone period of `ch` while gliding.
    pub fn tick(&mut self, ch: usize, regs: &mut RegisterImage) {
        if let Some(tp) = self.ramp.tick() {
            let audible = !regs.is_muted(ch);
            regs.set_tone_period(ch, tp, audible);
        }
    }

    /// Apply a speed change to the glide in progress.
    pub fn rescale(&mut self, ratio_q12: u32) {
        self.ramp.rescale(ratio_q12);
    }
}

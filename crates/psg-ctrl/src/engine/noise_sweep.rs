//! Noise-period sweep started by `J<np>~<np_end>`.
//!
//! The noise generator is shared by all channels of a slot, so there is one
//! sweep per slot. It belongs to the channel that started it and only raises
//! the dirty bit while that channel is audible.

use super::{Ramp, RampPhase};
use crate::constants::MAX_NOISE_PERIOD;
use crate::registers::{Register, RegisterImage};

/// Slot-wide noise sweep state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoiseSweep {
    owner: usize,
    ramp: Ramp,
}

impl NoiseSweep {
    /// Start sweeping from `from` to `to` over `ticks`, owned by channel `owner`.
    pub fn start(&mut self, owner: usize, from: u8, to: u8, ticks: u16) {
        self.owner = owner;
        self.ramp.start(from as u16, to as u16, ticks);
    }

    /// Cancel the sweep.
    pub fn stop(&mut self) {
        self.ramp.stop();
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> RampPhase {
        self.ramp.phase()
    }

    /// Channel that started the sweep.
    #[inline]
    pub fn owner(&self) -> usize {
        self.owner
    }

    /// Advance one tick, updating register 6 while sweeping.
    pub fn tick(&mut self, regs: &mut RegisterImage) {
        if let Some(np) = self.ramp.tick() {
            let np = np.min(MAX_NOISE_PERIOD as u16) as u8;
            let audible = !regs.is_muted(self.owner);
            regs.write_if(Register::NoisePeriod.addr(), np, audible);
        }
    }

    /// Apply a speed change to the sweep in progress.
    pub fn rescale(&mut self, ratio_q12: u32) {
        self.ramp.rescale(ratio_q12);
    }
}

//! Register merge for a main slot with a sound-effect overlay.
//!
//! Both slots sequence into their own [`RegisterImage`]. Each tick the mixer
//! decides, per address, which slot drives the chip and emits only what the
//! chip does not already hold.

use crate::constants::{MIXER_CHANNEL_MASK, NUM_CHANNEL, NUM_REGISTER};
use crate::registers::{MixerFlags, Register, RegisterImage, RegisterMask};

/// Which slot drives which registers during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ownership {
    /// Addresses taken from the overlay image.
    pub registers: RegisterMask,
    /// Register 7 bits taken from the overlay image.
    pub mixer: u8,
    /// Register 7 bits forced to "disabled" for main channels whose hardware
    /// envelope the overlay took over.
    pub muted: u8,
}

impl Ownership {
    /// Work out ownership from the two images.
    ///
    /// # Arguments
    /// * `main` - Main slot image
    /// * `overlay` - Overlay slot image
    /// * `overlay_playing` - The overlay slot is in the playing state
    pub fn resolve(main: &RegisterImage, overlay: &RegisterImage, overlay_playing: bool) -> Self {
        let mut own = Ownership::default();
        if !overlay_playing {
            return own;
        }

        let mut uses_noise = false;
        let mut uses_envelope = false;
        for ch in 0..NUM_CHANNEL {
            if overlay.is_muted(ch) {
                continue;
            }
            own.registers |= RegisterMask::tone(ch) | RegisterMask::volume(ch);
            own.mixer |= MIXER_CHANNEL_MASK << ch;
            if overlay.volume(ch) & 0x10 != 0 {
                uses_envelope = true;
            }
            if !overlay.mixer().contains(MixerFlags::noise(ch)) {
                uses_noise = true;
            }
        }

        if uses_noise {
            own.registers |= RegisterMask::NOISE;
            let addr = Register::NoisePeriod.addr();
            if main.read(addr) != overlay.read(addr) {
                own.mixer |= MixerFlags::all_noise().bits();
            }
        }

        if uses_envelope {
            own.registers |= RegisterMask::ENVELOPE_PERIOD | RegisterMask::ENVELOPE_SHAPE;
            let differs = [
                Register::EnvelopePeriodLo,
                Register::EnvelopePeriodHi,
                Register::EnvelopeShape,
            ]
            .iter()
            .any(|reg| main.read(reg.addr()) != overlay.read(reg.addr()));
            if differs {
                for ch in 0..NUM_CHANNEL {
                    let driven = own.mixer & (MIXER_CHANNEL_MASK << ch) == MIXER_CHANNEL_MASK << ch;
                    if !driven && main.volume(ch) & 0x10 != 0 {
                        own.muted |= MIXER_CHANNEL_MASK << ch;
                    }
                }
            }
        }

        own
    }

    /// Register 7 as the chip should see it.
    pub fn merge_mixer(&self, main: u8, overlay: u8) -> u8 {
        ((main & !self.mixer) | (overlay & self.mixer)) | self.muted
    }
}

/// Merges two register images into one chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMixer {
    physical: [u8; NUM_REGISTER],
    previous: Ownership,
}

impl SlotMixer {
    /// Mixer for a chip in the reset state.
    pub fn new() -> Self {
        SlotMixer {
            physical: RegisterImage::reset_pattern(),
            previous: Ownership::default(),
        }
    }

    /// Forget ownership and assume the chip holds the reset pattern.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// What the chip currently holds.
    pub fn physical(&self) -> &[u8; NUM_REGISTER] {
        &self.physical
    }

    /// Ownership applied on the last [`SlotMixer::mix`].
    pub fn ownership(&self) -> Ownership {
        self.previous
    }

    /// Emit the merged registers for this tick through `write`, in ascending
    /// address order, and acknowledge both images.
    pub fn mix<F>(
        &mut self,
        main: &mut RegisterImage,
        overlay: &mut RegisterImage,
        overlay_playing: bool,
        mut write: F,
    ) where
        F: FnMut(u8, u8),
    {
        let own = Ownership::resolve(main, overlay, overlay_playing);
        let prev = self.previous;
        let mixer_addr = Register::Mixer.addr();

        for addr in 0..NUM_REGISTER as u8 {
            let (value, dirty, changed) = if addr == mixer_addr {
                let value = own.merge_mixer(main.read(addr), overlay.read(addr));
                let dirty = main.dirty().has_addr(addr)
                    || (own.mixer != 0 && overlay.dirty().has_addr(addr));
                let changed = own.mixer != prev.mixer || own.muted != prev.muted;
                (value, dirty, changed)
            } else {
                let from_overlay = own.registers.has_addr(addr);
                let image: &RegisterImage = if from_overlay { overlay } else { main };
                let changed = from_overlay != prev.registers.has_addr(addr);
                (image.read(addr), image.dirty().has_addr(addr), changed)
            };

            if dirty || (changed && value != self.physical[addr as usize]) {
                write(addr, value);
                self.physical[addr as usize] = value;
            }
        }

        if own != prev {
            log::trace!(
                "overlay ownership: registers {:#06x}, mixer {:#04x}, muted {:#04x}",
                own.registers.bits(),
                own.mixer,
                own.muted
            );
        }
        self.previous = own;
        main.acknowledge();
        overlay.acknowledge();
    }
}

impl Default for SlotMixer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed(
        mixer: &mut SlotMixer,
        main: &mut RegisterImage,
        overlay: &mut RegisterImage,
        playing: bool,
    ) -> Vec<(u8, u8)> {
        let mut out = Vec::new();
        mixer.mix(main, overlay, playing, |addr, data| out.push((addr, data)));
        out
    }

    #[test]
    fn test_idle_overlay_passes_main_through() {
        let mut mixer = SlotMixer::new();
        let mut main = RegisterImage::new();
        let mut overlay = RegisterImage::new();
        main.set_tone_period(0, 0x1C, true);
        main.write(8, 12);
        main.set_channel_mixer(0, 0x08);
        overlay.write(10, 15);

        let out = mixed(&mut mixer, &mut main, &mut overlay, false);
        assert_eq!(out, vec![(0, 0x1C), (7, 0x3E), (8, 12)]);
        assert!(main.dirty().is_empty());
        assert!(overlay.dirty().is_empty());
    }

    #[test]
    fn test_overlay_takes_and_returns_channel() {
        let mut mixer = SlotMixer::new();
        let mut main = RegisterImage::new();
        let mut overlay = RegisterImage::new();
        main.set_tone_period(2, 0x100, true);
        main.write(10, 10);
        main.set_channel_mixer(2, 0x08);
        mixed(&mut mixer, &mut main, &mut overlay, false);

        overlay.set_tone_period(2, 0x080, true);
        overlay.write(10, 14);
        overlay.set_channel_mixer(2, 0x08);
        let out = mixed(&mut mixer, &mut main, &mut overlay, true);
        assert_eq!(out, vec![(4, 0x80), (5, 0x00), (7, 0x3B), (10, 14)]);
        assert_eq!(mixer.ownership().mixer, 0x24);

        // Main keeps sequencing underneath; nothing reaches the chip
        main.write(10, 9);
        assert!(mixed(&mut mixer, &mut main, &mut overlay, true).is_empty());

        let out = mixed(&mut mixer, &mut main, &mut overlay, false);
        assert_eq!(out, vec![(4, 0x00), (5, 0x01), (10, 9)]);
        assert_eq!(mixer.physical()[10], 9);
    }

    #[test]
    fn test_noise_conflict_silences_main_noise() {
        let mut mixer = SlotMixer::new();
        let mut main = RegisterImage::new();
        let mut overlay = RegisterImage::new();
        main.write(6, 5);
        main.set_channel_mixer(0, 0x01);
        mixed(&mut mixer, &mut main, &mut overlay, false);
        assert_eq!(mixer.physical()[7], 0x37);

        overlay.write(6, 20);
        overlay.set_channel_mixer(2, 0x01);
        let out = mixed(&mut mixer, &mut main, &mut overlay, true);
        assert_eq!(out, vec![(6, 20), (7, 0x1F)]);
    }

    #[test]
    fn test_envelope_conflict_mutes_main_envelope_channels() {
        let main = {
            let mut image = RegisterImage::new();
            image.write(8, 0x10);
            image.set_channel_mixer(0, 0x08);
            image.write(13, 8);
            image
        };
        let overlay = {
            let mut image = RegisterImage::new();
            image.write(10, 0x10);
            image.set_channel_mixer(2, 0x08);
            image.write(13, 14);
            image
        };

        let own = Ownership::resolve(&main, &overlay, true);
        assert!(own.registers.contains(RegisterMask::ENVELOPE_SHAPE));
        assert_eq!(own.muted, 0x09);
        assert_eq!(own.merge_mixer(main.read(7), overlay.read(7)), 0x3F & !0x04);
    }

    #[test]
    fn test_forced_write_passes_through() {
        let mut mixer = SlotMixer::new();
        let mut main = RegisterImage::new();
        let mut overlay = RegisterImage::new();
        main.write(13, 8);
        mixed(&mut mixer, &mut main, &mut overlay, false);

        main.touch(13);
        let out = mixed(&mut mixer, &mut main, &mut overlay, false);
        assert_eq!(out, vec![(13, 8)]);
    }
}

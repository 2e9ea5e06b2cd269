//! PSG register image with dirty tracking.
//!
//! A slot never talks to the chip directly. Engines write into a
//! [`RegisterImage`]; once per tick the host drains the addresses whose value
//! differs from what was last handed out, in ascending address order.

use std::fmt;

use bitflags::bitflags;

use crate::constants::{MIXER_ALL_OFF, MIXER_CHANNEL_MASK, NUM_REGISTER};

/// AY-3-8910 / YM2149 register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Channel A tone period, low 8 bits - R0
    ToneALo = 0x00,
    /// Channel A tone period, high 4 bits - R1
    ToneAHi = 0x01,
    /// Channel B tone period, low 8 bits - R2
    ToneBLo = 0x02,
    /// Channel B tone period, high 4 bits - R3
    ToneBHi = 0x03,
    /// Channel C tone period, low 8 bits - R4
    ToneCLo = 0x04,
    /// Channel C tone period, high 4 bits - R5
    ToneCHi = 0x05,
    /// Noise period (5 bits) - R6
    NoisePeriod = 0x06,
    /// Mixer: tone/noise disable bits - R7
    Mixer = 0x07,
    /// Channel A volume, bit 4 selects the hardware envelope - R8
    VolumeA = 0x08,
    /// Channel B volume - R9
    VolumeB = 0x09,
    /// Channel C volume - R10
    VolumeC = 0x0A,
    /// Envelope period, low byte - R11
    EnvelopePeriodLo = 0x0B,
    /// Envelope period, high byte - R12
    EnvelopePeriodHi = 0x0C,
    /// Envelope shape; writing it restarts the envelope - R13
    EnvelopeShape = 0x0D,
    /// I/O port A - R14
    PortA = 0x0E,
    /// I/O port B - R15
    PortB = 0x0F,
}

impl Register {
    /// All registers in address order.
    pub const ALL: [Register; NUM_REGISTER] = [
        Register::ToneALo,
        Register::ToneAHi,
        Register::ToneBLo,
        Register::ToneBHi,
        Register::ToneCLo,
        Register::ToneCHi,
        Register::NoisePeriod,
        Register::Mixer,
        Register::VolumeA,
        Register::VolumeB,
        Register::VolumeC,
        Register::EnvelopePeriodLo,
        Register::EnvelopePeriodHi,
        Register::EnvelopeShape,
        Register::PortA,
        Register::PortB,
    ];

    /// Register for a raw address; only the low 4 bits are decoded.
    pub fn from_addr(addr: u8) -> Self {
        Self::ALL[(addr & 0x0F) as usize]
    }

    /// Low tone-period register of a channel.
    pub fn tone_lo(ch: usize) -> Self {
        Self::from_addr((ch as u8) << 1)
    }

    /// Volume register of a channel.
    pub fn volume(ch: usize) -> Self {
        Self::from_addr(0x08 + ch as u8)
    }

    /// Register address.
    pub fn addr(self) -> u8 {
        self as u8
    }

    /// Single-bit dirty mask of this register.
    pub fn mask(self) -> RegisterMask {
        RegisterMask::from_bits_retain(1 << self.addr())
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::ToneALo => "tone A low",
            Register::ToneAHi => "tone A high",
            Register::ToneBLo => "tone B low",
            Register::ToneBHi => "tone B high",
            Register::ToneCLo => "tone C low",
            Register::ToneCHi => "tone C high",
            Register::NoisePeriod => "noise period",
            Register::Mixer => "mixer",
            Register::VolumeA => "volume A",
            Register::VolumeB => "volume B",
            Register::VolumeC => "volume C",
            Register::EnvelopePeriodLo => "envelope period low",
            Register::EnvelopePeriodHi => "envelope period high",
            Register::EnvelopeShape => "envelope shape",
            Register::PortA => "port A",
            Register::PortB => "port B",
        };
        write!(f, "R{} ({})", self.addr(), name)
    }
}

bitflags! {
    /// One bit per register address.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegisterMask: u16 {
        /// R0-R1
        const TONE_A = 0x0003;
        /// R2-R3
        const TONE_B = 0x000C;
        /// R4-R5
        const TONE_C = 0x0030;
        /// R6
        const NOISE = 0x0040;
        /// R7
        const MIXER = 0x0080;
        /// R8
        const VOLUME_A = 0x0100;
        /// R9
        const VOLUME_B = 0x0200;
        /// R10
        const VOLUME_C = 0x0400;
        /// R11-R12
        const ENVELOPE_PERIOD = 0x1800;
        /// R13
        const ENVELOPE_SHAPE = 0x2000;
        /// R14-R15
        const PORTS = 0xC000;
    }
}

impl RegisterMask {
    /// Tone period pair of a channel.
    pub fn tone(ch: usize) -> Self {
        Self::from_bits_retain(0x0003 << (ch * 2))
    }

    /// Volume register of a channel.
    pub fn volume(ch: usize) -> Self {
        Self::from_bits_retain(0x0100 << ch)
    }

    /// Whether the bit for `addr` is set.
    pub fn has_addr(self, addr: u8) -> bool {
        self.bits() & (1 << (addr & 0x0F)) != 0
    }
}

bitflags! {
    /// Register 7 bits. A set bit disables the generator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MixerFlags: u8 {
        /// Tone A disabled
        const TONE_A = 0x01;
        /// Tone B disabled
        const TONE_B = 0x02;
        /// Tone C disabled
        const TONE_C = 0x04;
        /// Noise A disabled
        const NOISE_A = 0x08;
        /// Noise B disabled
        const NOISE_B = 0x10;
        /// Noise C disabled
        const NOISE_C = 0x20;
    }
}

impl MixerFlags {
    /// Tone and noise bits of one channel.
    pub fn channel(ch: usize) -> Self {
        Self::from_bits_truncate(MIXER_CHANNEL_MASK << ch)
    }

    /// Tone bit of one channel.
    pub fn tone(ch: usize) -> Self {
        Self::from_bits_truncate(0x01 << ch)
    }

    /// Noise bit of one channel.
    pub fn noise(ch: usize) -> Self {
        Self::from_bits_truncate(0x08 << ch)
    }

    /// Noise bits of all channels.
    pub fn all_noise() -> Self {
        Self::NOISE_A | Self::NOISE_B | Self::NOISE_C
    }
}

/// Mirror of the 16 PSG registers owned by one slot.
///
/// `published` remembers the last value handed to the host for each address,
/// so a write only raises the dirty bit when the chip would actually change.
/// Quiet writes update the image without raising it; the next audible write
/// still compares against `published`, so the chip is never left stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterImage {
    data: [u8; NUM_REGISTER],
    published: [u8; NUM_REGISTER],
    dirty: RegisterMask,
    forced: RegisterMask,
    mixer_changed: u8,
}

impl RegisterImage {
    /// Image in the reset pattern: everything 0, register 7 = 0x3F.
    pub fn new() -> Self {
        let data = Self::reset_pattern();
        RegisterImage {
            data,
            published: data,
            dirty: RegisterMask::empty(),
            forced: RegisterMask::empty(),
            mixer_changed: 0,
        }
    }

    /// Register values after a reset.
    pub fn reset_pattern() -> [u8; NUM_REGISTER] {
        let mut data = [0; NUM_REGISTER];
        data[Register::Mixer.addr() as usize] = MIXER_ALL_OFF;
        data
    }

    /// Return the image to the reset pattern. Addresses whose published value
    /// differs become dirty.
    pub fn reset(&mut self) {
        self.forced = RegisterMask::empty();
        self.dirty = RegisterMask::empty();
        self.mixer_changed = 0;
        for (addr, value) in Self::reset_pattern().into_iter().enumerate() {
            self.write(addr as u8, value);
        }
    }

    /// Current value of a register.
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.data[(addr & 0x0F) as usize]
    }

    /// All register values.
    pub fn data(&self) -> &[u8; NUM_REGISTER] {
        &self.data
    }

    /// Store a value, marking it dirty when it differs from the published one.
    pub fn write(&mut self, addr: u8, value: u8) {
        let idx = (addr & 0x0F) as usize;
        let bit = Register::from_addr(addr).mask();
        self.data[idx] = value;
        if value != self.published[idx] {
            self.dirty |= bit;
        } else if !self.forced.intersects(bit) {
            self.dirty -= bit;
        }
    }

    /// Store a value without touching the dirty mask.
    #[inline]
    pub fn write_quiet(&mut self, addr: u8, value: u8) {
        self.data[(addr & 0x0F) as usize] = value;
    }

    /// Store a value either audibly or quietly.
    #[inline]
    pub fn write_if(&mut self, addr: u8, value: u8, audible: bool) {
        if audible {
            self.write(addr, value);
        } else {
            self.write_quiet(addr, value);
        }
    }

    /// Mark an address dirty regardless of its value.
    pub fn touch(&mut self, addr: u8) {
        let bit = Register::from_addr(addr).mask();
        self.forced |= bit;
        self.dirty |= bit;
    }

    /// Addresses to be sent this tick.
    #[inline]
    pub fn dirty(&self) -> RegisterMask {
        self.dirty
    }

    /// Channels whose mixer bits changed this tick, one bit per channel.
    #[inline]
    pub fn mixer_changed(&self) -> u8 {
        self.mixer_changed
    }

    /// 12-bit tone period of a channel.
    pub fn tone_period(&self, ch: usize) -> u16 {
        let lo = self.data[ch * 2] as u16;
        let hi = self.data[ch * 2 + 1] as u16;
        (hi << 8) | lo
    }

    /// Store a 12-bit tone period.
    pub fn set_tone_period(&mut self, ch: usize, tp: u16, audible: bool) {
        let addr = Register::tone_lo(ch).addr();
        self.write_if(addr, (tp & 0xFF) as u8, audible);
        self.write_if(addr + 1, ((tp >> 8) & 0x0F) as u8, audible);
    }

    /// Volume register of a channel, including the envelope bit.
    #[inline]
    pub fn volume(&self, ch: usize) -> u8 {
        self.read(Register::volume(ch).addr())
    }

    /// Register 7 as flags.
    #[inline]
    pub fn mixer(&self) -> MixerFlags {
        MixerFlags::from_bits_truncate(self.read(Register::Mixer.addr()))
    }

    /// A channel is muted when both its tone and noise are disabled.
    #[inline]
    pub fn is_muted(&self, ch: usize) -> bool {
        self.mixer().contains(MixerFlags::channel(ch))
    }

    /// Replace the tone/noise disable bits of a channel.
    ///
    /// `bits` uses the channel-A layout (0x01 tone off, 0x08 noise off) and is
    /// shifted into place.
    pub fn set_channel_mixer(&mut self, ch: usize, bits: u8) {
        let addr = Register::Mixer.addr();
        let old = self.read(addr);
        let value = (old & !(MIXER_CHANNEL_MASK << ch)) | ((bits & MIXER_CHANNEL_MASK) << ch);
        if value != old {
            self.mixer_changed |= 1 << ch;
        }
        self.write(addr, value);
    }

    /// Force register 7 out and flag the given channels' mixer bits as changed.
    pub fn touch_mixer(&mut self, channel_mask: u8) {
        self.mixer_changed |= channel_mask;
        self.touch(Register::Mixer.addr());
    }

    /// Disable tone and noise of a channel.
    #[inline]
    pub fn mute(&mut self, ch: usize) {
        self.set_channel_mixer(ch, MIXER_CHANNEL_MASK);
    }

    /// Hand every dirty address to `f` in ascending order, then clear.
    pub fn drain<F: FnMut(u8, u8)>(&mut self, mut f: F) {
        for addr in 0..NUM_REGISTER as u8 {
            if self.dirty.has_addr(addr) {
                f(addr, self.data[addr as usize]);
            }
        }
        self.acknowledge();
    }

    /// Treat the dirty addresses as sent without emitting them.
    pub fn acknowledge(&mut self) {
        for addr in 0..NUM_REGISTER {
            if self.dirty.has_addr(addr as u8) {
                self.published[addr] = self.data[addr];
            }
        }
        self.dirty = RegisterMask::empty();
        self.forced = RegisterMask::empty();
        self.mixer_changed = 0;
    }

    /// Record that the host now holds exactly this image (after a full rewrite).
    pub fn mark_all_published(&mut self) {
        self.published = self.data;
        self.dirty = RegisterMask::empty();
        self.forced = RegisterMask::empty();
        self.mixer_changed = 0;
    }
}

impl Default for RegisterImage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drained(image: &mut RegisterImage) -> Vec<(u8, u8)> {
        let mut out = Vec::new();
        image.drain(|addr, data| out.push((addr, data)));
        out
    }

    #[test]
    fn test_register_conversion() {
        assert_eq!(Register::from_addr(0x00), Register::ToneALo);
        assert_eq!(Register::from_addr(0x0D), Register::EnvelopeShape);
        assert_eq!(Register::from_addr(0x17), Register::Mixer);
        assert_eq!(Register::tone_lo(2), Register::ToneCLo);
        assert_eq!(Register::volume(1), Register::VolumeB);
        assert_eq!(Register::Mixer.to_string(), "R7 (mixer)");
    }

    #[test]
    fn test_masks() {
        assert_eq!(RegisterMask::tone(1), RegisterMask::TONE_B);
        assert_eq!(RegisterMask::volume(2), RegisterMask::VOLUME_C);
        assert_eq!(MixerFlags::channel(1), MixerFlags::TONE_B | MixerFlags::NOISE_B);
        assert!(RegisterMask::ENVELOPE_PERIOD.has_addr(0x0C));
    }

    #[test]
    fn test_new_image_is_clean() {
        let mut image = RegisterImage::new();
        assert_eq!(image.read(7), 0x3F);
        assert!(image.dirty().is_empty());
        assert!(drained(&mut image).is_empty());
    }

    #[test]
    fn test_write_suppression() {
        let mut image = RegisterImage::new();
        image.write(8, 12);
        assert_eq!(drained(&mut image), vec![(8, 12)]);
        image.write(8, 12);
        assert!(drained(&mut image).is_empty());
    }

    #[test]
    fn test_write_back_to_published_clears_dirty() {
        let mut image = RegisterImage::new();
        image.write(6, 3);
        image.write(6, 0);
        assert!(image.dirty().is_empty());
    }

    #[test]
    fn test_quiet_write_is_caught_up_later() {
        let mut image = RegisterImage::new();
        image.write_quiet(9, 5);
        assert!(image.dirty().is_empty());
        image.write(9, 5);
        assert_eq!(drained(&mut image), vec![(9, 5)]);
    }

    #[test]
    fn test_touch_forces_rewrite() {
        let mut image = RegisterImage::new();
        image.touch(13);
        image.write(13, 0);
        assert_eq!(drained(&mut image), vec![(13, 0)]);
    }

    #[test]
    fn test_drain_is_ascending() {
        let mut image = RegisterImage::new();
        image.write(10, 1);
        image.set_tone_period(0, 0x123, true);
        image.write(6, 7);
        let out = drained(&mut image);
        assert_eq!(out, vec![(0, 0x23), (1, 0x01), (6, 7), (10, 1)]);
    }

    #[test]
    fn test_channel_mixer() {
        let mut image = RegisterImage::new();
        assert!(image.is_muted(1));
        image.set_channel_mixer(1, 0x08);
        assert_eq!(image.read(7), 0x3F & !0x02);
        assert_eq!(image.mixer_changed(), 0b010);
        assert!(!image.is_muted(1));
        image.mute(1);
        assert!(image.is_muted(1));
        assert_eq!(image.read(7), 0x3F);
    }

    #[test]
    fn test_reset_marks_differences() {
        let mut image = RegisterImage::new();
        image.write(0, 0x55);
        image.acknowledge();
        image.reset();
        assert_eq!(drained(&mut image), vec![(0, 0)]);
    }
}

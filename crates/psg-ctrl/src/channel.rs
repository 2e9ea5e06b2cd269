//! Per-channel sequencer state.

use crate::constants::{
    DEFAULT_GATE_TIME, DEFAULT_NOTE_LEN, DEFAULT_OCTAVE, DEFAULT_TEMPO, DEFAULT_VOLUME,
    MAX_LOOP_NESTING_DEPTH,
};
use crate::engine::{Lfo, NoiseSweep, PitchBend, SoftEnvelope, TickClock};
use crate::fixed::{rescale_q12, rescale_ticks};
use crate::registers::RegisterImage;

/// Host hook for `@C` commands: `(channel, value)`.
pub type UserCallback = Box<dyn FnMut(u8, i32)>;

/// One open `[` loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LoopFrame {
    /// Offset just after the loop count.
    pub head: usize,
    /// Passes left including the current one; 0 loops forever.
    pub times: u8,
}

/// Decoder position and loop stack of a channel.
#[derive(Debug, Clone)]
pub(crate) struct MmlState<'a> {
    pub text: &'a [u8],
    pub pos: usize,
    pub loops: [LoopFrame; MAX_LOOP_NESTING_DEPTH],
    pub depth: usize,
    /// Passes completed by the outermost loop.
    pub primary_loop_count: u8,
    /// The cursor reached the end of the text.
    pub decode_end: bool,
    /// The outermost loop should exit at its next `]`.
    pub end_primary_loop: bool,
}

impl<'a> MmlState<'a> {
    fn new(text: &'a [u8]) -> Self {
        MmlState {
            text,
            pos: 0,
            loops: [LoopFrame::default(); MAX_LOOP_NESTING_DEPTH],
            depth: 0,
            primary_loop_count: 0,
            decode_end: false,
            end_primary_loop: false,
        }
    }
}

/// Tone parameters set by MML commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ToneParams {
    pub tempo: u16,
    pub note_len: u8,
    pub len_dots: u8,
    /// 0-based (`O4` = 3).
    pub octave: u8,
    /// 0-based (`Q8` = 7).
    pub gate: u8,
    pub volume: u8,
    pub hw_envelope: bool,
    pub bias: i16,
    pub tp_offset: i8,
    pub exclude_len: u8,
    pub exclude_dots: u8,
    /// The current note slurs into the next one.
    pub legato: bool,
}

impl Default for ToneParams {
    fn default() -> Self {
        ToneParams {
            tempo: DEFAULT_TEMPO as u16,
            note_len: DEFAULT_NOTE_LEN as u8,
            len_dots: 0,
            octave: (DEFAULT_OCTAVE - 1) as u8,
            gate: (DEFAULT_GATE_TIME - 1) as u8,
            volume: DEFAULT_VOLUME as u8,
            hw_envelope: false,
            bias: 0,
            tp_offset: 0,
            exclude_len: 0,
            exclude_dots: 0,
            legato: false,
        }
    }
}

/// Note and gate countdowns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NoteTimer {
    /// Ticks until the next command is decoded.
    pub note_on: u16,
    /// Ticks until the note is released.
    pub gate: u16,
    /// Q12 remainder carried into the next note.
    pub frac: u16,
}

impl NoteTimer {
    fn rescale(&mut self, ratio_q12: u32) {
        let q12 = ((self.note_on as u32) << 12) | self.frac as u32;
        let q12 = rescale_q12(q12, ratio_q12).min(crate::fixed::MAX_NOTE_ON_Q12);
        self.note_on = (q12 >> 12) as u16;
        self.frac = (q12 & 0x0FFF) as u16;
        self.gate = rescale_ticks(self.gate, ratio_q12);
    }
}

/// Slot-wide values the decoder reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Timing {
    /// PSG clock in 0.01 Hz.
    pub clock: u32,
    pub proc_freq: u16,
    /// Speed factor in percent.
    pub speed: u16,
    /// Global frequency shift, 1/360 octave.
    pub shift: i16,
    /// `R`/`H`/`J` without a length inherit the `L` length.
    pub rest_len_inherit: bool,
}

/// State of one PSG channel within a slot.
#[derive(Debug, Clone)]
pub struct Channel<'a> {
    pub(crate) mml: MmlState<'a>,
    pub(crate) tone: ToneParams,
    pub(crate) timer: NoteTimer,
    pub(crate) envelope: SoftEnvelope,
    pub(crate) lfo: Lfo,
    pub(crate) pitch_bend: PitchBend,
}

impl<'a> Channel<'a> {
    /// Channel with default parameters and no text.
    pub fn new() -> Self {
        Self::with_text(&[])
    }

    fn with_text(text: &'a [u8]) -> Self {
        Channel {
            mml: MmlState::new(text),
            tone: ToneParams::default(),
            timer: NoteTimer::default(),
            envelope: SoftEnvelope::default(),
            lfo: Lfo::default(),
            pitch_bend: PitchBend::default(),
        }
    }

    /// Forget everything, text included.
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    /// Restore defaults but keep the text, ready to play from the start.
    pub(crate) fn rewind(&mut self) {
        *self = Self::with_text(self.mml.text);
    }

    /// Assign a new text stream.
    pub(crate) fn set_text(&mut self, text: &'a [u8]) {
        self.mml.text = text;
        self.mml.pos = 0;
        self.mml.decode_end = false;
    }

    /// Text assigned to this channel.
    pub fn text(&self) -> &'a [u8] {
        self.mml.text
    }

    /// Decoder offset into the text.
    pub fn position(&self) -> usize {
        self.mml.pos
    }

    /// The decoder reached the end of the text.
    pub fn is_decode_end(&self) -> bool {
        self.mml.decode_end
    }

    /// Passes completed by the outermost loop.
    pub fn primary_loop_count(&self) -> u8 {
        self.mml.primary_loop_count
    }

    /// Current loop nesting depth.
    pub fn loop_depth(&self) -> usize {
        self.mml.depth
    }

    /// Ticks until the next note.
    pub fn note_on_ticks(&self) -> u16 {
        self.timer.note_on
    }

    /// Ticks until the current note's gate closes.
    pub fn gate_ticks(&self) -> u16 {
        self.timer.gate
    }

    /// Channel tempo.
    pub fn tempo(&self) -> u16 {
        self.tone.tempo
    }

    /// Channel volume (0-15).
    pub fn volume(&self) -> u8 {
        self.tone.volume
    }

    /// 1-based octave.
    pub fn octave(&self) -> u8 {
        self.tone.octave + 1
    }

    /// Software envelope state.
    pub fn envelope(&self) -> &SoftEnvelope {
        &self.envelope
    }

    /// LFO state.
    pub fn lfo(&self) -> &Lfo {
        &self.lfo
    }

    /// Pitch-bend state.
    pub fn pitch_bend(&self) -> &PitchBend {
        &self.pitch_bend
    }

    pub(crate) fn clock(&self, timing: &Timing) -> TickClock {
        TickClock {
            proc_freq: timing.proc_freq,
            tempo: self.tone.tempo,
            speed: timing.speed,
        }
    }

    /// Stretch every running countdown by `ratio_q12`. `timing` already
    /// carries the new speed.
    pub(crate) fn rescale(&mut self, ratio_q12: u32, timing: &Timing) {
        let clock = self.clock(timing);
        self.timer.rescale(ratio_q12);
        self.envelope.rescale(ratio_q12);
        self.lfo.rescale(ratio_q12, &clock);
        self.pitch_bend.rescale(ratio_q12);
    }
}

impl Default for Channel<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the decoder and the per-tick engines of one channel touch.
pub(crate) struct ChannelContext<'s, 'a> {
    /// Physical channel index (0 = A).
    pub ch: usize,
    pub channel: &'s mut Channel<'a>,
    pub regs: &'s mut RegisterImage,
    pub noise: &'s mut NoiseSweep,
    pub timing: &'s Timing,
    pub callback: &'s mut Option<UserCallback>,
}

impl ChannelContext<'_, '_> {
    /// Tempo-dependent clock for this channel.
    pub fn clock(&self) -> TickClock {
        self.channel.clock(self.timing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ch = Channel::new();
        assert_eq!(ch.tempo(), 120);
        assert_eq!(ch.octave(), 4);
        assert_eq!(ch.tone.gate, 7);
        assert_eq!(ch.volume(), 15);
        assert!(ch.text().is_empty());
    }

    #[test]
    fn test_rewind_keeps_text() {
        let mut ch = Channel::new();
        ch.set_text(b"CDE");
        ch.mml.pos = 2;
        ch.tone.volume = 3;
        ch.rewind();
        assert_eq!(ch.text(), b"CDE");
        assert_eq!(ch.position(), 0);
        assert_eq!(ch.volume(), 15);

        ch.reset();
        assert!(ch.text().is_empty());
    }

    #[test]
    fn test_timer_rescale_round_trip() {
        let mut timer = NoteTimer {
            note_on: 50,
            gate: 40,
            frac: 0x800,
        };
        timer.rescale(crate::fixed::speed_ratio_q12(100, 200));
        assert_eq!(timer.note_on, 25);
        assert_eq!(timer.gate, 20);
        timer.rescale(crate::fixed::speed_ratio_q12(200, 100));
        assert_eq!(timer.note_on, 50);
        assert_eq!(timer.frac, 0x800);
        assert_eq!(timer.gate, 40);
    }
}

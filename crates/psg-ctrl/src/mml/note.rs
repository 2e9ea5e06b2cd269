//! Note, noise and rest events.
//!
//! A note event resolves its pitch and length, programs the tone, volume and
//! mixer registers, sets the note/gate timers and re-arms the sub-engines.

use super::cursor::MmlCursor;
use crate::channel::ChannelContext;
use crate::constants::*;
use crate::fixed::{calc_tp, shift_tp, MAX_NOTE_ON_Q12};
use crate::registers::Register;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteKind {
    Tone,
    Noise,
    Rest,
}

impl NoteKind {
    /// Channel-A layout mixer bits (set = disabled).
    fn mixer_bits(self) -> u8 {
        match self {
            NoteKind::Tone => 0x08,
            NoteKind::Noise => 0x01,
            NoteKind::Rest => 0x09,
        }
    }
}

/// Semitone of a note letter within the octave.
fn column(letter: u8) -> i32 {
    match letter {
        b'C' => 0,
        b'D' => 2,
        b'E' => 4,
        b'F' => 5,
        b'G' => 7,
        b'A' => 9,
        b'B' => 11,
        _ => 0,
    }
}

/// Look past `&` for the note the legato slides into, following octave
/// changes and white space. The cursor is a copy; the text is decoded again
/// normally afterwards. Falls back to `start` when no note follows.
fn legato_target(mut cur: MmlCursor<'_>, octave: i32, start: i32) -> i32 {
    let mut octave = octave.clamp(MIN_OCTAVE, MAX_OCTAVE);
    while let Some(c) = cur.peek_upper() {
        match c {
            b'O' => octave = cur.param(MIN_OCTAVE, MAX_OCTAVE, DEFAULT_OCTAVE),
            b'<' => {
                octave = (octave - 1).max(MIN_OCTAVE);
                cur.bump();
            }
            b'>' => {
                octave = (octave + 1).min(MAX_OCTAVE);
                cur.bump();
            }
            b'A'..=b'G' => {
                cur.bump();
                return cur.shift_half_notes(column(c) + (octave - 1) * 12);
            }
            c if c.is_ascii_whitespace() => cur.bump(),
            _ => break,
        }
    }
    start
}

impl ChannelContext<'_, '_> {
    /// Tone period of a note after detune and the global frequency shift.
    fn note_tp(&self, note: i32) -> u16 {
        let bias = self.channel.tone.bias as i32 + self.timing.shift as i32;
        shift_tp(calc_tp(note, self.timing.clock), bias)
    }

    /// Decode one note, noise or rest command at the cursor.
    pub(crate) fn generate_tone(&mut self, cur: &mut MmlCursor<'_>) {
        let Some(head) = cur.peek_upper() else {
            return;
        };
        cur.bump();

        let tone = self.channel.tone;
        let mut note = 0;
        let mut legato_end = None;
        let mut sweep = None;
        let kind;
        let note_len;
        let mut dots;

        match head {
            b'N' => {
                kind = NoteKind::Tone;
                note = cur.read_number(MIN_NOTE_NUMBER, MAX_NOTE_NUMBER, MIN_NOTE_NUMBER).value;
                dots = cur.count_dots() + tone.len_dots;
                note_len = tone.note_len as i32;
            }
            b'H' | b'J' | b'R' => {
                kind = if head == b'R' {
                    NoteKind::Rest
                } else {
                    NoteKind::Noise
                };

                if head == b'J' {
                    let addr = Register::NoisePeriod.addr();
                    let current = self.regs.read(addr) as i32;
                    let np = cur.read_number(MIN_NOISE_PERIOD, MAX_NOISE_PERIOD, current).value as u8;
                    self.regs.write(addr, np);
                    if cur.eat(b'~') {
                        let end = cur.read_number(MIN_NOISE_PERIOD, MAX_NOISE_PERIOD, np as i32);
                        sweep = Some((np, end.value as u8));
                    }
                }

                let inherit = self.timing.rest_len_inherit;
                let default_len = if inherit {
                    tone.note_len as i32
                } else {
                    DEFAULT_REST_LEN
                };
                let len = cur.read_number(MIN_NOTE_LEN, MAX_NOTE_LEN, default_len);
                note_len = len.value;
                dots = cur.count_dots();
                if inherit && len.omitted {
                    dots += tone.len_dots;
                }
            }
            _ => {
                kind = NoteKind::Tone;
                note = cur.shift_half_notes(column(head) + tone.octave as i32 * 12);
                // Length 0 sets the pitch without starting a note
                let len = cur.read_number(0, MAX_NOTE_LEN, tone.note_len as i32);
                note_len = len.value;
                dots = cur.count_dots();
                if len.omitted {
                    dots += tone.len_dots;
                }
                if cur.eat(b'&') {
                    legato_end = Some(legato_target(*cur, tone.octave as i32 + 1, note));
                }
            }
        }

        let ch = self.ch;
        let clock = self.clock();
        let in_legato = tone.legato;

        let mut tp = 0;
        let mut end_tp = 0;
        if kind == NoteKind::Tone {
            tp = self.note_tp(note);
            tp = (tp as i32 + tone.tp_offset as i32).clamp(0, MAX_TONE_PERIOD as i32) as u16;
            end_tp = match legato_end {
                Some(end) => self.note_tp(end),
                None => shift_tp(tp, self.channel.pitch_bend.level as i32),
            };
            self.regs.set_tone_period(ch, tp, true);
        }

        if kind != NoteKind::Rest {
            let envelope_bit = if tone.hw_envelope { 0x10 } else { 0 };
            self.regs
                .write(Register::volume(ch).addr(), tone.volume | envelope_bit);
            if tone.hw_envelope && !in_legato {
                self.regs.touch(Register::EnvelopeShape.addr());
            }
        }

        if note_len != 0 {
            let mut q12 = clock.note_q12(note_len as u16, dots);
            if tone.exclude_len != 0 {
                q12 = q12.saturating_sub(clock.note_q12(tone.exclude_len as u16, tone.exclude_dots));
                self.channel.tone.exclude_len = 0;
                self.channel.tone.exclude_dots = 0;
            }
            let timer = &mut self.channel.timer;
            let q12 = (q12 + timer.frac as u32).min(MAX_NOTE_ON_Q12);
            timer.frac = (q12 & 0x0FFF) as u16;
            timer.note_on = (q12 >> 12) as u16;
            timer.gate = ((q12 as u64 * (tone.gate as u64 + 1) / 8) >> 12) as u16;

            self.regs.set_channel_mixer(ch, kind.mixer_bits());
        }

        if self.channel.envelope.enabled && !in_legato {
            self.channel.envelope.note_on(tone.volume, &clock);
        }

        let ticks = self.channel.timer.note_on;
        if kind == NoteKind::Tone {
            self.channel.lfo.note_on(tp, in_legato, &clock);
            self.channel.pitch_bend.start(tp, end_tp, ticks);
        } else {
            self.channel.lfo.stop();
            self.channel.pitch_bend.stop();
        }

        if let Some((from, to)) = sweep {
            self.noise.start(ch, from, to, ticks);
        }

        self.channel.tone.legato = legato_end.is_some();
    }
}

//! Command dispatch for one channel.
//!
//! `decode_mml` runs whenever a channel's note timer expires. It executes
//! parameter commands until it reaches a note, noise or rest (which sets the
//! timer again) or the end of the text.

use log::trace;

use super::cursor::MmlCursor;
use crate::channel::{ChannelContext, LoopFrame};
use crate::constants::*;
use crate::registers::Register;

impl ChannelContext<'_, '_> {
    /// Decode commands up to and including the next note event.
    pub(crate) fn decode_mml(&mut self) {
        let text = self.channel.mml.text;
        let mut cur = MmlCursor::at(text, self.channel.mml.pos);
        if cur.is_at_end() {
            self.channel.mml.decode_end = true;
            return;
        }

        let mut loop_opened = false;
        let mut jumps = 0usize;

        while let Some(c) = cur.peek_upper() {
            let mut note_event = false;
            match c {
                b'A'..=b'H' | b'J' | b'N' | b'R' => {
                    self.generate_tone(&mut cur);
                    note_event = true;
                }
                b'$' => self.decode_dollar(&mut cur),
                b'@' => self.decode_atsign(&mut cur),
                b'T' => {
                    self.channel.tone.tempo =
                        cur.param(MIN_TEMPO, MAX_TEMPO, DEFAULT_TEMPO) as u16;
                }
                b'V' => {
                    self.channel.tone.volume =
                        cur.param(MIN_VOLUME, MAX_VOLUME, DEFAULT_VOLUME) as u8;
                    self.channel.tone.hw_envelope = false;
                }
                b'S' => {
                    let shape = cur.param(MIN_ENVELOP_SHAPE, MAX_ENVELOP_SHAPE, MIN_ENVELOP_SHAPE);
                    let addr = Register::EnvelopeShape.addr();
                    self.regs.write(addr, shape as u8);
                    self.regs.touch(addr);
                    self.channel.tone.hw_envelope = true;
                }
                b'M' => {
                    let period =
                        cur.param(MIN_ENVELOP_PERIOD, MAX_ENVELOP_PERIOD, MIN_ENVELOP_PERIOD);
                    self.regs
                        .write(Register::EnvelopePeriodLo.addr(), (period & 0xFF) as u8);
                    self.regs
                        .write(Register::EnvelopePeriodHi.addr(), (period >> 8) as u8);
                }
                b'L' => {
                    self.channel.tone.note_len =
                        cur.param(MIN_NOTE_LEN, MAX_NOTE_LEN, DEFAULT_NOTE_LEN) as u8;
                    self.channel.tone.len_dots = cur.count_dots();
                }
                b'O' => {
                    let octave = cur.param(MIN_OCTAVE, MAX_OCTAVE, DEFAULT_OCTAVE);
                    self.channel.tone.octave = (octave - 1) as u8;
                }
                b'Q' => {
                    let gate = cur.param(MIN_GATE_TIME, MAX_GATE_TIME, DEFAULT_GATE_TIME);
                    self.channel.tone.gate = (gate - 1) as u8;
                }
                b'I' => {
                    let np = cur.param(MIN_NOISE_PERIOD, MAX_NOISE_PERIOD, DEFAULT_NOISE_PERIOD);
                    self.regs.write(Register::NoisePeriod.addr(), np as u8);
                }
                b'X' => {
                    self.channel.tone.exclude_len =
                        cur.param(MIN_EXCLUDE_NOTE_LEN, MAX_EXCLUDE_NOTE_LEN, MIN_EXCLUDE_NOTE_LEN)
                            as u8;
                    self.channel.tone.exclude_dots = cur.count_dots();
                }
                b'<' => {
                    let tone = &mut self.channel.tone;
                    tone.octave = tone.octave.saturating_sub(1);
                    cur.bump();
                }
                b'>' => {
                    let tone = &mut self.channel.tone;
                    if (tone.octave as i32) < MAX_OCTAVE - 1 {
                        tone.octave += 1;
                    }
                    cur.bump();
                }
                b'[' => {
                    if self.channel.mml.depth < MAX_LOOP_NESTING_DEPTH {
                        let times = cur.param(MIN_LOOP_TIMES, MAX_LOOP_TIMES, DEFAULT_LOOP_TIMES);
                        let mml = &mut self.channel.mml;
                        mml.loops[mml.depth] = LoopFrame {
                            head: cur.pos(),
                            times: times as u8,
                        };
                        mml.depth += 1;
                        loop_opened = true;
                    } else {
                        trace!("ch{}: loop nesting too deep, '[' ignored", self.ch);
                        cur.bump();
                    }
                }
                b'|' => {
                    let mml = &self.channel.mml;
                    let last_pass = mml.depth > 0
                        && (mml.loops[mml.depth - 1].times == 1
                            || (mml.depth == 1 && mml.end_primary_loop));
                    cur.bump();
                    if last_pass {
                        cur.skip_to_loop_end();
                    }
                }
                b']' => {
                    if self.channel.mml.depth == 0 {
                        cur.bump();
                    } else {
                        let force_exit = loop_opened || jumps > MAX_LOOP_NESTING_DEPTH;
                        if let Some(head) = self.close_loop(force_exit) {
                            jumps += 1;
                            cur = MmlCursor::at(text, head);
                        } else {
                            cur.bump();
                        }
                    }
                }
                _ => cur.bump(),
            }

            self.channel.mml.pos = cur.pos();
            if cur.is_at_end() {
                self.channel.mml.decode_end = true;
                return;
            }
            if note_event {
                return;
            }
        }
    }

    /// Handle `]` of the innermost loop. Returns the loop head to jump back
    /// to, or `None` when the loop is left.
    fn close_loop(&mut self, force_exit: bool) -> Option<usize> {
        let mml = &mut self.channel.mml;
        let idx = mml.depth - 1;
        let primary = mml.depth == 1;
        let frame = mml.loops[idx];

        // A pending primary-loop exit leaves here rather than replaying the
        // body up to `|`, so the channel ends at the first `]` it reaches.
        if force_exit || frame.times == 1 || (primary && mml.end_primary_loop) {
            if primary {
                mml.primary_loop_count = 0;
                mml.end_primary_loop = false;
            }
            mml.loops[idx] = LoopFrame::default();
            mml.depth -= 1;
            return None;
        }

        if frame.times > 1 {
            mml.loops[idx].times -= 1;
        }
        if primary {
            mml.primary_loop_count = mml.primary_loop_count.wrapping_add(1);
        }
        Some(frame.head)
    }

    /// `$` extension commands: envelope, LFO, detune and pitch bend.
    fn decode_dollar(&mut self, cur: &mut MmlCursor<'_>) {
        cur.bump();
        let Some(c) = cur.peek_upper() else {
            return;
        };

        let env = &mut self.channel.envelope;
        let lfo = &mut self.channel.lfo;
        let time = |cur: &mut MmlCursor<'_>| {
            cur.param(MIN_SOFT_ENVELOPE_TIME, MAX_SOFT_ENVELOPE_TIME, MIN_SOFT_ENVELOPE_TIME) as u16
        };
        match c {
            b'A' => env.attack = time(cur),
            b'H' => env.hold = time(cur),
            b'D' => env.decay = time(cur),
            b'F' => env.fade = time(cur),
            b'R' => env.release = time(cur),
            b'S' => {
                env.sustain = cur.param(
                    MIN_SOFT_ENVELOPE_SUSTAIN,
                    MAX_SOFT_ENVELOPE_SUSTAIN,
                    DEFAULT_SOFT_ENVELOPE_SUSTAIN,
                ) as u16;
            }
            b'E' => {
                env.enabled =
                    cur.param(MIN_SOFT_ENVELOPE_MODE, MAX_SOFT_ENVELOPE_MODE, MIN_SOFT_ENVELOPE_MODE)
                        != 0;
            }
            b'U' => {
                env.time_unit = cur.param(
                    MIN_SOFT_ENVELOPE_TIME_UNIT,
                    MAX_SOFT_ENVELOPE_TIME_UNIT,
                    MIN_SOFT_ENVELOPE_TIME_UNIT,
                ) as u16;
            }
            b'M' => lfo.enabled = cur.param(MIN_LFO_MODE, MAX_LFO_MODE, MIN_LFO_MODE) != 0,
            b'L' => lfo.speed = cur.param(MIN_LFO_SPEED, MAX_LFO_SPEED, DEFAULT_LFO_SPEED) as i16,
            b'J' => lfo.depth = cur.param(MIN_LFO_DEPTH, MAX_LFO_DEPTH, MIN_LFO_DEPTH) as u8,
            b'T' => {
                lfo.delay_len = cur.param(MIN_LFO_DELAY, MAX_LFO_DELAY, MIN_LFO_DELAY) as u8;
                lfo.delay_dots = cur.count_dots();
            }
            b'V' => {
                lfo.speed_unit =
                    cur.param(MIN_LFO_SPEED_UNIT, MAX_LFO_SPEED_UNIT, MIN_LFO_SPEED_UNIT) as u16;
            }
            b'B' => self.channel.tone.bias = cur.param(MIN_BIAS, MAX_BIAS, 0) as i16,
            b'O' => {
                self.channel.tone.tp_offset = cur.param(MIN_TP_OFFSET, MAX_TP_OFFSET, 0) as i8;
            }
            b'P' => {
                self.channel.pitch_bend.level =
                    cur.param(MIN_PITCHBEND_LEVEL, MAX_PITCHBEND_LEVEL, 0) as i16;
            }
            _ => cur.bump(),
        }
    }

    /// `@` commands. Only `@C` (user callback) exists.
    fn decode_atsign(&mut self, cur: &mut MmlCursor<'_>) {
        cur.bump();
        match cur.peek_upper() {
            Some(b'C') => {
                cur.bump();
                let value = if cur.eat(b'(') {
                    let value = cur.read_c_literal();
                    cur.eat(b')');
                    value
                } else {
                    cur.read_number(i32::MIN, i32::MAX, 0).value
                };
                if let Some(callback) = self.callback.as_mut() {
                    trace!("ch{}: user callback({})", self.ch, value);
                    callback(self.ch as u8, value);
                }
            }
            Some(_) => cur.bump(),
            None => {}
        }
    }
}

//! Sequencer limits, defaults and fixed-point factors.
//!
//! Every numeric MML parameter is saturated into the `MIN_*..=MAX_*` range named
//! here; omitted parameters take the matching `DEFAULT_*` value.

/// Number of tone channels on the PSG.
pub const NUM_CHANNEL: usize = 3;

/// Number of PSG registers mirrored by a slot.
pub const NUM_REGISTER: usize = 16;

/// Register 7 value with every tone and noise generator disabled.
pub const MIXER_ALL_OFF: u8 = 0x3F;

/// Tone + noise disable bits of one channel in register 7 (shifted by channel).
pub const MIXER_CHANNEL_MASK: u8 = 0x09;

/// Tick rate used when the host passes 0.
pub const DEFAULT_PROC_FREQ: u16 = 100;

/// Largest tone period the 12-bit tone registers accept.
pub const MAX_TONE_PERIOD: u16 = 0x0FFF;

/// Longest accepted MML text (offsets are 16-bit).
pub const MAX_MML_TEXT_LEN: usize = 0xFFFE;

/// Only MML header version that exists.
pub const MML_VERSION_1: u8 = 1;

pub const MIN_NOTE_NUMBER: i32 = 0;
pub const MAX_NOTE_NUMBER: i32 = 95;

pub const MIN_OCTAVE: i32 = 1;
pub const MAX_OCTAVE: i32 = 8;
pub const DEFAULT_OCTAVE: i32 = 4;

pub const MIN_GATE_TIME: i32 = 1;
pub const MAX_GATE_TIME: i32 = 8;
pub const DEFAULT_GATE_TIME: i32 = 8;

pub const MIN_NOISE_PERIOD: i32 = 0;
pub const MAX_NOISE_PERIOD: i32 = 31;
pub const DEFAULT_NOISE_PERIOD: i32 = 16;

pub const MIN_LOOP_TIMES: i32 = 0;
pub const MAX_LOOP_TIMES: i32 = 255;
pub const DEFAULT_LOOP_TIMES: i32 = 1;

/// Deepest `[` nesting; further brackets are treated as literal text.
pub const MAX_LOOP_NESTING_DEPTH: usize = 3;

pub const MIN_ENVELOP_PERIOD: i32 = 0;
pub const MAX_ENVELOP_PERIOD: i32 = 0xFFFF;

pub const MIN_ENVELOP_SHAPE: i32 = 0;
pub const MAX_ENVELOP_SHAPE: i32 = 15;

pub const MIN_VOLUME: i32 = 0;
pub const MAX_VOLUME: i32 = 15;
pub const DEFAULT_VOLUME: i32 = 15;

pub const MIN_TEMPO: i32 = 10;
pub const MAX_TEMPO: i32 = 1000;
pub const DEFAULT_TEMPO: i32 = 120;

/// Speed multiplier in percent.
pub const MIN_SPEED_FACTOR: u16 = 20;
pub const MAX_SPEED_FACTOR: u16 = 500;
pub const DEFAULT_SPEED_FACTOR: u16 = 100;

/// Global frequency shift, 360 units per octave.
pub const MIN_SHIFT_DEGREES: i16 = -1800;
pub const MAX_SHIFT_DEGREES: i16 = 1800;

/// Note length as the denominator of a whole note (4 = quarter note).
pub const MIN_NOTE_LEN: i32 = 1;
pub const MAX_NOTE_LEN: i32 = 128;
pub const DEFAULT_NOTE_LEN: i32 = 4;

/// Length used by `R`/`H`/`J` without a length when rest-length inheritance is off.
pub const DEFAULT_REST_LEN: i32 = 4;

pub const MAX_NOTE_DOT: u8 = 3;

pub const MIN_SOFT_ENVELOPE_TIME: i32 = 0;
pub const MAX_SOFT_ENVELOPE_TIME: i32 = 10_000;

/// Sustain level in percent of the channel volume.
pub const MIN_SOFT_ENVELOPE_SUSTAIN: i32 = 0;
pub const MAX_SOFT_ENVELOPE_SUSTAIN: i32 = 1500;
pub const DEFAULT_SOFT_ENVELOPE_SUSTAIN: i32 = 100;

pub const MIN_SOFT_ENVELOPE_TIME_UNIT: i32 = 0;
pub const MAX_SOFT_ENVELOPE_TIME_UNIT: i32 = 8192;

pub const MIN_SOFT_ENVELOPE_MODE: i32 = 0;
pub const MAX_SOFT_ENVELOPE_MODE: i32 = 1;

pub const MIN_BIAS: i32 = -500;
pub const MAX_BIAS: i32 = 500;

pub const MIN_TP_OFFSET: i32 = -100;
pub const MAX_TP_OFFSET: i32 = 100;

pub const MIN_EXCLUDE_NOTE_LEN: i32 = 0;
pub const MAX_EXCLUDE_NOTE_LEN: i32 = 128;

pub const MIN_LFO_SPEED: i32 = -200;
pub const MAX_LFO_SPEED: i32 = 200;
pub const DEFAULT_LFO_SPEED: i32 = 40;

pub const MIN_LFO_SPEED_UNIT: i32 = 0;
pub const MAX_LFO_SPEED_UNIT: i32 = 8192;

pub const MIN_LFO_DEPTH: i32 = 0;
pub const MAX_LFO_DEPTH: i32 = 255;

pub const MIN_LFO_DELAY: i32 = 0;
pub const MAX_LFO_DELAY: i32 = 128;

pub const MIN_LFO_MODE: i32 = 0;
pub const MAX_LFO_MODE: i32 = 1;

/// Pitch-bend target, 360 units per octave.
pub const MIN_PITCHBEND_LEVEL: i32 = -2880;
pub const MAX_PITCHBEND_LEVEL: i32 = 2880;

/// Ticks the finish-primary-loop request waits for channels to line up.
pub const MAX_FIN_PRI_LOOP_TRY: u8 = 15;

/// 2^(1/360) in Q24: lengthens a tone period by one unit of detune.
pub const Q_PITCHBEND_FACTOR: u64 = 16_809_550;
/// 2^(-1/360) in Q24.
pub const Q_PITCHBEND_FACTOR_N: u64 = 16_744_944;

/// 2^(1/12) in Q24: one equal-tempered semitone up.
pub const Q_CALCTP_FACTOR: i64 = 17_774_841;
/// 2^(-1/12) in Q24.
pub const Q_CALCTP_FACTOR_N: i64 = 15_835_583;

/// Note number of A4 (440 Hz).
pub const NOTE_NUMBER_A4: i32 = 45;

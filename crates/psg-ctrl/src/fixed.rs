//! Fixed-point helpers shared by the decoder and the sub-engines.
//!
//! Pitch math runs in Q24, durations in Q12 and ramps in Q6. Nothing here
//! touches floating point.

use crate::constants::{
    MAX_TONE_PERIOD, NOTE_NUMBER_A4, Q_CALCTP_FACTOR, Q_CALCTP_FACTOR_N, Q_PITCHBEND_FACTOR,
    Q_PITCHBEND_FACTOR_N,
};

/// Units of [`shift_tp`] bias per octave.
pub const DEGREES_PER_OCTAVE: i32 = 360;

/// Largest note duration representable by the 16-bit tick counters, in Q12.
pub const MAX_NOTE_ON_Q12: u32 = ((u16::MAX as u32) << 12) | 0x0FFF;

/// Clamp `value` into `min..=max`.
#[inline]
pub fn sat(value: i32, min: i32, max: i32) -> i32 {
    value.clamp(min, max)
}

/// Convert milliseconds to ticks at `proc_freq` Hz, rounding to nearest.
#[inline]
pub fn ms_to_ticks(ms: u32, proc_freq: u16) -> u32 {
    ((ms as u64 * proc_freq as u64 + 500) / 1000) as u32
}

/// Scale a tone period by `2^(-bias/360)`.
///
/// Positive bias shortens the period (raises the pitch), negative bias
/// lengthens it. Whole octaves are applied as shifts, the remainder as
/// repeated multiplication by the one-degree Q24 factor. The result is
/// rounded and clamped to the 12-bit tone range.
///
/// # Arguments
/// * `tp` - Tone period (0-4095)
/// * `bias` - Shift in 1/360 octave units
pub fn shift_tp(tp: u16, bias: i32) -> u16 {
    const LIMIT: u64 = ((MAX_TONE_PERIOD as u64) + 1) << 24;

    let mut q24 = (tp as u64) << 24;
    let octaves = (bias.unsigned_abs() / DEGREES_PER_OCTAVE as u32) as u32;
    let steps = bias.unsigned_abs() % DEGREES_PER_OCTAVE as u32;

    if bias >= 0 {
        q24 = q24.checked_shr(octaves).unwrap_or(0);
        for _ in 0..steps {
            q24 = (q24 * Q_PITCHBEND_FACTOR_N) >> 24;
        }
    } else {
        for _ in 0..octaves {
            q24 <<= 1;
            if q24 >= LIMIT {
                return MAX_TONE_PERIOD;
            }
        }
        for _ in 0..steps {
            q24 = (q24 * Q_PITCHBEND_FACTOR) >> 24;
            if q24 >= LIMIT {
                return MAX_TONE_PERIOD;
            }
        }
    }

    (((q24 + (1 << 23)) >> 24).min(MAX_TONE_PERIOD as u64)) as u16
}

/// Equal-tempered tone period for a note number.
///
/// Note 45 is A4 = 440 Hz. `clock` is the PSG input clock in 0.01 Hz units;
/// the chip divides it by 16 before the tone counter.
pub fn calc_tp(note: i32, clock: u32) -> u16 {
    let n = note - NOTE_NUMBER_A4;
    let octaves = n / 12;

    let mut hz_q24: i64 = 440 << 24;
    if octaves >= 0 {
        hz_q24 <<= octaves;
    } else {
        hz_q24 >>= -octaves;
    }

    let (factor, steps) = if n >= 0 {
        (Q_CALCTP_FACTOR, n % 12)
    } else {
        (Q_CALCTP_FACTOR_N, (-n) % 12)
    };
    for _ in 0..steps {
        hz_q24 = (hz_q24 * factor) >> 24;
    }

    let clock_q24 = (clock as i64) << 24;
    let tp = clock_q24 / (1600 * hz_q24.max(1));
    tp.clamp(0, MAX_TONE_PERIOD as i64) as u16
}

/// Duration of a note in Q12 ticks.
///
/// A whole note lasts `proc_freq * 240 / tempo` ticks at speed 100%; each dot
/// adds half of the previous increment. Length 0 yields 0.
///
/// # Arguments
/// * `len` - Note length denominator (4 = quarter note)
/// * `tempo` - Quarter notes per minute
/// * `dots` - Number of dots (0-3)
/// * `proc_freq` - Tick rate in Hz
/// * `speed` - Speed factor in percent
pub fn note_on_time_q12(len: u16, tempo: u16, dots: u8, proc_freq: u16, speed: u16) -> u32 {
    if len == 0 || tempo == 0 || speed == 0 {
        return 0;
    }

    let mut delta = ((proc_freq as u64 * 240) << 12) * 100
        / (tempo as u64 * len as u64 * speed as u64);
    let mut total = delta;
    for _ in 0..dots {
        delta >>= 1;
        total += delta;
    }
    total.min(MAX_NOTE_ON_Q12 as u64) as u32
}

/// Q12 ratio converting counters from speed `old` to speed `new`.
#[inline]
pub fn speed_ratio_q12(old: u16, new: u16) -> u32 {
    ((old as u32) << 12) / (new.max(1) as u32)
}

/// Multiply `value` by a Q12 ratio, truncating.
#[inline]
pub fn rescale_q12(value: u32, ratio_q12: u32) -> u32 {
    ((value as u64 * ratio_q12 as u64) >> 12).min(u32::MAX as u64) as u32
}

/// Like [`rescale_q12`] for 16-bit tick counters, saturating.
#[inline]
pub fn rescale_ticks(value: u16, ratio_q12: u32) -> u16 {
    rescale_q12(value as u32, ratio_q12).min(u16::MAX as u32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const CLOCK_2MHZ: u32 = 200_000_000;

    fn tone_hz(tp: u16, clock: u32) -> f64 {
        clock as f64 / 100.0 / (16.0 * tp as f64)
    }

    #[test]
    fn test_calc_tp_a4() {
        assert_eq!(calc_tp(45, CLOCK_2MHZ), 284);
        assert_relative_eq!(tone_hz(284, CLOCK_2MHZ), 440.0, max_relative = 0.002);
    }

    #[test]
    fn test_calc_tp_tracks_equal_temperament() {
        // Above C6 the integer period quantization dominates
        for note in 12..=72 {
            let tp = calc_tp(note, CLOCK_2MHZ);
            let expected = 440.0 * 2f64.powf((note - 45) as f64 / 12.0);
            assert_relative_eq!(tone_hz(tp, CLOCK_2MHZ), expected, max_relative = 0.02);
        }
    }

    #[test]
    fn test_calc_tp_clamps_low_notes() {
        // 4 MHz clock: C1 would need more than 12 bits
        assert_eq!(calc_tp(0, 400_000_000), MAX_TONE_PERIOD);
    }

    #[test]
    fn test_calc_tp_monotonic() {
        for note in 1..=95 {
            assert!(calc_tp(note, CLOCK_2MHZ) <= calc_tp(note - 1, CLOCK_2MHZ));
        }
    }

    #[test]
    fn test_shift_tp_octaves() {
        assert_eq!(shift_tp(284, 360), 142);
        assert_eq!(shift_tp(284, -360), 568);
        assert_eq!(shift_tp(3000, -360), MAX_TONE_PERIOD);
    }

    #[test]
    fn test_shift_tp_semitone() {
        // 30 degrees = one semitone
        let up = shift_tp(1000, 30);
        assert_relative_eq!(up as f64, 1000.0 / 2f64.powf(1.0 / 12.0), max_relative = 0.002);
    }

    #[test]
    fn test_shift_tp_large_negative_does_not_wrap() {
        assert_eq!(shift_tp(4000, -2879), MAX_TONE_PERIOD);
        assert_eq!(shift_tp(1, -2880), 256);
    }

    #[test]
    fn test_ms_to_ticks_rounds() {
        assert_eq!(ms_to_ticks(1000, 100), 100);
        assert_eq!(ms_to_ticks(5, 100), 1);
        assert_eq!(ms_to_ticks(4, 100), 0);
        assert_eq!(ms_to_ticks(10_000, 60), 600);
    }

    #[test]
    fn test_note_on_time_quarter() {
        assert_eq!(note_on_time_q12(4, 120, 0, 100, 100) >> 12, 50);
        assert_eq!(note_on_time_q12(4, 120, 1, 100, 100) >> 12, 75);
        assert_eq!(note_on_time_q12(4, 120, 2, 100, 100) >> 12, 87);
        assert_eq!(note_on_time_q12(4, 120, 0, 100, 200) >> 12, 25);
        assert_eq!(note_on_time_q12(0, 120, 0, 100, 100), 0);
    }

    #[test]
    fn test_note_on_time_saturates() {
        assert_eq!(note_on_time_q12(1, 10, 3, u16::MAX, 20), MAX_NOTE_ON_Q12);
    }

    proptest! {
        #[test]
        fn prop_shift_tp_zero_is_identity(tp in 0u16..=4095) {
            prop_assert_eq!(shift_tp(tp, 0), tp);
        }

        #[test]
        fn prop_shift_tp_direction(tp in 16u16..=4095, bias in 1i32..=2880) {
            prop_assert!(shift_tp(tp, bias) <= tp);
            prop_assert!(shift_tp(tp, -bias) >= tp);
        }

        #[test]
        fn prop_shift_tp_octave_round_trip(tp in 1u16..=4095) {
            let back = shift_tp(shift_tp(tp, 360), -360);
            prop_assert!(back.abs_diff(tp) <= 1, "{} -> {}", tp, back);
        }

        #[test]
        fn prop_calc_tp_in_range(note in 0i32..=95, clock in 100_000_000u32..=400_000_000) {
            prop_assert!(calc_tp(note, clock) <= MAX_TONE_PERIOD);
        }

        #[test]
        fn prop_speed_rescale_round_trip(ticks in 0u32..=(1u32 << 26), pct in 20u16..=500) {
            let there = rescale_q12(ticks, speed_ratio_q12(100, pct));
            let back = rescale_q12(there, speed_ratio_q12(pct, 100));
            // Each step truncates by at most one unit of the scaled value
            let tolerance = (ticks >> 9) + 8;
            prop_assert!(back.abs_diff(ticks) <= tolerance, "{} -> {} -> {}", ticks, there, back);
        }
    }
}

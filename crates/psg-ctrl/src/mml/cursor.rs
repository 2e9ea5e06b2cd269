//! Byte cursor over one channel's MML text.
//!
//! Commands are single ASCII letters (case-insensitive) followed by optional
//! decimal parameters. Whitespace is only skipped where a command says so;
//! unknown bytes are stepped over by the decoder.

use crate::constants::{MAX_NOTE_DOT, MAX_NOTE_NUMBER, MIN_NOTE_NUMBER};

/// Result of reading an optional numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberRead {
    /// Saturated value, or the default when omitted.
    pub value: i32,
    /// No digits were present.
    pub omitted: bool,
}

/// Position inside a borrowed MML text.
#[derive(Debug, Clone, Copy)]
pub struct MmlCursor<'a> {
    text: &'a [u8],
    pos: usize,
}

impl<'a> MmlCursor<'a> {
    /// Cursor at the start of `text`.
    pub fn new(text: &'a [u8]) -> Self {
        Self::at(text, 0)
    }

    /// Cursor at `pos`, clamped to the end of `text`.
    pub fn at(text: &'a [u8], pos: usize) -> Self {
        MmlCursor {
            text,
            pos: pos.min(text.len()),
        }
    }

    /// Current offset.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Whole text the cursor walks.
    #[inline]
    pub fn text(&self) -> &'a [u8] {
        self.text
    }

    /// Whether the cursor reached the end of the text.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Byte under the cursor.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    /// Byte under the cursor, upper-cased.
    #[inline]
    pub fn peek_upper(&self) -> Option<u8> {
        self.peek().map(|c| c.to_ascii_uppercase())
    }

    #[inline]
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.text.get(self.pos + offset).copied()
    }

    /// Step over one byte.
    #[inline]
    pub fn bump(&mut self) {
        if self.pos < self.text.len() {
            self.pos += 1;
        }
    }

    /// Step over `c` if it is under the cursor.
    pub fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skip spaces, tabs and line breaks.
    pub fn skip_white_space(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Read an optionally signed decimal number.
    ///
    /// A sign without digits is not consumed. The value saturates into
    /// `min..=max`; when no digits are present `default` is returned and
    /// `omitted` is set.
    pub fn read_number(&mut self, min: i32, max: i32, default: i32) -> NumberRead {
        let mut p = self.pos;
        let negative = match self.text.get(p) {
            Some(b'-') => {
                p += 1;
                true
            }
            Some(b'+') => {
                p += 1;
                false
            }
            _ => false,
        };

        let digits_start = p;
        let mut value: i64 = 0;
        while let Some(d) = self.text.get(p).filter(|c| c.is_ascii_digit()) {
            value = (value * 10 + (d - b'0') as i64).min(i32::MAX as i64 + 1);
            p += 1;
        }

        if p == digits_start {
            return NumberRead {
                value: default,
                omitted: true,
            };
        }

        self.pos = p;
        let value = if negative { -value } else { value };
        NumberRead {
            value: value.clamp(min as i64, max as i64) as i32,
            omitted: false,
        }
    }

    /// Step over the command letter, then read its parameter.
    pub fn param(&mut self, min: i32, max: i32, default: i32) -> i32 {
        self.bump();
        self.read_number(min, max, default).value
    }

    /// Count `.` after a length, at most three.
    pub fn count_dots(&mut self) -> u8 {
        let mut dots = 0;
        while self.eat(b'.') {
            if dots < MAX_NOTE_DOT {
                dots += 1;
            }
        }
        dots
    }

    /// Apply `+`/`#` (sharp) and `-` (flat) suffixes to a note number.
    pub fn shift_half_notes(&mut self, note: i32) -> i32 {
        let mut note = note;
        loop {
            match self.peek() {
                Some(b'+') | Some(b'#') => note += 1,
                Some(b'-') => note -= 1,
                _ => break,
            }
            self.pos += 1;
        }
        note.clamp(MIN_NOTE_NUMBER, MAX_NOTE_NUMBER)
    }

    /// Read a C-style integer literal: `0x` hex, leading `0` octal, else
    /// decimal, with an optional sign. Saturates to `i32`; 0 if absent.
    pub fn read_c_literal(&mut self) -> i32 {
        let start = self.pos;
        let negative = match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                true
            }
            Some(b'+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };

        let hex = self.peek() == Some(b'0')
            && matches!(self.peek_at(1), Some(b'x') | Some(b'X'))
            && self.peek_at(2).is_some_and(|c| c.is_ascii_hexdigit());
        let radix = if hex {
            self.pos += 2;
            16
        } else if self.peek() == Some(b'0') {
            8
        } else {
            10
        };

        let digits_start = self.pos;
        let mut value: i64 = 0;
        while let Some(d) = self.peek().and_then(|c| (c as char).to_digit(radix)) {
            value = (value * radix as i64 + d as i64).min(i32::MAX as i64 + 1);
            self.pos += 1;
        }

        if self.pos == digits_start {
            self.pos = start;
            return 0;
        }

        let value = if negative { -value } else { value };
        value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// Move to the `]` closing the current loop, skipping nested loops.
    /// Stops at the end of the text when there is none.
    pub fn skip_to_loop_end(&mut self) {
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                b'[' => depth += 1,
                b']' if depth == 0 => return,
                b']' => depth -= 1,
                _ => {}
            }
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_number_saturates() {
        let mut c = MmlCursor::new(b"2000X");
        let n = c.read_number(10, 1000, 120);
        assert_eq!(n, NumberRead { value: 1000, omitted: false });
        assert_eq!(c.peek(), Some(b'X'));

        let mut c = MmlCursor::new(b"-7");
        assert_eq!(c.read_number(0, 15, 15).value, 0);
    }

    #[test]
    fn test_read_number_omitted() {
        let mut c = MmlCursor::new(b"C");
        let n = c.read_number(1, 128, 4);
        assert_eq!(n, NumberRead { value: 4, omitted: true });
        assert_eq!(c.pos(), 0);

        let mut c = MmlCursor::new(b"-C");
        assert!(c.read_number(-100, 100, 0).omitted);
        assert_eq!(c.pos(), 0);
    }

    #[test]
    fn test_read_number_huge() {
        let mut c = MmlCursor::new(b"99999999999999999999");
        assert_eq!(c.read_number(0, 255, 1).value, 255);
        assert!(c.is_at_end());
    }

    #[test]
    fn test_count_dots_caps_at_three() {
        let mut c = MmlCursor::new(b".....C");
        assert_eq!(c.count_dots(), 3);
        assert_eq!(c.peek(), Some(b'C'));
    }

    #[test]
    fn test_shift_half_notes() {
        let mut c = MmlCursor::new(b"+#-4");
        assert_eq!(c.shift_half_notes(10), 11);
        assert_eq!(c.peek(), Some(b'4'));

        let mut c = MmlCursor::new(b"--");
        assert_eq!(c.shift_half_notes(0), 0);

        let mut c = MmlCursor::new(b"++");
        assert_eq!(c.shift_half_notes(95), 95);
    }

    #[test]
    fn test_c_literal() {
        let mut c = MmlCursor::new(b"0x1F)");
        assert_eq!(c.read_c_literal(), 31);
        assert_eq!(c.peek(), Some(b')'));

        assert_eq!(MmlCursor::new(b"017").read_c_literal(), 15);
        assert_eq!(MmlCursor::new(b"-42").read_c_literal(), -42);
        assert_eq!(MmlCursor::new(b"0x)").read_c_literal(), 0);

        let mut c = MmlCursor::new(b")");
        assert_eq!(c.read_c_literal(), 0);
        assert_eq!(c.pos(), 0);
    }

    #[test]
    fn test_skip_to_loop_end_is_nesting_aware() {
        let text = b"C[2D]E]F";
        let mut c = MmlCursor::new(text);
        c.skip_to_loop_end();
        assert_eq!(c.pos(), 6);

        let mut c = MmlCursor::new(b"CDE");
        c.skip_to_loop_end();
        assert!(c.is_at_end());
    }

    #[test]
    fn test_param_and_whitespace() {
        let mut c = MmlCursor::new(b"  T150");
        c.skip_white_space();
        assert_eq!(c.peek_upper(), Some(b'T'));
        assert_eq!(c.param(10, 1000, 120), 150);
        assert!(c.is_at_end());
    }
}

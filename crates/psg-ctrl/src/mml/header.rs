//! Optional `:` header in front of the channel streams.
//!
//! ```text
//! :V1 M1;  T150 CDE, EFG
//! ```
//!
//! `V<n>` must follow the colon directly. `M<n>` selects whether `R`/`H`/`J`
//! without a length inherit the channel's `L` length (bit 0). Anything else up
//! to the closing `;` is ignored.

use log::trace;

use super::cursor::MmlCursor;
use crate::constants::MML_VERSION_1;
use crate::error::{MmlError, Result};

/// Settings carried by the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmlHeader {
    /// MML dialect version.
    pub version: u8,
    /// Rests and noise notes without a length use the channel note length.
    pub rest_len_inherit: bool,
}

/// Parse leading white space and an optional header.
///
/// `mode` bit 0 gives the default for [`MmlHeader::rest_len_inherit`].
/// Returns the header and the offset at which channel text starts.
pub fn parse_header(text: &[u8], mode: u16) -> Result<(MmlHeader, usize)> {
    let mut header = MmlHeader {
        version: MML_VERSION_1,
        rest_len_inherit: mode & 1 != 0,
    };

    let mut cursor = MmlCursor::new(text);
    cursor.skip_white_space();
    if !cursor.eat(b':') {
        return Ok((header, cursor.pos()));
    }

    if cursor.peek_upper() == Some(b'V') {
        let version = cursor.param(0, u8::MAX as i32, MML_VERSION_1 as i32);
        if version == MML_VERSION_1 as i32 {
            header.version = MML_VERSION_1;
        } else {
            trace!("unsupported MML version {version}, using {MML_VERSION_1}");
        }
    }

    loop {
        match cursor.peek_upper() {
            None => return Err(MmlError::UnterminatedHeader),
            Some(b'M') => {
                let mode = cursor.param(i32::MIN, i32::MAX, 0);
                header.rest_len_inherit = mode & 1 != 0;
            }
            Some(b';') => {
                cursor.bump();
                // A header must be followed by channel text
                if cursor.is_at_end() {
                    return Err(MmlError::UnterminatedHeader);
                }
                return Ok((header, cursor.pos()));
            }
            Some(_) => cursor.bump(),
        }
    }
}

//! Error types for MML loading.

use thiserror::Error;

/// Result type for sequencer operations.
pub type Result<T> = std::result::Result<T, MmlError>;

/// Errors that can occur when handing MML text to a slot.
///
/// Playback itself never fails: once text is accepted, malformed commands are
/// skipped and out-of-range parameters are saturated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MmlError {
    /// The text is longer than the 16-bit offsets used by the decoder can address.
    #[error("MML text is {len} bytes long (limit {limit})")]
    TextTooLong {
        /// Length of the rejected text.
        len: usize,
        /// Maximum accepted length.
        limit: usize,
    },

    /// A `:` header was opened but never closed by `;`.
    #[error("MML header is not terminated by ';'")]
    UnterminatedHeader,
}

impl MmlError {
    /// Negative status code reported by the C-style host API.
    ///
    /// `-1` for rejected text, `-2` for a malformed header.
    pub fn status_code(&self) -> i32 {
        match self {
            MmlError::TextTooLong { .. } => -1,
            MmlError::UnterminatedHeader => -2,
        }
    }
}

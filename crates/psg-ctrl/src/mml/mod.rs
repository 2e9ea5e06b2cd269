//! MML text handling: cursor, header and the per-channel decoder.

pub mod cursor;
pub mod header;

pub(crate) mod decoder;
pub(crate) mod note;

pub use cursor::{MmlCursor, NumberRead};
pub use header::{parse_header, MmlHeader};

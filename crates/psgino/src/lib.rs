//! Host-facing MML players for AY-3-8910 / YM2149 PSGs.
//!
//! The sequencing itself lives in [`psg_ctrl`]; this crate wires a slot to a
//! register output and adds the reset sequence.
//!
//! - [`Psgino`] - one three-channel music slot
//! - [`PsginoZ`] - music plus a one-channel sound-effect slot on channel C
//!
//! # Example
//!
//! ```
//! use psgino::{PlayStatus, PsgPlayer, PsginoZ, SlotConfig};
//!
//! let mut bus = Vec::new();
//! let mut player = PsginoZ::new(SlotConfig::new(1_789_772.5), |addr, data| bus.push((addr, data)));
//! player.set_mml("T120 L8 O4 [2 CEG>C<]", 0).unwrap();
//! player.set_se_mml("V15 O6 L32 CE", 0).unwrap();
//!
//! player.play();
//! player.proc();
//! player.play_se();
//! while player.status() == PlayStatus::Playing {
//!     player.proc();
//! }
//! drop(player);
//! assert!(!bus.is_empty());
//! ```

#![warn(missing_docs)]

mod player;
mod psgino;
mod psgino_z;
mod writer;

pub use player::{PsgPlayer, ResetHook};
pub use psgino::Psgino;
pub use psgino_z::PsginoZ;
pub use writer::RegisterWriter;

pub use psg_ctrl::{MmlError, PlayStatus, Result, SlotConfig};

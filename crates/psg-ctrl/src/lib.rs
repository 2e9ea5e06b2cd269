//! MML sequencer engine for AY-3-8910 / YM2149 compatible PSGs.
//!
//! A [`Slot`] sequences up to three channels of MML text into a 16-register
//! [`RegisterImage`]. The host ticks the slot at a fixed rate and drains the
//! registers that changed; nothing in this crate talks to hardware.
//!
//! # Modules
//!
//! - [`slot`] - Slot state machine and host operations
//! - [`mml`] - Text cursor, header parsing and command decoding
//! - [`engine`] - Software envelope, LFO, pitch bend and noise sweep
//! - [`registers`] - Register image with write suppression
//! - [`mixer`] - Merging a sound-effect slot over a main slot
//! - [`fixed`] - Fixed-point pitch and timing arithmetic
//!
//! # Example
//!
//! ```
//! use psg_ctrl::{PlayStatus, Slot, SlotConfig};
//!
//! let mut slot = Slot::new(SlotConfig::new(2_000_000.0).with_proc_freq(100));
//! slot.set_mml("T120 L8 O4 CEG>C", 0).expect("valid MML");
//! slot.play();
//!
//! let mut ticks = 0;
//! loop {
//!     slot.control_psg();
//!     slot.registers_mut().drain(|_addr, _data| {
//!         // psg.write(addr, data)
//!     });
//!     if slot.status() == PlayStatus::Ended {
//!         break;
//!     }
//!     ticks += 1;
//! }
//! assert_eq!(ticks, 100);
//! ```

pub mod channel;
pub mod constants;
pub mod engine;
pub mod error;
pub mod fixed;
pub mod mixer;
pub mod mml;
pub mod registers;
pub mod slot;

pub use channel::{Channel, UserCallback};
pub use error::{MmlError, Result};
pub use mixer::{Ownership, SlotMixer};
pub use mml::MmlHeader;
pub use registers::{MixerFlags, Register, RegisterImage, RegisterMask};
pub use slot::{PlayStatus, Slot, SlotConfig};

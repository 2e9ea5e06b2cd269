//! Common player interface.
//!
//! [`Psgino`](crate::Psgino) and [`PsginoZ`](crate::PsginoZ) share the
//! host loop operations through [`PsgPlayer`], so a driver can hold either as
//! `Box<dyn PsgPlayer>`.

use psg_ctrl::PlayStatus;

/// Host-facing control of a music slot.
///
/// # Example
///
/// ```
/// use psgino::{PlayStatus, PsgPlayer};
///
/// fn play_to_end(player: &mut dyn PsgPlayer, max_ticks: usize) -> usize {
///     player.play();
///     for tick in 0..max_ticks {
///         player.proc();
///         if player.status() == PlayStatus::Ended {
///             return tick;
///         }
///     }
///     max_ticks
/// }
/// ```
pub trait PsgPlayer {
    /// Request playback from the start; applied on the next [`PsgPlayer::proc`].
    fn play(&mut self);

    /// Request a stop; applied on the next [`PsgPlayer::proc`].
    fn stop(&mut self);

    /// Advance one tick and send the changed registers.
    ///
    /// Call at the configured processing frequency.
    fn proc(&mut self);

    /// Clear all state, run the reset hook and rewrite every register.
    fn reset(&mut self);

    /// Status of the music slot.
    fn status(&self) -> PlayStatus;

    /// Whether the music slot is playing.
    fn is_playing(&self) -> bool {
        self.status() == PlayStatus::Playing
    }
}

/// Hook run by [`PsgPlayer::reset`] before the registers are rewritten,
/// e.g. to pulse the chip's reset line.
pub type ResetHook = Box<dyn FnMut()>;

//! Single-slot player.

use log::debug;
use psg_ctrl::{PlayStatus, RegisterImage, Result, Slot, SlotConfig};

use crate::player::{PsgPlayer, ResetHook};
use crate::writer::RegisterWriter;

/// Three-channel MML player driving one PSG.
///
/// # Example
///
/// ```
/// use psgino::{PsgPlayer, Psgino, SlotConfig};
///
/// let mut writes = 0;
/// let mut player = Psgino::new(SlotConfig::new(2_000_000.0), |_addr, _data| writes += 1);
/// player.set_mml("T180 O5 L8 EDC", 0).unwrap();
/// player.play();
/// player.proc();
/// drop(player);
/// assert!(writes > 0);
/// ```
pub struct Psgino<'mml, W: RegisterWriter> {
    slot: Slot<'mml>,
    writer: W,
    reset_hook: Option<ResetHook>,
}

impl<'mml, W: RegisterWriter> Psgino<'mml, W> {
    /// Create a player writing through `writer`.
    ///
    /// # Arguments
    ///
    /// * `config` - Clock, tick rate and channel order
    /// * `writer` - Register output
    pub fn new(config: SlotConfig, writer: W) -> Self {
        Psgino {
            slot: Slot::new(config),
            writer,
            reset_hook: None,
        }
    }

    /// Attach MML text. See [`Slot::set_mml`].
    pub fn set_mml(&mut self, text: &'mml str, mode: u16) -> Result<()> {
        self.slot.set_mml(text, mode)
    }

    /// Install the `@C` callback.
    pub fn set_user_callback<F>(&mut self, callback: F)
    where
        F: FnMut(u8, i32) + 'static,
    {
        self.slot.set_user_callback(callback);
    }

    /// Exit the outermost loops once the channels line up.
    pub fn finish_primary_loop(&mut self) {
        self.slot.finish_primary_loop();
    }

    /// Playback speed in percent (20-500).
    pub fn set_speed_factor(&mut self, factor: u16) {
        self.slot.set_speed_factor(factor);
    }

    /// Transpose by `degrees` (360 per octave).
    pub fn shift_frequency(&mut self, degrees: i16) {
        self.slot.shift_frequency(degrees);
    }

    /// Run `hook` on every [`PsgPlayer::reset`].
    pub fn set_reset_hook<F>(&mut self, hook: F)
    where
        F: FnMut() + 'static,
    {
        self.reset_hook = Some(Box::new(hook));
    }

    /// The underlying slot.
    pub fn slot(&self) -> &Slot<'mml> {
        &self.slot
    }

    /// Register output.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Register output, mutable.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Take the register output back.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<W: RegisterWriter> PsgPlayer for Psgino<'_, W> {
    fn play(&mut self) {
        self.slot.play();
    }

    fn stop(&mut self) {
        self.slot.stop();
    }

    fn proc(&mut self) {
        self.slot.control_psg();
        let writer = &mut self.writer;
        self.slot
            .registers_mut()
            .drain(|addr, data| writer.write_register(addr, data));
    }

    fn reset(&mut self) {
        self.slot.reset();
        if let Some(hook) = self.reset_hook.as_mut() {
            hook();
        }
        self.writer.write_all(&RegisterImage::reset_pattern());
        self.slot.registers_mut().mark_all_published();
        debug!("psgino reset");
    }

    fn status(&self) -> PlayStatus {
        self.slot.status()
    }
}

//! Music plus sound-effect player.
//!
//! The sound-effect slot has a single channel mapped to PSG channel C. While
//! an effect plays it takes over that channel (and the noise or envelope
//! registers it uses); the music keeps sequencing underneath and is restored
//! when the effect ends.

use log::debug;
use psg_ctrl::{PlayStatus, RegisterImage, Result, Slot, SlotConfig, SlotMixer};

use crate::player::{PsgPlayer, ResetHook};
use crate::writer::RegisterWriter;

/// Music and sound-effect slots sharing one PSG.
pub struct PsginoZ<'mml, W: RegisterWriter> {
    music: Slot<'mml>,
    se: Slot<'mml>,
    mixer: SlotMixer,
    writer: W,
    reset_hook: Option<ResetHook>,
}

impl<'mml, W: RegisterWriter> PsginoZ<'mml, W> {
    /// Create a player writing through `writer`.
    ///
    /// The sound-effect slot uses the same clock and tick rate as `config`,
    /// with one channel in reverse order.
    pub fn new(config: SlotConfig, writer: W) -> Self {
        let se_config = config.with_channels(1).with_reverse(true);
        PsginoZ {
            music: Slot::new(config),
            se: Slot::new(se_config),
            mixer: SlotMixer::new(),
            writer,
            reset_hook: None,
        }
    }

    /// Attach music MML.
    pub fn set_mml(&mut self, text: &'mml str, mode: u16) -> Result<()> {
        self.music.set_mml(text, mode)
    }

    /// Attach sound-effect MML; only the first stream is used.
    pub fn set_se_mml(&mut self, text: &'mml str, mode: u16) -> Result<()> {
        self.se.set_mml(text, mode)
    }

    /// Start the sound effect on the next tick.
    pub fn play_se(&mut self) {
        self.se.play();
    }

    /// Stop the sound effect on the next tick.
    pub fn stop_se(&mut self) {
        self.se.stop();
    }

    /// Status of the sound-effect slot.
    pub fn se_status(&self) -> PlayStatus {
        self.se.status()
    }

    /// `@C` callback for the music slot.
    pub fn set_user_callback<F>(&mut self, callback: F)
    where
        F: FnMut(u8, i32) + 'static,
    {
        self.music.set_user_callback(callback);
    }

    /// `@C` callback for the sound-effect slot.
    pub fn set_se_user_callback<F>(&mut self, callback: F)
    where
        F: FnMut(u8, i32) + 'static,
    {
        self.se.set_user_callback(callback);
    }

    /// Exit the music's outermost loops once its channels line up.
    pub fn finish_primary_loop(&mut self) {
        self.music.finish_primary_loop();
    }

    /// Music speed in percent (20-500). Effects keep their own speed.
    pub fn set_speed_factor(&mut self, factor: u16) {
        self.music.set_speed_factor(factor);
    }

    /// Transpose the music by `degrees` (360 per octave).
    pub fn shift_frequency(&mut self, degrees: i16) {
        self.music.shift_frequency(degrees);
    }

    /// Run `hook` on every [`PsgPlayer::reset`].
    pub fn set_reset_hook<F>(&mut self, hook: F)
    where
        F: FnMut() + 'static,
    {
        self.reset_hook = Some(Box::new(hook));
    }

    /// Music slot.
    pub fn music(&self) -> &Slot<'mml> {
        &self.music
    }

    /// Sound-effect slot.
    pub fn se(&self) -> &Slot<'mml> {
        &self.se
    }

    /// Register merge state.
    pub fn mixer(&self) -> &SlotMixer {
        &self.mixer
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

impl<W: RegisterWriter> PsgPlayer for PsginoZ<'_, W> {
    fn play(&mut self) {
        self.music.play();
    }

    fn stop(&mut self) {
        self.music.stop();
    }

    fn proc(&mut self) {
        self.music.control_psg();
        self.se.control_psg();

        let se_playing = self.se.status() == PlayStatus::Playing;
        let writer = &mut self.writer;
        self.mixer.mix(
            self.music.registers_mut(),
            self.se.registers_mut(),
            se_playing,
            |addr, data| writer.write_register(addr, data),
        );
    }

    fn reset(&mut self) {
        self.music.reset();
        self.se.reset();
        self.mixer.reset();
        if let Some(hook) = self.reset_hook.as_mut() {
            hook();
        }
        self.writer.write_all(&RegisterImage::reset_pattern());
        self.music.registers_mut().mark_all_published();
        self.se.registers_mut().mark_all_published();
        debug!("psgino-z reset");
    }

    fn status(&self) -> PlayStatus {
        self.music.status()
    }
}

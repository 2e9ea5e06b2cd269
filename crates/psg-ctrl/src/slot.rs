//! Sequencer slot: up to three channels sharing one register image.
//!
//! The host calls [`Slot::control_psg`] once per tick (at
//! [`SlotConfig::proc_freq`] Hz) and then drains [`Slot::registers_mut`].
//! Play and stop are requests, serviced at the start of the next tick.
//!
//! # Example
//!
//! ```
//! use psg_ctrl::{PlayStatus, Slot, SlotConfig};
//!
//! let mut slot = Slot::new(SlotConfig::new(2_000_000.0));
//! slot.set_mml("T150 O4 L8 CDEFGAB>C", 0).unwrap();
//! slot.play();
//!
//! let mut writes = Vec::new();
//! slot.control_psg();
//! slot.registers_mut().drain(|addr, data| writes.push((addr, data)));
//!
//! assert_eq!(slot.status(), PlayStatus::Playing);
//! assert!(writes.iter().any(|&(addr, _)| addr == 7));
//! ```

use std::fmt;

use log::debug;

use crate::channel::{Channel, ChannelContext, Timing, UserCallback};
use crate::constants::{
    DEFAULT_PROC_FREQ, DEFAULT_SPEED_FACTOR, MAX_FIN_PRI_LOOP_TRY, MAX_GATE_TIME,
    MAX_MML_TEXT_LEN, MAX_SHIFT_DEGREES, MAX_SPEED_FACTOR, MIN_SHIFT_DEGREES, MIN_SPEED_FACTOR,
    MIXER_ALL_OFF, MML_VERSION_1, NUM_CHANNEL,
};
use crate::engine::{EnvelopePhase, NoiseSweep};
use crate::error::{MmlError, Result};
use crate::fixed::speed_ratio_q12;
use crate::mml::parse_header;
use crate::registers::{Register, RegisterImage};

/// Playback state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlayStatus {
    /// Nothing is playing.
    #[default]
    Stopped,
    /// Channels are being sequenced.
    Playing,
    /// Every channel ran out of text. Only a new play request leaves this state.
    Ended,
}

/// Static slot configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotConfig {
    /// PSG input clock in 0.01 Hz.
    pub clock: u32,
    /// Tick rate in Hz; 0 selects 100 Hz.
    pub proc_freq: u16,
    /// Assign MML streams to channels C, B, A instead of A, B, C.
    pub reverse: bool,
    /// Channels implemented by the slot (1-3).
    pub channels: u8,
}

impl SlotConfig {
    /// Three channels, forward order, 100 Hz, for a clock given in Hz.
    pub fn new(clock_hz: f32) -> Self {
        Self::from_centi_hz((clock_hz as f64 * 100.0 + 0.5) as u32)
    }

    /// Same as [`SlotConfig::new`] with the clock already in 0.01 Hz units.
    pub fn from_centi_hz(clock: u32) -> Self {
        SlotConfig {
            clock,
            proc_freq: DEFAULT_PROC_FREQ,
            reverse: false,
            channels: NUM_CHANNEL as u8,
        }
    }

    /// Set the tick rate (0 = 100 Hz).
    pub fn with_proc_freq(mut self, proc_freq: u16) -> Self {
        self.proc_freq = proc_freq;
        self
    }

    /// Assign streams from channel C downwards.
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Number of channels, clamped to 1-3.
    pub fn with_channels(mut self, channels: u8) -> Self {
        self.channels = channels.clamp(1, NUM_CHANNEL as u8);
        self
    }

    /// Tick rate with the 0 default resolved.
    pub fn effective_proc_freq(&self) -> u16 {
        if self.proc_freq == 0 {
            DEFAULT_PROC_FREQ
        } else {
            self.proc_freq
        }
    }
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self::new(2_000_000.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlRequest {
    Play,
    Stop,
}

/// One independent sequencer.
///
/// The MML text is borrowed for `'a`; the slot never copies it.
pub struct Slot<'a> {
    config: SlotConfig,
    timing: Timing,
    mml_set: bool,
    version: u8,
    status: PlayStatus,
    prev_status: PlayStatus,
    request: Option<ControlRequest>,
    fin_loop_requested: bool,
    fin_loop_try: u8,
    num_used: usize,
    channels: [Channel<'a>; NUM_CHANNEL],
    noise: NoiseSweep,
    regs: RegisterImage,
    callback: Option<UserCallback>,
}

impl<'a> Slot<'a> {
    /// Create an idle slot with a reset register image.
    pub fn new(config: SlotConfig) -> Self {
        let config = SlotConfig {
            channels: config.channels.clamp(1, NUM_CHANNEL as u8),
            ..config
        };
        Slot {
            config,
            timing: Timing {
                clock: config.clock,
                proc_freq: config.effective_proc_freq(),
                speed: DEFAULT_SPEED_FACTOR,
                shift: 0,
                rest_len_inherit: false,
            },
            mml_set: false,
            version: MML_VERSION_1,
            status: PlayStatus::Stopped,
            prev_status: PlayStatus::Stopped,
            request: None,
            fin_loop_requested: false,
            fin_loop_try: 0,
            num_used: 0,
            channels: [Channel::new(), Channel::new(), Channel::new()],
            noise: NoiseSweep::default(),
            regs: RegisterImage::new(),
            callback: None,
        }
    }

    /// Slot configuration.
    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    /// Physical channel for the i-th stream.
    #[inline]
    pub fn channel_index(&self, i: usize) -> usize {
        if self.config.reverse {
            NUM_CHANNEL - (i + 1)
        } else {
            i
        }
    }

    /// Physical channels carrying a stream, in processing order.
    pub fn active_channels(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_used).map(|i| self.channel_index(i))
    }

    /// Bit mask of the physical channels carrying a stream.
    pub fn active_channel_mask(&self) -> u8 {
        self.active_channels().fold(0, |mask, ch| mask | (1 << ch))
    }

    /// Number of streams found by the last [`Slot::set_mml`].
    pub fn channels_used(&self) -> usize {
        self.num_used
    }

    /// State of a physical channel.
    pub fn channel(&self, ch: usize) -> Option<&Channel<'a>> {
        self.channels.get(ch)
    }

    /// Current playback state.
    pub fn status(&self) -> PlayStatus {
        self.status
    }

    /// Playback state before the last tick.
    pub fn previous_status(&self) -> PlayStatus {
        self.prev_status
    }

    /// MML version from the header.
    pub fn mml_version(&self) -> u8 {
        self.version
    }

    /// Register image.
    pub fn registers(&self) -> &RegisterImage {
        &self.regs
    }

    /// Register image, for draining.
    pub fn registers_mut(&mut self) -> &mut RegisterImage {
        &mut self.regs
    }

    /// Current speed factor in percent.
    pub fn speed_factor(&self) -> u16 {
        self.timing.speed
    }

    /// Current frequency shift (360 per octave).
    pub fn frequency_shift(&self) -> i16 {
        self.timing.shift
    }

    /// Shared noise sweep.
    pub fn noise_sweep(&self) -> &NoiseSweep {
        &self.noise
    }

    /// Attach MML text.
    ///
    /// An optional `:` header comes first; channel streams are separated by
    /// `,`. Streams beyond the slot's channel count are ignored. `mode` bit 0
    /// makes `R`/`H`/`J` without a length inherit the `L` length unless the
    /// header overrides it. On error the previous text stays in place.
    pub fn set_mml(&mut self, text: &'a str, mode: u16) -> Result<()> {
        let bytes = text.as_bytes();
        if bytes.len() > MAX_MML_TEXT_LEN {
            return Err(MmlError::TextTooLong {
                len: bytes.len(),
                limit: MAX_MML_TEXT_LEN,
            });
        }
        let (header, start) = parse_header(bytes, mode)?;

        let mut rest = &bytes[start..];
        let mut used = 0;
        for i in 0..self.config.channels as usize {
            let ch = self.channel_index(i);
            let end = rest.iter().position(|&c| c == b',');
            let stream = &rest[..end.unwrap_or(rest.len())];
            self.channels[ch].set_text(stream);
            used += 1;
            match end {
                Some(comma) => rest = &rest[comma + 1..],
                None => break,
            }
        }
        for i in used..NUM_CHANNEL {
            let ch = self.channel_index(i);
            self.channels[ch].set_text(&[]);
        }

        self.num_used = used;
        self.version = header.version;
        self.timing.rest_len_inherit = header.rest_len_inherit;
        self.mml_set = true;
        debug!("mml set: {} stream(s), {} bytes", used, bytes.len());
        Ok(())
    }

    /// Request playback from the start on the next tick.
    pub fn play(&mut self) {
        self.request = Some(ControlRequest::Play);
    }

    /// Request a stop on the next tick.
    pub fn stop(&mut self) {
        self.request = Some(ControlRequest::Stop);
    }

    /// Make the outermost loops exit once all channels line up.
    ///
    /// Channels wait up to [`MAX_FIN_PRI_LOOP_TRY`] ticks for equal
    /// outer-loop pass counts, then exit regardless.
    pub fn finish_primary_loop(&mut self) {
        self.fin_loop_requested = true;
    }

    /// Install the `@C` callback.
    pub fn set_user_callback<F>(&mut self, callback: F)
    where
        F: FnMut(u8, i32) + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Remove the `@C` callback.
    pub fn clear_user_callback(&mut self) {
        self.callback = None;
    }

    /// Change the playback speed (percent, clamped to 20-500).
    ///
    /// Running countdowns are rescaled so notes in flight keep their
    /// relative position.
    pub fn set_speed_factor(&mut self, factor: u16) {
        let factor = factor.clamp(MIN_SPEED_FACTOR, MAX_SPEED_FACTOR);
        if factor == self.timing.speed {
            return;
        }
        let ratio = speed_ratio_q12(self.timing.speed, factor);
        self.timing.speed = factor;
        for channel in self.channels.iter_mut() {
            channel.rescale(ratio, &self.timing);
        }
        self.noise.rescale(ratio);
        debug!("speed factor {}%", factor);
    }

    /// Transpose every following note by `degrees` (360 per octave,
    /// clamped to ±1800).
    pub fn shift_frequency(&mut self, degrees: i16) {
        self.timing.shift = degrees.clamp(MIN_SHIFT_DEGREES, MAX_SHIFT_DEGREES);
        debug!("frequency shift {}", self.timing.shift);
    }

    /// Drop the text and return to the power-on state. Speed factor,
    /// frequency shift and the callback are kept.
    pub fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.reset();
        }
        self.mml_set = false;
        self.num_used = 0;
        self.status = PlayStatus::Stopped;
        self.prev_status = PlayStatus::Stopped;
        self.request = None;
        self.fin_loop_requested = false;
        self.fin_loop_try = 0;
        self.noise = NoiseSweep::default();
        self.regs.reset();
        debug!("slot reset");
    }

    fn rewind(&mut self) {
        let mixer = Register::Mixer.addr();
        self.regs.write(mixer, MIXER_ALL_OFF);
        let mask = self.active_channel_mask();
        self.regs.touch_mixer(mask);

        for channel in self.channels.iter_mut() {
            channel.rewind();
        }
        self.noise.stop();
        self.fin_loop_requested = false;
        self.fin_loop_try = 0;
    }

    fn context(&mut self, ch: usize) -> ChannelContext<'_, 'a> {
        ChannelContext {
            ch,
            channel: &mut self.channels[ch],
            regs: &mut self.regs,
            noise: &mut self.noise,
            timing: &self.timing,
            callback: &mut self.callback,
        }
    }

    fn service_request(&mut self) {
        match self.request.take() {
            Some(ControlRequest::Play) => {
                self.rewind();
                self.status = PlayStatus::Playing;
                debug!("play");
            }
            Some(ControlRequest::Stop) => {
                self.status = PlayStatus::Stopped;
                let mask = self.active_channel_mask();
                for ch in 0..NUM_CHANNEL {
                    if mask & (1 << ch) != 0 {
                        self.regs.mute(ch);
                    }
                }
                self.regs.touch_mixer(mask);
                debug!("stop");
            }
            None => {}
        }
    }

    fn service_finish_primary_loop(&mut self) {
        if self.fin_loop_requested {
            self.fin_loop_requested = false;
            self.fin_loop_try = MAX_FIN_PRI_LOOP_TRY;
            debug!("finish primary loop requested");
        }
        if self.fin_loop_try == 0 {
            return;
        }

        self.fin_loop_try -= 1;
        let aligned = if self.fin_loop_try > 0 {
            let first = self.channels[self.channel_index(0)].primary_loop_count();
            self.active_channels()
                .all(|ch| self.channels[ch].primary_loop_count() == first)
        } else {
            true
        };

        if aligned {
            for i in 0..self.num_used {
                let ch = self.channel_index(i);
                self.channels[ch].mml.end_primary_loop = true;
            }
            self.fin_loop_try = 0;
            debug!("primary loop exit armed");
        }
    }

    /// Advance the slot by one tick.
    ///
    /// Does nothing until text is set. Services play/stop requests, then
    /// for each channel in order: counts down the note and gate timers,
    /// decodes the next note when the note timer expires, closes the gate,
    /// and runs pitch bend, software envelope and LFO. The noise sweep runs
    /// last. The slot ends when every channel has finished its text.
    pub fn control_psg(&mut self) {
        self.prev_status = self.status;
        if !self.mml_set {
            return;
        }

        self.service_request();
        if self.status != PlayStatus::Playing {
            return;
        }

        self.service_finish_primary_loop();

        let mut decode_end_count = 0;
        for i in 0..self.num_used {
            let ch = self.channel_index(i);
            let mut ctx = self.context(ch);

            let timer = &mut ctx.channel.timer;
            timer.note_on = timer.note_on.saturating_sub(1);
            timer.gate = timer.gate.saturating_sub(1);

            if ctx.channel.timer.note_on == 0 {
                if ctx.channel.mml.decode_end {
                    decode_end_count += 1;
                } else {
                    ctx.decode_mml();
                }
            }

            ctx.tick_engines();
        }

        self.noise.tick(&mut self.regs);

        if decode_end_count >= self.num_used {
            self.status = PlayStatus::Ended;
            debug!("end of sequence");
        }
    }
}

impl ChannelContext<'_, '_> {
    /// Gate handling and the per-tick sub-engines of one channel.
    fn tick_engines(&mut self) {
        let ch = self.ch;
        let clock = self.clock();
        let volume = self.channel.tone.volume;

        let gate_closes = self.channel.tone.gate < (MAX_GATE_TIME - 1) as u8
            || self.channel.mml.decode_end;
        if self.channel.timer.gate == 0 && gate_closes && !self.regs.is_muted(ch) {
            let releasing = self.channel.envelope.note_off(volume, &clock);
            if !releasing {
                self.regs.mute(ch);
            }
        }

        self.channel.pitch_bend.tick(ch, self.regs);

        if self.channel.envelope.enabled {
            self.channel.envelope.tick(ch, self.regs, volume, &clock);
            if self.channel.envelope.phase() == EnvelopePhase::End {
                self.regs.mute(ch);
            }
        }

        if self.channel.lfo.enabled {
            let bend_stopped = self.channel.pitch_bend.is_stopped();
            self.channel.lfo.tick(ch, self.regs, bend_stopped);
        }
    }
}

impl fmt::Debug for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("config", &self.config)
            .field("status", &self.status)
            .field("channels_used", &self.num_used)
            .field("speed", &self.timing.speed)
            .field("shift", &self.timing.shift)
            .field("registers", &self.regs.data())
            .field("callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

//! The player handle: owns the decode source, texture and audio stream, and
//! runs the playback loop over them.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audio::AudioFeeder;
use crate::error::PlayerError;
use crate::hw::{AudioBackend, AudioStream, FillFn, Graphics, TextureId};
use crate::input::{CancelPolicy, CancelReason, CancelSpec, InputDevices, InputSnapshot};
use crate::playback::{Advance, Clock, PlaybackState, SystemClock, Timeline};
use crate::settings::PlayerOptions;
use crate::source::{DecodeSource, OpenSource, SharedSource, SourceInput, lock_source};
use crate::video::{FrameUploader, PolyHeader, TextureLayout, Vertex, video_quad};

/// Why a blocking play returned without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The stream ended with looping off.
    Finished,
    /// A configured cancel input matched.
    Cancelled,
    /// The software reset combo was held.
    Reset,
}

impl PlayOutcome {
    /// Integer result code: 0 finished, 1 cancelled, 2 reset. Errors use
    /// [`PlayerError::CODE`].
    pub fn code(self) -> i32 {
        match self {
            PlayOutcome::Finished => 0,
            PlayOutcome::Cancelled => 1,
            PlayOutcome::Reset => 2,
        }
    }
}

/// Result of one [`Player::decode_step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A new frame is due; upload and draw it.
    FrameReady,
    /// Nothing to do yet.
    Idle,
    EndOfStream,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Player<D: DecodeSource + 'static, G: Graphics, S: AudioStream> {
    source: Option<SharedSource<D>>,
    feeder: Arc<Mutex<AudioFeeder>>,
    graphics: G,
    texture: Option<TextureId>,
    stream: Option<S>,
    layout: TextureLayout,
    uploader: FrameUploader,
    header: Option<PolyHeader>,
    quad: [Vertex; 4],
    options: PlayerOptions,
    timeline: Timeline,
    clock: Box<dyn Clock>,
    sample_rate: u32,
    audio_running: bool,
}

impl<D, G, S> Player<D, G, S>
where
    D: OpenSource + 'static,
    G: Graphics,
    S: AudioStream,
{
    pub fn from_file<A>(path: impl AsRef<Path>, graphics: G, audio: &mut A) -> Result<Self, PlayerError>
    where
        A: AudioBackend<Stream = S>,
    {
        Self::from_file_with_options(path, graphics, audio, PlayerOptions::default())
    }

    pub fn from_file_with_options<A>(
        path: impl AsRef<Path>,
        graphics: G,
        audio: &mut A,
        options: PlayerOptions,
    ) -> Result<Self, PlayerError>
    where
        A: AudioBackend<Stream = S>,
    {
        let path = path.as_ref();
        log::info!("Opening {}", path.display());
        let source = D::open(SourceInput::File(path.to_path_buf()))?;
        Self::with_source(source, graphics, audio, options)
    }

    pub fn from_memory<A>(bytes: Vec<u8>, graphics: G, audio: &mut A) -> Result<Self, PlayerError>
    where
        A: AudioBackend<Stream = S>,
    {
        Self::from_memory_with_options(bytes, graphics, audio, PlayerOptions::default())
    }

    pub fn from_memory_with_options<A>(
        bytes: Vec<u8>,
        graphics: G,
        audio: &mut A,
        options: PlayerOptions,
    ) -> Result<Self, PlayerError>
    where
        A: AudioBackend<Stream = S>,
    {
        log::info!("Opening {} byte stream from memory", bytes.len());
        let source = D::open(SourceInput::Memory(bytes))?;
        Self::with_source(source, graphics, audio, options)
    }
}

impl<D, G, S> Player<D, G, S>
where
    D: DecodeSource + 'static,
    G: Graphics,
    S: AudioStream,
{
    /// Build a player around an already opened source.
    ///
    /// On failure everything acquired so far is released before the error
    /// is returned.
    pub fn with_source<A>(
        mut source: D,
        graphics: G,
        audio: &mut A,
        options: PlayerOptions,
    ) -> Result<Self, PlayerError>
    where
        A: AudioBackend<Stream = S>,
    {
        let layout = TextureLayout::new(source.width(), source.height())?;
        let sample_rate = source.sample_rate();
        source.set_loop(options.looping);

        let mut player = Self {
            source: Some(Arc::new(Mutex::new(source))),
            feeder: Arc::new(Mutex::new(AudioFeeder::new())),
            graphics,
            texture: None,
            stream: None,
            layout,
            uploader: FrameUploader::new(layout),
            header: None,
            quad: video_quad(options.screen_size, layout.uv_scale()),
            options,
            timeline: Timeline::new(),
            clock: Box::new(SystemClock::new()),
            sample_rate,
            audio_running: false,
        };
        player.setup_graphics()?;
        player.setup_audio(audio)?;

        log::info!(
            "Player ready: {}x{} video in {}x{} texture, {} Hz audio",
            layout.video_width,
            layout.video_height,
            layout.texture_width,
            layout.texture_height,
            sample_rate
        );
        Ok(player)
    }

    /// Replace the pacing clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    fn setup_graphics(&mut self) -> Result<(), PlayerError> {
        let bytes = self.layout.texture_bytes();
        let texture = self.graphics.alloc_texture(bytes)?;
        self.texture = Some(texture);
        self.graphics.clear_texture(texture, bytes);
        self.graphics.configure_converter(
            texture,
            self.layout.texture_blocks_x(),
            self.layout.texture_blocks_y(),
        );
        self.header = Some(PolyHeader::compile(
            self.options.list_type,
            self.options.filter,
            texture,
            &self.layout,
        ));
        log::debug!(
            "Texture {} configured: {}x{} blocks, {} bytes",
            texture.0,
            self.layout.texture_blocks_x(),
            self.layout.texture_blocks_y(),
            bytes
        );
        Ok(())
    }

    fn setup_audio<A: AudioBackend<Stream = S>>(&mut self, audio: &mut A) -> Result<(), PlayerError> {
        let source = Arc::clone(self.shared_source()?);
        let feeder = Arc::clone(&self.feeder);
        // Lock order inside the callback is feeder, then source.
        let fill: FillFn = Box::new(move |out: &mut [u8]| {
            lock(&feeder).fill(&*source, out);
        });
        let mut stream = audio.open_stream(fill, self.options.audio_buffer_bytes)?;
        stream.set_volume(self.options.volume);
        self.stream = Some(stream);
        Ok(())
    }

    fn shared_source(&self) -> Result<&SharedSource<D>, PlayerError> {
        self.source
            .as_ref()
            .ok_or(PlayerError::InvalidState("decode source released"))
    }

    fn stream_mut(&mut self) -> Result<&mut S, PlayerError> {
        self.stream
            .as_mut()
            .ok_or(PlayerError::InvalidState("audio stream released"))
    }

    /// Release texture, audio stream and decode source, in that order.
    /// Safe to call on a partially built player and more than once.
    fn release(&mut self) {
        if let Some(texture) = self.texture.take() {
            self.graphics.free_texture(texture);
            log::debug!("Released texture {}", texture.0);
        }
        if let Some(mut stream) = self.stream.take() {
            if self.audio_running {
                stream.stop();
                self.audio_running = false;
            }
            drop(stream);
            log::debug!("Released audio stream");
        }
        if self.source.take().is_some() {
            log::debug!("Released decode source");
        }
    }

    /// Tear the player down now rather than at end of scope.
    pub fn destroy(mut self) {
        self.release();
        log::info!("Player destroyed");
    }

    pub fn is_looping(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| lock_source(source).is_looping())
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.options.looping = enabled;
        if let Some(source) = &self.source {
            lock_source(source).set_loop(enabled);
        }
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.options.volume = volume;
        if let Some(stream) = self.stream.as_mut() {
            stream.set_volume(volume);
        }
    }

    /// Start the audio stream at the source's sample rate.
    pub fn start_audio(&mut self) -> Result<(), PlayerError> {
        let rate = self.sample_rate;
        self.stream_mut()?.start(rate)?;
        self.audio_running = true;
        Ok(())
    }

    pub fn stop_audio(&mut self) {
        if let Some(stream) = self.stream.as_mut() {
            if self.audio_running {
                stream.stop();
            }
        }
        self.audio_running = false;
    }

    /// Play until the stream ends or every button in `cancel_buttons` is
    /// held. A zero mask leaves only the reset combo able to stop playback.
    pub fn play<I: InputDevices + ?Sized>(
        &mut self,
        input: &mut I,
        cancel_buttons: u32,
    ) -> Result<PlayOutcome, PlayerError> {
        self.play_with(input, &CancelSpec::buttons(cancel_buttons))
    }

    /// Play until the stream ends or an input matching `cancel` is seen.
    /// Blocks the calling thread throughout.
    pub fn play_with<I: InputDevices + ?Sized>(
        &mut self,
        input: &mut I,
        cancel: &CancelSpec,
    ) -> Result<PlayOutcome, PlayerError> {
        let source = Arc::clone(self.shared_source()?);
        let policy = CancelPolicy::new(cancel);

        if self.timeline.state() != PlaybackState::Unstarted {
            lock_source(&source).rewind();
        }
        self.timeline.reset();
        lock(&self.feeder).reset();

        let result = self.run(&source, input, &policy);
        if result.is_err() {
            self.timeline.fail();
        }

        self.stop_audio();
        lock(&self.feeder).reset();

        match &result {
            Ok(outcome) => log::info!(
                "Playback ended: {outcome:?} after {} frames",
                self.timeline.frames_presented()
            ),
            Err(e) => log::warn!("Playback failed: {e}"),
        }
        result
    }

    fn run<I: InputDevices + ?Sized>(
        &mut self,
        source: &SharedSource<D>,
        input: &mut I,
        policy: &CancelPolicy,
    ) -> Result<PlayOutcome, PlayerError> {
        self.start_audio()?;
        if !self.timeline.prime(source, self.clock.now())? {
            return Err(PlayerError::EmptyStream);
        }

        let mut snapshot = InputSnapshot::default();
        loop {
            let now = self.clock.now();

            input.poll(&mut snapshot);
            if let Some(reason) = policy.evaluate(&snapshot) {
                self.timeline.cancel();
                return Ok(match reason {
                    CancelReason::User => PlayOutcome::Cancelled,
                    CancelReason::Reset => PlayOutcome::Reset,
                });
            }

            if let Some(stream) = self.stream.as_mut() {
                stream.poll();
            }

            if !self.timeline.is_due(now) {
                std::thread::yield_now();
                continue;
            }

            self.render()?;
            self.timeline.present();

            match self.timeline.advance(source)? {
                Advance::Next => {}
                Advance::EndOfStream => return Ok(PlayOutcome::Finished),
                Advance::Loop => self.loop_restart(source)?,
            }
        }
    }

    /// Rewind to the first frame with fresh audio state and a new clock
    /// reference.
    fn loop_restart(&mut self, source: &SharedSource<D>) -> Result<(), PlayerError> {
        let resume_audio = self.audio_running;
        self.stop_audio();

        let restarted = self.timeline.restart(source, self.clock.now())?;
        lock(&self.feeder).reset();
        if !restarted {
            return Err(PlayerError::EmptyStream);
        }

        if resume_audio {
            self.start_audio()?;
        }
        Ok(())
    }

    /// One non-blocking tick for callers running their own render loop.
    ///
    /// Returns [`StepResult::FrameReady`] when a new frame is due; the
    /// caller should then [`upload_frame`](Self::upload_frame) and
    /// [`draw_frame`](Self::draw_frame) before stepping again, since the
    /// next step decodes over it. Input is not checked here.
    pub fn decode_step(&mut self) -> Result<StepResult, PlayerError> {
        let source = Arc::clone(self.shared_source()?);

        match self.timeline.state() {
            PlaybackState::Unstarted => {
                if !self.timeline.prime(&source, self.clock.now())? {
                    return Ok(StepResult::EndOfStream);
                }
            }
            PlaybackState::LoopRestart => self.loop_restart(&source)?,
            state if state.is_terminal() => return Ok(StepResult::EndOfStream),
            _ => {}
        }

        if let Some(stream) = self.stream.as_mut() {
            stream.poll();
        }

        if self.timeline.is_presented() {
            match self.timeline.advance(&source)? {
                Advance::Next => {}
                Advance::EndOfStream => return Ok(StepResult::EndOfStream),
                Advance::Loop => self.loop_restart(&source)?,
            }
        }

        if self.timeline.is_due(self.clock.now()) {
            self.timeline.present();
            Ok(StepResult::FrameReady)
        } else {
            Ok(StepResult::Idle)
        }
    }

    /// Send the current frame through the texture converter if it has not
    /// been sent yet. Returns whether anything was uploaded.
    pub fn upload_frame(&mut self) -> Result<bool, PlayerError> {
        if self.texture.is_none() {
            return Err(PlayerError::InvalidState("texture released"));
        }
        if !self.timeline.slot().pending_upload() {
            return Ok(false);
        }
        let Some(frame) = self.timeline.frame() else {
            return Ok(false);
        };
        self.uploader.upload(&mut self.graphics, frame)?;
        self.timeline.mark_uploaded();
        Ok(true)
    }

    /// Submit the video quad into the currently open list.
    pub fn draw_frame(&mut self) {
        if let Some(header) = &self.header {
            self.graphics.submit_header(header);
            self.graphics.submit_vertices(bytemuck::cast_slice(&self.quad));
        }
    }

    /// A full scene: upload the pending frame, then draw it.
    pub fn render(&mut self) -> Result<bool, PlayerError> {
        self.graphics.wait_ready();
        self.graphics.begin_scene();
        let uploaded = self.upload_frame();
        self.graphics.begin_list(self.options.list_type);
        self.draw_frame();
        self.graphics.end_list();
        self.graphics.end_scene();
        uploaded
    }

    /// Polygon header for drawing the video texture on custom geometry.
    pub fn texture_header(&self) -> Option<&PolyHeader> {
        self.header.as_ref()
    }

    /// Texture coordinates of the video's bottom-right corner.
    pub fn uv_scale(&self) -> (f32, f32) {
        self.layout.uv_scale()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.layout.video_width, self.layout.video_height)
    }

    pub fn texture_dimensions(&self) -> (u32, u32) {
        (self.layout.texture_width, self.layout.texture_height)
    }

    /// Presentation time of the most recently decoded audio chunk.
    pub fn audio_time(&self) -> f64 {
        lock(&self.feeder).audio_time()
    }

    /// Unread audio bytes carried over between hardware pulls.
    pub fn audio_carry_over(&self) -> usize {
        lock(&self.feeder).carry_over()
    }

    pub fn audio_underruns(&self) -> u64 {
        lock(&self.feeder).underruns()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> PlaybackState {
        self.timeline.state()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Seconds since the current pass's clock reference.
    pub fn elapsed(&self) -> f64 {
        self.timeline.elapsed(self.clock.now())
    }

    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    pub fn graphics(&self) -> &G {
        &self.graphics
    }

    pub fn graphics_mut(&mut self) -> &mut G {
        &mut self.graphics
    }
}

impl<D, G, S> Drop for Player<D, G, S>
where
    D: DecodeSource + 'static,
    G: Graphics,
    S: AudioStream,
{
    fn drop(&mut self) {
        self.release();
    }
}

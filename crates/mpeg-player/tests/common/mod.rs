//! Scripted collaborators for driving a whole `Player` in tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use mpeg_player::error::{DecodeError, HardwareError};
use mpeg_player::hw::{AudioBackend, AudioStream, FillFn, Graphics, TextureId};
use mpeg_player::input::{ControllerState, InputDevices, InputSnapshot};
use mpeg_player::playback::ManualClock;
use mpeg_player::settings::ListType;
use mpeg_player::source::{AudioChunk, DecodeSource, DecodeStatus, Frame};
use mpeg_player::video::{CONVERTER_BLOCK_BYTES, PolyHeader};
use mpeg_player::{PlayerOptions, SoftwareGraphics};

/// Luma offset of the first luma byte inside a converter block.
const LUMA_OFFSET: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TextureAlloc,
    TextureFree,
    Scene,
    /// First block of a frame reached the converter; carries the frame index.
    Upload(u8),
    Quad,
    StreamOpen,
    StreamStart(u32),
    StreamStop,
    StreamDrop,
    SourceDrop,
    /// Input polled at this tick.
    Tick(u32),
}

#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<Event>>>);

impl Log {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Frame indices in upload order.
    pub fn uploads(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Upload(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    /// Only the tick and upload events, in order.
    pub fn pacing(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, Event::Tick(_) | Event::Upload(_)))
            .collect()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

/// 16x16 source whose frames carry their index in every luma byte.
pub struct ScriptedSource {
    times: Vec<f64>,
    next_frame: usize,
    audio_chunks: usize,
    next_chunk: usize,
    chunk: AudioChunk,
    width: u32,
    height: u32,
    looping: bool,
    log: Log,
}

impl ScriptedSource {
    pub fn new(times: &[f64], log: &Log) -> Self {
        Self {
            times: times.to_vec(),
            next_frame: 0,
            audio_chunks: 8,
            next_chunk: 0,
            chunk: AudioChunk::silent(0.0),
            width: 16,
            height: 16,
            looping: false,
            log: log.clone(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

impl DecodeSource for ScriptedSource {
    fn decode_video(&mut self, frame: &mut Frame) -> Result<DecodeStatus, DecodeError> {
        let Some(&time) = self.times.get(self.next_frame) else {
            return Ok(DecodeStatus::EndOfStream);
        };
        if frame.width != self.width || frame.height != self.height {
            frame.reset(self.width, self.height);
        }
        frame.y.data.fill(self.next_frame as u8);
        frame.time = time;
        self.next_frame += 1;
        Ok(DecodeStatus::Decoded)
    }

    fn decode_audio(&mut self) -> Result<Option<&AudioChunk>, DecodeError> {
        if self.next_chunk >= self.audio_chunks {
            return Ok(None);
        }
        self.chunk.samples.fill(1000 + self.next_chunk as i16);
        self.chunk.time = self.next_chunk as f64 * 0.05;
        self.next_chunk += 1;
        Ok(Some(&self.chunk))
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn sample_rate(&self) -> u32 {
        22050
    }

    fn set_loop(&mut self, enabled: bool) {
        self.looping = enabled;
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn rewind(&mut self) {
        self.next_frame = 0;
        self.next_chunk = 0;
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.log.push(Event::SourceDrop);
    }
}

/// Software converter that also logs what happens to it.
pub struct RecordingGraphics {
    inner: SoftwareGraphics,
    log: Log,
    per_frame: u32,
    counter: u32,
}

impl RecordingGraphics {
    pub fn new(log: &Log) -> Self {
        Self::with_vram(log, mpeg_player::hw::software::DEFAULT_VRAM_BYTES)
    }

    pub fn with_vram(log: &Log, bytes: usize) -> Self {
        Self {
            inner: SoftwareGraphics::new(bytes),
            log: log.clone(),
            per_frame: 1,
            counter: 0,
        }
    }

    pub fn software(&self) -> &SoftwareGraphics {
        &self.inner
    }

    fn count_transfer(&mut self) {
        self.counter = (self.counter + 1) % self.per_frame;
    }
}

impl Graphics for RecordingGraphics {
    fn alloc_texture(&mut self, bytes: usize) -> Result<TextureId, HardwareError> {
        let texture = self.inner.alloc_texture(bytes)?;
        self.log.push(Event::TextureAlloc);
        Ok(texture)
    }

    fn free_texture(&mut self, texture: TextureId) {
        self.inner.free_texture(texture);
        self.log.push(Event::TextureFree);
    }

    fn clear_texture(&mut self, texture: TextureId, bytes: usize) {
        self.inner.clear_texture(texture, bytes);
    }

    fn configure_converter(&mut self, texture: TextureId, blocks_x: u32, blocks_y: u32) {
        self.per_frame = blocks_x * blocks_y;
        self.counter = 0;
        self.inner.configure_converter(texture, blocks_x, blocks_y);
    }

    fn transfer_block(&mut self, block: &[u8; CONVERTER_BLOCK_BYTES]) {
        if self.counter == 0 {
            self.log.push(Event::Upload(block[LUMA_OFFSET]));
        }
        self.count_transfer();
        self.inner.transfer_block(block);
    }

    fn transfer_filler(&mut self) {
        self.count_transfer();
        self.inner.transfer_filler();
    }

    fn wait_ready(&mut self) {
        self.inner.wait_ready();
    }

    fn begin_scene(&mut self) {
        self.log.push(Event::Scene);
        self.inner.begin_scene();
    }

    fn begin_list(&mut self, list: ListType) {
        self.inner.begin_list(list);
    }

    fn submit_header(&mut self, header: &PolyHeader) {
        self.inner.submit_header(header);
    }

    fn submit_vertices(&mut self, data: &[u8]) {
        self.log.push(Event::Quad);
        self.inner.submit_vertices(data);
    }

    fn end_list(&mut self) {
        self.inner.end_list();
    }

    fn end_scene(&mut self) {
        self.inner.end_scene();
    }
}

/// Audio backend whose streams pull a fixed amount per poll while started.
pub struct FakeAudio {
    pub log: Log,
    pub fail_open: bool,
    pub pull_bytes: usize,
    /// Volume last set on any stream this backend opened.
    pub volume: Arc<Mutex<u8>>,
    /// Every byte handed out by the fill function, across streams.
    pub pulled: Arc<Mutex<Vec<u8>>>,
}

impl FakeAudio {
    pub fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            fail_open: false,
            pull_bytes: 512,
            volume: Arc::new(Mutex::new(0)),
            pulled: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(log: &Log) -> Self {
        Self {
            fail_open: true,
            ..Self::new(log)
        }
    }

    /// Samples pulled so far, decoded from native-endian PCM.
    pub fn samples(&self) -> Vec<i16> {
        self.pulled
            .lock()
            .unwrap()
            .chunks_exact(2)
            .map(|b| i16::from_ne_bytes([b[0], b[1]]))
            .collect()
    }
}

impl AudioBackend for FakeAudio {
    type Stream = FakeStream;

    fn open_stream(&mut self, fill: FillFn, buffer_bytes: usize) -> Result<FakeStream, HardwareError> {
        if self.fail_open {
            return Err(HardwareError::AudioStream("no free channels".into()));
        }
        self.log.push(Event::StreamOpen);
        Ok(FakeStream {
            fill,
            log: self.log.clone(),
            pull: vec![0; self.pull_bytes.min(buffer_bytes)],
            started: false,
            volume: Arc::clone(&self.volume),
            pulled: Arc::clone(&self.pulled),
        })
    }
}

pub struct FakeStream {
    fill: FillFn,
    log: Log,
    pull: Vec<u8>,
    started: bool,
    volume: Arc<Mutex<u8>>,
    pulled: Arc<Mutex<Vec<u8>>>,
}

impl AudioStream for FakeStream {
    fn start(&mut self, sample_rate: u32) -> Result<(), HardwareError> {
        self.started = true;
        self.log.push(Event::StreamStart(sample_rate));
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
        self.log.push(Event::StreamStop);
    }

    fn poll(&mut self) {
        if self.started {
            (self.fill)(&mut self.pull);
            self.pulled.lock().unwrap().extend_from_slice(&self.pull);
        }
    }

    fn set_volume(&mut self, volume: u8) {
        *self.volume.lock().unwrap() = volume;
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.log.push(Event::StreamDrop);
    }
}

/// Controller input driven by tick number. Each poll logs the tick and then
/// moves the shared clock to `(tick + 1) * step`, so the tick that reads the
/// clock before polling sees exactly `tick * step`.
pub struct ScriptedInput {
    clock: ManualClock,
    step: f64,
    tick: u32,
    log: Log,
    /// `(tick, buttons)` held from that tick on.
    presses: Vec<(u32, u32)>,
    /// Give up after this many ticks.
    limit: u32,
}

impl ScriptedInput {
    pub fn new(clock: &ManualClock, step: f64, log: &Log) -> Self {
        Self {
            clock: clock.clone(),
            step,
            tick: 0,
            log: log.clone(),
            presses: Vec::new(),
            limit: 10_000,
        }
    }

    pub fn press_at(mut self, tick: u32, buttons: u32) -> Self {
        self.presses.push((tick, buttons));
        self
    }

    /// Rewind the script and the clock to tick zero.
    pub fn restart(&mut self) {
        self.tick = 0;
        self.clock.set(0.0);
    }
}

impl InputDevices for ScriptedInput {
    fn poll(&mut self, snapshot: &mut InputSnapshot) {
        assert!(self.tick < self.limit, "playback did not terminate");
        snapshot.clear();
        let buttons = self
            .presses
            .iter()
            .filter(|(at, _)| *at <= self.tick)
            .map(|(_, b)| *b)
            .last()
            .unwrap_or(0);
        snapshot.controllers.push(ControllerState { buttons });
        self.log.push(Event::Tick(self.tick));
        self.tick += 1;
        self.clock.set(f64::from(self.tick) * self.step);
    }
}

pub fn options(looping: bool) -> PlayerOptions {
    PlayerOptions {
        looping,
        ..Default::default()
    }
}

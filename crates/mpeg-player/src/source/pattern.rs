//! Synthetic test-pattern source: scrolling colour bars and a sine tone.
//!
//! Opened from a small JSON descriptor (file or memory) so the whole player
//! can be exercised without an MPEG1 decoder.

use std::f32::consts::TAU;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{AUDIO_CHUNK_SAMPLES, AudioChunk, DecodeStatus, Frame, SourceInput};
use super::{DecodeSource, OpenSource};
use crate::error::DecodeError;

/// BT.601 studio-range YCbCr for white, yellow, cyan, green, magenta, red, blue, black.
const BARS: [(u8, u8, u8); 8] = [
    (235, 128, 128),
    (210, 16, 146),
    (170, 166, 16),
    (145, 54, 34),
    (106, 202, 222),
    (81, 90, 240),
    (41, 240, 110),
    (16, 128, 128),
];

const TONE_AMPLITUDE: f32 = 8000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternDescriptor {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub frames: u32,
    pub sample_rate: u32,
    pub tone_hz: f32,
    /// Pixels the bars move per frame.
    pub scroll: u32,
}

impl Default for PatternDescriptor {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            fps: 25.0,
            frames: 250,
            sample_rate: 22050,
            tone_hz: 440.0,
            scroll: 2,
        }
    }
}

impl PatternDescriptor {
    pub fn duration_secs(&self) -> f64 {
        f64::from(self.frames) / self.fps
    }

    fn validate(&self) -> Result<(), DecodeError> {
        if self.width == 0 || self.height == 0 {
            return Err(DecodeError::InvalidSource(format!(
                "pattern dimensions {}x{}",
                self.width, self.height
            )));
        }
        if self.fps.is_nan() || self.fps <= 0.0 {
            return Err(DecodeError::InvalidSource(format!("pattern fps {}", self.fps)));
        }
        if self.sample_rate == 0 {
            return Err(DecodeError::InvalidSource("pattern sample rate 0".into()));
        }
        Ok(())
    }
}

pub struct PatternSource {
    desc: PatternDescriptor,
    next_frame: u32,
    next_sample: u64,
    total_samples: u64,
    chunk: AudioChunk,
    looping: bool,
}

impl PatternSource {
    pub fn new(desc: PatternDescriptor) -> Result<Self, DecodeError> {
        desc.validate()?;
        let total_samples = (desc.duration_secs() * f64::from(desc.sample_rate)).ceil() as u64;
        Ok(Self {
            desc,
            next_frame: 0,
            next_sample: 0,
            total_samples,
            chunk: AudioChunk::silent(0.0),
            looping: false,
        })
    }

    pub fn descriptor(&self) -> &PatternDescriptor {
        &self.desc
    }

    fn from_json(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::InvalidSource("empty pattern buffer".into()));
        }
        let desc: PatternDescriptor = serde_json::from_slice(bytes)
            .map_err(|e| DecodeError::Malformed(format!("pattern descriptor: {e}")))?;
        Self::new(desc)
    }

    fn from_path(path: &Path) -> Result<Self, DecodeError> {
        let bytes = std::fs::read(path)?;
        log::debug!("Opened pattern descriptor {}", path.display());
        Self::from_json(&bytes)
    }

    fn paint(&self, frame: &mut Frame, index: u32) {
        let bar_width = (self.desc.width / BARS.len() as u32).max(1);
        let shift = index.wrapping_mul(self.desc.scroll);
        let coded_w = frame.y.width;

        for y in 0..frame.y.height {
            let row = frame.y.row_mut(y);
            for x in 0..coded_w {
                let bar = (x.wrapping_add(shift) / bar_width) as usize % BARS.len();
                row[x as usize] = BARS[bar].0;
            }
        }
        for y in 0..frame.cb.height {
            for x in 0..frame.cb.width {
                let bar = ((x * 2).wrapping_add(shift) / bar_width) as usize % BARS.len();
                frame.cb.row_mut(y)[x as usize] = BARS[bar].1;
                frame.cr.row_mut(y)[x as usize] = BARS[bar].2;
            }
        }
    }
}

impl DecodeSource for PatternSource {
    fn decode_video(&mut self, frame: &mut Frame) -> Result<DecodeStatus, DecodeError> {
        if self.next_frame >= self.desc.frames {
            return Ok(DecodeStatus::EndOfStream);
        }
        if frame.width != self.desc.width || frame.height != self.desc.height {
            frame.reset(self.desc.width, self.desc.height);
        }
        let index = self.next_frame;
        self.paint(frame, index);
        frame.time = f64::from(index) / self.desc.fps;
        self.next_frame += 1;
        Ok(DecodeStatus::Decoded)
    }

    fn decode_audio(&mut self) -> Result<Option<&AudioChunk>, DecodeError> {
        if self.next_sample >= self.total_samples {
            return Ok(None);
        }
        let rate = self.desc.sample_rate as f32;
        let start = self.next_sample;
        self.chunk.time = start as f64 / f64::from(self.desc.sample_rate);
        self.chunk.samples.resize(AUDIO_CHUNK_SAMPLES, 0);
        for (i, sample) in self.chunk.samples.iter_mut().enumerate() {
            let n = start + i as u64;
            *sample = if n < self.total_samples {
                // Phase from the sample index modulo one period keeps f32 precise.
                let period = (rate / self.desc.tone_hz).max(1.0);
                let phase = (n as f32 % period) / period;
                (TONE_AMPLITUDE * (TAU * phase).sin()) as i16
            } else {
                0
            };
        }
        self.next_sample += AUDIO_CHUNK_SAMPLES as u64;
        Ok(Some(&self.chunk))
    }

    fn width(&self) -> u32 {
        self.desc.width
    }

    fn height(&self) -> u32 {
        self.desc.height
    }

    fn sample_rate(&self) -> u32 {
        self.desc.sample_rate
    }

    fn set_loop(&mut self, enabled: bool) {
        self.looping = enabled;
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn rewind(&mut self) {
        self.next_frame = 0;
        self.next_sample = 0;
    }
}

impl OpenSource for PatternSource {
    fn open(input: SourceInput) -> Result<Self, DecodeError> {
        match input {
            SourceInput::File(path) => Self::from_path(&path),
            SourceInput::Memory(bytes) => Self::from_json(&bytes),
        }
    }
}

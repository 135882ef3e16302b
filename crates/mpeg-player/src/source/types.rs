use std::path::PathBuf;

/// Edge length of a macroblock in luma pixels.
pub const MACROBLOCK_SIZE: u32 = 16;

/// Samples in one decoded MPEG1 layer II audio frame.
pub const AUDIO_CHUNK_SAMPLES: usize = 1152;

/// Bytes in one decoded audio chunk (mono, 16-bit).
pub const AUDIO_CHUNK_BYTES: usize = AUDIO_CHUNK_SAMPLES * 2;

const BLACK_LUMA: u8 = 16;
const NEUTRAL_CHROMA: u8 = 128;

/// Where a decode source reads its stream from.
#[derive(Debug, Clone)]
pub enum SourceInput {
    File(PathBuf),
    Memory(Vec<u8>),
}

/// Outcome of a video decode that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    Decoded,
    EndOfStream,
}

/// One 8-bit image plane. `width` is the coded (macroblock aligned) width,
/// which is also the row stride.
#[derive(Debug, Clone, Default)]
pub struct Plane {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Plane {
    pub fn new(width: u32, height: u32, fill: u8) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width as usize * height as usize],
        }
    }

    /// Resize in place, keeping the allocation when possible.
    pub fn resize(&mut self, width: u32, height: u32, fill: u8) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width as usize * height as usize, fill);
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.data[start..start + self.width as usize]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.width as usize;
        let width = self.width as usize;
        &mut self.data[start..start + width]
    }
}

/// A decoded YCbCr 4:2:0 picture.
///
/// Planes are stored at coded size: luma is `blocks_x * 16` by
/// `blocks_y * 16`, chroma half that in each direction. `width`/`height` are
/// the display dimensions.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Presentation time in seconds from stream start.
    pub time: f64,
    pub y: Plane,
    pub cb: Plane,
    pub cr: Plane,
}

impl Frame {
    /// A black frame with planes allocated at coded size.
    pub fn new(width: u32, height: u32) -> Self {
        let mut frame = Self::default();
        frame.reset(width, height);
        frame
    }

    /// Reallocate planes for new dimensions and clear to black.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.time = 0.0;
        let coded_w = self.blocks_x() * MACROBLOCK_SIZE;
        let coded_h = self.blocks_y() * MACROBLOCK_SIZE;
        self.y.resize(coded_w, coded_h, BLACK_LUMA);
        self.cb.resize(coded_w / 2, coded_h / 2, NEUTRAL_CHROMA);
        self.cr.resize(coded_w / 2, coded_h / 2, NEUTRAL_CHROMA);
    }

    /// Macroblock columns covering the display width.
    pub fn blocks_x(&self) -> u32 {
        self.width.div_ceil(MACROBLOCK_SIZE)
    }

    /// Macroblock rows covering the display height.
    pub fn blocks_y(&self) -> u32 {
        self.height.div_ceil(MACROBLOCK_SIZE)
    }
}

/// One decoded block of mono PCM.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
    /// Presentation time of the first sample, in seconds.
    pub time: f64,
}

impl AudioChunk {
    pub fn silent(time: f64) -> Self {
        Self {
            samples: vec![0; AUDIO_CHUNK_SAMPLES],
            time,
        }
    }

    /// Native-endian PCM bytes, as the audio hardware consumes them.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.samples)
    }
}

//! Hardware collaborator boundary.
//!
//! Register programming, video memory management and bulk transfers stay
//! behind [`Graphics`]; the pull-driven audio channel stays behind
//! [`AudioBackend`] / [`AudioStream`]. The player never touches hardware
//! directly.

pub mod software;

use crate::error::HardwareError;
use crate::settings::ListType;
use crate::video::{CONVERTER_BLOCK_BYTES, PolyHeader};

pub use software::{GraphicsStats, SoftwareGraphics};

/// Fill callback handed to an audio stream. Must write exactly `out.len()` bytes.
pub type FillFn = Box<dyn FnMut(&mut [u8]) + Send + 'static>;

/// Video memory address of an allocated texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

pub trait Graphics {
    fn alloc_texture(&mut self, bytes: usize) -> Result<TextureId, HardwareError>;
    fn free_texture(&mut self, texture: TextureId);
    fn clear_texture(&mut self, texture: TextureId, bytes: usize);

    /// Point the texture converter at `texture`, laid out as
    /// `blocks_x` by `blocks_y` macroblocks.
    fn configure_converter(&mut self, texture: TextureId, blocks_x: u32, blocks_y: u32);
    /// Push one macroblock into the converter.
    fn transfer_block(&mut self, block: &[u8; CONVERTER_BLOCK_BYTES]);
    /// Push one dummy macroblock to keep the converter's stride aligned.
    fn transfer_filler(&mut self);

    /// Block until the renderer can accept a new scene.
    fn wait_ready(&mut self);
    fn begin_scene(&mut self);
    fn begin_list(&mut self, list: ListType);
    fn submit_header(&mut self, header: &PolyHeader);
    /// Raw vertex commands, 32 bytes each.
    fn submit_vertices(&mut self, data: &[u8]);
    fn end_list(&mut self);
    fn end_scene(&mut self);
}

pub trait AudioBackend {
    type Stream: AudioStream;

    /// Allocate a stream that calls `fill` whenever the hardware wants more
    /// samples. Dropping the stream releases it.
    fn open_stream(
        &mut self,
        fill: FillFn,
        buffer_bytes: usize,
    ) -> Result<Self::Stream, HardwareError>;
}

pub trait AudioStream {
    fn start(&mut self, sample_rate: u32) -> Result<(), HardwareError>;
    fn stop(&mut self);
    /// Give the stream a chance to service pending pulls. Streams driven by
    /// their own callback thread may do nothing here.
    fn poll(&mut self);
    fn set_volume(&mut self, volume: u8);
}

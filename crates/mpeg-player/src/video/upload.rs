//! Macroblock upload into the texture converter.
//!
//! The converter consumes 4:2:0 macroblocks in a fixed byte order and writes
//! them into the texture left to right, top to bottom, wrapping after
//! `texture_blocks_x` blocks. Every row of real macroblocks is therefore
//! followed by filler blocks up to the texture stride, and the frame by
//! filler rows up to the texture height. Miss one and every later row lands
//! in the wrong place.

use super::layout::TextureLayout;
use crate::error::UploadError;
use crate::hw::Graphics;
use crate::source::{Frame, MACROBLOCK_SIZE, Plane};

/// One converter macroblock: Cb 8x8, Cr 8x8, then the four 8x8 luma blocks
/// (top-left, top-right, bottom-left, bottom-right).
pub const CONVERTER_BLOCK_BYTES: usize = 384;

const CHROMA_BLOCK: usize = 8;
const CB_OFFSET: usize = 0;
const CR_OFFSET: usize = 64;
const LUMA_OFFSET: usize = 128;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub blocks: u32,
    pub fillers: u32,
}

impl UploadStats {
    pub fn transfers(&self) -> u32 {
        self.blocks + self.fillers
    }
}

pub struct FrameUploader {
    layout: TextureLayout,
    block: [u8; CONVERTER_BLOCK_BYTES],
}

impl FrameUploader {
    pub fn new(layout: TextureLayout) -> Self {
        Self {
            layout,
            block: [0; CONVERTER_BLOCK_BYTES],
        }
    }

    pub fn layout(&self) -> &TextureLayout {
        &self.layout
    }

    /// Send `frame` through the converter, padded to the texture stride.
    pub fn upload<G: Graphics + ?Sized>(
        &mut self,
        gfx: &mut G,
        frame: &Frame,
    ) -> Result<UploadStats, UploadError> {
        self.check(frame)?;

        let blocks_x = self.layout.video_blocks_x();
        let blocks_y = self.layout.video_blocks_y();
        let padding = self.layout.padding_per_row();
        let mut stats = UploadStats::default();

        for by in 0..blocks_y {
            for bx in 0..blocks_x {
                gather_macroblock(frame, bx, by, &mut self.block);
                gfx.transfer_block(&self.block);
                stats.blocks += 1;
            }
            for _ in 0..padding {
                gfx.transfer_filler();
                stats.fillers += 1;
            }
        }

        for _ in 0..self.layout.filler_rows() * self.layout.texture_blocks_x() {
            gfx.transfer_filler();
            stats.fillers += 1;
        }

        Ok(stats)
    }

    fn check(&self, frame: &Frame) -> Result<(), UploadError> {
        if frame.width != self.layout.video_width || frame.height != self.layout.video_height {
            return Err(UploadError::FrameSize {
                expected: (self.layout.video_width, self.layout.video_height),
                actual: (frame.width, frame.height),
            });
        }
        let luma_w = self.layout.video_blocks_x() * MACROBLOCK_SIZE;
        let luma_h = self.layout.video_blocks_y() * MACROBLOCK_SIZE;
        check_plane("luma", &frame.y, luma_w, luma_h)?;
        check_plane("cb", &frame.cb, luma_w / 2, luma_h / 2)?;
        check_plane("cr", &frame.cr, luma_w / 2, luma_h / 2)
    }
}

fn check_plane(name: &'static str, plane: &Plane, width: u32, height: u32) -> Result<(), UploadError> {
    let expected = width as usize * height as usize;
    let consistent = plane.data.len() >= plane.width as usize * plane.height as usize;
    if plane.width < width || plane.height < height || !consistent {
        return Err(UploadError::PlaneMismatch {
            plane: name,
            expected,
            actual: plane.data.len(),
        });
    }
    Ok(())
}

/// Copy macroblock (`bx`, `by`) into converter byte order.
fn gather_macroblock(frame: &Frame, bx: u32, by: u32, out: &mut [u8; CONVERTER_BLOCK_BYTES]) {
    let cx = (bx * 8) as usize;
    let cy = by * 8;
    for row in 0..CHROMA_BLOCK {
        let dst = row * CHROMA_BLOCK;
        let cb = frame.cb.row(cy + row as u32);
        let cr = frame.cr.row(cy + row as u32);
        out[CB_OFFSET + dst..CB_OFFSET + dst + 8].copy_from_slice(&cb[cx..cx + 8]);
        out[CR_OFFSET + dst..CR_OFFSET + dst + 8].copy_from_slice(&cr[cx..cx + 8]);
    }

    let lx = (bx * MACROBLOCK_SIZE) as usize;
    let ly = by * MACROBLOCK_SIZE;
    for quadrant in 0..4 {
        let qx = lx + (quadrant % 2) * 8;
        let qy = ly + (quadrant / 2) as u32 * 8;
        let base = LUMA_OFFSET + quadrant * 64;
        for row in 0..8 {
            let src = frame.y.row(qy + row as u32);
            out[base + row * 8..base + row * 8 + 8].copy_from_slice(&src[qx..qx + 8]);
        }
    }
}

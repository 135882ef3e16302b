//! Software stand-in for the texture converter and renderer.
//!
//! Emulates the hardware closely enough to check what the player sends it:
//! a video memory budget, the macroblock-to-YUV422 converter with its fixed
//! stride, and scene/list/quad submission.

use std::collections::HashMap;

use super::{Graphics, TextureId};
use crate::error::HardwareError;
use crate::settings::ListType;
use crate::video::quad::CMD_VERTEX_EOL;
use crate::video::{CONVERTER_BLOCK_BYTES, PolyHeader, VERTEX_BYTES, Vertex};

/// Default video memory budget.
pub const DEFAULT_VRAM_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphicsStats {
    pub textures_allocated: u32,
    pub textures_freed: u32,
    pub blocks: u64,
    pub fillers: u64,
    /// Times the converter cursor wrapped after a full texture.
    pub frames_converted: u64,
    pub scenes: u64,
    pub quads: u64,
}

#[derive(Debug, Clone, Copy)]
struct Converter {
    texture: TextureId,
    blocks_x: u32,
    blocks_y: u32,
    /// Next macroblock slot, row-major over the texture.
    cursor: u32,
}

pub struct SoftwareGraphics {
    capacity: usize,
    used: usize,
    next_id: u32,
    textures: HashMap<TextureId, Vec<u8>>,
    converter: Option<Converter>,
    in_scene: bool,
    list: Option<ListType>,
    header: Option<PolyHeader>,
    last_quad: Vec<Vertex>,
    pending: Vec<Vertex>,
    stats: GraphicsStats,
}

impl SoftwareGraphics {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: 0,
            next_id: 1,
            textures: HashMap::new(),
            converter: None,
            in_scene: false,
            list: None,
            header: None,
            last_quad: Vec::new(),
            pending: Vec::new(),
            stats: GraphicsStats::default(),
        }
    }

    pub fn stats(&self) -> GraphicsStats {
        self.stats
    }

    pub fn available(&self) -> usize {
        self.capacity - self.used
    }

    /// Converter configuration register as the hardware sees it:
    /// `((blocks_y - 1) << 8) | (blocks_x - 1)`.
    pub fn converter_config(&self) -> Option<u32> {
        self.converter
            .map(|c| ((c.blocks_y - 1) << 8) | (c.blocks_x - 1))
    }

    pub fn texture(&self, texture: TextureId) -> Option<&[u8]> {
        self.textures.get(&texture).map(Vec::as_slice)
    }

    pub fn in_scene(&self) -> bool {
        self.in_scene
    }

    /// List currently open for submission.
    pub fn open_list(&self) -> Option<ListType> {
        self.list
    }

    /// Header of the most recently submitted polygon.
    pub fn last_header(&self) -> Option<&PolyHeader> {
        self.header.as_ref()
    }

    /// Vertices of the most recently completed strip.
    pub fn last_quad(&self) -> &[Vertex] {
        &self.last_quad
    }

    /// `(y, u, v)` of texel (`x`, `y`) in the converter's texture.
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        let conv = self.converter?;
        let data = self.textures.get(&conv.texture)?;
        let stride = conv.blocks_x as usize * 16;
        let pair = (y as usize * stride + (x as usize & !1)) * 2;
        let texel = data.get(pair..pair + 4)?;
        let luma = if x % 2 == 0 { texel[1] } else { texel[3] };
        Some((luma, texel[0], texel[2]))
    }

    fn advance_cursor(&mut self) -> Option<(Converter, u32)> {
        let conv = self.converter.as_mut()?;
        let slot = conv.cursor;
        conv.cursor += 1;
        if conv.cursor == conv.blocks_x * conv.blocks_y {
            conv.cursor = 0;
            self.stats.frames_converted += 1;
        }
        Some((*conv, slot))
    }
}

impl Default for SoftwareGraphics {
    fn default() -> Self {
        Self::new(DEFAULT_VRAM_BYTES)
    }
}

/// Write one 4:2:0 macroblock into a UYVY texture at block slot
/// (`bx`, `by`). `stride` is the texture width in pixels.
fn convert_block(block: &[u8; CONVERTER_BLOCK_BYTES], dst: &mut [u8], stride: usize, bx: usize, by: usize) {
    let (cb, rest) = block.split_at(64);
    let (cr, luma) = rest.split_at(64);
    for yy in 0..16 {
        for xx in (0..16).step_by(2) {
            let quadrant = (yy / 8) * 2 + xx / 8;
            let l = &luma[quadrant * 64..quadrant * 64 + 64];
            let y0 = l[(yy % 8) * 8 + xx % 8];
            let y1 = l[(yy % 8) * 8 + xx % 8 + 1];
            let c = (yy / 2) * 8 + xx / 2;
            let offset = ((by * 16 + yy) * stride + bx * 16 + xx) * 2;
            dst[offset..offset + 4].copy_from_slice(&[cb[c], y0, cr[c], y1]);
        }
    }
}

impl Graphics for SoftwareGraphics {
    fn alloc_texture(&mut self, bytes: usize) -> Result<TextureId, HardwareError> {
        if bytes > self.available() {
            return Err(HardwareError::OutOfVideoMemory {
                requested: bytes,
                available: self.available(),
            });
        }
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.used += bytes;
        self.textures.insert(id, vec![0; bytes]);
        self.stats.textures_allocated += 1;
        log::debug!("Allocated texture {} ({bytes} bytes)", id.0);
        Ok(id)
    }

    fn free_texture(&mut self, texture: TextureId) {
        if let Some(data) = self.textures.remove(&texture) {
            self.used -= data.len();
            self.stats.textures_freed += 1;
            if self.converter.is_some_and(|c| c.texture == texture) {
                self.converter = None;
            }
        } else {
            log::warn!("Free of unknown texture {}", texture.0);
        }
    }

    fn clear_texture(&mut self, texture: TextureId, bytes: usize) {
        if let Some(data) = self.textures.get_mut(&texture) {
            let n = bytes.min(data.len());
            data[..n].fill(0);
        }
    }

    fn configure_converter(&mut self, texture: TextureId, blocks_x: u32, blocks_y: u32) {
        self.converter = Some(Converter {
            texture,
            blocks_x,
            blocks_y,
            cursor: 0,
        });
    }

    fn transfer_block(&mut self, block: &[u8; CONVERTER_BLOCK_BYTES]) {
        self.stats.blocks += 1;
        let Some((conv, slot)) = self.advance_cursor() else {
            return;
        };
        let stride = conv.blocks_x as usize * 16;
        if let Some(data) = self.textures.get_mut(&conv.texture) {
            let bx = (slot % conv.blocks_x) as usize;
            let by = (slot / conv.blocks_x) as usize;
            convert_block(block, data, stride, bx, by);
        }
    }

    fn transfer_filler(&mut self) {
        self.stats.fillers += 1;
        self.advance_cursor();
    }

    fn wait_ready(&mut self) {}

    fn begin_scene(&mut self) {
        self.in_scene = true;
        self.stats.scenes += 1;
    }

    fn begin_list(&mut self, list: ListType) {
        self.list = Some(list);
    }

    fn submit_header(&mut self, header: &PolyHeader) {
        self.header = Some(*header);
        self.pending.clear();
    }

    fn submit_vertices(&mut self, data: &[u8]) {
        for chunk in data.chunks_exact(VERTEX_BYTES) {
            let vertex: Vertex = bytemuck::pod_read_unaligned(chunk);
            self.pending.push(vertex);
            if vertex.flags == CMD_VERTEX_EOL {
                self.last_quad = std::mem::take(&mut self.pending);
                self.stats.quads += 1;
            }
        }
    }

    fn end_list(&mut self) {
        self.list = None;
    }

    fn end_scene(&mut self) {
        self.in_scene = false;
    }
}

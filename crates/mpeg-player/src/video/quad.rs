use bytemuck::{Pod, Zeroable};

use super::layout::TextureLayout;
use crate::hw::TextureId;
use crate::settings::{FilterMode, ListType};

/// Vertex command flags.
pub const CMD_VERTEX: u32 = 0xe000_0000;
/// Last vertex of a strip.
pub const CMD_VERTEX_EOL: u32 = 0xf000_0000;

/// Opaque white, packed ARGB.
pub const WHITE: u32 = 0xffff_ffff;

/// One hardware vertex command, 32 bytes as the renderer consumes it.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub flags: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub u: f32,
    pub v: f32,
    pub argb: u32,
    pub oargb: u32,
}

pub const VERTEX_BYTES: usize = std::mem::size_of::<Vertex>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 16-bit YUV 4:2:2, stored linearly (not twiddled).
    Yuv422,
}

/// Compiled polygon header for drawing the video texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolyHeader {
    pub list: ListType,
    pub filter: FilterMode,
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// Sample with the converter's stride rather than the texture width.
    pub strided: bool,
}

impl PolyHeader {
    pub fn compile(
        list: ListType,
        filter: FilterMode,
        texture: TextureId,
        layout: &TextureLayout,
    ) -> Self {
        Self {
            list,
            filter,
            texture,
            width: layout.texture_width,
            height: layout.texture_height,
            format: TextureFormat::Yuv422,
            strided: true,
        }
    }
}

/// A strip of four vertices covering `screen`, sampling the video region
/// `(0,0)..uv` of the texture.
pub fn video_quad(screen: [f32; 2], uv: (f32, f32)) -> [Vertex; 4] {
    let [w, h] = screen;
    let (u, v) = uv;
    let corner = |x, y, u, v, flags| Vertex {
        flags,
        x,
        y,
        z: 1.0,
        u,
        v,
        argb: WHITE,
        oargb: 0,
    };
    [
        corner(0.0, 0.0, 0.0, 0.0, CMD_VERTEX),
        corner(w, 0.0, u, 0.0, CMD_VERTEX),
        corner(0.0, h, 0.0, v, CMD_VERTEX),
        corner(w, h, u, v, CMD_VERTEX_EOL),
    ]
}

use crate::error::{DecodeError, PlayerError};
use crate::source::MACROBLOCK_SIZE;

/// Largest texture edge the converter can address (64 macroblocks).
pub const MAX_TEXTURE_SIZE: u32 = 1024;

/// Where a video of a given size lands inside its power-of-two texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureLayout {
    pub video_width: u32,
    pub video_height: u32,
    pub texture_width: u32,
    pub texture_height: u32,
}

impl TextureLayout {
    pub fn new(video_width: u32, video_height: u32) -> Result<Self, PlayerError> {
        if video_width == 0 || video_height == 0 {
            return Err(DecodeError::InvalidSource(format!(
                "video dimensions {video_width}x{video_height}"
            ))
            .into());
        }
        if video_width > MAX_TEXTURE_SIZE || video_height > MAX_TEXTURE_SIZE {
            return Err(PlayerError::VideoTooLarge {
                width: video_width,
                height: video_height,
                max: MAX_TEXTURE_SIZE,
            });
        }
        Ok(Self {
            video_width,
            video_height,
            texture_width: video_width.next_power_of_two().max(MACROBLOCK_SIZE),
            texture_height: video_height.next_power_of_two().max(MACROBLOCK_SIZE),
        })
    }

    /// Macroblock columns the decoder codes, including a partial last one.
    pub fn video_blocks_x(&self) -> u32 {
        self.video_width.div_ceil(MACROBLOCK_SIZE)
    }

    pub fn video_blocks_y(&self) -> u32 {
        self.video_height.div_ceil(MACROBLOCK_SIZE)
    }

    pub fn texture_blocks_x(&self) -> u32 {
        self.texture_width / MACROBLOCK_SIZE
    }

    pub fn texture_blocks_y(&self) -> u32 {
        self.texture_height / MACROBLOCK_SIZE
    }

    /// Filler transfers after each row of real macroblocks.
    pub fn padding_per_row(&self) -> u32 {
        self.texture_blocks_x() - self.video_blocks_x()
    }

    /// Whole rows of filler after the last real row.
    pub fn filler_rows(&self) -> u32 {
        self.texture_blocks_y() - self.video_blocks_y()
    }

    /// Every transfer for one frame, real and filler.
    pub fn transfers_per_frame(&self) -> u32 {
        self.texture_blocks_x() * self.texture_blocks_y()
    }

    /// Size of the 16-bit YUV422 texture.
    pub fn texture_bytes(&self) -> usize {
        self.texture_width as usize * self.texture_height as usize * 2
    }

    /// Texture coordinates of the video's bottom-right corner.
    pub fn uv_scale(&self) -> (f32, f32) {
        (
            self.video_width as f32 / self.texture_width as f32,
            self.video_height as f32 / self.texture_height as f32,
        )
    }
}

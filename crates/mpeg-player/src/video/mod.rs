pub mod layout;
pub mod quad;
pub mod upload;

pub use layout::{MAX_TEXTURE_SIZE, TextureLayout};
pub use quad::{PolyHeader, TextureFormat, VERTEX_BYTES, Vertex, video_quad};
pub use upload::{CONVERTER_BLOCK_BYTES, FrameUploader, UploadStats};

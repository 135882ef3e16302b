use thiserror::Error;

/// Failures reported by a decode source. End of stream is not one of these.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid source: {0}")]
    InvalidSource(String),
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed stream: {0}")]
    Malformed(String),
}

/// Failures reported by the graphics or audio hardware collaborators.
#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("out of video memory (requested {requested} bytes, {available} available)")]
    OutOfVideoMemory { requested: usize, available: usize },
    #[error("audio stream: {0}")]
    AudioStream(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no decoded frame to upload")]
    NoFrame,
    #[error("frame is {}x{}, texture was laid out for {}x{}", actual.0, actual.1, expected.0, expected.1)]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("{plane} plane is {actual} bytes, expected at least {expected}")]
    PlaneMismatch {
        plane: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("video is {width}x{height}, the texture converter supports at most {max}x{max}")]
    VideoTooLarge { width: u32, height: u32, max: u32 },
    #[error("stream contains no video frames")]
    EmptyStream,
    #[error("player is not usable: {0}")]
    InvalidState(&'static str),
}

impl PlayerError {
    /// Integer code used for errors alongside [`PlayOutcome::code`](crate::player::PlayOutcome::code).
    pub const CODE: i32 = -1;
}

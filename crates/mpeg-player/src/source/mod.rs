//! Decode source boundary.
//!
//! The MPEG1 decoder itself lives outside this crate. Anything that can hand
//! out video frames and audio chunks from one stream implements
//! [`DecodeSource`]; the player only ever talks to it through this trait.
//!
//! A source keeps two independent cursors over the same stream, one for
//! video and one for audio. The playback controller advances the video
//! cursor while the audio hardware's fill callback advances the audio cursor
//! from its own context, so the source is shared behind a [`SharedSource`]
//! mutex and each decode call holds the lock only for its own duration.

pub mod pattern;
pub mod types;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::DecodeError;

pub use pattern::{PatternDescriptor, PatternSource};
pub use types::{
    AUDIO_CHUNK_BYTES, AUDIO_CHUNK_SAMPLES, AudioChunk, DecodeStatus, Frame, MACROBLOCK_SIZE,
    Plane, SourceInput,
};

pub trait DecodeSource: Send {
    /// Decode the next video frame into `frame`, reusing its plane buffers.
    ///
    /// The previous contents of `frame` are overwritten, so whoever owns the
    /// slot must be done with it before calling this.
    fn decode_video(&mut self, frame: &mut Frame) -> Result<DecodeStatus, DecodeError>;

    /// Decode the next audio chunk. The returned chunk stays valid until the
    /// next call on this source.
    fn decode_audio(&mut self) -> Result<Option<&AudioChunk>, DecodeError>;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn sample_rate(&self) -> u32;

    fn set_loop(&mut self, enabled: bool);
    fn is_looping(&self) -> bool;

    /// Move both cursors back to the start of the stream.
    fn rewind(&mut self);
}

/// Sources that can be opened from a file or a memory buffer.
pub trait OpenSource: DecodeSource + Sized {
    fn open(input: SourceInput) -> Result<Self, DecodeError>;
}

/// A decode source shared between the playback loop and the audio callback.
pub type SharedSource<D> = Arc<Mutex<D>>;

/// Lock a shared source. A panic on the other side leaves the cursors in a
/// usable state, so poisoning is ignored.
pub fn lock_source<D: ?Sized>(source: &Mutex<D>) -> MutexGuard<'_, D> {
    source.lock().unwrap_or_else(PoisonError::into_inner)
}

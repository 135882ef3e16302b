//! MPEG1 playback engine for fixed multimedia hardware.
//!
//! The decoder, the graphics unit and the audio channel are collaborators
//! behind traits ([`DecodeSource`], [`Graphics`], [`AudioBackend`]); this
//! crate paces decoded frames against a clock, feeds the pull-driven audio
//! stream from the same source, reshapes frames into the texture
//! converter's macroblock stride and stops playback on configured input.

pub mod audio;
pub mod error;
pub mod hw;
pub mod input;
pub mod playback;
pub mod player;
pub mod settings;
pub mod source;
pub mod video;

pub use audio::{AudioFeeder, CpalBackend};
pub use error::{DecodeError, HardwareError, PlayerError, UploadError};
pub use hw::{AudioBackend, AudioStream, Graphics, SoftwareGraphics, TextureId};
pub use input::{CancelSpec, InputDevices, InputSnapshot, Key, NoInput, buttons};
pub use playback::{Clock, ManualClock, PlaybackState, SystemClock};
pub use player::{PlayOutcome, Player, StepResult};
pub use settings::{FilterMode, ListType, PlayerOptions};
pub use source::{DecodeSource, Frame, OpenSource, PatternDescriptor, PatternSource};

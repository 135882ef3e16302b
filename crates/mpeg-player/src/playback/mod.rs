pub mod clock;
pub mod timeline;

pub use clock::{Clock, ManualClock, SystemClock};
pub use timeline::{Advance, FrameSlot, PlaybackState, Timeline};

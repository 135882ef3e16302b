use std::sync::Mutex;

use crate::error::DecodeError;
use crate::source::{DecodeSource, DecodeStatus, Frame, lock_source};

/// Where the timeline is in one playback pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing decoded yet.
    Unstarted,
    /// First frame decoded, clock reference taken.
    Primed,
    Running,
    /// End of stream reached with looping on; waiting for [`Timeline::restart`].
    LoopRestart,
    Finished,
    Cancelled,
    Errored,
}

impl PlaybackState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Errored)
    }

    /// States in which the current frame may be presented.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Primed | Self::Running)
    }
}

/// Result of decoding past the frame just presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A new frame is current.
    Next,
    /// End of stream with looping on.
    Loop,
    /// End of stream.
    EndOfStream,
}

/// The single frame the timeline owns. The decode source writes straight
/// into it, so anything read out of it is only good until the next decode;
/// `generation` tells readers whether that has happened.
#[derive(Debug, Default)]
pub struct FrameSlot {
    frame: Frame,
    generation: u64,
    valid: bool,
    pending_upload: bool,
    presented: bool,
}

impl FrameSlot {
    pub fn frame(&self) -> Option<&Frame> {
        self.valid.then_some(&self.frame)
    }

    /// Bumped every time a decode overwrites the frame.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Decoded but not yet sent to the texture.
    pub fn pending_upload(&self) -> bool {
        self.pending_upload
    }

    fn decode<D: DecodeSource + ?Sized>(&mut self, source: &Mutex<D>) -> Result<bool, DecodeError> {
        if self.pending_upload {
            log::debug!("Frame {} replaced before upload", self.generation);
        }
        let status = lock_source(source).decode_video(&mut self.frame);
        self.generation += 1;
        self.presented = false;
        match status {
            Ok(DecodeStatus::Decoded) => {
                self.valid = true;
                self.pending_upload = true;
                Ok(true)
            }
            Ok(DecodeStatus::EndOfStream) => {
                self.invalidate();
                Ok(false)
            }
            Err(e) => {
                self.invalidate();
                Err(e)
            }
        }
    }

    fn invalidate(&mut self) {
        self.valid = false;
        self.pending_upload = false;
        self.presented = false;
    }
}

/// Paces decoded frames against elapsed time.
///
/// A frame is due once `now - clock_ref >= frame.time`. Frames are never
/// skipped: each due frame is presented, then the next one is decoded,
/// however far behind real time that leaves playback.
#[derive(Debug)]
pub struct Timeline {
    state: PlaybackState,
    slot: FrameSlot,
    clock_ref: f64,
    frames_presented: u64,
    loops: u32,
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Unstarted,
            slot: FrameSlot::default(),
            clock_ref: 0.0,
            frames_presented: 0,
            loops: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn slot(&self) -> &FrameSlot {
        &self.slot
    }

    /// The current frame, while one is held.
    pub fn frame(&self) -> Option<&Frame> {
        self.slot.frame()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Completed loop restarts since the last reset.
    pub fn loops(&self) -> u32 {
        self.loops
    }

    /// Seconds since the clock reference.
    pub fn elapsed(&self, now: f64) -> f64 {
        now - self.clock_ref
    }

    /// Decode the first frame and take `now` as the clock reference.
    /// Returns `false` (and moves to `Errored`) when the stream has no frames.
    pub fn prime<D: DecodeSource + ?Sized>(
        &mut self,
        source: &Mutex<D>,
        now: f64,
    ) -> Result<bool, DecodeError> {
        match self.slot.decode(source) {
            Ok(true) => {
                self.state = PlaybackState::Primed;
                self.clock_ref = now;
                log::debug!("Primed at {now:.3}s");
                Ok(true)
            }
            Ok(false) => {
                self.state = PlaybackState::Errored;
                Ok(false)
            }
            Err(e) => {
                self.state = PlaybackState::Errored;
                Err(e)
            }
        }
    }

    /// Whether the current frame should be presented at `now`.
    pub fn is_due(&self, now: f64) -> bool {
        self.state.is_active()
            && self
                .slot
                .frame()
                .is_some_and(|frame| self.elapsed(now) >= frame.time)
    }

    /// Whether the current frame has been presented and the next decode is owed.
    pub fn is_presented(&self) -> bool {
        self.slot.valid && self.slot.presented
    }

    /// Mark the current frame as shown.
    pub fn present(&mut self) {
        if self.slot.valid && !self.slot.presented {
            self.slot.presented = true;
            self.frames_presented += 1;
            self.state = PlaybackState::Running;
        }
    }

    /// The current frame reached the texture.
    pub fn mark_uploaded(&mut self) {
        self.slot.pending_upload = false;
    }

    /// Decode the frame after the one just presented.
    pub fn advance<D: DecodeSource + ?Sized>(&mut self, source: &Mutex<D>) -> Result<Advance, DecodeError> {
        match self.slot.decode(source) {
            Ok(true) => {
                self.state = PlaybackState::Running;
                Ok(Advance::Next)
            }
            Ok(false) => {
                if lock_source(source).is_looping() {
                    self.state = PlaybackState::LoopRestart;
                    Ok(Advance::Loop)
                } else {
                    self.state = PlaybackState::Finished;
                    log::debug!("End of stream after {} frames", self.frames_presented);
                    Ok(Advance::EndOfStream)
                }
            }
            Err(e) => {
                self.state = PlaybackState::Errored;
                Err(e)
            }
        }
    }

    /// Rewind the source, decode its first frame again and restart the
    /// clock at `now`. Returns `false` (and moves to `Errored`) when the
    /// rewound stream yields nothing.
    pub fn restart<D: DecodeSource + ?Sized>(
        &mut self,
        source: &Mutex<D>,
        now: f64,
    ) -> Result<bool, DecodeError> {
        lock_source(source).rewind();
        match self.slot.decode(source) {
            Ok(true) => {
                self.state = PlaybackState::Running;
                self.clock_ref = now;
                self.loops += 1;
                log::info!("Loop restart #{}", self.loops);
                Ok(true)
            }
            Ok(false) => {
                self.state = PlaybackState::Errored;
                Ok(false)
            }
            Err(e) => {
                self.state = PlaybackState::Errored;
                Err(e)
            }
        }
    }

    pub fn cancel(&mut self) {
        self.state = PlaybackState::Cancelled;
    }

    pub fn fail(&mut self) {
        self.state = PlaybackState::Errored;
    }

    /// Back to `Unstarted` with the clock reference cleared, ready for a
    /// fresh pass.
    pub fn reset(&mut self) {
        self.state = PlaybackState::Unstarted;
        self.slot.invalidate();
        self.clock_ref = 0.0;
        self.frames_presented = 0;
        self.loops = 0;
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::AudioChunk;

    /// Emits frames with the given timestamps, then end of stream.
    struct Frames {
        times: Vec<f64>,
        next: usize,
        looping: bool,
        fail_at: Option<usize>,
    }

    impl Frames {
        fn new(times: &[f64]) -> Mutex<Self> {
            Mutex::new(Self {
                times: times.to_vec(),
                next: 0,
                looping: false,
                fail_at: None,
            })
        }
    }

    impl DecodeSource for Frames {
        fn decode_video(&mut self, frame: &mut Frame) -> Result<DecodeStatus, DecodeError> {
            if self.fail_at == Some(self.next) {
                return Err(DecodeError::Malformed("bad slice".into()));
            }
            let Some(&time) = self.times.get(self.next) else {
                return Ok(DecodeStatus::EndOfStream);
            };
            if frame.width != 16 {
                frame.reset(16, 16);
            }
            frame.time = time;
            self.next += 1;
            Ok(DecodeStatus::Decoded)
        }
        fn decode_audio(&mut self) -> Result<Option<&AudioChunk>, DecodeError> {
            Ok(None)
        }
        fn width(&self) -> u32 {
            16
        }
        fn height(&self) -> u32 {
            16
        }
        fn sample_rate(&self) -> u32 {
            44100
        }
        fn set_loop(&mut self, enabled: bool) {
            self.looping = enabled;
        }
        fn is_looping(&self) -> bool {
            self.looping
        }
        fn rewind(&mut self) {
            self.next = 0;
        }
    }

    #[test]
    fn prime_takes_clock_reference() {
        let src = Frames::new(&[0.0, 0.5]);
        let mut tl = Timeline::new();
        assert!(tl.prime(&src, 10.0).unwrap());
        assert_eq!(tl.state(), PlaybackState::Primed);
        assert!((tl.elapsed(10.25) - 0.25).abs() < 1e-12);
        assert!(tl.is_due(10.0));
        assert!(tl.slot().pending_upload());
    }

    #[test]
    fn prime_on_empty_stream_errors() {
        let src = Frames::new(&[]);
        let mut tl = Timeline::new();
        assert!(!tl.prime(&src, 0.0).unwrap());
        assert_eq!(tl.state(), PlaybackState::Errored);
        assert!(tl.frame().is_none());
    }

    #[test]
    fn frame_not_due_until_its_timestamp() {
        let src = Frames::new(&[0.0, 0.5]);
        let mut tl = Timeline::new();
        tl.prime(&src, 0.0).unwrap();
        tl.present();
        assert_eq!(tl.advance(&src).unwrap(), Advance::Next);
        assert!(!tl.is_due(0.3));
        assert!(!tl.is_due(0.4999));
        assert!(tl.is_due(0.5));
    }

    #[test]
    fn end_of_stream_finishes_without_loop() {
        let src = Frames::new(&[0.0]);
        let mut tl = Timeline::new();
        tl.prime(&src, 0.0).unwrap();
        tl.present();
        assert_eq!(tl.advance(&src).unwrap(), Advance::EndOfStream);
        assert_eq!(tl.state(), PlaybackState::Finished);
        assert!(tl.state().is_terminal());
        assert!(!tl.is_due(100.0));
    }

    #[test]
    fn loop_restart_resets_clock() {
        let src = Frames::new(&[0.0, 0.5]);
        src.lock().unwrap().set_loop(true);
        let mut tl = Timeline::new();
        tl.prime(&src, 0.0).unwrap();
        tl.present();
        tl.advance(&src).unwrap();
        tl.present();
        assert_eq!(tl.advance(&src).unwrap(), Advance::Loop);
        assert_eq!(tl.state(), PlaybackState::LoopRestart);
        assert!(!tl.is_due(1.0));

        assert!(tl.restart(&src, 7.0).unwrap());
        assert_eq!(tl.state(), PlaybackState::Running);
        assert!(tl.elapsed(7.0).abs() < 1e-12);
        assert!(tl.frame().unwrap().time.abs() < 1e-12);
        assert_eq!(tl.loops(), 1);
    }

    #[test]
    fn decode_error_moves_to_errored() {
        let src = Frames::new(&[0.0, 0.5]);
        src.lock().unwrap().fail_at = Some(1);
        let mut tl = Timeline::new();
        tl.prime(&src, 0.0).unwrap();
        tl.present();
        assert!(tl.advance(&src).is_err());
        assert_eq!(tl.state(), PlaybackState::Errored);
    }

    #[test]
    fn generation_bumps_on_every_decode() {
        let src = Frames::new(&[0.0, 0.1, 0.2]);
        let mut tl = Timeline::new();
        tl.prime(&src, 0.0).unwrap();
        let g0 = tl.slot().generation();
        tl.present();
        tl.advance(&src).unwrap();
        assert_eq!(tl.slot().generation(), g0 + 1);
    }

    #[test]
    fn present_counts_once_per_frame() {
        let src = Frames::new(&[0.0, 0.1]);
        let mut tl = Timeline::new();
        tl.prime(&src, 0.0).unwrap();
        tl.present();
        tl.present();
        assert_eq!(tl.frames_presented(), 1);
        assert!(tl.is_presented());
        tl.mark_uploaded();
        assert!(!tl.slot().pending_upload());
    }

    #[test]
    fn reset_returns_to_unstarted() {
        let src = Frames::new(&[0.0]);
        let mut tl = Timeline::new();
        tl.prime(&src, 3.0).unwrap();
        tl.cancel();
        assert_eq!(tl.state(), PlaybackState::Cancelled);
        tl.reset();
        assert_eq!(tl.state(), PlaybackState::Unstarted);
        assert!(tl.frame().is_none());
        assert!(tl.elapsed(0.0).abs() < 1e-12);
    }
}

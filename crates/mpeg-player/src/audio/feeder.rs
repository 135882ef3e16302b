use std::sync::Mutex;

use crate::source::{AUDIO_CHUNK_BYTES, DecodeSource, lock_source};

/// Answers pull requests from the audio hardware with exactly the number of
/// bytes asked for.
///
/// Decoded chunks rarely line up with the hardware's request size, so the
/// unread tail of the last chunk is carried over to the next request. When
/// the source runs dry the rest of the request is zero-filled; an underrun is
/// never an error.
pub struct AudioFeeder {
    /// Bytes of the most recently decoded chunk. Never larger than one chunk.
    chunk: Vec<u8>,
    /// Read cursor into `chunk`.
    offset: usize,
    /// Unread bytes remaining in `chunk`.
    leftover: usize,
    /// Presentation time of the most recently decoded chunk.
    audio_time: f64,
    /// Pulls that had to be padded with silence.
    underruns: u64,
}

impl AudioFeeder {
    pub fn new() -> Self {
        Self {
            chunk: Vec::with_capacity(AUDIO_CHUNK_BYTES),
            offset: 0,
            leftover: 0,
            audio_time: 0.0,
            underruns: 0,
        }
    }

    /// Fill `out` completely. Returns how many bytes came from decoded audio;
    /// the remainder is silence.
    pub fn fill<D: DecodeSource + ?Sized>(&mut self, source: &Mutex<D>, out: &mut [u8]) -> usize {
        let mut written = 0;

        while written < out.len() {
            if self.leftover == 0 && !self.decode_next(source) {
                break;
            }
            let n = self.leftover.min(out.len() - written);
            out[written..written + n].copy_from_slice(&self.chunk[self.offset..self.offset + n]);
            self.offset += n;
            self.leftover -= n;
            written += n;
        }

        if written < out.len() {
            out[written..].fill(0);
            self.underruns += 1;
        }
        written
    }

    /// Drop any carried-over audio so a restarted stream begins clean.
    pub fn reset(&mut self) {
        self.chunk.clear();
        self.offset = 0;
        self.leftover = 0;
        self.audio_time = 0.0;
    }

    /// Unread bytes held over from the last decoded chunk.
    pub fn carry_over(&self) -> usize {
        self.leftover
    }

    pub fn audio_time(&self) -> f64 {
        self.audio_time
    }

    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    fn decode_next<D: DecodeSource + ?Sized>(&mut self, source: &Mutex<D>) -> bool {
        let mut source = lock_source(source);
        match source.decode_audio() {
            Ok(Some(chunk)) => {
                let bytes = chunk.as_bytes();
                self.chunk.clear();
                self.chunk.extend_from_slice(bytes);
                self.offset = 0;
                self.leftover = self.chunk.len();
                self.audio_time = chunk.time;
                self.leftover > 0
            }
            Ok(None) => false,
            Err(e) => {
                log::warn!("Audio decode failed, padding with silence: {e}");
                false
            }
        }
    }
}

impl Default for AudioFeeder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::source::{AUDIO_CHUNK_SAMPLES, AudioChunk, DecodeStatus, Frame};

    /// Emits `chunks` chunks whose samples count up from 1, so every byte
    /// position in the stream is distinguishable.
    struct CountingSource {
        chunks: usize,
        emitted: usize,
        chunk: AudioChunk,
        fail_after: Option<usize>,
    }

    impl CountingSource {
        fn new(chunks: usize) -> Self {
            Self {
                chunks,
                emitted: 0,
                chunk: AudioChunk::silent(0.0),
                fail_after: None,
            }
        }

        /// The full stream as it should come out of the feeder.
        fn expected(chunks: usize) -> Vec<u8> {
            let samples: Vec<i16> = (0..chunks * AUDIO_CHUNK_SAMPLES)
                .map(|i| (i % 30000) as i16 + 1)
                .collect();
            bytemuck::cast_slice(&samples).to_vec()
        }
    }

    impl DecodeSource for CountingSource {
        fn decode_video(&mut self, _frame: &mut Frame) -> Result<DecodeStatus, DecodeError> {
            Ok(DecodeStatus::EndOfStream)
        }

        fn decode_audio(&mut self) -> Result<Option<&AudioChunk>, DecodeError> {
            if self.fail_after == Some(self.emitted) {
                return Err(DecodeError::Malformed("corrupt audio frame".into()));
            }
            if self.emitted >= self.chunks {
                return Ok(None);
            }
            let base = self.emitted * AUDIO_CHUNK_SAMPLES;
            for (i, s) in self.chunk.samples.iter_mut().enumerate() {
                *s = ((base + i) % 30000) as i16 + 1;
            }
            self.chunk.time = self.emitted as f64 * 0.05;
            self.emitted += 1;
            Ok(Some(&self.chunk))
        }

        fn width(&self) -> u32 {
            16
        }
        fn height(&self) -> u32 {
            16
        }
        fn sample_rate(&self) -> u32 {
            22050
        }
        fn set_loop(&mut self, _enabled: bool) {}
        fn is_looping(&self) -> bool {
            false
        }
        fn rewind(&mut self) {
            self.emitted = 0;
        }
    }

    fn drain(feeder: &mut AudioFeeder, src: &Mutex<CountingSource>, sizes: &[usize]) -> Vec<u8> {
        let mut all = Vec::new();
        for &n in sizes {
            let mut buf = vec![0xAAu8; n];
            feeder.fill(src, &mut buf);
            assert_eq!(buf.len(), n);
            all.extend_from_slice(&buf);
        }
        all
    }

    #[test]
    fn small_pulls_are_contiguous() {
        let src = Mutex::new(CountingSource::new(4));
        let mut feeder = AudioFeeder::new();
        let out = drain(&mut feeder, &src, &[1000; 6]);
        assert_eq!(out, CountingSource::expected(4)[..6000]);
    }

    #[test]
    fn pull_larger_than_one_chunk() {
        let src = Mutex::new(CountingSource::new(4));
        let mut feeder = AudioFeeder::new();
        let out = drain(&mut feeder, &src, &[AUDIO_CHUNK_BYTES * 3 + 17]);
        assert_eq!(out, CountingSource::expected(4)[..AUDIO_CHUNK_BYTES * 3 + 17]);
        assert_eq!(feeder.carry_over(), AUDIO_CHUNK_BYTES - 17);
    }

    #[test]
    fn pulls_spanning_chunk_boundaries_never_repeat_bytes() {
        let src = Mutex::new(CountingSource::new(5));
        let mut feeder = AudioFeeder::new();
        let sizes = [7, 2300, 2304, 1, 4000, 99];
        let total: usize = sizes.iter().sum();
        let out = drain(&mut feeder, &src, &sizes);
        assert_eq!(out, CountingSource::expected(5)[..total]);
    }

    #[test]
    fn end_of_stream_zero_fills_remainder() {
        let src = Mutex::new(CountingSource::new(1));
        let mut feeder = AudioFeeder::new();
        let mut buf = vec![0xFFu8; AUDIO_CHUNK_BYTES + 500];
        let real = feeder.fill(&src, &mut buf);
        assert_eq!(real, AUDIO_CHUNK_BYTES);
        assert_eq!(buf[..AUDIO_CHUNK_BYTES], CountingSource::expected(1)[..]);
        assert!(buf[AUDIO_CHUNK_BYTES..].iter().all(|&b| b == 0));
        assert_eq!(feeder.underruns(), 1);

        // Every later pull is pure silence.
        let mut buf = vec![0xFFu8; 64];
        assert_eq!(feeder.fill(&src, &mut buf), 0);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn carry_over_never_exceeds_one_chunk() {
        let src = Mutex::new(CountingSource::new(10));
        let mut feeder = AudioFeeder::new();
        for n in [1, 3000, 5000, 333, 2304, 7777] {
            let mut buf = vec![0u8; n];
            feeder.fill(&src, &mut buf);
            assert!(feeder.carry_over() <= AUDIO_CHUNK_BYTES);
        }
    }

    #[test]
    fn reset_clears_carry_over() {
        let src = Mutex::new(CountingSource::new(3));
        let mut feeder = AudioFeeder::new();
        let mut buf = vec![0u8; 100];
        feeder.fill(&src, &mut buf);
        assert_eq!(feeder.carry_over(), AUDIO_CHUNK_BYTES - 100);
        feeder.reset();
        assert_eq!(feeder.carry_over(), 0);
        assert!(feeder.audio_time().abs() < 1e-12);

        // After a reset and rewind the next pull starts at the stream head.
        src.lock().unwrap().rewind();
        feeder.fill(&src, &mut buf);
        assert_eq!(buf, CountingSource::expected(1)[..100]);
    }

    #[test]
    fn tracks_audio_time_of_last_chunk() {
        let src = Mutex::new(CountingSource::new(3));
        let mut feeder = AudioFeeder::new();
        let mut buf = vec![0u8; AUDIO_CHUNK_BYTES * 2];
        feeder.fill(&src, &mut buf);
        assert!((feeder.audio_time() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn decode_error_is_treated_as_silence() {
        let mut source = CountingSource::new(3);
        source.fail_after = Some(1);
        let src = Mutex::new(source);
        let mut feeder = AudioFeeder::new();
        let mut buf = vec![0xFFu8; AUDIO_CHUNK_BYTES * 2];
        assert_eq!(feeder.fill(&src, &mut buf), AUDIO_CHUNK_BYTES);
        assert!(buf[AUDIO_CHUNK_BYTES..].iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_length_pull_touches_nothing() {
        let src = Mutex::new(CountingSource::new(1));
        let mut feeder = AudioFeeder::new();
        assert_eq!(feeder.fill(&src, &mut []), 0);
        assert_eq!(src.lock().unwrap().emitted, 0);
        assert_eq!(feeder.underruns(), 0);
    }
}

//! Desktop audio output through cpal.
//!
//! The device callback pulls mono 16-bit PCM from the player's fill
//! function, steps through it at the source rate and writes the same sample
//! to every device channel.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicU8, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream};

use crate::error::HardwareError;
use crate::hw::{AudioBackend, AudioStream, FillFn};

/// Bytes requested from the fill function per pull.
const PULL_BYTES: usize = 4096;

pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    type Stream = CpalStream;

    fn open_stream(&mut self, fill: FillFn, buffer_bytes: usize) -> Result<CpalStream, HardwareError> {
        let device = self
            .host
            .default_output_device()
            .ok_or_else(|| HardwareError::AudioStream("no audio output device found".into()))?;
        let device_name = device
            .description()
            .map(|d| d.name().to_string())
            .unwrap_or_else(|_| "Unknown".into());
        log::info!("Audio output device: {device_name}");

        Ok(CpalStream {
            device,
            fill: Some(fill),
            pull_bytes: PULL_BYTES.min(buffer_bytes.max(2)) & !1,
            volume: Arc::new(AtomicU8::new(255)),
            stream: None,
        })
    }
}

/// Nearest-sample rate conversion from the source rate to the device rate.
struct Resampler {
    fill: FillFn,
    pull: Vec<u8>,
    queue: VecDeque<i16>,
    /// Source samples per device frame.
    step: f64,
    phase: f64,
    current: i16,
}

impl Resampler {
    fn new(fill: FillFn, pull_bytes: usize, source_rate: u32, device_rate: u32) -> Self {
        Self {
            fill,
            pull: vec![0; pull_bytes],
            queue: VecDeque::with_capacity(pull_bytes / 2),
            step: f64::from(source_rate) / f64::from(device_rate),
            phase: 1.0,
            current: 0,
        }
    }

    fn next_sample(&mut self) -> i16 {
        while self.phase >= 1.0 {
            if self.queue.is_empty() {
                (self.fill)(&mut self.pull);
                self.queue.extend(
                    self.pull
                        .chunks_exact(2)
                        .map(|b| i16::from_ne_bytes([b[0], b[1]])),
                );
            }
            self.current = self.queue.pop_front().unwrap_or(0);
            self.phase -= 1.0;
        }
        self.phase += self.step;
        self.current
    }

    fn render(&mut self, data: &mut [f32], channels: usize, gain: f32) {
        for frame in data.chunks_mut(channels) {
            let sample = f32::from(self.next_sample()) / 32768.0 * gain;
            frame.fill(sample);
        }
    }
}

pub struct CpalStream {
    device: Device,
    /// Handed to the device callback on start, returned on stop.
    fill: Option<FillFn>,
    pull_bytes: usize,
    volume: Arc<AtomicU8>,
    stream: Option<(Stream, Arc<Mutex<Option<Resampler>>>)>,
}

impl AudioStream for CpalStream {
    fn start(&mut self, sample_rate: u32) -> Result<(), HardwareError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let Some(fill) = self.fill.take() else {
            return Err(HardwareError::AudioStream("fill callback missing".into()));
        };

        let config = match self.device.default_output_config() {
            Ok(config) => config,
            Err(e) => {
                self.fill = Some(fill);
                return Err(HardwareError::AudioStream(e.to_string()));
            }
        };
        let device_rate = config.sample_rate();
        let channels = config.channels() as usize;
        log::info!("Audio output: {sample_rate}Hz mono -> {device_rate}Hz, {channels}ch");

        let resampler = Arc::new(Mutex::new(Some(Resampler::new(
            fill,
            self.pull_bytes,
            sample_rate,
            device_rate,
        ))));
        let shared = resampler.clone();
        let volume = self.volume.clone();

        let built = self.device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let gain = f32::from(volume.load(Ordering::Relaxed)) / 255.0;
                let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
                match guard.as_mut() {
                    Some(resampler) => resampler.render(data, channels, gain),
                    None => data.fill(0.0),
                }
            },
            |err| {
                log::error!("Audio stream error: {err}");
            },
            None,
        );

        let stream = match built.map_err(|e| e.to_string()).and_then(|s| {
            s.play().map_err(|e| e.to_string())?;
            Ok(s)
        }) {
            Ok(stream) => stream,
            Err(e) => {
                self.fill = take_fill(&resampler);
                return Err(HardwareError::AudioStream(e));
            }
        };

        self.stream = Some((stream, resampler));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some((stream, resampler)) = self.stream.take() {
            drop(stream);
            self.fill = take_fill(&resampler);
            log::debug!("Audio output stopped");
        }
    }

    fn poll(&mut self) {}

    fn set_volume(&mut self, volume: u8) {
        self.volume.store(volume, Ordering::Relaxed);
    }
}

/// Recover the fill function once the device callback is gone.
fn take_fill(resampler: &Mutex<Option<Resampler>>) -> Option<FillFn> {
    resampler
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .map(|r| r.fill)
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Hardware output through cpal
//!
//! cpal pulls samples through a callback instead of exposing a looping
//! buffer with cursors, so this backend keeps the circular buffer itself.
//! The output callback reads it at the hardware's pace and advances the play
//! cursor; the frame loop writes into a private staging copy and publishes
//! the locked spans on unlock.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::buffer::AudioStreamConfig;
use crate::audio::device::{AudioDevice, Cursors, LockedRegions};
use crate::constants::BYTES_PER_SAMPLE;
use crate::error::AudioError;

/// Longest the loop will wait on the callback for the ring
const LOCK_TIMEOUT: Duration = Duration::from_millis(2);

struct RingState {
    data: Vec<u8>,
    play_cursor: usize,
    /// Bytes the device has already pulled ahead of `play_cursor`
    write_ahead: usize,
    playing: bool,
}

/// Looping output buffer on the host's default output device
pub struct CpalOutput {
    name: String,
    staging: Vec<u8>,
    locked: Option<LockedRegions>,
    ring: Arc<Mutex<RingState>>,
    stream: cpal::Stream,
    config: StreamConfig,
    error_rx: Receiver<AudioError>,
    failure: Option<AudioError>,
}

impl CpalOutput {
    /// Open the default output device at the stream's sample rate.
    pub fn open_default(stream: &AudioStreamConfig) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceNotFound("No default output device".to_string()))?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let default_config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;
        if default_config.channels() == 0 {
            return Err(AudioError::UnsupportedFormat(format!(
                "{} reports no output channels",
                name
            )));
        }

        let config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(stream.samples_per_second()),
            buffer_size: cpal::BufferSize::Default,
        };

        let size = stream.buffer_size_bytes();
        let ring = Arc::new(Mutex::new(RingState {
            data: vec![0; size],
            play_cursor: 0,
            write_ahead: 0,
            playing: false,
        }));

        let (error_tx, error_rx) = bounded::<AudioError>(16);
        let channels = config.channels as usize;
        let callback_ring = ring.clone();

        let output = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut ring = callback_ring.lock();
                    if !ring.playing {
                        data.fill(0.0);
                        return;
                    }

                    let size = ring.data.len();
                    let mut frames = 0usize;
                    for frame in data.chunks_mut(channels) {
                        let at = ring.play_cursor;
                        let left = i16::from_le_bytes([ring.data[at], ring.data[at + 1]]);
                        let right = i16::from_le_bytes([ring.data[at + 2], ring.data[at + 3]]);
                        for (channel, out) in frame.iter_mut().enumerate() {
                            *out = match channel {
                                0 => left as f32 / 32768.0,
                                1 => right as f32 / 32768.0,
                                _ => 0.0,
                            };
                        }
                        ring.play_cursor = (at + BYTES_PER_SAMPLE) % size;
                        frames += 1;
                    }
                    ring.write_ahead = frames * BYTES_PER_SAMPLE;
                },
                move |err| {
                    let _ = error_tx.try_send(AudioError::unavailable(err.to_string()));
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        tracing::debug!("Output ring for '{}' is {} bytes", name, size);

        Ok(Self {
            name,
            staging: vec![0; size],
            locked: None,
            ring,
            stream: output,
            config,
            error_rx,
            failure: None,
        })
    }

    /// Stream configuration negotiated with the device
    pub fn stream_config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn device_name(&self) -> &str {
        &self.name
    }

    /// Latch the first stream error; the device stays unavailable afterwards.
    fn check_failed(&mut self) -> Result<(), AudioError> {
        if self.failure.is_none() {
            if let Ok(err) = self.error_rx.try_recv() {
                tracing::warn!("Output stream '{}' failed: {}", self.name, err);
                self.failure = Some(err);
            }
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl AudioDevice for CpalOutput {
    fn name(&self) -> &str {
        "cpal"
    }

    fn buffer_size(&self) -> usize {
        self.staging.len()
    }

    fn query_cursors(&mut self) -> Result<Cursors, AudioError> {
        self.check_failed()?;
        let ring = self
            .ring
            .try_lock_for(LOCK_TIMEOUT)
            .ok_or_else(|| AudioError::unavailable("output ring busy"))?;
        let size = ring.data.len();
        Ok(Cursors {
            play: ring.play_cursor,
            write: (ring.play_cursor + ring.write_ahead) % size,
        })
    }

    fn lock(&mut self, offset: usize, length: usize) -> Result<LockedRegions, AudioError> {
        self.check_failed()?;
        if self.locked.is_some() {
            return Err(AudioError::unavailable("buffer already locked"));
        }
        let size = self.staging.len();
        let regions = LockedRegions::split(offset % size, length.min(size), size);
        self.locked = Some(regions);
        Ok(regions)
    }

    fn regions_mut(&mut self, locked: &LockedRegions) -> (&mut [u8], &mut [u8]) {
        locked.slices_mut(&mut self.staging)
    }

    fn unlock(&mut self, locked: LockedRegions) -> Result<(), AudioError> {
        self.locked = None;
        self.check_failed()?;
        let mut ring = self
            .ring
            .try_lock_for(LOCK_TIMEOUT)
            .ok_or_else(|| AudioError::unavailable("output ring busy"))?;
        for span in std::iter::once(locked.first).chain(locked.second) {
            ring.data[span.offset..span.end()]
                .copy_from_slice(&self.staging[span.offset..span.end()]);
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        self.check_failed()?;
        {
            let mut ring = self.ring.lock();
            ring.play_cursor = 0;
            ring.write_ahead = 0;
            ring.playing = true;
        }
        self.stream
            .play()
            .map_err(|e| AudioError::unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_default_output() {
        // Only meaningful on machines with an output device; CI usually has none.
        let config = AudioStreamConfig::default();
        match CpalOutput::open_default(&config) {
            Ok(mut output) => {
                assert_eq!(output.buffer_size(), config.buffer_size_bytes());
                let cursors = output.query_cursors();
                assert!(cursors.is_ok() || cursors.unwrap_err().is_unavailable());
            }
            Err(e) => assert!(!e.to_string().is_empty()),
        }
    }
}

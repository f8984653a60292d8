//! Circular buffer geometry and the latency-targeting write planner
//!
//! The hardware plays a fixed-size circular buffer on its own clock. Every
//! frame the planner looks at where the play cursor is now and works out
//! which byte range the writer has to fill so that it ends up exactly
//! `latency_samples` ahead of it. The range may wrap past the end of the
//! buffer, in which case it is split into two segments.

use crate::constants::{BYTES_PER_SAMPLE, DEFAULT_LATENCY_DIVISOR, DEFAULT_SAMPLE_RATE};
use crate::error::{Error, Result};

/// Negotiated stream format. Fixed once the device is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioStreamConfig {
    samples_per_second: u32,
    bytes_per_sample: usize,
    buffer_size_bytes: usize,
    latency_samples: usize,
}

impl AudioStreamConfig {
    /// Validate and build a stream configuration.
    ///
    /// The format is 16-bit stereo. The buffer must hold a whole number of
    /// sample-pairs and at least one second of audio, and the latency lead
    /// must stay under one second.
    pub fn new(
        samples_per_second: u32,
        bytes_per_sample: usize,
        buffer_size_bytes: usize,
        latency_samples: usize,
    ) -> Result<Self> {
        if samples_per_second == 0 {
            return Err(Error::Config("samples per second must be non-zero".into()));
        }
        if bytes_per_sample != BYTES_PER_SAMPLE {
            return Err(Error::Config(format!(
                "only 16-bit stereo ({} bytes per sample) is supported, got {}",
                BYTES_PER_SAMPLE, bytes_per_sample
            )));
        }
        if buffer_size_bytes == 0 || buffer_size_bytes % bytes_per_sample != 0 {
            return Err(Error::Config(format!(
                "buffer size {} is not a non-zero multiple of {} bytes per sample",
                buffer_size_bytes, bytes_per_sample
            )));
        }
        if buffer_size_bytes < samples_per_second as usize * bytes_per_sample {
            return Err(Error::Config(format!(
                "buffer of {} bytes holds less than one second at {} Hz",
                buffer_size_bytes, samples_per_second
            )));
        }
        if latency_samples >= samples_per_second as usize {
            return Err(Error::Config(format!(
                "latency of {} samples is not below {} samples per second",
                latency_samples, samples_per_second
            )));
        }

        Ok(Self {
            samples_per_second,
            bytes_per_sample,
            buffer_size_bytes,
            latency_samples,
        })
    }

    /// 16-bit stereo with a one second buffer and a lead of
    /// `samples_per_second / latency_divisor` samples.
    pub fn stereo_16bit(samples_per_second: u32, latency_divisor: u32) -> Result<Self> {
        if latency_divisor == 0 {
            return Err(Error::Config("latency divisor must be non-zero".into()));
        }
        let buffer_size_bytes = samples_per_second as usize * BYTES_PER_SAMPLE;
        let latency_samples = (samples_per_second / latency_divisor) as usize;
        Self::new(
            samples_per_second,
            BYTES_PER_SAMPLE,
            buffer_size_bytes,
            latency_samples,
        )
    }

    pub fn samples_per_second(&self) -> u32 {
        self.samples_per_second
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bytes_per_sample
    }

    pub fn buffer_size_bytes(&self) -> usize {
        self.buffer_size_bytes
    }

    pub fn latency_samples(&self) -> usize {
        self.latency_samples
    }

    /// Latency lead in bytes
    pub fn latency_bytes(&self) -> usize {
        self.latency_samples * self.bytes_per_sample
    }

    /// Capacity of the circular buffer in sample-pairs
    pub fn buffer_samples(&self) -> usize {
        self.buffer_size_bytes / self.bytes_per_sample
    }
}

impl Default for AudioStreamConfig {
    fn default() -> Self {
        let samples_per_second = DEFAULT_SAMPLE_RATE;
        Self {
            samples_per_second,
            bytes_per_sample: BYTES_PER_SAMPLE,
            buffer_size_bytes: samples_per_second as usize * BYTES_PER_SAMPLE,
            latency_samples: (samples_per_second / DEFAULT_LATENCY_DIVISOR) as usize,
        }
    }
}

/// One contiguous byte span inside the circular buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Segment {
    pub offset: usize,
    pub length: usize,
}

impl Segment {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// One past the last byte of the span
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Byte range to overwrite this frame, split at the wrap point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePlan {
    pub byte_to_lock: usize,
    pub target_cursor: usize,
    pub bytes_to_write: usize,
    segments: [Segment; 2],
    segment_count: usize,
}

impl WritePlan {
    /// Segments in write order. Empty when there is nothing to write.
    pub fn segments(&self) -> &[Segment] {
        &self.segments[..self.segment_count]
    }

    /// Whether the range crosses the end of the buffer
    pub fn wraps(&self) -> bool {
        self.segment_count == 2
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_to_write == 0
    }

    /// Number of sample-pairs the game has to produce for this plan
    pub fn sample_count(&self, config: &AudioStreamConfig) -> usize {
        self.bytes_to_write / config.bytes_per_sample()
    }
}

/// Compute this frame's write range.
///
/// `play_cursor` must lie in `[0, buffer_size)`. The function keeps no state:
/// the same inputs always produce the same plan.
pub fn plan(play_cursor: usize, writer_index: u64, config: &AudioStreamConfig) -> WritePlan {
    let size = config.buffer_size_bytes();
    let bytes_per_sample = config.bytes_per_sample() as u64;

    let byte_to_lock = ((writer_index * bytes_per_sample) % size as u64) as usize;
    let target_cursor = (play_cursor + config.latency_bytes()) % size;

    let mut segments = [Segment::default(); 2];
    let (bytes_to_write, segment_count) = if byte_to_lock > target_cursor {
        let head = size - byte_to_lock;
        segments[0] = Segment::new(byte_to_lock, head);
        if target_cursor == 0 {
            // The range ends exactly at the buffer end; no second span.
            (head, 1)
        } else {
            segments[1] = Segment::new(0, target_cursor);
            (head + target_cursor, 2)
        }
    } else {
        let length = target_cursor - byte_to_lock;
        segments[0] = Segment::new(byte_to_lock, length);
        (length, usize::from(length > 0))
    };

    WritePlan {
        byte_to_lock,
        target_cursor,
        bytes_to_write,
        segments,
        segment_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference() -> AudioStreamConfig {
        AudioStreamConfig::new(48000, 4, 192_000, 3200).unwrap()
    }

    #[test]
    fn test_reference_defaults() {
        let config = AudioStreamConfig::default();
        assert_eq!(config, reference());
        assert_eq!(
            AudioStreamConfig::stereo_16bit(48000, 15).unwrap(),
            reference()
        );
        assert_eq!(config.latency_bytes(), 12_800);
        assert_eq!(config.buffer_samples(), 48_000);
    }

    #[test]
    fn test_config_rejects_bad_geometry() {
        assert!(AudioStreamConfig::new(0, 4, 192_000, 10).is_err());
        assert!(AudioStreamConfig::new(48000, 0, 192_000, 10).is_err());
        assert!(AudioStreamConfig::new(48000, 2, 96_000, 10).is_err());
        assert!(AudioStreamConfig::new(48000, 4, 192_002, 10).is_err());
        assert!(AudioStreamConfig::new(48000, 4, 96_000, 10).is_err());
        assert!(AudioStreamConfig::new(48000, 4, 192_000, 48000).is_err());
        assert!(AudioStreamConfig::stereo_16bit(48000, 0).is_err());
    }

    #[test]
    fn test_no_wrap_plan() {
        let plan = plan(1000, 0, &reference());
        assert_eq!(plan.byte_to_lock, 0);
        assert_eq!(plan.target_cursor, 13_800);
        assert_eq!(plan.bytes_to_write, 13_800);
        assert_eq!(plan.segments(), &[Segment::new(0, 13_800)]);
        assert!(!plan.wraps());
        assert_eq!(plan.sample_count(&reference()), 3450);
    }

    #[test]
    fn test_wrapping_plan() {
        // 47_500 sample-pairs puts the writer at byte 190_000.
        let plan = plan(1000, 47_500, &reference());
        assert_eq!(plan.byte_to_lock, 190_000);
        assert_eq!(plan.target_cursor, 13_800);
        assert_eq!(plan.bytes_to_write, 15_800);
        assert_eq!(
            plan.segments(),
            &[Segment::new(190_000, 2000), Segment::new(0, 13_800)]
        );
        assert!(plan.wraps());
    }

    #[test]
    fn test_writer_index_wraps_by_modulo() {
        let config = reference();
        let lap = config.buffer_samples() as u64;
        assert_eq!(plan(1000, 47_500 + 3 * lap, &config), plan(1000, 47_500, &config));
    }

    #[test]
    fn test_zero_length_plan() {
        // Writer sits exactly on the target cursor.
        let plan = plan(1000, 3450, &reference());
        assert_eq!(plan.byte_to_lock, 13_800);
        assert!(plan.is_empty());
        assert!(plan.segments().is_empty());
    }

    #[test]
    fn test_target_on_buffer_end_yields_single_segment() {
        let config = reference();
        // play cursor + lead lands exactly on the wrap point
        let plan = plan(192_000 - 12_800, 47_000, &config);
        assert_eq!(plan.target_cursor, 0);
        assert_eq!(plan.byte_to_lock, 188_000);
        assert_eq!(plan.bytes_to_write, 4000);
        assert_eq!(plan.segments(), &[Segment::new(188_000, 4000)]);
    }

    proptest! {
        #[test]
        fn prop_plan_geometry(
            sample_cursor in 0usize..48_000,
            writer_index in 0u64..(u64::MAX / 8),
        ) {
            let config = reference();
            let size = config.buffer_size_bytes();
            let play_cursor = sample_cursor * config.bytes_per_sample();
            let plan = plan(play_cursor, writer_index, &config);

            prop_assert_eq!(plan.byte_to_lock as u64, (writer_index * 4) % size as u64);
            prop_assert!(plan.byte_to_lock < size);
            prop_assert!(plan.target_cursor < size);
            prop_assert!(plan.bytes_to_write <= size);

            let total: usize = plan.segments().iter().map(|s| s.length).sum();
            prop_assert_eq!(total, plan.bytes_to_write);

            let mut expected_offset = plan.byte_to_lock;
            for segment in plan.segments() {
                prop_assert!(!segment.is_empty());
                prop_assert_eq!(segment.offset, expected_offset % size);
                prop_assert!(segment.end() <= size);
                expected_offset = segment.end();
            }
            if !plan.is_empty() {
                prop_assert_eq!(expected_offset % size, plan.target_cursor);
            }
        }

        #[test]
        fn prop_plan_is_pure(play_cursor in 0usize..192_000, writer_index in any::<u32>()) {
            let config = reference();
            let first = plan(play_cursor, writer_index as u64, &config);
            let second = plan(play_cursor, writer_index as u64, &config);
            prop_assert_eq!(first, second);
        }
    }
}

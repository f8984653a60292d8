//! Sample copier
//!
//! Pushes freshly produced interleaved 16-bit stereo samples into the
//! segments of a [`WritePlan`] and owns the running writer index.

use crate::audio::buffer::{AudioStreamConfig, WritePlan};
use crate::audio::device::AudioDevice;
use crate::error::AudioError;

/// Outcome of a completed copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyResult {
    /// Sample-pairs written into the device
    pub samples_written: usize,
    /// Lock/unlock transactions performed
    pub segments_written: usize,
}

/// Writes sample-pairs into the device and tracks how many have been
/// written since the stream started.
#[derive(Debug, Clone)]
pub struct SampleCopier {
    config: AudioStreamConfig,
    writer_index: u64,
}

impl SampleCopier {
    pub fn new(config: AudioStreamConfig) -> Self {
        Self {
            config,
            writer_index: 0,
        }
    }

    /// Monotonic count of sample-pairs written so far
    pub fn writer_index(&self) -> u64 {
        self.writer_index
    }

    pub fn config(&self) -> &AudioStreamConfig {
        &self.config
    }

    /// Copy `source` into the plan's segments, one lock/unlock per segment.
    ///
    /// `source` holds interleaved left/right samples and must be exactly
    /// `plan.sample_count()` pairs long. If a lock fails part way, the
    /// segments already written stay released and the writer index reflects
    /// only what actually landed.
    pub fn write<D: AudioDevice + ?Sized>(
        &mut self,
        plan: &WritePlan,
        source: &[i16],
        device: &mut D,
    ) -> Result<CopyResult, AudioError> {
        let bytes_per_sample = self.config.bytes_per_sample();
        let mut result = CopyResult::default();
        let mut pairs = source.chunks_exact(2);

        for segment in plan.segments() {
            let locked = device.lock(segment.offset, segment.length)?;

            let mut copied = 0usize;
            {
                let (first, second) = device.regions_mut(&locked);
                for region in [first, second] {
                    for dest in region.chunks_exact_mut(bytes_per_sample) {
                        let Some(pair) = pairs.next() else { break };
                        dest[0..2].copy_from_slice(&pair[0].to_le_bytes());
                        dest[2..4].copy_from_slice(&pair[1].to_le_bytes());
                        copied += 1;
                    }
                }
            }
            self.writer_index += copied as u64;
            result.samples_written += copied;

            device.unlock(locked)?;
            result.segments_written += 1;
        }

        Ok(result)
    }
}

/// Zero the whole buffer so playback starts from silence.
pub fn clear_buffer<D: AudioDevice + ?Sized>(device: &mut D) -> Result<(), AudioError> {
    let size = device.buffer_size();
    let locked = device.lock(0, size)?;
    {
        let (first, second) = device.regions_mut(&locked);
        first.fill(0);
        second.fill(0);
    }
    device.unlock(locked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::plan;
    use crate::audio::simulated::SimulatedDevice;
    use proptest::prelude::*;

    fn small_config() -> AudioStreamConfig {
        AudioStreamConfig::new(100, 4, 400, 10).unwrap()
    }

    fn ramp(pairs: usize) -> Vec<i16> {
        (0..pairs as i16).flat_map(|i| [i, -i]).collect()
    }

    #[test]
    fn test_single_segment_copy() {
        let config = small_config();
        let mut device = SimulatedDevice::manual(&config);
        let handle = device.handle();
        let mut copier = SampleCopier::new(config);

        let plan = plan(0, 0, &config);
        assert_eq!(plan.bytes_to_write, 40);
        let samples = ramp(10);

        let result = copier.write(&plan, &samples, &mut device).unwrap();
        assert_eq!(result.samples_written, 10);
        assert_eq!(result.segments_written, 1);
        assert_eq!(copier.writer_index(), 10);
        assert_eq!(handle.samples_at(0, 10), samples);
    }

    #[test]
    fn test_wrapped_copy_continues_source_across_segments() {
        let config = small_config();
        let mut device = SimulatedDevice::manual(&config);
        let handle = device.handle();
        let mut copier = SampleCopier::new(config);
        copier.writer_index = 95;

        // byte_to_lock 380, target 40: 20 bytes at the end then 40 at the start
        let plan = plan(0, copier.writer_index(), &config);
        assert!(plan.wraps());
        let samples = ramp(15);

        let result = copier.write(&plan, &samples, &mut device).unwrap();
        assert_eq!(result.samples_written, 15);
        assert_eq!(result.segments_written, 2);
        assert_eq!(copier.writer_index(), 110);
        assert_eq!(handle.samples_at(380, 15), samples);
        assert_eq!(handle.lock_calls(), 2);
        assert_eq!(handle.unlock_calls(), 2);
    }

    #[test]
    fn test_lock_failure_mid_plan_keeps_partial_progress() {
        let config = small_config();
        let mut device = SimulatedDevice::manual(&config);
        let handle = device.handle();
        let mut copier = SampleCopier::new(config);
        copier.writer_index = 95;

        let plan = plan(0, copier.writer_index(), &config);
        handle.fail_locks_after(1);

        let err = copier.write(&plan, &ramp(15), &mut device).unwrap_err();
        assert!(err.is_unavailable());
        // Only the 5 pairs of the first segment landed.
        assert_eq!(copier.writer_index(), 100);
        assert_eq!(handle.unlock_calls(), 1);
        assert_eq!(handle.samples_at(380, 5), ramp(5));
    }

    #[test]
    fn test_empty_plan_touches_nothing() {
        let config = small_config();
        let mut device = SimulatedDevice::manual(&config);
        let handle = device.handle();
        let mut copier = SampleCopier::new(config);
        copier.writer_index = 10;

        let plan = plan(0, copier.writer_index(), &config);
        assert!(plan.is_empty());
        let result = copier.write(&plan, &[], &mut device).unwrap();
        assert_eq!(result, CopyResult::default());
        assert_eq!(copier.writer_index(), 10);
        assert_eq!(handle.lock_calls(), 0);
    }

    #[test]
    fn test_clear_buffer_zeroes_everything() {
        let config = small_config();
        let mut device = SimulatedDevice::manual(&config);
        let handle = device.handle();
        assert!(handle.committed().iter().any(|&b| b != 0));

        clear_buffer(&mut device).unwrap();
        assert!(handle.committed().iter().all(|&b| b == 0));
    }

    proptest! {
        #[test]
        fn prop_writer_advances_by_planned_pairs(
            cursor_pair in 0usize..100,
            start in 0u64..10_000,
        ) {
            let config = small_config();
            let mut device = SimulatedDevice::manual(&config);
            let mut copier = SampleCopier::new(config);
            copier.writer_index = start;

            let plan = plan(cursor_pair * 4, start, &config);
            let samples = ramp(plan.sample_count(&config));
            copier.write(&plan, &samples, &mut device).unwrap();

            prop_assert_eq!(
                copier.writer_index(),
                start + (plan.bytes_to_write / config.bytes_per_sample()) as u64
            );
        }
    }
}

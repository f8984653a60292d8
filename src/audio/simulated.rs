//! In-memory circular buffer device
//!
//! Behaves like a looping hardware buffer without touching any sound API.
//! The play cursor is either driven by hand through a [`SimulatedHandle`]
//! (tests) or follows wall time once playback starts (headless runs).
//! Faults can be injected through the same handle.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::audio::buffer::AudioStreamConfig;
use crate::audio::device::{AudioDevice, Cursors, LockedRegions};
use crate::error::AudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorMode {
    Manual,
    Realtime,
}

#[derive(Debug)]
struct SimShared {
    /// Bytes the "hardware" sees, updated on unlock
    committed: Vec<u8>,
    play_cursor: usize,
    playing: bool,
    started_at: Option<Instant>,
    unavailable: bool,
    query_fails: bool,
    locks_before_failure: Option<usize>,
    query_calls: usize,
    lock_calls: usize,
    unlock_calls: usize,
}

/// Simulated looping sound buffer
pub struct SimulatedDevice {
    staging: Vec<u8>,
    locked: Option<LockedRegions>,
    mode: CursorMode,
    samples_per_second: u32,
    bytes_per_sample: usize,
    shared: Arc<Mutex<SimShared>>,
}

impl SimulatedDevice {
    /// Device whose play cursor only moves when told to
    pub fn manual(config: &AudioStreamConfig) -> Self {
        Self::with_mode(config, CursorMode::Manual)
    }

    /// Device whose play cursor advances with wall time after `play()`
    pub fn realtime(config: &AudioStreamConfig) -> Self {
        Self::with_mode(config, CursorMode::Realtime)
    }

    fn with_mode(config: &AudioStreamConfig, mode: CursorMode) -> Self {
        let size = config.buffer_size_bytes();
        // Uninitialized hardware memory; cold start is expected to clear it.
        let noise = 0x5a;
        Self {
            staging: vec![noise; size],
            locked: None,
            mode,
            samples_per_second: config.samples_per_second(),
            bytes_per_sample: config.bytes_per_sample(),
            shared: Arc::new(Mutex::new(SimShared {
                committed: vec![noise; size],
                play_cursor: 0,
                playing: false,
                started_at: None,
                unavailable: false,
                query_fails: false,
                locks_before_failure: None,
                query_calls: 0,
                lock_calls: 0,
                unlock_calls: 0,
            })),
        }
    }

    /// Control handle that stays valid after the device is boxed away
    pub fn handle(&self) -> SimulatedHandle {
        SimulatedHandle {
            shared: self.shared.clone(),
            bytes_per_sample: self.bytes_per_sample,
        }
    }

    fn realtime_cursor(&self, shared: &SimShared) -> usize {
        let Some(started_at) = shared.started_at else {
            return shared.play_cursor;
        };
        let size = self.staging.len();
        let elapsed = started_at.elapsed().as_secs_f64();
        let frames = (elapsed * self.samples_per_second as f64) as u64;
        let bytes = frames * self.bytes_per_sample as u64;
        (bytes % size as u64) as usize
    }
}

impl AudioDevice for SimulatedDevice {
    fn name(&self) -> &str {
        "simulated"
    }

    fn buffer_size(&self) -> usize {
        self.staging.len()
    }

    fn query_cursors(&mut self) -> Result<Cursors, AudioError> {
        let mut shared = self.shared.lock();
        shared.query_calls += 1;
        if shared.unavailable || shared.query_fails {
            return Err(AudioError::unavailable("simulated device offline"));
        }

        let play = match self.mode {
            CursorMode::Manual => shared.play_cursor,
            CursorMode::Realtime => {
                let cursor = self.realtime_cursor(&shared);
                shared.play_cursor = cursor;
                cursor
            }
        };
        // Model the hardware's write-ahead as one sample-pair past the read head.
        let write = (play + self.bytes_per_sample) % self.staging.len();
        Ok(Cursors { play, write })
    }

    fn lock(&mut self, offset: usize, length: usize) -> Result<LockedRegions, AudioError> {
        let mut shared = self.shared.lock();
        shared.lock_calls += 1;
        if shared.unavailable {
            return Err(AudioError::unavailable("simulated device offline"));
        }
        if let Some(remaining) = shared.locks_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(AudioError::unavailable("simulated lock failure"));
            }
            *remaining -= 1;
        }
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
        let mut shared = self.shared.lock();
        shared.unlock_calls += 1;
        self.locked = None;
        if shared.unavailable {
            return Err(AudioError::unavailable("simulated device offline"));
        }

        for span in std::iter::once(locked.first).chain(locked.second) {
            shared.committed[span.offset..span.end()]
                .copy_from_slice(&self.staging[span.offset..span.end()]);
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let mut shared = self.shared.lock();
        if shared.unavailable {
            return Err(AudioError::unavailable("simulated device offline"));
        }
        shared.playing = true;
        shared.play_cursor = 0;
        shared.started_at = Some(Instant::now());
        Ok(())
    }
}

/// Shared control surface for a [`SimulatedDevice`]
#[derive(Clone)]
pub struct SimulatedHandle {
    shared: Arc<Mutex<SimShared>>,
    bytes_per_sample: usize,
}

impl SimulatedHandle {
    /// Move the play cursor to an absolute byte offset (manual mode).
    pub fn set_play_cursor(&self, bytes: usize) {
        let mut shared = self.shared.lock();
        let size = shared.committed.len();
        shared.play_cursor = bytes % size;
    }

    /// Advance the play cursor by `bytes`, wrapping at the buffer end.
    pub fn advance(&self, bytes: usize) {
        let mut shared = self.shared.lock();
        let size = shared.committed.len();
        shared.play_cursor = (shared.play_cursor + bytes) % size;
    }

    /// Make every operation fail, as if the device had been pulled.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.lock().unavailable = unavailable;
    }

    /// Make cursor queries fail while locks keep working.
    pub fn set_query_fails(&self, fails: bool) {
        self.shared.lock().query_fails = fails;
    }

    /// Let `count` more locks succeed, then fail every one after.
    pub fn fail_locks_after(&self, count: usize) {
        self.shared.lock().locks_before_failure = Some(count);
    }

    pub fn clear_lock_failure(&self) {
        self.shared.lock().locks_before_failure = None;
    }

    pub fn is_playing(&self) -> bool {
        self.shared.lock().playing
    }

    pub fn play_cursor(&self) -> usize {
        self.shared.lock().play_cursor
    }

    pub fn query_calls(&self) -> usize {
        self.shared.lock().query_calls
    }

    pub fn lock_calls(&self) -> usize {
        self.shared.lock().lock_calls
    }

    pub fn unlock_calls(&self) -> usize {
        self.shared.lock().unlock_calls
    }

    /// Copy of the bytes the hardware would play
    pub fn committed(&self) -> Vec<u8> {
        self.shared.lock().committed.clone()
    }

    /// Decode `count` stereo sample-pairs starting at byte `offset`, wrapping.
    pub fn samples_at(&self, offset: usize, count: usize) -> Vec<i16> {
        let shared = self.shared.lock();
        let size = shared.committed.len();
        let mut out = Vec::with_capacity(count * 2);
        for pair in 0..count {
            let base = offset + pair * self.bytes_per_sample;
            for channel in 0..2 {
                let at = (base + channel * 2) % size;
                let lo = shared.committed[at];
                let hi = shared.committed[(at + 1) % size];
                out.push(i16::from_le_bytes([lo, hi]));
            }
        }
        out
    }
}

//! Audio device capability and backend selection
//!
//! The loop never talks to a sound API directly. It sees a circular buffer
//! behind the [`AudioDevice`] trait, which any backend (real hardware, the
//! in-memory simulator, or the always-failing stub) can provide.

use crate::audio::buffer::{AudioStreamConfig, Segment};
use crate::error::AudioError;

/// Snapshot of the hardware cursors, in bytes, modulo the buffer size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursors {
    /// Where the hardware is reading right now
    pub play: usize,
    /// Where the hardware considers it safe to start writing. Stale by the
    /// time anyone reads it; the planner ignores it.
    pub write: usize,
}

/// Spans handed out by [`AudioDevice::lock`]. The second one is present only
/// when the locked range runs past the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedRegions {
    pub first: Segment,
    pub second: Option<Segment>,
}

impl LockedRegions {
    /// Split `length` bytes starting at `offset` at the wrap point of a
    /// buffer of `size` bytes.
    pub fn split(offset: usize, length: usize, size: usize) -> Self {
        let head = length.min(size - offset);
        let tail = length - head;
        Self {
            first: Segment::new(offset, head),
            second: (tail > 0).then(|| Segment::new(0, tail)),
        }
    }

    /// Borrow the two spans out of the backing buffer they refer to.
    pub fn slices_mut<'a>(&self, buffer: &'a mut [u8]) -> (&'a mut [u8], &'a mut [u8]) {
        let second_len = self.second.map_or(0, |s| s.length);
        let (low, high) = buffer.split_at_mut(self.first.offset);
        (&mut high[..self.first.length], &mut low[..second_len])
    }
}

/// Exclusive-write view of a hardware circular buffer.
///
/// Every operation may fail with [`AudioError::DeviceUnavailable`] when the
/// device is missing, was pulled, or is momentarily busy. None of them may
/// block for longer than a short bounded wait.
pub trait AudioDevice {
    /// Short label used in logs
    fn name(&self) -> &str;

    /// Size of the circular buffer in bytes
    fn buffer_size(&self) -> usize;

    fn query_cursors(&mut self) -> Result<Cursors, AudioError>;

    /// Take exclusive write access to `length` bytes starting at `offset`.
    fn lock(&mut self, offset: usize, length: usize) -> Result<LockedRegions, AudioError>;

    /// Writable memory for a range previously returned by [`AudioDevice::lock`].
    fn regions_mut(&mut self, locked: &LockedRegions) -> (&mut [u8], &mut [u8]);

    /// Release a lock, making the written bytes eligible for playback.
    fn unlock(&mut self, locked: LockedRegions) -> Result<(), AudioError>;

    /// Start looping playback from offset 0.
    fn play(&mut self) -> Result<(), AudioError>;
}

impl<D: AudioDevice + ?Sized> AudioDevice for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn buffer_size(&self) -> usize {
        (**self).buffer_size()
    }

    fn query_cursors(&mut self) -> Result<Cursors, AudioError> {
        (**self).query_cursors()
    }

    fn lock(&mut self, offset: usize, length: usize) -> Result<LockedRegions, AudioError> {
        (**self).lock(offset, length)
    }

    fn regions_mut(&mut self, locked: &LockedRegions) -> (&mut [u8], &mut [u8]) {
        (**self).regions_mut(locked)
    }

    fn unlock(&mut self, locked: LockedRegions) -> Result<(), AudioError> {
        (**self).unlock(locked)
    }

    fn play(&mut self) -> Result<(), AudioError> {
        (**self).play()
    }
}

/// Stand-in used when no backend could be brought up. Every call fails.
#[derive(Debug, Clone)]
pub struct NullDevice {
    buffer_size: usize,
}

impl NullDevice {
    pub fn new(config: &AudioStreamConfig) -> Self {
        Self {
            buffer_size: config.buffer_size_bytes(),
        }
    }
}

impl AudioDevice for NullDevice {
    fn name(&self) -> &str {
        "null"
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn query_cursors(&mut self) -> Result<Cursors, AudioError> {
        Err(AudioError::unavailable("no audio device"))
    }

    fn lock(&mut self, _offset: usize, _length: usize) -> Result<LockedRegions, AudioError> {
        Err(AudioError::unavailable("no audio device"))
    }

    fn regions_mut(&mut self, _locked: &LockedRegions) -> (&mut [u8], &mut [u8]) {
        (&mut [], &mut [])
    }

    fn unlock(&mut self, _locked: LockedRegions) -> Result<(), AudioError> {
        Err(AudioError::unavailable("no audio device"))
    }

    fn play(&mut self) -> Result<(), AudioError> {
        Err(AudioError::unavailable("no audio device"))
    }
}

/// Backends the provider chain knows how to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Default host output through cpal
    Cpal,
    /// In-memory buffer whose play cursor follows wall time
    Simulated,
    /// Always-failing stub
    Null,
}

impl Backend {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cpal" => Some(Backend::Cpal),
            "simulated" | "sim" => Some(Backend::Simulated),
            "null" | "none" => Some(Backend::Null),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Cpal => "cpal",
            Backend::Simulated => "simulated",
            Backend::Null => "null",
        }
    }

    /// Try to bring the backend up for the given stream format.
    pub fn open(&self, config: &AudioStreamConfig) -> Result<Box<dyn AudioDevice>, AudioError> {
        match self {
            #[cfg(feature = "cpal-output")]
            Backend::Cpal => {
                let device = crate::audio::output::CpalOutput::open_default(config)?;
                let negotiated = device.stream_config();
                tracing::info!(
                    "cpal output '{}': {} channels at {} Hz",
                    device.device_name(),
                    negotiated.channels,
                    negotiated.sample_rate.0
                );
                Ok(Box::new(device))
            }
            #[cfg(not(feature = "cpal-output"))]
            Backend::Cpal => Err(AudioError::DeviceNotFound(
                "built without the cpal-output feature".to_string(),
            )),
            Backend::Simulated => Ok(Box::new(
                crate::audio::simulated::SimulatedDevice::realtime(config),
            )),
            Backend::Null => Ok(Box::new(NullDevice::new(config))),
        }
    }
}

/// Walk the configured backends in order and return the first one that
/// opens. Unknown names are skipped. Falls back to [`NullDevice`].
pub fn select_device<S: AsRef<str>>(
    names: &[S],
    config: &AudioStreamConfig,
) -> Box<dyn AudioDevice> {
    for name in names {
        let name = name.as_ref();
        let Some(backend) = Backend::from_name(name) else {
            tracing::warn!("Unknown audio backend '{}', skipping", name);
            continue;
        };

        match backend.open(config) {
            Ok(device) => {
                tracing::info!("Using audio backend: {}", device.name());
                return device;
            }
            Err(e) => {
                tracing::warn!("Audio backend {} unavailable: {}", backend.name(), e);
            }
        }
    }

    tracing::warn!("No audio backend available, running silent");
    Box::new(NullDevice::new(config))
}

/// Output device summary for the startup banner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// List the host's output devices. Empty when built without cpal.
#[cfg(feature = "cpal-output")]
pub fn list_output_devices() -> Vec<OutputDeviceInfo> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device.name() {
                let is_default = default_name.as_ref() == Some(&name);
                devices.push(OutputDeviceInfo { name, is_default });
            }
        }
    }
    devices
}

/// List the host's output devices. Empty when built without cpal.
#[cfg(not(feature = "cpal-output"))]
pub fn list_output_devices() -> Vec<OutputDeviceInfo> {
    Vec::new()
}

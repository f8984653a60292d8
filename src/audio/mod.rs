//! Audio subsystem module

pub mod buffer;
pub mod copier;
pub mod device;
#[cfg(feature = "cpal-output")]
pub mod output;
pub mod simulated;

pub use buffer::{plan, AudioStreamConfig, Segment, WritePlan};
pub use copier::{clear_buffer, CopyResult, SampleCopier};
pub use device::{
    list_output_devices, select_device, AudioDevice, Backend, Cursors, LockedRegions, NullDevice,
};
#[cfg(feature = "cpal-output")]
pub use output::CpalOutput;
pub use simulated::{SimulatedDevice, SimulatedHandle};

//! # Frame Audio
//!
//! Fixed-latency audio output from a per-frame game loop.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        Frame Loop (frame_loop)                       │
//! │                                                                      │
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌────────────┐   │
//! │  │  Events /  │──▶│  Cursor    │──▶│  Write     │──▶│   Game     │   │
//! │  │ Controllers│   │  Query     │   │  Planner   │   │  Update    │   │
//! │  └────────────┘   └─────┬──────┘   └─────┬──────┘   └─────┬──────┘   │
//! │                         │                │                │          │
//! │                         │                ▼                ▼          │
//! │                         │          ┌────────────┐   ┌────────────┐   │
//! │                         │          │  Sample    │   │ Presenter  │   │
//! │                         │          │  Copier    │   └────────────┘   │
//! │                         │          └─────┬──────┘                    │
//! │                         │                │ lock / unlock per segment │
//! │                         ▼                ▼                           │
//! │  ┌──────────────────────────────────────────────────────────────┐    │
//! │  │              AudioDevice (audio::device)                     │    │
//! │  │   ┌──────────────────────────────────────────────────────┐   │    │
//! │  │   │ circular buffer  ▲play          ▲writer    ▲target   │   │    │
//! │  │   └──────────────────────────────────────────────────────┘   │    │
//! │  │      cpal output  |  simulated  |  null                      │    │
//! │  └──────────────────────────────────────────────────────────────┘    │
//! │                                                                      │
//! │  Frame Clock (clock): ms/frame, fps, megacycles/frame                │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod platform;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate for audio output
    pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

    /// Bytes per sample-pair (16-bit left + 16-bit right)
    pub const BYTES_PER_SAMPLE: usize = 4;

    /// Latency lead is one fifteenth of a second of audio
    pub const DEFAULT_LATENCY_DIVISOR: u32 = 15;

    /// Default test tone frequency in Hz
    pub const DEFAULT_TONE_HZ: u32 = 256;

    /// Default test tone amplitude
    pub const DEFAULT_TONE_VOLUME: i16 = 3000;

    /// Default offscreen buffer size
    pub const DEFAULT_WIDTH: usize = 1280;
    pub const DEFAULT_HEIGHT: usize = 720;

    /// Controller stick deflection per pixel of scroll
    pub const STICK_DIVISOR: i32 = 4096;
}

//! Main loop driver
//!
//! One [`FrameLoop`] owns everything a frame touches: the audio device, the
//! sample copier and its writer index, the event and controller sources,
//! the pixel buffer, the presenter and the clock. Each call to
//! [`FrameLoop::run_iteration`] performs exactly one frame:
//!
//! ```text
//! events ─▶ controllers ─▶ query cursors ─▶ plan ─▶ game ─▶ copy ─▶ present ─▶ tick
//!                               │                             ▲
//!                               └── unavailable: skip ────────┘
//! ```
//!
//! Device failures never stop the loop; they cost that frame its audio.

use crate::audio::buffer::{plan, AudioStreamConfig, WritePlan};
use crate::audio::copier::{clear_buffer, CopyResult, SampleCopier};
use crate::audio::device::AudioDevice;
use crate::clock::{FrameClock, FramePacer, FrameStats};
use crate::config::AppConfig;
use crate::constants::STICK_DIVISOR;
use crate::error::{Error, Result};
use crate::platform::events::{
    EventSource, InputSource, KeyCode, KeyEvent, PlatformEvent, MAX_CONTROLLERS,
};
use crate::platform::game::{Game, InputOffsets, SoundOutputBuffer};
use crate::platform::video::{OffscreenBuffer, Presenter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// Terminal. Set by quit, window close or Alt+F4.
    Stopped,
}

/// Running totals since the loop was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    pub frames: u64,
    /// Frames whose audio was skipped or only partly written
    pub dropout_frames: u64,
    pub samples_written: u64,
    /// Times audio went from working to failing
    pub outages: u64,
    /// Times audio came back after an outage
    pub recoveries: u64,
}

/// What happened during one iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    pub state: LoopState,
    /// Whether the device answered the cursor query this frame
    pub sound_valid: bool,
    pub plan: Option<WritePlan>,
    /// Set when every segment of the plan made it into the device
    pub copied: Option<CopyResult>,
    pub timing: FrameStats,
}

pub struct FrameLoop {
    stream: AudioStreamConfig,
    device: Box<dyn AudioDevice>,
    copier: SampleCopier,
    events: Box<dyn EventSource>,
    input: Box<dyn InputSource>,
    presenter: Box<dyn Presenter>,
    pixels: OffscreenBuffer,
    samples: Vec<i16>,
    offsets: InputOffsets,
    tone_hz: u32,
    clock: FrameClock,
    pacer: Option<FramePacer>,
    state: LoopState,
    audio_ok: bool,
    stats: LoopStats,
}

impl FrameLoop {
    pub fn new(
        config: &AppConfig,
        device: Box<dyn AudioDevice>,
        events: Box<dyn EventSource>,
        input: Box<dyn InputSource>,
        presenter: Box<dyn Presenter>,
    ) -> Result<Self> {
        config.validate()?;
        let stream = config.stream_config()?;
        if device.buffer_size() != stream.buffer_size_bytes() {
            return Err(Error::Config(format!(
                "{} device buffer is {} bytes, stream expects {}",
                device.name(),
                device.buffer_size(),
                stream.buffer_size_bytes()
            )));
        }

        Ok(Self {
            stream,
            device,
            copier: SampleCopier::new(stream),
            events,
            input,
            presenter,
            pixels: OffscreenBuffer::new(config.video.width, config.video.height),
            // A plan never asks for more than the whole buffer.
            samples: vec![0; stream.buffer_samples() * 2],
            offsets: InputOffsets::default(),
            tone_hz: config.audio.tone_hz,
            clock: FrameClock::system(),
            pacer: config.frame.target_fps.map(FramePacer::new),
            state: LoopState::Running,
            audio_ok: true,
            stats: LoopStats::default(),
        })
    }

    /// Zero the device buffer and start looping playback.
    ///
    /// Failures are logged only; the loop runs without sound until the
    /// device starts answering.
    pub fn startup(&mut self) {
        tracing::info!(
            "Audio: {} Hz, {} byte buffer, {} sample lead via {}",
            self.stream.samples_per_second(),
            self.stream.buffer_size_bytes(),
            self.stream.latency_samples(),
            self.device.name()
        );

        if let Err(e) = clear_buffer(&mut *self.device) {
            tracing::warn!("Could not clear sound buffer: {}", e);
        }
        if let Err(e) = self.device.play() {
            tracing::warn!("Could not start playback: {}", e);
        }
    }

    /// Run frames until stopped or `max_frames` have run.
    pub fn run(&mut self, game: &mut dyn Game, max_frames: Option<u64>) -> LoopStats {
        self.startup();

        while self.state == LoopState::Running {
            if max_frames.is_some_and(|max| self.stats.frames >= max) {
                tracing::info!("Frame limit reached");
                break;
            }
            self.run_iteration(game);
        }

        tracing::info!(
            "Loop finished: {} frames, {} with audio dropouts ({} outages), {} samples written",
            self.stats.frames,
            self.stats.dropout_frames,
            self.stats.outages,
            self.stats.samples_written
        );
        self.stats
    }

    pub fn run_iteration(&mut self, game: &mut dyn Game) -> IterationReport {
        self.drain_events();
        self.poll_controllers();

        let plan = match self.device.query_cursors() {
            Ok(cursors) => Some(plan(cursors.play, self.copier.writer_index(), &self.stream)),
            Err(e) => {
                tracing::debug!("Cursor query failed: {}", e);
                None
            }
        };

        let sample_count = plan.map_or(0, |p| p.sample_count(&self.stream));
        let source = &mut self.samples[..sample_count * 2];
        match plan {
            Some(_) => {
                let mut sound = SoundOutputBuffer::new(self.stream.samples_per_second(), source);
                game.update_and_render(
                    &mut self.pixels,
                    self.offsets,
                    Some(&mut sound),
                    self.tone_hz,
                );
            }
            None => game.update_and_render(&mut self.pixels, self.offsets, None, self.tone_hz),
        }

        let mut copied = None;
        if let Some(plan) = &plan {
            let before = self.copier.writer_index();
            let result = self
                .copier
                .write(plan, &self.samples[..sample_count * 2], &mut *self.device);
            self.stats.samples_written += self.copier.writer_index() - before;

            match result {
                Ok(result) => copied = Some(result),
                Err(e) => tracing::debug!("Sound write interrupted: {}", e),
            }
        }
        if copied.is_none() {
            self.stats.dropout_frames += 1;
        }
        self.note_audio(copied.is_some());

        if let Err(e) = self.presenter.present(&self.pixels) {
            tracing::debug!("Present failed: {}", e);
        }

        self.offsets.x = self.offsets.x.wrapping_add(1);

        if let Some(pacer) = &self.pacer {
            pacer.wait(&self.clock);
        }
        let timing = self.clock.tick();
        tracing::trace!(
            "{:.02}ms/f, {:.02} FPS, {:.02}Mc/f",
            timing.ms_per_frame(),
            timing.fps(),
            timing.megacycles_per_frame()
        );

        self.stats.frames += 1;
        IterationReport {
            state: self.state,
            sound_valid: plan.is_some(),
            plan,
            copied,
            timing,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Request a stop from outside the event stream.
    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn writer_index(&self) -> u64 {
        self.copier.writer_index()
    }

    pub fn offsets(&self) -> InputOffsets {
        self.offsets
    }

    pub fn stream_config(&self) -> &AudioStreamConfig {
        &self.stream
    }

    pub fn pixels(&self) -> &OffscreenBuffer {
        &self.pixels
    }

    fn drain_events(&mut self) {
        while let Some(event) = self.events.poll_event() {
            match event {
                PlatformEvent::Quit => {
                    tracing::info!("Quit requested");
                    self.state = LoopState::Stopped;
                }
                PlatformEvent::Close => {
                    tracing::info!("Window closed");
                    self.state = LoopState::Stopped;
                }
                PlatformEvent::Key(key) => self.handle_key(key),
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.is_quit_combo() {
            tracing::info!("Alt+F4 pressed");
            self.state = LoopState::Stopped;
            return;
        }
        if !key.is_transition() {
            return;
        }

        match key.code {
            KeyCode::W
            | KeyCode::A
            | KeyCode::S
            | KeyCode::D
            | KeyCode::Q
            | KeyCode::E
            | KeyCode::Up
            | KeyCode::Down
            | KeyCode::Left
            | KeyCode::Right
            | KeyCode::Space => {
                tracing::debug!("{:?} {}", key.code, if key.is_down { "down" } else { "up" });
            }
            KeyCode::Escape => {
                tracing::debug!(
                    "Escape: is_down={} was_down={}",
                    key.is_down,
                    key.was_down
                );
            }
            KeyCode::F4 | KeyCode::Other(_) => {}
        }
    }

    fn poll_controllers(&mut self) {
        for index in 0..MAX_CONTROLLERS {
            let Some(pad) = self.input.poll_controller(index) else {
                continue;
            };
            self.offsets.x = self
                .offsets
                .x
                .wrapping_add(pad.stick_x as i32 / STICK_DIVISOR);
            self.offsets.y = self
                .offsets
                .y
                .wrapping_add(pad.stick_y as i32 / STICK_DIVISOR);
        }
    }

    fn note_audio(&mut self, ok: bool) {
        if ok == self.audio_ok {
            return;
        }
        if ok {
            tracing::info!("Audio device recovered");
            self.stats.recoveries += 1;
        } else {
            tracing::warn!("Audio device unavailable, continuing without sound");
            self.stats.outages += 1;
        }
        self.audio_ok = ok;
    }
}

//! Window events and controller input
//!
//! The loop drains events without blocking and polls a fixed number of
//! controller slots each frame. Where they come from (a window system, a
//! gamepad library, a test script) is up to the implementor.

use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// Controller slots polled every frame
pub const MAX_CONTROLLERS: usize = 4;

/// Keys the loop reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    W,
    A,
    S,
    D,
    Q,
    E,
    Up,
    Down,
    Left,
    Right,
    Escape,
    Space,
    F4,
    Other(u32),
}

/// Raw key message as the window system reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub is_down: bool,
    pub was_down: bool,
    pub alt_down: bool,
}

impl KeyEvent {
    /// Auto-repeat messages carry the same state twice.
    pub fn is_transition(&self) -> bool {
        self.is_down != self.was_down
    }

    pub fn is_quit_combo(&self) -> bool {
        self.code == KeyCode::F4 && self.alt_down
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The application was asked to quit
    Quit,
    /// The window was closed or destroyed
    Close,
    Key(KeyEvent),
}

/// Non-blocking event queue
pub trait EventSource {
    /// Next pending event, or `None` once the queue is empty.
    fn poll_event(&mut self) -> Option<PlatformEvent>;
}

/// Event source fed from another thread through a channel
pub struct ChannelEvents {
    rx: Receiver<PlatformEvent>,
    disconnected: bool,
}

impl ChannelEvents {
    pub fn new(rx: Receiver<PlatformEvent>) -> Self {
        Self {
            rx,
            disconnected: false,
        }
    }

    /// Sender/source pair with an unbounded queue
    pub fn channel() -> (Sender<PlatformEvent>, Self) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (tx, Self::new(rx))
    }
}

impl EventSource for ChannelEvents {
    fn poll_event(&mut self) -> Option<PlatformEvent> {
        if self.disconnected {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::debug!("Event sender dropped; no further events");
                self.disconnected = true;
                None
            }
        }
    }
}

/// Pre-recorded events, one batch per frame
#[derive(Debug, Default)]
pub struct ScriptedEvents {
    frames: std::collections::VecDeque<Vec<PlatformEvent>>,
    current: std::collections::VecDeque<PlatformEvent>,
    started: bool,
}

impl ScriptedEvents {
    pub fn new(frames: Vec<Vec<PlatformEvent>>) -> Self {
        Self {
            frames: frames.into(),
            current: Default::default(),
            started: false,
        }
    }
}

impl EventSource for ScriptedEvents {
    fn poll_event(&mut self) -> Option<PlatformEvent> {
        if !self.started {
            self.started = true;
            self.current = self.frames.pop_front().unwrap_or_default().into();
        }
        match self.current.pop_front() {
            Some(event) => Some(event),
            None => {
                // Queue drained for this frame; arm the next batch.
                self.started = false;
                None
            }
        }
    }
}

/// Left stick snapshot of one connected controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerState {
    pub stick_x: i16,
    pub stick_y: i16,
}

/// Controller polling. `None` means nothing is plugged into that slot.
pub trait InputSource {
    fn poll_controller(&mut self, index: usize) -> Option<ControllerState>;
}

/// Input source with every slot empty
#[derive(Debug, Clone, Copy, Default)]
pub struct NoControllers;

impl InputSource for NoControllers {
    fn poll_controller(&mut self, _index: usize) -> Option<ControllerState> {
        None
    }
}

/// Same snapshot in a fixed set of slots every frame
#[derive(Debug, Clone, Default)]
pub struct FixedControllers {
    pub slots: [Option<ControllerState>; MAX_CONTROLLERS],
}

impl InputSource for FixedControllers {
    fn poll_controller(&mut self, index: usize) -> Option<ControllerState> {
        self.slots.get(index).copied().flatten()
    }
}

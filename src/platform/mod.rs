//! Collaborators the frame loop drives but does not own

pub mod events;
pub mod game;
pub mod video;

pub use events::{
    ChannelEvents, ControllerState, EventSource, FixedControllers, InputSource, KeyCode, KeyEvent,
    NoControllers, PlatformEvent, ScriptedEvents, MAX_CONTROLLERS,
};
pub use game::{Game, InputOffsets, SoundOutputBuffer, ToneGame};
pub use video::{ChecksumPresenter, NullPresenter, OffscreenBuffer, Presenter};

use std::fmt;

use crate::transport::RawState;

/// Observable playback state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// Nothing playing, no resource.
    #[default]
    Initial,
    /// Transport is connecting or loading.
    Buffering,
    /// Media is playing.
    Ready,
    /// Playback suspended by the user; resume via start.
    Paused,
    /// The stream reached its end.
    Ended,
    /// Playback failed; the session carries a message.
    Error,
}

/// Commands a UI should offer for a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Resume,
    Pause,
    Stop,
}

impl PlayerState {
    /// Controls that make sense in this state.
    ///
    /// ```
    /// use playback::{Command, PlayerState};
    ///
    /// assert_eq!(PlayerState::Ready.controls(), &[Command::Pause, Command::Stop]);
    /// assert!(PlayerState::Buffering.controls().is_empty());
    /// ```
    pub fn controls(self) -> &'static [Command] {
        match self {
            Self::Initial | Self::Error | Self::Ended => &[Command::Start],
            Self::Ready => &[Command::Pause, Command::Stop],
            Self::Paused => &[Command::Resume, Command::Stop],
            Self::Buffering => &[],
        }
    }

    /// Whether a progress indicator should be shown.
    pub fn is_loading(self) -> bool {
        self == Self::Buffering
    }

    /// Whether the video surface should be visible.
    pub fn shows_video(self) -> bool {
        self != Self::Initial
    }
}

impl From<RawState> for PlayerState {
    fn from(raw: RawState) -> Self {
        match raw {
            RawState::Ready => Self::Ready,
            RawState::Buffering => Self::Buffering,
            RawState::Ended => Self::Ended,
            RawState::Idle | RawState::Unknown(_) => Self::Initial,
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Buffering => "buffering",
            Self::Ready => "ready",
            Self::Paused => "paused",
            Self::Ended => "ended",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Resume => "resume",
            Self::Pause => "pause",
            Self::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Point-in-time copy of a session's observable fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub state: PlayerState,
    pub stream_address: String,
    /// Present only while `state` is [`PlayerState::Error`].
    pub error_message: Option<String>,
}

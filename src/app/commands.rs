//! Inbound command vocabulary.
//!
//! The remote channel carries a single free-text field per message.  It
//! decodes to exactly one of the commands below, by case-sensitive exact
//! match — anything else is unrecognized and gets logged and dropped by
//! the [`CommandInbox`](super::inbox::CommandInbox).

use crate::fsm::context::MotionDirection;

/// Commands the outside world can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start a raise travel cycle (next time the controller is idle).
    Raise,
    /// Start a lower travel cycle.
    Lower,
    /// Request a one-shot report of the current position.
    Report,
    /// Enable automatic light-sensing motion.
    EnableAuto,
    /// Disable automatic light-sensing motion.
    DisableAuto,
}

impl Command {
    /// Decode the free-text command field.  Exact, case-sensitive match.
    pub fn decode(text: &str) -> Option<Self> {
        match text {
            "raise" => Some(Self::Raise),
            "lower" => Some(Self::Lower),
            "report" => Some(Self::Report),
            "enable-auto" => Some(Self::EnableAuto),
            "disable-auto" => Some(Self::DisableAuto),
            _ => None,
        }
    }

    /// The motion direction this command requests, if any.
    pub fn direction(self) -> Option<MotionDirection> {
        match self {
            Self::Raise => Some(MotionDirection::Raise),
            Self::Lower => Some(MotionDirection::Lower),
            _ => None,
        }
    }
}

//! Outbound application events.
//!
//! The [`ShutterService`](super::service::ShutterService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them — log to serial, publish
//! on the MQTT status topic, etc.

use crate::fsm::context::ShutterPosition;
use crate::fsm::StateId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The controller finished startup recovery (carries the recovered
    /// state and position).
    Started {
        state: StateId,
        position: ShutterPosition,
    },

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A travel cycle completed and the position flipped.
    /// Emitted exactly once per completed cycle.
    PositionChanged(ShutterPosition),

    /// A remote `report` request was answered.
    PositionReport(ShutterPosition),
}

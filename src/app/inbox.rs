//! Command inbox — the shared fields written by the remote channel and
//! read by the controller.
//!
//! Holds at most one outstanding motion command (last-write-wins, no
//! queueing: a command arriving before the previous one is consumed is
//! lost), plus two sticky flags: auto-mode enabled and report requested.
//! The report flag stays set until the controller consumes it; auto-mode
//! toggles apply immediately.

use log::{info, warn};

use super::commands::Command;
use crate::fsm::context::MotionDirection;

/// Decoded inbound state, owned by the main loop and consumed by the
/// [`ShutterService`](super::service::ShutterService) each tick.
#[derive(Debug, Default)]
pub struct CommandInbox {
    pending: Option<MotionDirection>,
    auto_mode: bool,
    report_requested: bool,
}

impl CommandInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and apply one inbound message's command field.
    /// Unrecognized input is logged and otherwise ignored.
    pub fn accept(&mut self, text: &str) {
        match Command::decode(text) {
            Some(cmd @ (Command::Raise | Command::Lower)) => {
                if self.pending.is_some() {
                    warn!("inbox: overwriting unconsumed pending command");
                }
                self.pending = cmd.direction();
                info!("inbox: pending command {:?}", self.pending);
            }
            Some(Command::Report) => {
                self.report_requested = true;
                info!("inbox: report requested");
            }
            Some(Command::EnableAuto) => {
                self.auto_mode = true;
                info!("inbox: auto mode enabled");
            }
            Some(Command::DisableAuto) => {
                self.auto_mode = false;
                info!("inbox: auto mode disabled");
            }
            None => {
                warn!("inbox: unrecognized command {:?}, ignored", text);
            }
        }
    }

    /// Take the pending motion command, clearing it.
    pub fn take_pending(&mut self) -> Option<MotionDirection> {
        self.pending.take()
    }

    /// Peek at the pending motion command without consuming it.
    pub fn pending(&self) -> Option<MotionDirection> {
        self.pending
    }

    /// Whether auto light sensing is currently enabled.
    pub fn auto_mode(&self) -> bool {
        self.auto_mode
    }

    /// Consume the sticky report-requested flag.
    pub fn take_report_request(&mut self) -> bool {
        core::mem::take(&mut self.report_requested)
    }
}

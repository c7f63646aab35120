//! Shutter service — the hexagonal core.
//!
//! [`ShutterService`] owns the FSM and the shared context.  It exposes a
//! clean, hardware-agnostic API.  All I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!  LightPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!  CommandInbox ▶│     ShutterService     │ ──▶ FlagStore
//!  MotorPort ◀── │  recovery · FSM · wear │
//!                └────────────────────────┘
//! ```
//!
//! ## Persistence protocol
//!
//! Two flags live in the flag store: `down` (last completed position)
//! and `in-progress` (motor energised).  `in-progress` is written once
//! per travel cycle, not every tick, and both flags are written only
//! when the stored value differs from the current one — the in-memory
//! mirror bounds flash wear.  A storage failure is fatal and propagates
//! upward; no core invariant survives without durable state.

use log::info;

use crate::config::SystemConfig;
use crate::error::Error;
use crate::fsm::context::{FsmContext, MotionTimer, ShutterPosition};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};

use super::events::AppEvent;
use super::inbox::CommandInbox;
use super::ports::{EventSink, FlagStore, LightPort, MotorPort};

/// Flag store key for the persisted position (`true` = down).
pub const KEY_POSITION: &str = "down";
/// Flag store key for the persisted motion-in-progress marker.
pub const KEY_IN_PROGRESS: &str = "in-progress";

/// In-memory mirror of the two persisted flags, refreshed at recovery.
/// Compared before every write so unchanged values never hit flash.
#[derive(Debug, Clone, Copy, Default)]
struct PersistedFlags {
    down: bool,
    in_progress: bool,
}

// ───────────────────────────────────────────────────────────────
// ShutterService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct ShutterService {
    fsm: Fsm,
    ctx: FsmContext,
    persisted: PersistedFlags,
    tick_count: u64,
}

impl ShutterService {
    /// Construct the service from configuration.
    ///
    /// Does **not** touch storage — call [`recover`](Self::recover) next.
    pub fn new(config: SystemConfig) -> Self {
        let ctx = FsmContext::new(config);
        let fsm = Fsm::new(build_state_table(), StateId::Idle);

        Self {
            fsm,
            ctx,
            persisted: PersistedFlags::default(),
            tick_count: 0,
        }
    }

    // ── Startup recovery ──────────────────────────────────────

    /// Recover persisted motion state.  Runs once, before the first tick.
    ///
    /// Both flags default to `false` when absent — a freshly provisioned
    /// device boots Idle with the shutter assumed up.  If the device
    /// restarted mid-motion (`in-progress` still set), the direction is
    /// re-derived from the position the motion had not yet flipped:
    /// position still `down` means a raise was interrupted, position
    /// still `up` means a lower was.  The travel timer restarts from
    /// zero — the physical position is unknown, so the full travel
    /// duration is replayed.
    pub fn recover(
        &mut self,
        store: &impl FlagStore,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        let down = store.get_bool(KEY_POSITION, false)?;
        let in_progress = store.get_bool(KEY_IN_PROGRESS, false)?;
        self.persisted = PersistedFlags { down, in_progress };
        self.ctx.position = ShutterPosition::from_down(down);

        let initial = if in_progress {
            if down { StateId::Raising } else { StateId::Lowering }
        } else {
            StateId::Idle
        };

        self.fsm.start(&mut self.ctx);
        if initial != StateId::Idle {
            info!("recovery: restart mid-motion, replaying full travel as {:?}", initial);
            self.fsm.force_transition(initial, &mut self.ctx);
        }

        sink.emit(&AppEvent::Started {
            state: initial,
            position: self.ctx.position,
        });
        info!(
            "recovered: state={:?} position={:?} (flags: down={}, in-progress={})",
            initial, self.ctx.position, down, in_progress
        );
        Ok(())
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle: read inputs → FSM → motor → persist.
    ///
    /// The `hw` parameter satisfies **both** [`LightPort`] and
    /// [`MotorPort`] — this avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl LightPort + MotorPort),
        inbox: &mut CommandInbox,
        store: &mut impl FlagStore,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        self.tick_count += 1;
        let prev_state = self.fsm.current_state();

        // 1. Latest smoothed light sample via LightPort
        self.ctx.lux = hw.read_lux();

        // 2. Inbox flags — the pending command is consumed only from Idle
        //    (no mid-motion cancellation; it stays queued otherwise).
        self.ctx.auto_mode = inbox.auto_mode();
        if prev_state == StateId::Idle && self.ctx.pending.is_none() {
            self.ctx.pending = inbox.take_pending();
        }

        // 3. FSM tick (pure state logic)
        self.fsm.tick(&mut self.ctx);

        // 4. Apply relay commands via MotorPort
        self.apply_motor(hw);

        // 5. Persistence — write-once per cycle, only when differing.
        if self.ctx.motion.is_active() && !self.persisted.in_progress {
            store.put_bool(KEY_IN_PROGRESS, true)?;
            self.persisted.in_progress = true;
        }
        if let Some(position) = self.ctx.completed.take() {
            if self.persisted.down != position.is_down() {
                store.put_bool(KEY_POSITION, position.is_down())?;
                self.persisted.down = position.is_down();
            }
            if self.persisted.in_progress {
                store.put_bool(KEY_IN_PROGRESS, false)?;
                self.persisted.in_progress = false;
            }
            sink.emit(&AppEvent::PositionChanged(position));
        }

        // 6. Emit state change if the FSM moved
        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }

        // 7. Answer a report request, independent of motion state.
        if inbox.take_report_request() {
            sink.emit(&AppEvent::PositionReport(self.ctx.position));
        }

        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Last completed shutter position.
    pub fn position(&self) -> ShutterPosition {
        self.ctx.position
    }

    /// Active motion timer (for diagnostics and tests).
    pub fn motion(&self) -> MotionTimer {
        self.ctx.motion
    }

    /// Length of the running auto-sensing streak.
    pub fn streak_len(&self) -> u8 {
        self.ctx.streak.len()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> SystemConfig {
        self.ctx.config.clone()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Translate FSM relay commands into port calls.
    fn apply_motor(&self, hw: &mut impl MotorPort) {
        use crate::fsm::context::MotionDirection;

        let cmds = &self.ctx.commands;
        if cmds.raise {
            hw.drive(MotionDirection::Raise);
        } else if cmds.lower {
            hw.drive(MotionDirection::Lower);
        } else {
            hw.stop();
        }
    }
}

//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  It contains the latest light sample, the auto-sensing
//! streak, the pending remote command, the shutter position, the motion
//! timer, relay command outputs, timing information, and configuration.
//! Think of it as the "blackboard" in a blackboard architecture.

use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Domain value types
// ---------------------------------------------------------------------------

/// Resting position of the shutter.  Persisted as the boolean `down`
/// (`true` = down).  Only ever written when a motion cycle *completes* —
/// never mid-motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterPosition {
    Up,
    Down,
}

impl ShutterPosition {
    /// Decode from the persisted `down` flag.
    pub fn from_down(down: bool) -> Self {
        if down { Self::Down } else { Self::Up }
    }

    /// Encode as the persisted `down` flag.
    pub fn is_down(self) -> bool {
        matches!(self, Self::Down)
    }
}

/// Which way the motor is (to be) driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionDirection {
    Raise,
    Lower,
}

/// In-memory motion timer.  `t` is the control tick at which the motion
/// started; elapsed time is derived from the tick counter, so the timer
/// is monotonic and survives nothing — after a restart it is
/// reconstructed from the persisted flags by the recovery protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionTimer {
    #[default]
    None,
    RaisingSince(u64),
    LoweringSince(u64),
}

impl MotionTimer {
    /// Whether a motion cycle is currently running.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Milliseconds elapsed since the motion started, measured in whole
    /// control ticks.  Zero when no motion is running.
    pub fn elapsed_ms(self, now_tick: u64, tick_period_ms: u32) -> u64 {
        match self {
            Self::None => 0,
            Self::RaisingSince(t) | Self::LoweringSince(t) => {
                now_tick.saturating_sub(t) * u64::from(tick_period_ms)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Light sample window
// ---------------------------------------------------------------------------

/// Run-length counter of consecutive light samples on the triggering side
/// of the brightness threshold.  A contradicting sample cancels the whole
/// streak (reset to 0, not decrement); a triggered transition consumes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightStreak {
    count: u8,
}

impl LightStreak {
    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn len(&self) -> u8 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Feed one lux sample.  While the shutter is up, dark samples
    /// (`lux < threshold`) accumulate toward `Lower`; while it is down,
    /// bright samples (`lux > threshold`) accumulate toward `Raise`.
    /// Returns the triggered direction once the window fills, consuming
    /// the streak.
    pub fn observe(
        &mut self,
        lux: u16,
        position: ShutterPosition,
        config: &SystemConfig,
    ) -> Option<MotionDirection> {
        let toward = match position {
            ShutterPosition::Up => lux < config.lux_threshold,
            ShutterPosition::Down => lux > config.lux_threshold,
        };

        if toward {
            self.count = self.count.saturating_add(1);
        } else {
            // An isolated contrary reading cancels the whole streak.
            self.count = 0;
            return None;
        }

        if self.count >= config.streak_window {
            self.count = 0;
            Some(match position {
                ShutterPosition::Up => MotionDirection::Lower,
                ShutterPosition::Down => MotionDirection::Raise,
            })
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Motor commands (written by state handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// Relay assertions requested by the state handlers.  The service applies
/// these through the motor port each tick.  Never both `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorCommand {
    pub raise: bool,
    pub lower: bool,
}

impl MotorCommand {
    /// Both relays released — safe default.
    pub fn released() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,
    /// Duration of one tick in milliseconds.
    pub tick_period_ms: u32,

    // -- Inputs --
    /// Latest smoothed lux sample (`None` before the first valid reading).
    pub lux: Option<u16>,
    /// Whether auto light sensing is enabled (mirrored from the inbox).
    pub auto_mode: bool,
    /// Pending remote motion command (consumed from Idle only).
    pub pending: Option<MotionDirection>,

    // -- State --
    /// Last *completed* position.
    pub position: ShutterPosition,
    /// Active motion timer.
    pub motion: MotionTimer,
    /// Auto-sensing run-length window.
    pub streak: LightStreak,
    /// Set by a motion handler on the tick its travel completes; the
    /// service consumes it to persist and report the new position.
    pub completed: Option<ShutterPosition>,

    // -- Outputs --
    /// Relay assertions to apply after the FSM tick.
    pub commands: MotorCommand,

    // -- Configuration --
    /// System configuration (tunable parameters).
    pub config: SystemConfig,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            tick_period_ms: config.control_loop_interval_ms,
            lux: None,
            auto_mode: false,
            pending: None,
            position: ShutterPosition::Up,
            motion: MotionTimer::None,
            streak: LightStreak::default(),
            completed: None,
            commands: MotorCommand::released(),
            config,
        }
    }

    /// Milliseconds the active motion has been running.
    pub fn motion_elapsed_ms(&self) -> u64 {
        self.motion.elapsed_ms(self.total_ticks, self.tick_period_ms)
    }
}

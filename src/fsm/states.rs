//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers — no closures, no
//! dynamic dispatch, no heap.  This is the classic embedded C FSM pattern
//! expressed in safe Rust.
//!
//! ```text
//!  IDLE ──[pending raise / bright streak while down]──▶ RAISING
//!   │ ▲                                                    │
//!   │ └───────────────[travel elapsed]─────────────────────┘
//!   │ ▲
//!   │ └───────────────[travel elapsed]─────────────────────┐
//!   │                                                      │
//!   └──[pending lower / dark streak while up]──────────▶ LOWERING
//! ```
//!
//! A remote command takes precedence over the auto-sensing streak and
//! consumes it; a started travel cycle always runs to the full
//! configured duration (no mid-motion cancellation).

use super::context::{FsmContext, MotionDirection, MotionTimer, ShutterPosition};
use super::{StateDescriptor, StateId};
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1 — Raising
        StateDescriptor {
            id: StateId::Raising,
            name: "Raising",
            on_enter: Some(raising_enter),
            on_exit: None,
            on_update: raising_update,
        },
        // Index 2 — Lowering
        StateDescriptor {
            id: StateId::Lowering,
            name: "Lowering",
            on_enter: Some(lowering_enter),
            on_exit: None,
            on_update: lowering_update,
        },
    ]
}

fn direction_state(dir: MotionDirection) -> StateId {
    match dir {
        MotionDirection::Raise => StateId::Raising,
        MotionDirection::Lower => StateId::Lowering,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.commands.raise = false;
    ctx.commands.lower = false;
    ctx.motion = MotionTimer::None;
    info!("IDLE: position {:?}, relays released", ctx.position);
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    // A remote command overrides the auto-sensing streak and clears any
    // accumulated context for the next cycle.
    if let Some(dir) = ctx.pending.take() {
        ctx.streak.reset();
        info!("IDLE: {:?} initiated by remote command", dir);
        return Some(direction_state(dir));
    }

    // Auto light sensing: only while idle, only when enabled.
    if ctx.auto_mode {
        if let Some(lux) = ctx.lux {
            let position = ctx.position;
            if let Some(dir) = ctx.streak.observe(lux, position, &ctx.config) {
                info!("IDLE: {:?} triggered by light sensor ({} lux)", dir, lux);
                return Some(direction_state(dir));
            }
        }
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RAISING state — motor energised toward "up"
// ═══════════════════════════════════════════════════════════════════════════

fn raising_enter(ctx: &mut FsmContext) {
    ctx.motion = MotionTimer::RaisingSince(ctx.total_ticks);
    // Opposite relay always released before asserting.
    ctx.commands.lower = false;
    ctx.commands.raise = true;
    info!("RAISING: travelling for {} ms", ctx.config.travel_duration_ms);
}

fn raising_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.motion_elapsed_ms() < u64::from(ctx.config.travel_duration_ms) {
        ctx.commands.lower = false;
        ctx.commands.raise = true;
        return None;
    }

    ctx.commands.raise = false;
    ctx.commands.lower = false;
    ctx.position = ShutterPosition::Up;
    ctx.completed = Some(ShutterPosition::Up);
    info!("RAISING: travel complete, shutter up");
    Some(StateId::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  LOWERING state — motor energised toward "down"
// ═══════════════════════════════════════════════════════════════════════════

fn lowering_enter(ctx: &mut FsmContext) {
    ctx.motion = MotionTimer::LoweringSince(ctx.total_ticks);
    ctx.commands.raise = false;
    ctx.commands.lower = true;
    info!("LOWERING: travelling for {} ms", ctx.config.travel_duration_ms);
}

fn lowering_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.motion_elapsed_ms() < u64::from(ctx.config.travel_duration_ms) {
        ctx.commands.raise = false;
        ctx.commands.lower = true;
        return None;
    }

    ctx.commands.raise = false;
    ctx.commands.lower = false;
    ctx.position = ShutterPosition::Down;
    ctx.completed = Some(ShutterPosition::Down);
    info!("LOWERING: travel complete, shutter down");
    Some(StateId::Idle)
}

//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  StateTable                                                │
//! │  ┌──────────┬───────────┬──────────┬───────────────────┐   │
//! │  │ StateId  │ on_enter  │ on_exit  │ on_update         │   │
//! │  ├──────────┼───────────┼──────────┼───────────────────┤   │
//! │  │ Idle     │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Raising  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  │ Lowering │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │   │
//! │  └──────────┴───────────┴──────────┴───────────────────┘   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer.  All functions receive `&mut FsmContext` which
//! holds the light sample, motion timer, relay outputs, and timing.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all possible controller states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Raising = 1,
    Lowering = 2,
}

impl StateId {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert a `u8` index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Idle` in release (safe fallback: entering
    /// Idle releases both relays).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Raising,
            2 => Self::Lowering,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]) and advances a
/// mutable [`FsmContext`] that is threaded through every handler call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Monotonically increasing tick counter (wraps at u64::MAX).
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it returns `Some(next)`, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    /// 3. Increment tick counter.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        self.tick_count += 1;
        ctx.ticks_in_state = self.tick_count - self.state_entry_tick;
        ctx.total_ticks = self.tick_count;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition (used by startup recovery to re-arm
    /// an interrupted travel cycle without waiting for a trigger).
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// How many ticks the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        // Exit current state
        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        // Update pointer and timing
        self.current = next_idx;
        self.state_entry_tick = self.tick_count;
        ctx.ticks_in_state = 0;

        // Enter new state
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::context::{FsmContext, MotionDirection, MotionTimer, ShutterPosition};
    use super::*;
    use crate::config::SystemConfig;

    fn make_ctx() -> FsmContext {
        FsmContext::new(SystemConfig::default())
    }

    fn make_fsm() -> Fsm {
        Fsm::new(states::build_state_table(), StateId::Idle)
    }

    #[test]
    fn starts_in_idle() {
        let fsm = make_fsm();
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn start_releases_relays() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.commands.raise = true;
        fsm.start(&mut ctx);
        assert!(!ctx.commands.raise);
        assert!(!ctx.commands.lower);
    }

    #[test]
    fn tick_increments_counter() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.ticks_in_current_state(), 1);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.ticks_in_current_state(), 2);
    }

    #[test]
    fn idle_to_lowering_on_pending_command() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.pending = Some(MotionDirection::Lower);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Lowering);
        assert!(ctx.pending.is_none(), "command must be consumed");
        assert!(ctx.commands.lower);
        assert!(!ctx.commands.raise);
        assert!(matches!(ctx.motion, MotionTimer::LoweringSince(_)));
    }

    #[test]
    fn idle_stays_without_inputs() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        for _ in 0..50 {
            fsm.tick(&mut ctx);
        }
        assert_eq!(fsm.current_state(), StateId::Idle);
        assert_eq!(ctx.commands, super::context::MotorCommand::released());
    }

    #[test]
    fn dark_streak_lowers_when_auto_enabled() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.auto_mode = true;
        ctx.lux = Some(40);
        for _ in 0..4 {
            fsm.tick(&mut ctx);
            assert_eq!(fsm.current_state(), StateId::Idle);
        }
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Lowering);
    }

    #[test]
    fn bright_streak_raises_when_down() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.position = ShutterPosition::Down;
        fsm.start(&mut ctx);

        ctx.auto_mode = true;
        ctx.lux = Some(800);
        for _ in 0..5 {
            fsm.tick(&mut ctx);
        }
        assert_eq!(fsm.current_state(), StateId::Raising);
    }

    #[test]
    fn auto_disabled_ignores_light() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.auto_mode = false;
        ctx.lux = Some(0);
        for _ in 0..20 {
            fsm.tick(&mut ctx);
        }
        assert_eq!(fsm.current_state(), StateId::Idle);
    }

    #[test]
    fn command_overrides_mid_streak_and_clears_it() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        // Build a partial dark streak toward Lowering.
        ctx.auto_mode = true;
        ctx.lux = Some(30);
        for _ in 0..3 {
            fsm.tick(&mut ctx);
        }
        assert_eq!(ctx.streak.len(), 3);

        // A raise command wins and consumes the streak.
        ctx.pending = Some(MotionDirection::Raise);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Raising);
        assert!(ctx.streak.is_empty());
    }

    #[test]
    fn travel_completes_after_configured_duration() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.pending = Some(MotionDirection::Lower);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Lowering);

        // The motor stays energised for the full travel duration.
        let travel_ticks = ctx.config.travel_ticks();
        for _ in 1..travel_ticks {
            fsm.tick(&mut ctx);
            assert_eq!(fsm.current_state(), StateId::Lowering);
            assert!(ctx.commands.lower, "relay must stay asserted mid-travel");
        }

        // One more tick completes the cycle.
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Idle);
        assert_eq!(ctx.position, ShutterPosition::Down);
        assert_eq!(ctx.completed, Some(ShutterPosition::Down));
        assert!(!ctx.commands.lower);
        assert_eq!(ctx.motion, MotionTimer::None);
    }

    #[test]
    fn raising_flips_position_up() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.position = ShutterPosition::Down;
        fsm.start(&mut ctx);

        ctx.pending = Some(MotionDirection::Raise);
        let travel_ticks = ctx.config.travel_ticks();
        for _ in 0..=travel_ticks {
            fsm.tick(&mut ctx);
        }
        assert_eq!(fsm.current_state(), StateId::Idle);
        assert_eq!(ctx.position, ShutterPosition::Up);
        assert_eq!(ctx.completed, Some(ShutterPosition::Up));
    }

    #[test]
    fn relays_never_both_asserted() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);

        ctx.pending = Some(MotionDirection::Lower);
        for _ in 0..40 {
            fsm.tick(&mut ctx);
            assert!(
                !(ctx.commands.raise && ctx.commands.lower),
                "both relays asserted"
            );
        }
    }

    #[test]
    fn force_transition_arms_motion_timer() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        fsm.start(&mut ctx);
        fsm.force_transition(StateId::Raising, &mut ctx);
        assert!(matches!(ctx.motion, MotionTimer::RaisingSince(0)));
        assert!(ctx.commands.raise);
    }

    #[test]
    fn state_id_from_index_roundtrip() {
        for i in 0..StateId::COUNT {
            let id = StateId::from_index(i);
            assert_eq!(id as usize, i);
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn state_id_from_invalid_index_returns_idle() {
        let id = StateId::from_index(99);
        assert_eq!(id, StateId::Idle);
    }
}

//! Cooperative periodic scheduler.
//!
//! Each component's periodic work (light sampling, command polling,
//! link monitoring, the control loop itself) is registered as a
//! schedule with its own fixed interval and an optional startup delay.
//! The scheduler notifies a [`SchedulerDelegate`] when schedules fire;
//! the main loop implements the delegate to push events into the queue.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Trigger Sources                          │
//! │                                                              │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌──────────┐   │
//! │  │ light      │ │ command    │ │ link       │ │ shutter  │   │
//! │  │ sample 1 s │ │ inbox 1 s  │ │ monitor 1s │ │ ctl 1 s  │   │
//! │  └─────┬──────┘ └─────┬──────┘ └─────┬──────┘ └─────┬────┘   │
//! │        ▼              ▼              ▼              ▼        │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate                         │  │
//! │  │       (main loop pushes into Event Queue)              │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │               events::drain_events()                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::app::ports::SchedulerDelegate;
use log::info;

// ═══════════════════════════════════════════════════════════════
//  Schedule types
// ═══════════════════════════════════════════════════════════════

/// A single periodic schedule entry.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Human-readable label (e.g., "light-sample").
    pub label: &'static str,
    /// Fire every `interval_secs` once running.
    pub interval_secs: u32,
    /// Delay before the first fire (0 = first fire after one interval).
    pub initial_delay_secs: u32,
    /// Whether this schedule is currently enabled.
    pub enabled: bool,
}

/// Internal bookkeeping for a live schedule.
#[derive(Debug, Clone)]
struct ScheduleEntry {
    schedule: Schedule,
    /// Ticks elapsed since the last fire (or since registration).
    elapsed_ticks: u64,
    /// Whether the initial delay has been served.
    started: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent schedules (stack-allocated).
const MAX_SCHEDULES: usize = 8;

/// The scheduler engine.
///
/// This struct is intentionally decoupled from the event system.
/// When a schedule fires, it invokes the [`SchedulerDelegate`] callback
/// rather than directly pushing events.  This makes the scheduler
/// independently testable and reusable across different execution contexts.
pub struct Scheduler {
    schedules: [Option<ScheduleEntry>; MAX_SCHEDULES],
    /// Global enable flag.
    enabled: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            schedules: [const { None }; MAX_SCHEDULES],
            enabled: true,
        }
    }

    /// Add a schedule.  Returns the slot index, or `None` if full.
    pub fn add(&mut self, schedule: Schedule) -> Option<usize> {
        for (i, slot) in self.schedules.iter_mut().enumerate() {
            if slot.is_none() {
                info!("Scheduler: added '{}' at slot {}", schedule.label, i);
                *slot = Some(ScheduleEntry {
                    started: schedule.initial_delay_secs == 0,
                    schedule,
                    elapsed_ticks: 0,
                });
                return Some(i);
            }
        }
        None // All slots full.
    }

    /// Remove a schedule by slot index.
    pub fn remove(&mut self, slot: usize) {
        if slot < MAX_SCHEDULES {
            if let Some(entry) = &self.schedules[slot] {
                info!("Scheduler: removed '{}' from slot {}", entry.schedule.label, slot);
            }
            self.schedules[slot] = None;
        }
    }

    /// Enable or disable the entire scheduler.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Number of active (enabled) schedules.
    pub fn active_count(&self) -> usize {
        self.schedules
            .iter()
            .filter(|s| s.as_ref().is_some_and(|e| e.schedule.enabled))
            .count()
    }

    /// Tick the scheduler.  Call once per base tick.
    ///
    /// When a schedule fires, `delegate.on_schedule_fired()` is called
    /// with the schedule label.  The caller decides what to do with the
    /// notification (push an event, log, etc.).
    ///
    /// * `tick_secs` — duration of one base tick in seconds.
    pub fn tick(&mut self, tick_secs: f32, delegate: &mut dyn SchedulerDelegate) {
        if !self.enabled {
            return;
        }

        for slot in self.schedules.iter_mut() {
            let entry = match slot {
                Some(e) if e.schedule.enabled => e,
                _ => continue,
            };

            entry.elapsed_ticks += 1;
            let elapsed_secs = entry.elapsed_ticks as f32 * tick_secs;

            let due = if entry.started {
                elapsed_secs >= entry.schedule.interval_secs as f32
            } else {
                elapsed_secs >= entry.schedule.initial_delay_secs as f32
            };

            if due {
                entry.started = true;
                entry.elapsed_ticks = 0;
                delegate.on_schedule_fired(entry.schedule.label);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

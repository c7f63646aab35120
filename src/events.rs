//! Interrupt-safe event system.
//!
//! Events are produced by:
//! - Timer callbacks (per-component schedule fires)
//! - Software (link changes, inbound traffic)
//!
//! Events are consumed by the main control loop, which processes them
//! one at a time in FIFO order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Timer ISR   │────▶│              │     │              │
//! │ Scheduler   │────▶│  Event Queue │────▶│  Main Loop   │
//! │ Software    │────▶│  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const EVENT_QUEUE_CAP: usize = 32;

/// System event types, ordered by rough priority.
/// Lower discriminant = higher priority when multiple events
/// are pending simultaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    // ── Sensor data ───────────────────────────────────────
    /// Light sample timer fired (1 Hz).
    LightSampleTick = 10,

    // ── Control ───────────────────────────────────────────
    /// Shutter control loop tick (1 Hz).
    ControlTick = 20,

    // ── Communication ─────────────────────────────────────
    /// Poll the inbound command channel.
    CommandPoll = 30,
    /// Poll the WiFi link monitor.
    LinkPoll = 31,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// The scheduler writes (produce), main loop reads (consume).
// Uses atomic head/tail indices.  The buffer is intentionally
// kept in a static so timer callbacks can access it.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: EVENT_BUFFER follows the SPSC discipline.
// Producer (push_event): scheduler / timer-callback context — one writer.
// Consumer (pop_event): main-loop task — one reader.
// The Acquire/Release pairs on the indices order the slot accesses.
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Push an event into the queue.
/// Safe to call from ISR context (lock-free).
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: single producer; the consumer cannot read this slot until
    // the Release store below publishes it.
    unsafe {
        EVENT_BUFFER[head as usize] = event as u8;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event from the queue.
/// Called from the main loop (single consumer).
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    let raw = unsafe { EVENT_BUFFER[tail as usize] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback.
/// Processes events in FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Check if the event queue is empty.
pub fn queue_is_empty() -> bool {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);
    tail == head
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        10 => Some(Event::LightSampleTick),
        20 => Some(Event::ControlTick),
        30 => Some(Event::CommandPoll),
        31 => Some(Event::LinkPoll),
        _ => None,
    }
}

//! Mock hardware adapter for integration tests.
//!
//! Records every relay call so tests can assert on the full command
//! history without touching real GPIO registers, and every flag write
//! so tests can bound flash wear.

use shutters::app::events::AppEvent;
use shutters::app::ports::{EventSink, FlagStore, LightPort, MotorPort, StorageError};
use shutters::fsm::context::MotionDirection;
use std::collections::HashMap;

// ── Relay call record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCall {
    Drive(MotionDirection),
    Stop,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub lux: Option<u16>,
    pub calls: Vec<RelayCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            lux: None,
            calls: Vec::new(),
        }
    }

    pub fn set_lux(&mut self, lux: u16) {
        self.lux = Some(lux);
    }

    /// The relay state after the latest call.
    pub fn driving(&self) -> Option<MotionDirection> {
        match self.calls.last() {
            Some(RelayCall::Drive(dir)) => Some(*dir),
            _ => None,
        }
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl LightPort for MockHardware {
    fn read_lux(&mut self) -> Option<u16> {
        self.lux
    }
}

impl MotorPort for MockHardware {
    fn drive(&mut self, direction: MotionDirection) {
        self.calls.push(RelayCall::Drive(direction));
    }

    fn stop(&mut self) {
        self.calls.push(RelayCall::Stop);
    }
}

// ── MockFlagStore ─────────────────────────────────────────────

pub struct MockFlagStore {
    flags: HashMap<String, bool>,
    /// Every successful put, in order — for wear-bounding assertions.
    pub writes: Vec<(String, bool)>,
    /// Force every write to fail (storage fault injection).
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockFlagStore {
    pub fn new() -> Self {
        Self {
            flags: HashMap::new(),
            writes: Vec::new(),
            fail_writes: false,
        }
    }

    /// Pre-seed persisted state, as if written before a restart.
    pub fn with_flags(down: bool, in_progress: bool) -> Self {
        let mut store = Self::new();
        store.flags.insert("down".to_string(), down);
        store.flags.insert("in-progress".to_string(), in_progress);
        store
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.flags.get(key).copied()
    }

    pub fn writes_for(&self, key: &str) -> Vec<bool> {
        self.writes
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl Default for MockFlagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagStore for MockFlagStore {
    fn get_bool(&self, key: &str, default: bool) -> Result<bool, StorageError> {
        Ok(*self.flags.get(key).unwrap_or(&default))
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.flags.insert(key.to_string(), value);
        self.writes.push((key.to_string(), value));
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn position_reports(&self) -> Vec<AppEvent> {
        self.events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    AppEvent::PositionChanged(_) | AppEvent::PositionReport(_)
                )
            })
            .copied()
            .collect()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

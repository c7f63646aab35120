//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ShutterService (domain)
//! ```
//!
//! Driven adapters (light sensor, motor relays, event sinks, flag storage)
//! implement these traits.  The [`ShutterService`](super::service::ShutterService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use crate::config::SystemConfig;
use crate::fsm::context::MotionDirection;

// ───────────────────────────────────────────────────────────────
// Light sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain the latest smoothed
/// ambient-light reading.  `None` means no valid sample exists yet.
pub trait LightPort {
    fn read_lux(&mut self) -> Option<u16>;
}

// ───────────────────────────────────────────────────────────────
// Motor port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command the shutter motor.
///
/// Implementations MUST keep the two relay lines mutually exclusive:
/// `drive` releases the opposite line before asserting the requested one.
pub trait MotorPort {
    /// Energise the motor in `direction`.
    fn drive(&mut self, direction: MotionDirection);

    /// Release both relay lines.
    fn stop(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / reporting)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, MQTT
/// status topic, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Flag store port (domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent boolean storage under a fixed namespace.
///
/// Calls are synchronous and durable on return.  Implementations open
/// the underlying store, perform the single operation, and close it
/// again — a handle is never held across control ticks.
///
/// A key that was never written is indistinguishable from a freshly
/// provisioned device, so `get_bool` takes a caller-supplied default
/// instead of failing on absence.
pub trait FlagStore {
    /// Read a flag, returning `default` if the key was never written.
    fn get_bool(&self, key: &str, default: bool) -> Result<bool, StorageError>;

    /// Write a flag. Durable once this returns `Ok`.
    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges should be rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from event system)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a schedule fires.
///
/// This decouples the [`Scheduler`](crate::scheduler::Scheduler) from the
/// event queue.  The main loop implements this by forwarding to
/// [`push_event`](crate::events::push_event), but the scheduler itself
/// knows nothing about events, queues, or ISRs.
pub trait SchedulerDelegate {
    /// Called when a schedule fires with the schedule's label.
    fn on_schedule_fired(&mut self, label: &str);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`FlagStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

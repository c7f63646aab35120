//! Unified error types for the shutters firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level control loop's error handling uniform.  All variants are `Copy`
//! so they can be cheaply threaded through the control core without
//! allocation.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
///
/// Connectivity faults are deliberately absent: the link monitor owns
/// its own retry policy and only ever exposes a status flag — a lost
/// link is not an error to the control core.  A `Storage` error is
/// fatal: without durable state the recovery protocol cannot guarantee
/// its invariants, so the control core propagates it upward and the
/// device restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Persistent flag storage could not be read or written.
    Storage(StorageError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

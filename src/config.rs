//! System configuration parameters
//!
//! All tunable parameters for the shutter controller.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Motion ---
    /// Time the motor must run to fully raise or lower the shutter (ms)
    pub travel_duration_ms: u32,

    // --- Auto light sensing ---
    /// Brightness threshold separating "dark" from "bright" (lux)
    pub lux_threshold: u16,
    /// Consecutive same-side samples required to trigger automatic motion
    pub streak_window: u8,

    // --- Timing ---
    /// Light sensor sample interval (milliseconds)
    pub light_sample_interval_ms: u32,
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,

    // --- Connectivity ---
    /// Fixed retry interval while the WiFi link is down (seconds)
    pub link_retry_interval_secs: u16,
    /// Bound on a single association handshake before giving up (seconds)
    pub link_connect_timeout_secs: u16,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Motion
            travel_duration_ms: 18_000,

            // Auto light sensing
            lux_threshold: 100,
            streak_window: 5,

            // Timing
            light_sample_interval_ms: 1000,  // 1 Hz
            control_loop_interval_ms: 1000,  // 1 Hz

            // Connectivity
            link_retry_interval_secs: 30,
            link_connect_timeout_secs: 20,
        }
    }
}

impl SystemConfig {
    /// Travel duration expressed in control-loop ticks (rounded up).
    pub fn travel_ticks(&self) -> u64 {
        u64::from(self.travel_duration_ms).div_ceil(u64::from(self.control_loop_interval_ms))
    }
}

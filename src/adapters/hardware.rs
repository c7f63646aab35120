//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the light sensor and the relay driver, exposing them through
//! [`LightPort`] and [`MotorPort`].  This is the only module in the
//! system that touches actual hardware.  On non-espidf targets, the
//! underlying drivers use cfg-gated simulation stubs.

use crate::app::ports::{LightPort, MotorPort};
use crate::drivers::relay::RelayDriver;
use crate::fsm::context::MotionDirection;
use crate::sensors::light::LightSensor;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    light: LightSensor,
    relays: RelayDriver,
}

impl HardwareAdapter {
    pub fn new(light: LightSensor, relays: RelayDriver) -> Self {
        Self { light, relays }
    }

    /// Take one light sample.  Called on the sensor's own 1 Hz cadence.
    pub fn sample_light(&mut self) -> Option<u16> {
        self.light.sample()
    }
}

// ── LightPort implementation ──────────────────────────────────

impl LightPort for HardwareAdapter {
    fn read_lux(&mut self) -> Option<u16> {
        self.light.current_lux()
    }
}

// ── MotorPort implementation ──────────────────────────────────

impl MotorPort for HardwareAdapter {
    fn drive(&mut self, direction: MotionDirection) {
        self.relays.drive(direction);
    }

    fn stop(&mut self) {
        self.relays.release();
    }
}

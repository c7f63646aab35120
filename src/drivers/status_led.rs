//! Boot-state blinker on the on-board LED.
//!
//! Blinks the LED N times per cycle, where N encodes the coarse device
//! state (connecting = 1, setup = 2, normal = 3).  Ticked on a fixed
//! 100 ms cadence from the main loop; a short pause separates bursts.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LED GPIO via hw_init.
//! On host/test: tracks level in-memory only.

use crate::drivers::hw_init;
use crate::pins;

/// Ticks the LED spends in each half-period of a blink (100 ms ticks).
const BLINK_HALF_PERIOD_TICKS: u8 = 1;
/// Idle ticks between bursts.
const BURST_GAP_TICKS: u8 = 8;

pub struct Blinker {
    /// Blinks per burst.  0 = LED off.
    blink_count: u8,
    /// Blinks remaining in the current burst.
    remaining: u8,
    /// Ticks left in the current phase (on, off, or gap).
    phase_ticks: u8,
    led_on: bool,
}

impl Blinker {
    pub fn new() -> Self {
        Self {
            blink_count: 0,
            remaining: 0,
            phase_ticks: 0,
            led_on: false,
        }
    }

    /// Set the number of blinks per burst.  Takes effect at the next burst.
    pub fn set_blink_count(&mut self, count: u8) {
        self.blink_count = count;
    }

    /// Advance one 100 ms tick.  Returns the LED level for convenience.
    pub fn tick(&mut self) -> bool {
        if self.phase_ticks > 0 {
            self.phase_ticks -= 1;
            return self.led_on;
        }

        if self.led_on {
            // Falling edge of a blink.
            self.set_led(false);
            self.remaining -= 1;
            self.phase_ticks = if self.remaining == 0 {
                BURST_GAP_TICKS
            } else {
                BLINK_HALF_PERIOD_TICKS
            };
        } else if self.remaining > 0 {
            self.set_led(true);
            self.phase_ticks = BLINK_HALF_PERIOD_TICKS;
        } else if self.blink_count > 0 {
            // Start the next burst.
            self.remaining = self.blink_count;
            self.set_led(true);
            self.phase_ticks = BLINK_HALF_PERIOD_TICKS;
        }

        self.led_on
    }

    pub fn led_on(&self) -> bool {
        self.led_on
    }

    fn set_led(&mut self, on: bool) {
        hw_init::gpio_write(pins::STATUS_LED_GPIO, on);
        self.led_on = on;
    }
}

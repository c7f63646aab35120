//! GPIO / peripheral pin assignments for the shutter controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Shutter motor relays (SRD-05VDC dual relay board, active HIGH)
// ---------------------------------------------------------------------------

/// Digital output: energises the "raise" winding of the tubular motor.
pub const RAISE_RELAY_GPIO: i32 = 23;
/// Digital output: energises the "lower" winding of the tubular motor.
/// Must never be HIGH at the same time as [`RAISE_RELAY_GPIO`].
pub const LOWER_RELAY_GPIO: i32 = 19;

// ---------------------------------------------------------------------------
// Sensors — Analog (ADC1)
// ---------------------------------------------------------------------------

/// KY-018 photoresistor — analog voltage via resistive divider.
/// ADC1 channel 5 (GPIO 33 on the classic ESP32).
pub const LIGHT_ADC_GPIO: i32 = 33;
/// ADC1 channel index for the light sensor.
pub const ADC1_CH_LIGHT: u32 = 5;

// ---------------------------------------------------------------------------
// Status LED (on-board)
// ---------------------------------------------------------------------------

/// On-board LED used by the boot-state blinker.
pub const STATUS_LED_GPIO: i32 = 2;

//! KY-018 photoresistor ambient-light sensor driver.
//!
//! Reads the analog voltage output through an ESP32 ADC channel and maps
//! the raw 12-bit value to lux by linear interpolation over a monotonic
//! calibration table (raw ADC value ascending, lux descending — less
//! light means a higher divider voltage on this module).
//!
//! The bracket is the adjacent table pair with `left.adc < raw <= right.adc`;
//! out-of-table values degrade to the first/last entry.  A degenerate
//! bracket (equal raw coordinates) would divide by zero; the sample is
//! skipped instead and the previous value retained — the fault never
//! propagates outward.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1 via the oneshot API (initialised by hw_init).
//! On host/test: reads from a static `AtomicU16` for injection.

use core::sync::atomic::{AtomicU16, Ordering};

static SIM_LIGHT_ADC: AtomicU16 = AtomicU16::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_light_adc(raw: u16) {
    SIM_LIGHT_ADC.store(raw, Ordering::Relaxed);
}

/// One entry of the ADC→lux calibration curve.
#[derive(Debug, Clone, Copy)]
pub struct CalPoint {
    /// Raw 12-bit ADC reading.
    pub adc: u16,
    /// Lux measured against a reference meter at that reading.
    pub lux: u16,
}

/// Factory calibration of the KY-018 divider, measured per board batch.
/// Keyed by raw ADC value, ascending; must stay monotonic in `adc`.
pub const LUX_CURVE: [CalPoint; 21] = [
    CalPoint { adc: 0, lux: 2500 },
    CalPoint { adc: 50, lux: 1650 },
    CalPoint { adc: 100, lux: 1100 },
    CalPoint { adc: 150, lux: 900 },
    CalPoint { adc: 200, lux: 560 },
    CalPoint { adc: 250, lux: 450 },
    CalPoint { adc: 300, lux: 440 },
    CalPoint { adc: 350, lux: 380 },
    CalPoint { adc: 400, lux: 330 },
    CalPoint { adc: 450, lux: 250 },
    CalPoint { adc: 500, lux: 210 },
    CalPoint { adc: 550, lux: 200 },
    CalPoint { adc: 600, lux: 190 },
    CalPoint { adc: 750, lux: 110 },
    CalPoint { adc: 1100, lux: 78 },
    CalPoint { adc: 2000, lux: 30 },
    CalPoint { adc: 2500, lux: 24 },
    CalPoint { adc: 3000, lux: 7 },
    CalPoint { adc: 3500, lux: 3 },
    CalPoint { adc: 4000, lux: 0 },
    CalPoint { adc: 4095, lux: 0 },
];

/// Evaluate the line through `left`/`right` at `raw`.
///
/// Returns `None` when the bracket is degenerate (`left.adc == right.adc`)
/// instead of dividing by zero.
pub fn lerp(left: CalPoint, right: CalPoint, raw: u16) -> Option<u16> {
    if left.adc == right.adc {
        return None;
    }
    let span_adc = i32::from(right.adc) - i32::from(left.adc);
    let span_lux = i32::from(right.lux) - i32::from(left.lux);
    let lux = i32::from(left.lux) + span_lux * (i32::from(raw) - i32::from(left.adc)) / span_adc;
    Some(lux.clamp(0, i32::from(u16::MAX)) as u16)
}

/// Interpolate a raw ADC value against `table`.
///
/// `None` means no lux value could be derived (empty table or a
/// degenerate bracket) and the caller should keep its previous reading.
pub fn interpolate(table: &[CalPoint], raw: u16) -> Option<u16> {
    let first = table.first()?;
    if raw <= first.adc {
        return Some(first.lux);
    }
    let last = table.last()?;
    if raw >= last.adc {
        return Some(last.lux);
    }

    for pair in table.windows(2) {
        if raw <= pair[1].adc {
            return lerp(pair[0], pair[1], raw);
        }
    }

    Some(last.lux)
}

/// The light sensor: periodic sampling plus the latest smoothed value.
pub struct LightSensor {
    curve: &'static [CalPoint],
    last_lux: Option<u16>,
    _adc_gpio: i32,
}

impl LightSensor {
    pub fn new(adc_gpio: i32) -> Self {
        Self {
            curve: &LUX_CURVE,
            last_lux: None,
            _adc_gpio: adc_gpio,
        }
    }

    /// Swap in a per-batch calibration table.
    pub fn set_calibration(&mut self, curve: &'static [CalPoint]) {
        self.curve = curve;
    }

    /// Take one sample.  When the calibration lookup yields nothing the
    /// previous value is retained.
    pub fn sample(&mut self) -> Option<u16> {
        let raw = self.read_adc();
        if let Some(lux) = interpolate(self.curve, raw) {
            self.last_lux = Some(lux);
        }
        self.last_lux
    }

    /// Latest smoothed reading without sampling.
    pub fn current_lux(&self) -> Option<u16> {
        self.last_lux
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> u16 {
        crate::drivers::hw_init::adc1_read(crate::drivers::hw_init::ADC1_CH_LIGHT)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> u16 {
        SIM_LIGHT_ADC.load(Ordering::Relaxed)
    }
}

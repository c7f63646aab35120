//! Sensor subsystem.
//!
//! One sensor on this board: the KY-018 ambient-light photoresistor,
//! read through ADC1 and linearised against a calibration table.

pub mod light;

use crate::register::CODES_PER_REGISTER;
use serde::{Deserialize, Serialize};

/// Flattened cell identity: register groups A→D outermost, in-register
/// position in the middle, device innermost. This is the canonical ordering
/// for min/max cell identification across the pack.
#[must_use]
pub const fn cell_id(group: usize, position: usize, device: usize, chain_len: usize) -> usize {
    (group * CODES_PER_REGISTER + position) * chain_len + device
}

/// Aggregate of one full cell-voltage scan, in native 100 µV codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoltageStatus {
    /// Sum over every cell in the pack.
    pub sum: u32,
    pub min: u16,
    pub min_id: usize,
    pub max: u16,
    pub max_id: usize,
}

impl Default for VoltageStatus {
    fn default() -> Self {
        Self {
            sum: 0,
            min: u16::MAX,
            min_id: 0,
            max: u16::MIN,
            max_id: 0,
        }
    }
}

impl VoltageStatus {
    /// Fold one reading in. Strict comparisons keep the first occurrence of
    /// an extreme in canonical order; the seeds make a lone reading both
    /// minimum and maximum.
    pub fn observe(&mut self, id: usize, code: u16) {
        self.sum += u32::from(code);
        if code < self.min {
            self.min = code;
            self.min_id = id;
        }
        if code > self.max {
            self.max = code;
            self.max_id = id;
        }
    }
}

/// Temperature extremes over one auxiliary scan, in hundredths of a degree
/// Celsius. No sum is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureStatus {
    pub min: i16,
    pub min_id: usize,
    pub max: i16,
    pub max_id: usize,
}

impl Default for TemperatureStatus {
    fn default() -> Self {
        Self {
            min: i16::MAX,
            min_id: 0,
            max: i16::MIN,
            max_id: 0,
        }
    }
}

impl TemperatureStatus {
    pub fn observe(&mut self, id: usize, centi_celsius: i16) {
        if centi_celsius < self.min {
            self.min = centi_celsius;
            self.min_id = id;
        }
        if centi_celsius > self.max {
            self.max = centi_celsius;
            self.max_id = id;
        }
    }
}

/// Convert a raw thermistor code to hundredths of a degree Celsius via the
/// Steinhart–Hart equation for the pack's NTC divider.
#[must_use]
pub fn steinhart_hart(raw: i16) -> i16 {
    const VREF: f32 = 30000.0; // 3.0 V reference, native units
    const KELVIN_OFFSET: f32 = 27315.0;
    const A: f32 = 0.003354016;
    const B: f32 = 0.000256524;
    const C: f32 = 0.00000260597;
    const D: f32 = 0.0000000632926;

    let log = -(VREF / f32::from(raw) - 1.0).ln();
    (100.0 / (A + log * (B + log * (C + D * log))) - KELVIN_OFFSET) as i16
}

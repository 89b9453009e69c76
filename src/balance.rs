use crate::chain::physical_index;
use crate::register::{CELLS_PER_DEVICE, CODES_PER_REGISTER, RegisterGroup, VOLTAGE_GROUPS};
use crate::status::VoltageStatus;
use serde::{Deserialize, Serialize};

/// Balancing threshold in native 100 µV codes (10 mV).
pub const DISCHARGE_DELTA: u16 = 100;

/// How the pack decides which cells to bleed down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DischargePolicy {
    /// Discharge every cell more than [`DISCHARGE_DELTA`] above the pack
    /// minimum.
    AboveMinPlusDelta,
    /// Discharge only the cell holding the pack maximum, once the spread
    /// exceeds the delta.
    MaxOnly,
    /// Discharge every cell more than [`DISCHARGE_DELTA`] above the pack
    /// mean.
    AboveMeanPlusDelta,
}

/// Compute per-device discharge masks in software (write) index order.
///
/// Bit `c` of a device's mask selects cell `c = group·3 + position`. Each
/// software index draws its readings from the voltage registers at its
/// physical position via [`physical_index`].
#[must_use]
pub fn discharge_masks<const N: usize>(
    cell_data: &[RegisterGroup<N>; VOLTAGE_GROUPS],
    status: &VoltageStatus,
    policy: DischargePolicy,
) -> [u16; N] {
    match policy {
        DischargePolicy::AboveMinPlusDelta => {
            threshold_masks(cell_data, status.min.saturating_add(DISCHARGE_DELTA))
        }
        DischargePolicy::AboveMeanPlusDelta => {
            let mean = status.sum / (CELLS_PER_DEVICE * N) as u32;
            threshold_masks(cell_data, (mean as u16).saturating_add(DISCHARGE_DELTA))
        }
        DischargePolicy::MaxOnly => {
            let mut masks = [0u16; N];
            if status.max.saturating_sub(status.min) > DISCHARGE_DELTA {
                // Canonical identity puts the device innermost; the quotient
                // is the cell index within its device.
                let device = status.max_id % N;
                let cell = status.max_id / N;
                masks[physical_index(device, N)] = 1 << cell;
            }
            masks
        }
    }
}

fn threshold_masks<const N: usize>(
    cell_data: &[RegisterGroup<N>; VOLTAGE_GROUPS],
    threshold: u16,
) -> [u16; N] {
    let mut masks = [0u16; N];
    for (software, mask) in masks.iter_mut().enumerate() {
        let device = physical_index(software, N);
        for (group, registers) in cell_data.iter().enumerate() {
            for position in 0..CODES_PER_REGISTER {
                if registers.register(device).code(position) > threshold {
                    *mask |= 1 << (group * CODES_PER_REGISTER + position);
                }
            }
        }
    }
    masks
}

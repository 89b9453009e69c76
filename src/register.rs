use crate::command::Command;
use crate::pec::pec15;
use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Data payload bytes per register.
pub const REGISTER_DATA_BYTES: usize = 6;
/// Wire bytes per register: the payload followed by its PEC.
pub const REGISTER_WIRE_BYTES: usize = 8;
/// 16-bit codes held by one register.
pub const CODES_PER_REGISTER: usize = 3;
/// Devices in the default daisy chain.
pub const CHAIN_LENGTH: usize = 12;
/// Cell voltage register groups per device (A through D).
pub const VOLTAGE_GROUPS: usize = 4;
/// Cells monitored by each device.
pub const CELLS_PER_DEVICE: usize = VOLTAGE_GROUPS * CODES_PER_REGISTER;

/// Cell voltage register group selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
}

impl Group {
    pub const ALL: [Group; VOLTAGE_GROUPS] = [Group::A, Group::B, Group::C, Group::D];
}

/// Auxiliary register group selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxGroup {
    A = 0,
    B = 1,
}

/// Status register group selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusGroup {
    A = 0,
    B = 1,
}

bitflags! {
    /// Control bits in byte 0 of the configuration register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Cfgr0: u8 {
        const ADCOPT = 1 << 0;
        const DTEN = 1 << 1;
        const REFON = 1 << 2;
        const GPIO1 = 1 << 3;
        const GPIO2 = 1 << 4;
        const GPIO3 = 1 << 5;
        const GPIO4 = 1 << 6;
        const GPIO5 = 1 << 7;
    }
}

impl Default for Cfgr0 {
    /// Value staged for every device at driver construction: GPIO pull-downs
    /// released, reference on, discharge timer enabled.
    fn default() -> Self {
        Self::all().difference(Self::ADCOPT)
    }
}

/// One device's slice of a register group: six payload bytes and their PEC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    data: [u8; REGISTER_DATA_BYTES],
    pec: u16,
}

impl Register {
    /// Build a register over `data` with a freshly computed PEC.
    #[must_use]
    pub const fn new(data: [u8; REGISTER_DATA_BYTES]) -> Self {
        Self {
            data,
            pec: pec15(&data),
        }
    }

    /// Build a register holding three 16-bit codes, as the device reports
    /// cell and GPIO voltages.
    #[must_use]
    pub fn from_codes(codes: [u16; CODES_PER_REGISTER]) -> Self {
        let mut data = [0u8; REGISTER_DATA_BYTES];
        for (i, code) in codes.into_iter().enumerate() {
            LittleEndian::write_u16(&mut data[2 * i..2 * i + 2], code);
        }
        Self::new(data)
    }

    /// Decode one wire frame: six payload bytes, then the PEC big-endian.
    /// The stored PEC is whatever came off the wire; see [`Self::verify`].
    #[must_use]
    pub fn from_wire(frame: &[u8; REGISTER_WIRE_BYTES]) -> Self {
        let mut data = [0u8; REGISTER_DATA_BYTES];
        data.copy_from_slice(&frame[..REGISTER_DATA_BYTES]);
        Self {
            data,
            pec: BigEndian::read_u16(&frame[REGISTER_DATA_BYTES..]),
        }
    }

    /// Append this register's wire frame to `out`.
    pub fn write_wire(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&self.pec.to_be_bytes());
    }

    /// True when the stored PEC matches the payload.
    #[must_use]
    pub fn verify(&self) -> bool {
        self.pec == pec15(&self.data)
    }

    /// Recompute the PEC after mutating the payload.
    pub fn seal(&mut self) {
        self.pec = pec15(&self.data);
    }

    /// The `index`th 16-bit code, little-endian as transmitted.
    #[must_use]
    pub fn code(&self, index: usize) -> u16 {
        LittleEndian::read_u16(&self.data[2 * index..2 * index + 2])
    }

    /// The `index`th code reinterpreted as signed, for thermistor inputs.
    #[must_use]
    pub fn signed_code(&self, index: usize) -> i16 {
        LittleEndian::read_i16(&self.data[2 * index..2 * index + 2])
    }

    #[must_use]
    pub const fn bytes(&self) -> &[u8; REGISTER_DATA_BYTES] {
        &self.data
    }

    #[must_use]
    pub const fn pec(&self) -> u16 {
        self.pec
    }

    /// OR a 12-bit discharge mask into configuration bytes 4 and 5, then
    /// reseal. Existing configuration bits are preserved.
    pub fn or_discharge_mask(&mut self, mask: u16) {
        self.data[4] |= (mask & 0xFF) as u8;
        self.data[5] |= ((mask >> 8) & 0x0F) as u8;
        self.seal();
    }

    /// The 12-bit discharge mask currently staged in bytes 4 and 5.
    #[must_use]
    pub fn discharge_mask(&self) -> u16 {
        u16::from(self.data[4]) | (u16::from(self.data[5] & 0x0F) << 8)
    }
}

impl Default for Register {
    fn default() -> Self {
        Self::new([0; REGISTER_DATA_BYTES])
    }
}

/// A command plus one register per device in the chain: the unit of transfer
/// for every chain transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterGroup<const N: usize = CHAIN_LENGTH> {
    command: Command,
    registers: [Register; N],
}

impl<const N: usize> RegisterGroup<N> {
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            registers: [Register::default(); N],
        }
    }

    #[must_use]
    pub const fn command(&self) -> Command {
        self.command
    }

    #[must_use]
    pub const fn registers(&self) -> &[Register; N] {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut [Register; N] {
        &mut self.registers
    }

    #[must_use]
    pub fn register(&self, device: usize) -> &Register {
        &self.registers[device]
    }

    pub fn register_mut(&mut self, device: usize) -> &mut Register {
        &mut self.registers[device]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        let register = Register::from_codes([0x1234, 0xABCD, 0x0042]);
        let mut wire = Vec::new();
        register.write_wire(&mut wire);
        assert_eq!(wire.len(), REGISTER_WIRE_BYTES);
        // Codes are little-endian on the wire, PEC big-endian.
        assert_eq!(&wire[..6], &[0x34, 0x12, 0xCD, 0xAB, 0x42, 0x00]);
        assert_eq!(wire[6], (register.pec() >> 8) as u8);
        assert_eq!(wire[7], register.pec() as u8);

        let decoded = Register::from_wire(wire[..].try_into().unwrap());
        assert_eq!(decoded, register);
        assert!(decoded.verify());
    }

    #[test]
    fn corrupted_frame_fails_verification() {
        let register = Register::from_codes([500, 600, 700]);
        let mut wire = Vec::new();
        register.write_wire(&mut wire);
        for bit in 0..REGISTER_DATA_BYTES * 8 {
            let mut corrupted = wire.clone();
            corrupted[bit / 8] ^= 1 << (bit % 8);
            let decoded = Register::from_wire(corrupted[..].try_into().unwrap());
            assert!(!decoded.verify(), "payload bit flip {bit} went undetected");
        }
    }

    #[test]
    fn signed_codes_share_the_payload() {
        let register = Register::from_codes([0xFFFF, 0x8000, 25]);
        assert_eq!(register.signed_code(0), -1);
        assert_eq!(register.signed_code(1), i16::MIN);
        assert_eq!(register.signed_code(2), 25);
    }

    #[test]
    fn discharge_mask_lands_in_bytes_four_and_five() {
        let mut register = Register::new([0xFE, 0, 0, 0, 0, 0]);
        register.or_discharge_mask(0x0ABC);
        assert_eq!(register.bytes()[4], 0xBC);
        assert_eq!(register.bytes()[5], 0x0A);
        assert_eq!(register.bytes()[0], 0xFE);
        assert!(register.verify());
        assert_eq!(register.discharge_mask(), 0x0ABC);

        // OR, not overwrite.
        register.or_discharge_mask(0x0543);
        assert_eq!(register.discharge_mask(), 0x0ABC | 0x0543);
    }

    #[test]
    fn power_up_configuration_byte() {
        assert_eq!(Cfgr0::default().bits(), 0xFE);
    }
}

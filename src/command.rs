use crate::pec::pec15;
use serde::{Deserialize, Serialize};

pub const COMMAND_BYTES: usize = 4;

/// ADC conversion mode. Encoded as two bits split across the two opcode
/// bytes of a conversion command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Fast = 1,
    Normal = 2,
    Filtered = 3,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Normal
    }
}

/// Whether discharge transistors are permitted to stay on during cell
/// conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dcp {
    Disabled = 0,
    Enabled = 1,
}

impl Default for Dcp {
    fn default() -> Self {
        Self::Disabled
    }
}

/// Cell selection for a voltage conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellChannel {
    All = 0,
    OneAndSeven = 1,
    TwoAndEight = 2,
    ThreeAndNine = 3,
    FourAndTen = 4,
    FiveAndEleven = 5,
    SixAndTwelve = 6,
}

impl Default for CellChannel {
    fn default() -> Self {
        Self::All
    }
}

/// GPIO selection for an auxiliary conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuxChannel {
    All = 0,
    Gpio1 = 1,
    Gpio2 = 2,
    Gpio3 = 3,
    Gpio4 = 4,
    Gpio5 = 5,
    Vref2 = 6,
}

impl Default for AuxChannel {
    fn default() -> Self {
        Self::All
    }
}

/// Channel selection for a status conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusChannel {
    All = 0,
    Soc = 1,
    InternalTemp = 2,
    AnalogSupply = 3,
    DigitalSupply = 4,
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::All
    }
}

/// Conversion settings baked into the trigger commands when the driver is
/// constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub mode: Mode,
    pub dcp: Dcp,
    pub cell_channel: CellChannel,
    pub aux_channel: AuxChannel,
    pub status_channel: StatusChannel,
}

/// A chain command: two opcode bytes followed by their PEC, big-endian.
/// Built once, immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command([u8; COMMAND_BYTES]);

impl Command {
    #[must_use]
    pub const fn from_opcode(opcode: u16) -> Self {
        Self::from_opcode_bytes((opcode >> 8) as u8, opcode as u8)
    }

    const fn from_opcode_bytes(b0: u8, b1: u8) -> Self {
        let pec = pec15(&[b0, b1]);
        Self([b0, b1, (pec >> 8) as u8, pec as u8])
    }

    /// Start-cell-voltage-conversion command (ADCV).
    #[must_use]
    pub const fn adcv(mode: Mode, dcp: Dcp, channel: CellChannel) -> Self {
        let md = mode as u8;
        Self::from_opcode_bytes(
            0x02 | (md >> 1),
            (md & 0x01) << 7 | 0x60 | (dcp as u8) << 4 | channel as u8,
        )
    }

    /// Start-auxiliary-conversion command (ADAX).
    #[must_use]
    pub const fn adax(mode: Mode, channel: AuxChannel) -> Self {
        let md = mode as u8;
        Self::from_opcode_bytes(0x04 | (md >> 1), (md & 0x01) << 7 | 0x60 | channel as u8)
    }

    /// Start-status-conversion command (ADSTAT).
    #[must_use]
    pub const fn adstat(mode: Mode, channel: StatusChannel) -> Self {
        let md = mode as u8;
        Self::from_opcode_bytes(0x04 | (md >> 1), (md & 0x01) << 7 | 0x68 | channel as u8)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; COMMAND_BYTES] {
        &self.0
    }

    #[must_use]
    pub const fn opcode(&self) -> u16 {
        (self.0[0] as u16) << 8 | self.0[1] as u16
    }
}

/// Write configuration register group.
pub const WRCFGA: Command = Command::from_opcode(0x0001);
/// Read configuration register group.
pub const RDCFGA: Command = Command::from_opcode(0x0002);
/// Read cell voltage register group A.
pub const RDCVA: Command = Command::from_opcode(0x0004);
/// Read cell voltage register group B.
pub const RDCVB: Command = Command::from_opcode(0x0006);
/// Read cell voltage register group C.
pub const RDCVC: Command = Command::from_opcode(0x0008);
/// Read cell voltage register group D.
pub const RDCVD: Command = Command::from_opcode(0x000A);
/// Read auxiliary register group A.
pub const RDAUXA: Command = Command::from_opcode(0x000C);
/// Read auxiliary register group B.
pub const RDAUXB: Command = Command::from_opcode(0x000E);
/// Read status register group A.
pub const RDSTATA: Command = Command::from_opcode(0x0010);
/// Read status register group B.
pub const RDSTATB: Command = Command::from_opcode(0x0012);
/// Clear the cell voltage registers.
pub const CLRCELL: Command = Command::from_opcode(0x0711);
/// Clear the auxiliary registers.
pub const CLRAUX: Command = Command::from_opcode(0x0712);

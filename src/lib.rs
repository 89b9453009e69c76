pub mod balance;
pub mod chain;
pub mod command;
pub mod error;
pub mod monitor;
pub mod pec;
pub mod register;
pub mod status;
pub mod transport;

pub use balance::{DISCHARGE_DELTA, DischargePolicy, discharge_masks};
pub use chain::physical_index;
pub use command::{AuxChannel, CellChannel, Command, ConversionConfig, Dcp, Mode, StatusChannel};
pub use error::{Ltc6811Error, Result};
pub use monitor::Ltc6811;
pub use pec::pec15;
pub use register::{AuxGroup, CHAIN_LENGTH, Cfgr0, Group, Register, RegisterGroup, StatusGroup};
pub use status::{TemperatureStatus, VoltageStatus};
pub use transport::{Bus, Delay};

use crate::balance::{DischargePolicy, discharge_masks};
use crate::chain::{self, T_CONFIG_SETTLE_US};
use crate::command::{
    CLRAUX, CLRCELL, Command, ConversionConfig, RDAUXA, RDAUXB, RDCFGA, RDCVA, RDCVB, RDCVC, RDCVD,
    RDSTATA, RDSTATB, WRCFGA,
};
use crate::error::Result;
use crate::register::{
    AuxGroup, CHAIN_LENGTH, CODES_PER_REGISTER, Cfgr0, Group, Register, RegisterGroup, StatusGroup,
    VOLTAGE_GROUPS,
};
use crate::status::{TemperatureStatus, VoltageStatus, cell_id, steinhart_hart};
use crate::transport::{Bus, Delay};
use tracing::debug;

/// Driver for a daisy chain of `N` LTC6811 cell monitors.
///
/// Owns the bus, the delay service and every register-group buffer; the
/// buffers are allocated once here and reused for every transaction. All
/// operations take `&mut self` and block for the protocol's fixed delays.
/// The driver is single-threaded; concurrent callers need an external lock
/// around the whole instance.
pub struct Ltc6811<B, D, const N: usize = CHAIN_LENGTH> {
    bus: B,
    delay: D,
    adcv: Command,
    adax: Command,
    adstat: Command,
    cell_data: [RegisterGroup<N>; VOLTAGE_GROUPS],
    aux_data: [RegisterGroup<N>; 2],
    status_data: [RegisterGroup<N>; 2],
    cfg_tx: RegisterGroup<N>,
    cfg_rx: RegisterGroup<N>,
}

impl<B, D, const N: usize> std::fmt::Debug for Ltc6811<B, D, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ltc6811")
            .field("chain_length", &N)
            .finish_non_exhaustive()
    }
}

impl<B: Bus, D: Delay, const N: usize> Ltc6811<B, D, N> {
    /// Build the conversion commands from `config`, stage the power-up
    /// configuration for every device and wake the chain from sleep.
    pub fn new(bus: B, delay: D, config: ConversionConfig) -> Self {
        let mut cfg_tx = RegisterGroup::new(WRCFGA);
        for register in cfg_tx.registers_mut() {
            *register = Register::new([Cfgr0::default().bits(), 0, 0, 0, 0, 0]);
        }

        let mut monitor = Self {
            bus,
            delay,
            adcv: Command::adcv(config.mode, config.dcp, config.cell_channel),
            adax: Command::adax(config.mode, config.aux_channel),
            adstat: Command::adstat(config.mode, config.status_channel),
            cell_data: [
                RegisterGroup::new(RDCVA),
                RegisterGroup::new(RDCVB),
                RegisterGroup::new(RDCVC),
                RegisterGroup::new(RDCVD),
            ],
            aux_data: [RegisterGroup::new(RDAUXA), RegisterGroup::new(RDAUXB)],
            status_data: [RegisterGroup::new(RDSTATA), RegisterGroup::new(RDSTATB)],
            cfg_tx,
            cfg_rx: RegisterGroup::new(RDCFGA),
        };
        monitor.wake_from_sleep();
        monitor
    }

    /// Wake the whole chain from sleep. Required once at start-up and after
    /// the chain's idle timeout (~2 s without traffic) may have elapsed;
    /// costs several milliseconds on a full chain.
    pub fn wake_from_sleep(&mut self) {
        chain::wake_from_sleep(&mut self.bus, &mut self.delay, N);
    }

    /// Bring the isoSPI links back to ready mode. Cheap; performed
    /// automatically ahead of every transaction.
    pub fn wake_from_idle(&mut self) {
        chain::wake_from_idle(&mut self.bus, N);
    }

    /// Read one cell voltage register group from every device.
    pub fn read_voltage_register_group(&mut self, group: Group) -> Result<()> {
        chain::read_register_group(&mut self.bus, &mut self.cell_data[group as usize])
    }

    /// Read one auxiliary register group from every device.
    pub fn read_aux_register_group(&mut self, group: AuxGroup) -> Result<()> {
        chain::read_register_group(&mut self.bus, &mut self.aux_data[group as usize])
    }

    /// Read one status register group from every device.
    pub fn read_status_register_group(&mut self, group: StatusGroup) -> Result<()> {
        chain::read_register_group(&mut self.bus, &mut self.status_data[group as usize])
    }

    /// Read the configuration register group from every device.
    pub fn read_config_register_group(&mut self) -> Result<()> {
        chain::read_register_group(&mut self.bus, &mut self.cfg_rx)
    }

    /// Write the staged configuration register group to every device.
    pub fn write_config_register_group(&mut self) -> Result<()> {
        chain::write_register_group(&mut self.bus, &self.cfg_tx)
    }

    /// Broadcast the cell-voltage register clear command.
    pub fn clear_voltage_registers(&mut self) -> Result<()> {
        chain::broadcast(&mut self.bus, CLRCELL, N)
    }

    /// Broadcast the auxiliary register clear command.
    pub fn clear_aux_registers(&mut self) -> Result<()> {
        chain::broadcast(&mut self.bus, CLRAUX, N)
    }

    /// Trigger a status-group conversion (SOC, die temperature, supplies)
    /// and block until its results are valid.
    pub fn start_status_conversion(&mut self) -> Result<()> {
        chain::start_conversion(&mut self.bus, &mut self.delay, self.adstat, N)
    }

    /// Convert and scan every cell voltage in the pack.
    ///
    /// Fails without a result if any group read fails; a failure means no
    /// trustworthy data was obtained this cycle.
    pub fn voltage_status(&mut self) -> Result<VoltageStatus> {
        chain::start_conversion(&mut self.bus, &mut self.delay, self.adcv, N)?;
        for group in Group::ALL {
            self.read_voltage_register_group(group)?;
        }

        let mut status = VoltageStatus::default();
        for (group, registers) in self.cell_data.iter().enumerate() {
            for position in 0..CODES_PER_REGISTER {
                for device in 0..N {
                    status.observe(
                        cell_id(group, position, device, N),
                        registers.register(device).code(position),
                    );
                }
            }
        }
        debug!(
            sum = status.sum,
            min = status.min,
            max = status.max,
            "voltage scan complete"
        );
        Ok(status)
    }

    /// Convert and scan the pack's thermistor inputs.
    ///
    /// The auxiliary conversion routes the GPIO inputs through the same
    /// register layout as the cell channels, so the voltage-shaped buffers
    /// are reused for the scan; each raw code is converted through the
    /// Steinhart–Hart equation into hundredths of a degree Celsius.
    pub fn temperature_status(&mut self) -> Result<TemperatureStatus> {
        chain::start_conversion(&mut self.bus, &mut self.delay, self.adax, N)?;
        for group in Group::ALL {
            self.read_voltage_register_group(group)?;
        }

        let mut status = TemperatureStatus::default();
        for (group, registers) in self.cell_data.iter().enumerate() {
            for position in 0..CODES_PER_REGISTER {
                for device in 0..N {
                    let raw = registers.register(device).signed_code(position);
                    status.observe(cell_id(group, position, device, N), steinhart_hart(raw));
                }
            }
        }
        Ok(status)
    }

    /// Stage discharge masks for `policy` over the last voltage scan, write
    /// the configuration group, wait the settle delay, then read the
    /// configuration back so the caller can inspect what actually latched.
    ///
    /// A failed write or read-back is reported; the staged masks are never
    /// rolled back.
    pub fn apply_discharge(
        &mut self,
        policy: DischargePolicy,
        status: &VoltageStatus,
    ) -> Result<()> {
        let masks = discharge_masks(&self.cell_data, status, policy);
        for (register, mask) in self.cfg_tx.registers_mut().iter_mut().zip(masks) {
            register.or_discharge_mask(mask);
        }
        debug!(?policy, "staged discharge masks");

        self.write_config_register_group()?;
        self.delay.delay_us(T_CONFIG_SETTLE_US);
        self.read_config_register_group()
    }

    /// The last-read cell voltage register groups.
    pub fn cell_data(&self) -> &[RegisterGroup<N>; VOLTAGE_GROUPS] {
        &self.cell_data
    }

    /// The last-read auxiliary register groups.
    pub fn aux_data(&self) -> &[RegisterGroup<N>; 2] {
        &self.aux_data
    }

    /// The last-read status register groups.
    pub fn status_data(&self) -> &[RegisterGroup<N>; 2] {
        &self.status_data
    }

    /// The configuration as staged for the next write.
    pub fn staged_config(&self) -> &RegisterGroup<N> {
        &self.cfg_tx
    }

    /// The configuration as last read back from the chain.
    pub fn latched_config(&self) -> &RegisterGroup<N> {
        &self.cfg_rx
    }
}

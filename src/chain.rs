//! Wake sequencing and register-group transactions over the daisy chain.

use crate::command::{COMMAND_BYTES, Command};
use crate::error::{Ltc6811Error, Result};
use crate::register::{REGISTER_WIRE_BYTES, Register, RegisterGroup};
use crate::transport::{Bus, Delay};
use tracing::{trace, warn};

/* Timing of chain states, in microseconds. */
pub const T_WAKE_MAX_US: u32 = 400;
pub const T_READY_US: u32 = 10;
pub const T_REFUP_MAX_US: u32 = 4400;
pub const T_CYCLE_FAST_MAX_US: u32 = 1185;
pub const T_CONFIG_SETTLE_US: u32 = 500;

/// Map a software device index to its physical position in the chain.
///
/// Frames shift through every device on a transaction, so the first frame
/// transmitted lands in the physically last device: software index 0 is the
/// tail of the chain.
#[must_use]
pub const fn physical_index(software_index: usize, chain_len: usize) -> usize {
    chain_len - 1 - software_index
}

/// Wake every device in the chain from sleep.
///
/// One select pulse per device, held for the chip's maximum wake latency;
/// only one device wakes per edge propagated along the chain, so the pulse
/// repeats `chain_len` times. Best-effort: the power-state contract offers
/// no feedback. Needed at initialization and after the ~2 s idle timeout
/// may have put the chain to sleep.
pub fn wake_from_sleep<B: Bus, D: Delay>(bus: &mut B, delay: &mut D, chain_len: usize) {
    trace!(chain_len, "waking chain from sleep");
    for _ in 0..chain_len {
        bus.assert_select();
        delay.delay_us(T_WAKE_MAX_US);
        bus.deassert_select();
        delay.delay_us(T_READY_US);
    }
}

/// Bring the isoSPI physical layer back to ready mode with one dummy byte
/// per device. Used ahead of every ordinary transaction.
pub fn wake_from_idle<B: Bus>(bus: &mut B, chain_len: usize) {
    for _ in 0..chain_len {
        bus.assert_select();
        // Best-effort ritual; the wake contract reports no failure.
        let _ = bus.transmit(&[0xFF]);
        bus.deassert_select();
    }
}

/// Write `group` to the chain: the command, then every device's wire frame
/// in software index order within a single select window.
pub fn write_register_group<B: Bus, const N: usize>(
    bus: &mut B,
    group: &RegisterGroup<N>,
) -> Result<()> {
    wake_from_idle(bus, N);

    let mut tx = Vec::with_capacity(COMMAND_BYTES + N * REGISTER_WIRE_BYTES);
    tx.extend_from_slice(group.command().as_bytes());
    for register in group.registers() {
        register.write_wire(&mut tx);
    }

    bus.assert_select();
    let result = bus.transmit(&tx);
    bus.deassert_select();
    result
}

/// Read `group` from the chain into its register buffers, then verify every
/// device's PEC.
///
/// A mismatch on any device fails the whole read; on failure the buffer's
/// previous contents may already be overwritten and nothing in it may be
/// trusted.
pub fn read_register_group<B: Bus, const N: usize>(
    bus: &mut B,
    group: &mut RegisterGroup<N>,
) -> Result<()> {
    wake_from_idle(bus, N);

    bus.assert_select();
    let result = bus.transmit_then_receive(group.command().as_bytes(), N * REGISTER_WIRE_BYTES);
    bus.deassert_select();
    let rx = result?;

    for (device, frame) in rx.chunks_exact(REGISTER_WIRE_BYTES).enumerate() {
        let mut wire = [0u8; REGISTER_WIRE_BYTES];
        wire.copy_from_slice(frame);
        *group.register_mut(device) = Register::from_wire(&wire);
    }
    for (device, register) in group.registers().iter().enumerate() {
        if !register.verify() {
            warn!(
                device,
                opcode = group.command().opcode(),
                "register PEC mismatch"
            );
            return Err(Ltc6811Error::Pec { device });
        }
    }
    Ok(())
}

/// Transmit a bare command with no data phase.
pub fn broadcast<B: Bus>(bus: &mut B, command: Command, chain_len: usize) -> Result<()> {
    wake_from_idle(bus, chain_len);

    bus.assert_select();
    let result = bus.transmit(command.as_bytes());
    bus.deassert_select();
    result
}

/// Trigger a conversion, then block for the worst-case reference settle
/// plus conversion time. The device exposes no completion interrupt at this
/// layer, so the delay is fixed rather than measured.
pub fn start_conversion<B: Bus, D: Delay>(
    bus: &mut B,
    delay: &mut D,
    command: Command,
    chain_len: usize,
) -> Result<()> {
    broadcast(bus, command, chain_len)?;
    delay.delay_us(T_REFUP_MAX_US + T_CYCLE_FAST_MAX_US);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{RDCVA, WRCFGA};
    use std::collections::VecDeque;
    use std::io;

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Select,
        Deselect,
        Transmit(Vec<u8>),
        Receive(usize),
    }

    #[derive(Default)]
    struct MockBus {
        log: Vec<Event>,
        responses: VecDeque<Vec<u8>>,
        fail_transmit: bool,
    }

    impl Bus for MockBus {
        fn assert_select(&mut self) {
            self.log.push(Event::Select);
        }

        fn deassert_select(&mut self) {
            self.log.push(Event::Deselect);
        }

        fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
            self.log.push(Event::Transmit(bytes.to_vec()));
            if self.fail_transmit {
                Err(io::Error::other("mock transmit fault").into())
            } else {
                Ok(())
            }
        }

        fn transmit_then_receive(&mut self, tx: &[u8], rx_len: usize) -> Result<Vec<u8>> {
            self.log.push(Event::Transmit(tx.to_vec()));
            self.log.push(Event::Receive(rx_len));
            self.responses
                .pop_front()
                .ok_or_else(|| io::Error::other("no scripted response").into())
        }
    }

    #[derive(Default)]
    struct MockDelay {
        delays: Vec<u32>,
    }

    impl Delay for MockDelay {
        fn delay_us(&mut self, micros: u32) {
            self.delays.push(micros);
        }
    }

    fn frames<const N: usize>(registers: [Register; N]) -> Vec<u8> {
        let mut wire = Vec::new();
        for register in registers {
            register.write_wire(&mut wire);
        }
        wire
    }

    #[test]
    fn reversal_mapping() {
        assert_eq!(physical_index(0, 12), 11);
        assert_eq!(physical_index(11, 12), 0);
        assert_eq!(physical_index(3, 12), 8);
    }

    #[test]
    fn idle_wake_pulses_every_device_once() {
        let mut bus = MockBus::default();
        wake_from_idle(&mut bus, 12);
        assert_eq!(bus.log.len(), 36);
        for pulse in bus.log.chunks_exact(3) {
            assert_eq!(pulse[0], Event::Select);
            assert_eq!(pulse[1], Event::Transmit(vec![0xFF]));
            assert_eq!(pulse[2], Event::Deselect);
        }
    }

    #[test]
    fn sleep_wake_holds_each_pulse() {
        let mut bus = MockBus::default();
        let mut delay = MockDelay::default();
        wake_from_sleep(&mut bus, &mut delay, 12);
        assert_eq!(delay.delays.len(), 24);
        for pair in delay.delays.chunks_exact(2) {
            assert_eq!(pair, [T_WAKE_MAX_US, T_READY_US]);
        }
    }

    #[test]
    fn write_transmits_software_index_zero_first() {
        // Software index 0 is shifted through the chain into the physically
        // last device; its frame must lead the byte stream.
        let mut group: RegisterGroup<3> = RegisterGroup::new(WRCFGA);
        for (i, register) in group.registers_mut().iter_mut().enumerate() {
            *register = Register::new([i as u8 + 1, 0, 0, 0, 0, 0]);
        }
        let mut bus = MockBus::default();
        write_register_group(&mut bus, &group).unwrap();

        // 3 idle-wake pulses, then the frame transmission.
        let Event::Transmit(stream) = &bus.log[10] else {
            panic!("expected a frame transmission, got {:?}", bus.log[10]);
        };
        let mut expected = WRCFGA.as_bytes().to_vec();
        expected.extend(frames(*group.registers()));
        assert_eq!(stream, &expected);
        assert_eq!(stream[COMMAND_BYTES], 1, "device 0 frame leads the stream");
        assert_eq!(bus.log[9], Event::Select);
        assert_eq!(bus.log[11], Event::Deselect);
    }

    #[test]
    fn read_decodes_every_device() {
        let sent = [
            Register::from_codes([100, 200, 300]),
            Register::from_codes([400, 500, 600]),
        ];
        let mut bus = MockBus::default();
        bus.responses.push_back(frames(sent));

        let mut group: RegisterGroup<2> = RegisterGroup::new(RDCVA);
        read_register_group(&mut bus, &mut group).unwrap();
        assert_eq!(group.registers(), &sent);
        assert_eq!(group.register(1).code(2), 600);
    }

    #[test]
    fn read_fails_when_any_device_pec_is_corrupted() {
        let mut registers = [Register::default(); 12];
        for (i, register) in registers.iter_mut().enumerate() {
            *register = Register::from_codes([i as u16, 0, 0]);
        }
        let mut wire = frames(registers);
        // Corrupt one payload byte of device 7 without fixing its PEC.
        wire[7 * REGISTER_WIRE_BYTES] ^= 0x01;

        let mut bus = MockBus::default();
        bus.responses.push_back(wire);

        let mut group: RegisterGroup<12> = RegisterGroup::new(RDCVA);
        match read_register_group(&mut bus, &mut group) {
            Err(Ltc6811Error::Pec { device }) => assert_eq!(device, 7),
            other => panic!("expected PEC failure, got {other:?}"),
        }
    }

    #[test]
    fn transport_fault_propagates() {
        let mut bus = MockBus {
            fail_transmit: true,
            ..MockBus::default()
        };
        let group: RegisterGroup<2> = RegisterGroup::new(WRCFGA);
        assert!(matches!(
            write_register_group(&mut bus, &group),
            Err(Ltc6811Error::Bus(_))
        ));
    }

    #[test]
    fn conversion_blocks_for_settle_and_convert() {
        use crate::command::{CellChannel, Dcp, Mode};
        let adcv = Command::adcv(Mode::Normal, Dcp::Disabled, CellChannel::All);
        let mut bus = MockBus::default();
        let mut delay = MockDelay::default();
        start_conversion(&mut bus, &mut delay, adcv, 12).unwrap();
        assert_eq!(delay.delays, vec![T_REFUP_MAX_US + T_CYCLE_FAST_MAX_US]);
    }
}

use crate::error::Result;

/// Bus transport for moving raw frames over the isolated SPI link.
///
/// Implementations handle the physical layer details (SPI peripheral,
/// bit-banged lines, a test double) while the driver handles framing,
/// PEC and timing. Byte ordering must be preserved exactly as given.
pub trait Bus {
    /// Drive the chip-select line active.
    fn assert_select(&mut self);

    /// Release the chip-select line.
    fn deassert_select(&mut self);

    /// Transmit `bytes` within the current select window.
    fn transmit(&mut self, bytes: &[u8]) -> Result<()>;

    /// Transmit `tx`, then clock in `rx_len` bytes, all within the current
    /// select window.
    fn transmit_then_receive(&mut self, tx: &[u8], rx_len: usize) -> Result<Vec<u8>>;
}

/// Microsecond-granularity delay service.
///
/// The chain's wake pulses and conversion settle times are protocol
/// contracts: a delay must last at least as long as requested, never less.
pub trait Delay {
    fn delay_us(&mut self, micros: u32);
}

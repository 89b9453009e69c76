use std::fmt;

#[derive(Debug)]
pub enum Ltc6811Error {
    /// Transport-level transmit or receive failure.
    Bus(std::io::Error),
    /// A received register frame whose PEC did not match its data.
    Pec { device: usize },
}

impl fmt::Display for Ltc6811Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ltc6811Error::Bus(e) => write!(f, "bus transport error: {}", e),
            Ltc6811Error::Pec { device } => write!(f, "PEC mismatch on device {}", device),
        }
    }
}

impl std::error::Error for Ltc6811Error {}

impl From<std::io::Error> for Ltc6811Error {
    fn from(err: std::io::Error) -> Ltc6811Error {
        Ltc6811Error::Bus(err)
    }
}

pub type Result<T> = std::result::Result<T, Ltc6811Error>;

use core::fmt;

use embedded_hal::i2c;

/// Driver error, generic over the bus error `E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The bus transfer itself failed.
    #[from]
    Bus(E),
    /// Nothing answered the identity read (floating bus).
    Absent,
    /// A device answered, but not the expected one. Multi-byte identities
    /// are packed big-endian.
    Mismatch { expected: u32, found: u32 },
    /// The device did not come out of reset in time.
    ResetTimeout,
    /// The device identified itself but its factory calibration is erased.
    BadCalibration,
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(err) => write!(f, "bus error: {}", err),
            Error::Absent => write!(f, "device not present"),
            Error::Mismatch { expected, found } => write!(
                f,
                "unexpected identity {:#x} (expected {:#x})",
                found, expected
            ),
            Error::ResetTimeout => write!(f, "device stuck in reset"),
            Error::BadCalibration => write!(f, "calibration data erased"),
        }
    }
}

/// Classify an identity read. All-zero and all-one answers mean no device
/// is driving the bus.
pub(crate) fn check_identity<E>(expected: &[u8], found: &[u8]) -> Result<(), Error<E>> {
    if found == expected {
        return Ok(());
    }
    if found.iter().all(|b| *b == 0x00) || found.iter().all(|b| *b == 0xFF) {
        return Err(Error::Absent);
    }
    Err(Error::Mismatch { expected: pack(expected), found: pack(found) })
}

/// An I2C address nobody acknowledges during the identity read means the
/// chip is not fitted. Any other failure is the bus's.
pub(crate) fn absent_on_nack<E: i2c::Error>(err: E) -> Error<E> {
    match err.kind() {
        i2c::ErrorKind::NoAcknowledge(_) => Error::Absent,
        _ => Error::Bus(err),
    }
}

fn pack(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0, |acc, b| acc << 8 | u32::from(*b))
}

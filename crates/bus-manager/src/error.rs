use core::fmt;

use crate::config::{DmaStream, Pin, PinRole, Priority, RegisterBlock, Vector};
use crate::driver::{BusFault, DriverError};

/// A physical resource that at most one descriptor may claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resource {
    RegisterBlock(RegisterBlock),
    DmaStream(DmaStream),
    Pin(Pin),
    /// Exclusive interrupt vector; shared data-ready vectors are exempt.
    Vector(Vector),
    ExtiLine(u8),
}

/// A descriptor or a set of descriptors is inconsistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    MissingPin(RegisterBlock, PinRole),
    DuplicatePin(Pin),
    TooManyPins(RegisterBlock),
    TooManyIrqs(RegisterBlock),
    /// Two interrupt lines of one bus share a line kind or a vector.
    DuplicateIrq(RegisterBlock, Vector),
    MissingIrq(RegisterBlock),
    InvalidPriority(Priority),
    InvalidPrescaler(RegisterBlock, u16),
    InvalidClock(RegisterBlock, u32),
    InvalidTimeout(RegisterBlock),
    InvalidBaud(RegisterBlock),
    /// A DMA stream is wired against its direction, or a pair reuses one
    /// stream for both directions.
    DmaDirection(DmaStream),
    ExtiLineMismatch { pin: Pin, line: u8 },
    /// Descriptors `first` and `second` (indices into the validated set)
    /// claim the same resource.
    Collision { resource: Resource, first: usize, second: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingPin(block, role) => {
                write!(f, "{:?} has no {:?} pin", block, role)
            }
            ConfigError::DuplicatePin(pin) => {
                write!(f, "pin {:?} assigned twice", pin)
            }
            ConfigError::TooManyPins(block) => {
                write!(f, "{:?} claims too many pins", block)
            }
            ConfigError::TooManyIrqs(block) => {
                write!(f, "{:?} claims too many interrupt lines", block)
            }
            ConfigError::DuplicateIrq(block, vector) => write!(
                f,
                "{:?} routes two interrupt lines to vector {}",
                block,
                vector.number()
            ),
            ConfigError::MissingIrq(block) => {
                write!(f, "{:?} has no interrupt line", block)
            }
            ConfigError::InvalidPriority(p) => {
                write!(f, "invalid priority {}.{}", p.preemption, p.sub)
            }
            ConfigError::InvalidPrescaler(block, value) => {
                write!(f, "{:?}: invalid prescaler {}", block, value)
            }
            ConfigError::InvalidClock(block, hz) => {
                write!(f, "{:?}: invalid clock {} Hz", block, hz)
            }
            ConfigError::InvalidTimeout(block) => {
                write!(f, "{:?}: transfer timeout must be non-zero", block)
            }
            ConfigError::InvalidBaud(block) => {
                write!(f, "{:?}: baud rate must be non-zero", block)
            }
            ConfigError::DmaDirection(stream) => {
                write!(f, "DMA stream {:?} misassigned", stream)
            }
            ConfigError::ExtiLineMismatch { pin, line } => {
                write!(f, "pin {:?} cannot drive EXTI line {}", pin, line)
            }
            ConfigError::Collision { resource, first, second } => write!(
                f,
                "descriptors {} and {} both claim {:?}",
                first, second, resource
            ),
        }
    }
}

/// Lifecycle errors of a [`crate::BusManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// `init` was already called successfully; the register block has an
    /// owner.
    AlreadyInitialized,
    /// The bus has not been brought up.
    NotInitialized,
    /// The protocol engine refused to bring the peripheral up.
    #[from]
    Init(DriverError),
    /// An earlier `init` failed; the bus stays down until reset.
    Failed,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::AlreadyInitialized => write!(f, "bus already initialized"),
            BusError::NotInitialized => write!(f, "bus not initialized"),
            BusError::Init(err) => write!(f, "bus bring-up failed: {}", err),
            BusError::Failed => write!(f, "bus bring-up failed earlier"),
        }
    }
}

/// Runtime failure of one transfer. Returned to the caller, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    NotInitialized,
    #[from]
    Driver(DriverError),
    #[from]
    Fault(BusFault),
    Timeout,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::NotInitialized => write!(f, "bus not initialized"),
            TransferError::Driver(err) => write!(f, "transfer rejected: {}", err),
            TransferError::Fault(fault) => write!(f, "bus fault: {:?}", fault),
            TransferError::Timeout => write!(f, "transfer timed out"),
        }
    }
}

impl embedded_hal::spi::Error for TransferError {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        use embedded_hal::spi::ErrorKind;
        match self {
            TransferError::Fault(BusFault::Overrun) => ErrorKind::Overrun,
            _ => ErrorKind::Other,
        }
    }
}

impl embedded_hal::i2c::Error for TransferError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        match self {
            TransferError::Fault(BusFault::Nack) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown)
            }
            TransferError::Fault(BusFault::ArbitrationLost) => {
                ErrorKind::ArbitrationLoss
            }
            TransferError::Fault(BusFault::Bus) => ErrorKind::Bus,
            TransferError::Fault(BusFault::Overrun) => ErrorKind::Overrun,
            _ => ErrorKind::Other,
        }
    }
}

/// Interrupt dispatch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// A vector fired with no registered handler. Fatal.
    Unregistered(Vector),
    /// Registration happens exactly once per vector.
    AlreadyRegistered(Vector),
    /// Vector number beyond the table.
    OutOfRange(Vector),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Unregistered(v) => {
                write!(f, "unregistered vector {} fired", v.number())
            }
            DispatchError::AlreadyRegistered(v) => {
                write!(f, "vector {} already registered", v.number())
            }
            DispatchError::OutOfRange(v) => {
                write!(f, "vector {} outside dispatch table", v.number())
            }
        }
    }
}

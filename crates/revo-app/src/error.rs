use core::fmt;

use bus_manager::{BusError, BusHandle, ConfigError, DispatchError, TransferError};
use revo_bsp::{BusRole, ComRole, DeviceRole};

/// Failure to bring up or look up a board bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// No bus was declared for the role.
    NotDeclared(BusRole),
    /// The role was declared twice.
    Duplicate(BusRole),
    TooManyBuses,
    /// The bus exists but has not been brought up (or failed to).
    NotInitialized(BusRole),
    Bus(BusRole, BusError),
    Dispatch(BusRole, DispatchError),
}

/// Binding a device to a bus handle failed. The first two variants are
/// configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttachError {
    /// The handle does not name a successfully initialized bus.
    NotLive(BusHandle),
    /// The device is declared on a different bus.
    WrongBus { device: DeviceRole, handle: BusHandle },
    AlreadyAttached(DeviceRole),
    NotAttached(DeviceRole),
}

impl AttachError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, AttachError::NotLive(_) | AttachError::WrongBus { .. })
    }
}

/// Device bring-up failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    NotAttached(DeviceRole),
    /// Initialize was already attempted for this device.
    AlreadyInitialized(DeviceRole),
    /// Nothing answered the identity read.
    Absent,
    /// Another part answered.
    Mismatch { expected: u32, found: u32 },
    ResetTimeout,
    /// The part identified itself but its factory calibration is erased.
    BadCalibration,
    #[from]
    Bus(BusError),
    #[from]
    Transfer(TransferError),
}

impl DeviceError {
    /// Absence and mismatch, as opposed to bus trouble.
    pub fn is_identity(&self) -> bool {
        matches!(self, DeviceError::Absent | DeviceError::Mismatch { .. })
    }
}

impl From<revo_sensors::Error<TransferError>> for DeviceError {
    fn from(err: revo_sensors::Error<TransferError>) -> Self {
        match err {
            revo_sensors::Error::Bus(err) => DeviceError::Transfer(err),
            revo_sensors::Error::Absent => DeviceError::Absent,
            revo_sensors::Error::Mismatch { expected, found } => {
                DeviceError::Mismatch { expected, found }
            }
            revo_sensors::Error::ResetTimeout => DeviceError::ResetTimeout,
            revo_sensors::Error::BadCalibration => DeviceError::BadCalibration,
        }
    }
}

/// Serial endpoint errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ComError {
    /// The role has no endpoint in this build.
    NotConfigured(ComRole),
    /// The endpoint exists but its bus is not up.
    Bus(BusError),
}

/// Failure reported by a board collaborator (clock tree, filesystem,
/// object system...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoardError {
    /// The hardware did not respond.
    NoResponse,
    /// The collaborator returned a non-zero status.
    Code(i32),
}

/// Why a boot stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootError {
    #[from]
    Config(ConfigError),
    #[from]
    Registry(RegistryError),
    #[from]
    Attach(AttachError),
    Device(DeviceRole, DeviceError),
    #[from]
    Dispatch(DispatchError),
    #[from]
    Board(BoardError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::NotDeclared(role) => {
                write!(f, "no bus declared for {:?}", role)
            }
            RegistryError::Duplicate(role) => {
                write!(f, "bus {:?} declared twice", role)
            }
            RegistryError::TooManyBuses => write!(f, "bus registry full"),
            RegistryError::NotInitialized(role) => {
                write!(f, "bus {:?} not initialized", role)
            }
            RegistryError::Bus(role, err) => write!(f, "bus {:?}: {}", role, err),
            RegistryError::Dispatch(role, err) => {
                write!(f, "bus {:?} interrupt routing: {}", role, err)
            }
        }
    }
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachError::NotLive(handle) => {
                write!(f, "{:?} is not an initialized bus", handle)
            }
            AttachError::WrongBus { device, handle } => {
                write!(f, "{:?} is not declared on {:?}", device, handle)
            }
            AttachError::AlreadyAttached(device) => {
                write!(f, "{:?} already attached", device)
            }
            AttachError::NotAttached(device) => {
                write!(f, "{:?} not attached", device)
            }
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotAttached(device) => {
                write!(f, "{:?} not attached", device)
            }
            DeviceError::AlreadyInitialized(device) => {
                write!(f, "{:?} already initialized", device)
            }
            DeviceError::Absent => write!(f, "device not present"),
            DeviceError::Mismatch { expected, found } => write!(
                f,
                "unexpected identity {:#x} (expected {:#x})",
                found, expected
            ),
            DeviceError::ResetTimeout => write!(f, "device stuck in reset"),
            DeviceError::BadCalibration => write!(f, "calibration data erased"),
            DeviceError::Bus(err) => write!(f, "{}", err),
            DeviceError::Transfer(err) => write!(f, "{}", err),
        }
    }
}

impl fmt::Display for ComError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComError::NotConfigured(role) => {
                write!(f, "no {:?} endpoint configured", role)
            }
            ComError::Bus(err) => write!(f, "{}", err),
        }
    }
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::NoResponse => write!(f, "no response"),
            BoardError::Code(code) => write!(f, "status {}", code),
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::Config(err) => write!(f, "{}", err),
            BootError::Registry(err) => write!(f, "{}", err),
            BootError::Attach(err) => write!(f, "{}", err),
            BootError::Device(device, err) => write!(f, "{:?}: {}", device, err),
            BootError::Dispatch(err) => write!(f, "{}", err),
            BootError::Board(err) => write!(f, "{}", err),
        }
    }
}

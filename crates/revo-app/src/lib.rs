#![no_std]
//! Bring-up of the Revolution flight controller.
//!
//! Owns the board buses keyed by role, binds devices to them, exposes the
//! serial endpoints and data-ready signals, and runs the staged boot
//! sequence that halts with a blink code when a mandatory stage fails.

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod board;
pub mod com;
pub mod devices;
pub mod drdy;
pub mod error;
pub mod fault;
pub mod registry;
pub mod sensors;
pub mod sequencer;

pub use board::{Board, FaultIndicator};
pub use com::{
    AuxPort, ComEndpoint, ComPort, ComTable, EndpointId, GpsPort, TelemetryPort,
};
pub use devices::{DeviceHandle, DeviceState, DeviceTable};
pub use drdy::{DataReadySignals, ExtiPending};
pub use error::{
    AttachError, BoardError, BootError, ComError, DeviceError, RegistryError,
};
pub use registry::{BusRegistry, Slot};
pub use sequencer::{BootFault, BootReport, Booted, Sequencer, Stage};

#![no_std]
//! Board-agnostic bus bring-up and sharing.
//!
//! Describes each physical bus with a validated, immutable [`BusConfig`],
//! brings it up exactly once through a [`BusManager`], serializes transfers
//! from multiple tasks through a per-bus lock, and routes shared interrupt
//! vectors to the right bus instance through a [`DispatchTable`].

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
mod device;
mod dispatch;
mod driver;
mod error;
mod handle;
mod manager;
pub mod validate;

pub use config::BusConfig;
pub use device::{I2cBusDevice, SpiBusDevice};
pub use dispatch::{DispatchTable, IrqService, VectorService};
pub use driver::{
    BusDriver, BusFault, DriverError, IrqOutcome, Segment, SerialDriver,
    Target,
};
pub use error::{BusError, ConfigError, DispatchError, Resource, TransferError};
pub use handle::{BusGuard, BusHandle, SharedBus};
pub use manager::{BusManager, ManagedBus};

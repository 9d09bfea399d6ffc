//! Boundary to the per-class protocol engines.
//!
//! The engines clock bytes in and out of a peripheral; this crate only
//! configures them, hands them one segment at a time and waits for the
//! interrupt that ends the segment.

use core::fmt;

use crate::config::{BusConfig, IrqLine};

/// Device addressed by a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    /// SPI device selected by chip select `n`.
    ChipSelect(u8),
    /// Seven-bit two-wire address.
    Address(u8),
    /// Serial ports have no addressing.
    Port,
}

/// One contiguous transfer on the wire: write `tx`, then clock in
/// `rx_len` bytes.
///
/// `last` ends the bus transaction after this segment (chip select
/// released, or STOP condition issued).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'b> {
    pub target: Target,
    pub tx: &'b [u8],
    pub rx_len: usize,
    pub last: bool,
}

/// Hardware-reported failure of a running segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusFault {
    Nack,
    ArbitrationLost,
    /// Misplaced START/STOP or framing error.
    Bus,
    Overrun,
    Dma,
}

/// What an interrupt meant for the segment in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqOutcome {
    /// Intermediate event, status cleared, nothing to report.
    Pending,
    Complete,
    Failed(BusFault),
}

/// Synchronous refusal by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Register block not in its reset state, or did not accept the
    /// configuration.
    RegisterBlockState,
    DmaUnavailable,
    /// A segment is already running.
    Busy,
    InvalidTarget,
    Unsupported,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::RegisterBlockState => {
                write!(f, "register block in unexpected state")
            }
            DriverError::DmaUnavailable => write!(f, "DMA stream unavailable"),
            DriverError::Busy => write!(f, "engine busy"),
            DriverError::InvalidTarget => write!(f, "invalid target"),
            DriverError::Unsupported => write!(f, "operation unsupported"),
        }
    }
}

/// Protocol engine for one bus instance.
///
/// `on_interrupt` and `abort` run in interrupt context: no blocking,
/// bounded work.
pub trait BusDriver {
    /// Program clocks, pins, DMA streams and interrupt lines from
    /// `config`. Called once.
    fn init(&mut self, config: &BusConfig) -> Result<(), DriverError>;

    /// Kick off `segment`. Completion is reported through
    /// [`BusDriver::on_interrupt`].
    fn start(&mut self, segment: &Segment<'_>) -> Result<(), DriverError>;

    /// Service `line`: clear status and report how the segment stands.
    fn on_interrupt(&mut self, line: IrqLine) -> IrqOutcome;

    /// Copy received bytes of the finished segment into `rx`, returning
    /// the count.
    fn finish(&mut self, rx: &mut [u8]) -> usize;

    /// Stop the running segment and bring the peripheral back to idle.
    fn abort(&mut self);
}

/// Byte-oriented access used by serial endpoints, interrupt driven
/// instead of segment driven.
pub trait SerialDriver: BusDriver {
    /// Next received byte, if the data register holds one.
    fn read_byte(&mut self) -> Option<u8>;

    /// Load a byte into the transmit register. `false` if it is still
    /// full.
    fn write_byte(&mut self, byte: u8) -> bool;

    /// Enable or disable the transmit-empty interrupt.
    fn set_tx_interrupt(&mut self, enabled: bool);
}

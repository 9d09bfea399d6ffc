//! Immutable bus descriptors.
//!
//! A [`BusConfig`] captures everything needed to bring up one physical bus:
//! register block, pin roles, protocol timing, DMA stream pair and
//! interrupt lines. Descriptors are produced by the builders in this module
//! and never change afterwards.

mod builder;
mod dma;
mod pins;
mod protocol;

use embassy_time::Duration;
use heapless::Vec;

pub use builder::{I2cBusBuilder, SpiBusBuilder, UsartBusBuilder};
pub use dma::{
    Burst, DmaConfig, DmaController, DmaDirection, DmaPair, DmaPriority,
    DmaStream, FifoPolicy, FifoThreshold,
};
pub use pins::{
    DataReady, Edge, OutputType, Pin, PinConfig, PinMode, PinRole, Port, Pull,
    Speed,
};
pub use protocol::{
    BitOrder, ClockPhase, ClockPolarity, DataBits, DutyCycle, FlowControl,
    I2cTiming, Parity, Protocol, SpiTiming, StopBits, UsartTiming, WordSize,
    I2C_MAX_CLOCK_HZ,
};

/// Most pins a single bus may claim (clock, data lines and chip selects).
pub const MAX_PINS: usize = 8;
/// Most interrupt lines a single bus may claim.
pub const MAX_IRQS: usize = 2;

/// Class of bus peripheral. Every instance of a class shares one protocol
/// engine and one generic interrupt routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusClass {
    Spi,
    I2c,
    Usart,
}

/// Physical register block of a bus peripheral, by class and instance
/// number (`Spi(1)` is SPI1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterBlock {
    Spi(u8),
    I2c(u8),
    /// USARTs and UARTs share one numbering.
    Usart(u8),
}

impl RegisterBlock {
    pub const fn class(&self) -> BusClass {
        match self {
            RegisterBlock::Spi(_) => BusClass::Spi,
            RegisterBlock::I2c(_) => BusClass::I2c,
            RegisterBlock::Usart(_) => BusClass::Usart,
        }
    }
}

/// Hardware interrupt vector number (position in the vector table after
/// the core exceptions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vector(u8);

impl Vector {
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    pub const fn number(&self) -> u8 {
        self.0
    }
}

/// Number of implemented NVIC priority bits.
pub const PRIORITY_BITS: u8 = 4;

/// Two-level interrupt priority. Lower values preempt higher ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Priority {
    pub preemption: u8,
    pub sub: u8,
}

impl Priority {
    pub const fn new(preemption: u8, sub: u8) -> Self {
        Self { preemption, sub }
    }

    pub const fn is_valid(&self) -> bool {
        let limit = 1 << PRIORITY_BITS;
        self.preemption < limit && self.sub < limit
    }
}

/// Which event of a bus an interrupt line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqLine {
    /// Receive DMA stream transfer complete / error.
    DmaRx,
    /// Transmit DMA stream transfer complete / error.
    DmaTx,
    /// Two-wire event interrupt.
    Event,
    /// Two-wire error interrupt.
    Error,
    /// Single global peripheral interrupt (serial ports).
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqConfig {
    pub line: IrqLine,
    pub vector: Vector,
    pub priority: Priority,
}

impl IrqConfig {
    pub const fn new(line: IrqLine, vector: Vector, priority: Priority) -> Self {
        Self { line, vector, priority }
    }
}

/// Validated descriptor of one physical bus.
///
/// Only constructible through [`SpiBusBuilder`], [`I2cBusBuilder`] or
/// [`UsartBusBuilder`], so every value upholds its per-bus invariants.
/// Cross-bus invariants are checked by [`crate::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    block: RegisterBlock,
    pins: Vec<(PinRole, PinConfig), MAX_PINS>,
    protocol: Protocol,
    dma: Option<DmaPair>,
    irqs: Vec<IrqConfig, MAX_IRQS>,
}

impl BusConfig {
    pub const fn block(&self) -> RegisterBlock {
        self.block
    }

    pub fn class(&self) -> BusClass {
        self.block.class()
    }

    pub fn pins(&self) -> &[(PinRole, PinConfig)] {
        &self.pins
    }

    pub fn pin(&self, role: PinRole) -> Option<&PinConfig> {
        self.pins.iter().find(|(r, _)| *r == role).map(|(_, p)| p)
    }

    /// Chip select pins in device-index order.
    pub fn chip_selects(&self) -> impl Iterator<Item = (u8, &PinConfig)> {
        self.pins.iter().filter_map(|(role, pin)| match role {
            PinRole::ChipSelect(n) => Some((*n, pin)),
            _ => None,
        })
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn dma(&self) -> Option<&DmaPair> {
        self.dma.as_ref()
    }

    pub fn dma_streams(&self) -> impl Iterator<Item = DmaStream> + '_ {
        self.dma.iter().flat_map(|pair| [pair.rx.stream, pair.tx.stream])
    }

    pub fn irqs(&self) -> &[IrqConfig] {
        &self.irqs
    }

    pub fn irq(&self, line: IrqLine) -> Option<&IrqConfig> {
        self.irqs.iter().find(|irq| irq.line == line)
    }

    /// Per-segment transfer timeout. Only two-wire buses carry one; the
    /// other classes are paced by their own clock and never stall.
    pub fn transfer_timeout(&self) -> Option<Duration> {
        match self.protocol {
            Protocol::I2c(timing) => Some(timing.transfer_timeout),
            _ => None,
        }
    }
}

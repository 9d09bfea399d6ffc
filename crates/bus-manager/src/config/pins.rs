//! GPIO pin descriptors used by bus and data-ready configurations.

use super::{Priority, Vector};
use crate::error::ConfigError;

/// GPIO port letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    A,
    B,
    C,
    D,
    E,
}

/// A physical pin, e.g. `PB6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pin {
    pub port: Port,
    pub index: u8,
}

impl Pin {
    pub const fn new(port: Port, index: u8) -> Self {
        Self { port, index }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    Input,
    Output,
    /// Alternate function number routing the pin to a peripheral.
    Alternate(u8),
    Analog,
}

/// Output slew rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    Mhz2,
    Mhz25,
    Mhz50,
    Mhz100,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputType {
    PushPull,
    OpenDrain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    None,
    Up,
    Down,
}

/// Electrical configuration of one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    pub pin: Pin,
    pub mode: PinMode,
    pub speed: Speed,
    pub output: OutputType,
    pub pull: Pull,
}

impl PinConfig {
    /// Pin routed to a peripheral through alternate function `af`.
    pub const fn alternate(
        pin: Pin,
        af: u8,
        speed: Speed,
        output: OutputType,
        pull: Pull,
    ) -> Self {
        Self { pin, mode: PinMode::Alternate(af), speed, output, pull }
    }

    /// Software-driven push-pull output, used for chip selects.
    pub const fn output(pin: Pin, speed: Speed, pull: Pull) -> Self {
        Self {
            pin,
            mode: PinMode::Output,
            speed,
            output: OutputType::PushPull,
            pull,
        }
    }

    pub const fn input(pin: Pin, speed: Speed, pull: Pull) -> Self {
        Self {
            pin,
            mode: PinMode::Input,
            speed,
            output: OutputType::OpenDrain,
            pull,
        }
    }
}

/// What a pin does for its bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinRole {
    Sclk,
    Miso,
    Mosi,
    /// Chip select for the n-th device on an SPI bus.
    ChipSelect(u8),
    Scl,
    Sda,
    Tx,
    Rx,
}

/// Edge that raises a data-ready interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

/// Data-ready signal of a sensor: an input pin wired to an external
/// interrupt line, independent of the bus the sensor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataReady {
    pin: PinConfig,
    line: u8,
    edge: Edge,
    vector: Vector,
    priority: Priority,
}

impl DataReady {
    /// External interrupt lines are numbered after the pin index they
    /// sample, so `line` must equal `pin.pin.index`.
    pub fn new(
        pin: PinConfig,
        line: u8,
        edge: Edge,
        vector: Vector,
        priority: Priority,
    ) -> Result<Self, ConfigError> {
        if pin.pin.index != line {
            return Err(ConfigError::ExtiLineMismatch { pin: pin.pin, line });
        }
        if !priority.is_valid() {
            return Err(ConfigError::InvalidPriority(priority));
        }
        Ok(Self { pin, line, edge, vector, priority })
    }

    pub fn pin(&self) -> &PinConfig {
        &self.pin
    }

    pub fn line(&self) -> u8 {
        self.line
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    pub fn vector(&self) -> Vector {
        self.vector
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}

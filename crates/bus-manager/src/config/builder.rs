use embassy_time::Duration;
use heapless::Vec;

use super::{
    BusConfig, DmaDirection, DmaPair, DutyCycle, I2cTiming, IrqConfig,
    PinConfig, PinRole, Protocol, RegisterBlock, SpiTiming, UsartTiming,
    I2C_MAX_CLOCK_HZ,
};
use crate::error::ConfigError;

/// Shared state of the three builders. The first error is latched and
/// reported by `build()`, so setters stay chainable.
#[derive(Debug, Clone)]
struct Draft {
    block: RegisterBlock,
    pins: Vec<(PinRole, PinConfig), { super::MAX_PINS }>,
    dma: Option<DmaPair>,
    irqs: Vec<IrqConfig, { super::MAX_IRQS }>,
    error: Option<ConfigError>,
}

impl Draft {
    const fn new(block: RegisterBlock) -> Self {
        Self {
            block,
            pins: Vec::new(),
            dma: None,
            irqs: Vec::new(),
            error: None,
        }
    }

    fn fail(&mut self, err: ConfigError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn pin(&mut self, role: PinRole, config: PinConfig) {
        if self.pins.iter().any(|(r, p)| *r == role || p.pin == config.pin) {
            self.fail(ConfigError::DuplicatePin(config.pin));
        } else if self.pins.push((role, config)).is_err() {
            self.fail(ConfigError::TooManyPins(self.block));
        }
    }

    fn irq(&mut self, irq: IrqConfig) {
        if !irq.priority.is_valid() {
            self.fail(ConfigError::InvalidPriority(irq.priority));
        } else if self
            .irqs
            .iter()
            .any(|i| i.line == irq.line || i.vector == irq.vector)
        {
            self.fail(ConfigError::DuplicateIrq(self.block, irq.vector));
        } else if self.irqs.push(irq).is_err() {
            self.fail(ConfigError::TooManyIrqs(self.block));
        }
    }

    fn dma(&mut self, pair: DmaPair) {
        if pair.rx.direction != DmaDirection::PeripheralToMemory {
            self.fail(ConfigError::DmaDirection(pair.rx.stream));
        } else if pair.tx.direction != DmaDirection::MemoryToPeripheral {
            self.fail(ConfigError::DmaDirection(pair.tx.stream));
        } else if pair.rx.stream == pair.tx.stream {
            self.fail(ConfigError::DmaDirection(pair.tx.stream));
        } else {
            self.dma = Some(pair);
        }
    }

    fn latched(&self) -> Result<(), ConfigError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn require(&self, role: PinRole) -> Result<(), ConfigError> {
        if self.pins.iter().any(|(r, _)| *r == role) {
            Ok(())
        } else {
            Err(ConfigError::MissingPin(self.block, role))
        }
    }

    fn finish(self, protocol: Protocol) -> Result<BusConfig, ConfigError> {
        if self.irqs.is_empty() {
            return Err(ConfigError::MissingIrq(self.block));
        }
        Ok(BusConfig {
            block: self.block,
            pins: self.pins,
            protocol,
            dma: self.dma,
            irqs: self.irqs,
        })
    }
}

/// Builder for a synchronous serial (SPI) master bus.
///
/// ```ignore
/// let accel = SpiBusBuilder::new(1, SpiTiming::mode3(4))
///     .sclk(PinConfig::alternate(pa5, 5, Speed::Mhz100, OutputType::PushPull, Pull::Up))
///     .miso(miso)
///     .mosi(mosi)
///     .chip_select(0, cs)
///     .dma(pair)
///     .irq(IrqConfig::new(IrqLine::DmaRx, Vector::new(56), HIGH))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct SpiBusBuilder {
    draft: Draft,
    timing: SpiTiming,
}

impl SpiBusBuilder {
    pub const fn new(instance: u8, timing: SpiTiming) -> Self {
        Self { draft: Draft::new(RegisterBlock::Spi(instance)), timing }
    }

    pub fn sclk(mut self, pin: PinConfig) -> Self {
        self.draft.pin(PinRole::Sclk, pin);
        self
    }

    pub fn miso(mut self, pin: PinConfig) -> Self {
        self.draft.pin(PinRole::Miso, pin);
        self
    }

    pub fn mosi(mut self, pin: PinConfig) -> Self {
        self.draft.pin(PinRole::Mosi, pin);
        self
    }

    /// Chip select for device `index`; indices are what
    /// [`crate::Target::ChipSelect`] refers to.
    pub fn chip_select(mut self, index: u8, pin: PinConfig) -> Self {
        self.draft.pin(PinRole::ChipSelect(index), pin);
        self
    }

    pub fn dma(mut self, pair: DmaPair) -> Self {
        self.draft.dma(pair);
        self
    }

    pub fn irq(mut self, irq: IrqConfig) -> Self {
        self.draft.irq(irq);
        self
    }

    pub fn build(self) -> Result<BusConfig, ConfigError> {
        self.draft.latched()?;
        let block = self.draft.block;
        let prescaler = self.timing.prescaler;
        if !(2..=256).contains(&prescaler) || !prescaler.is_power_of_two() {
            return Err(ConfigError::InvalidPrescaler(block, prescaler));
        }
        self.draft.require(PinRole::Sclk)?;
        self.draft.require(PinRole::Miso)?;
        self.draft.require(PinRole::Mosi)?;
        if !self
            .draft
            .pins
            .iter()
            .any(|(role, _)| matches!(role, PinRole::ChipSelect(_)))
        {
            return Err(ConfigError::MissingPin(block, PinRole::ChipSelect(0)));
        }
        self.draft.finish(Protocol::Spi(self.timing))
    }
}

/// Builder for a two-wire (I2C) master bus.
#[derive(Debug, Clone)]
pub struct I2cBusBuilder {
    draft: Draft,
    timing: I2cTiming,
}

impl I2cBusBuilder {
    /// Standard duty cycle, 50 ms transfer timeout.
    pub const fn new(instance: u8, clock_hz: u32) -> Self {
        Self {
            draft: Draft::new(RegisterBlock::I2c(instance)),
            timing: I2cTiming {
                clock_hz,
                duty: DutyCycle::Ratio2,
                transfer_timeout: Duration::from_millis(50),
            },
        }
    }

    pub fn duty(mut self, duty: DutyCycle) -> Self {
        self.timing.duty = duty;
        self
    }

    pub fn transfer_timeout(mut self, timeout: Duration) -> Self {
        self.timing.transfer_timeout = timeout;
        self
    }

    pub fn scl(mut self, pin: PinConfig) -> Self {
        self.draft.pin(PinRole::Scl, pin);
        self
    }

    pub fn sda(mut self, pin: PinConfig) -> Self {
        self.draft.pin(PinRole::Sda, pin);
        self
    }

    pub fn irq(mut self, irq: IrqConfig) -> Self {
        self.draft.irq(irq);
        self
    }

    pub fn build(self) -> Result<BusConfig, ConfigError> {
        self.draft.latched()?;
        let block = self.draft.block;
        let clock = self.timing.clock_hz;
        if clock == 0 || clock > I2C_MAX_CLOCK_HZ {
            return Err(ConfigError::InvalidClock(block, clock));
        }
        if self.timing.transfer_timeout.as_ticks() == 0 {
            return Err(ConfigError::InvalidTimeout(block));
        }
        self.draft.require(PinRole::Scl)?;
        self.draft.require(PinRole::Sda)?;
        self.draft.finish(Protocol::I2c(self.timing))
    }
}

/// Builder for an asynchronous serial (USART/UART) port.
#[derive(Debug, Clone)]
pub struct UsartBusBuilder {
    draft: Draft,
    timing: UsartTiming,
}

impl UsartBusBuilder {
    pub const fn new(instance: u8, timing: UsartTiming) -> Self {
        Self { draft: Draft::new(RegisterBlock::Usart(instance)), timing }
    }

    pub fn tx(mut self, pin: PinConfig) -> Self {
        self.draft.pin(PinRole::Tx, pin);
        self
    }

    pub fn rx(mut self, pin: PinConfig) -> Self {
        self.draft.pin(PinRole::Rx, pin);
        self
    }

    pub fn dma(mut self, pair: DmaPair) -> Self {
        self.draft.dma(pair);
        self
    }

    pub fn irq(mut self, irq: IrqConfig) -> Self {
        self.draft.irq(irq);
        self
    }

    pub fn build(self) -> Result<BusConfig, ConfigError> {
        self.draft.latched()?;
        let block = self.draft.block;
        if self.timing.baud == 0 {
            return Err(ConfigError::InvalidBaud(block));
        }
        self.draft.require(PinRole::Tx)?;
        self.draft.require(PinRole::Rx)?;
        self.draft.finish(Protocol::Usart(self.timing))
    }
}

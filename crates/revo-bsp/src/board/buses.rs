use bus_manager::config::{
    DmaConfig, DmaController, DmaDirection, DmaPair, DmaPriority, DmaStream,
    DutyCycle, I2cBusBuilder, IrqConfig, IrqLine, OutputType, Pin, PinConfig,
    Port, Pull, Speed, SpiBusBuilder, SpiTiming, UsartBusBuilder, UsartTiming,
};
use bus_manager::{BusConfig, ConfigError};
use embassy_time::Duration;

use crate::irq;
use crate::roles::BusRole;

const AF_I2C: u8 = 4;
const AF_SPI1_2: u8 = 5;
const AF_SPI3: u8 = 6;
const AF_USART1_3: u8 = 7;
const AF_UART4_6: u8 = 8;

const I2C_TRANSFER_TIMEOUT: Duration = Duration::from_millis(50);

/// Canonical descriptor of a board bus.
pub fn bus_config(role: BusRole) -> Result<BusConfig, ConfigError> {
    match role {
        BusRole::Flash => flash(),
        BusRole::Gps => gps(),
        BusRole::Aux => aux(),
        BusRole::Telemetry => telemetry(),
        BusRole::Mag => mag(),
        BusRole::Flexiport => flexiport(),
        BusRole::Pressure => pressure(),
        BusRole::Accel => accel(),
        BusRole::Gyro => gyro(),
    }
}

const fn pin(port: Port, index: u8) -> Pin {
    Pin::new(port, index)
}

const fn af(port: Port, index: u8, function: u8, speed: Speed) -> PinConfig {
    PinConfig::alternate(
        pin(port, index),
        function,
        speed,
        OutputType::PushPull,
        Pull::Up,
    )
}

/// I2C lines are open drain with external pull-ups.
const fn i2c_line(port: Port, index: u8) -> PinConfig {
    PinConfig::alternate(
        pin(port, index),
        AF_I2C,
        Speed::Mhz50,
        OutputType::OpenDrain,
        Pull::None,
    )
}

const fn chip_select(port: Port, index: u8) -> PinConfig {
    PinConfig::output(pin(port, index), Speed::Mhz50, Pull::Up)
}

const fn serial_line(port: Port, index: u8, function: u8) -> PinConfig {
    af(port, index, function, Speed::Mhz2)
}

/// Receive at medium and transmit at high stream priority, byte-wide,
/// no FIFO.
const fn spi_dma(
    controller: DmaController,
    rx: u8,
    tx: u8,
    channel: u8,
) -> DmaPair {
    DmaPair {
        rx: DmaConfig::single(
            DmaStream::new(controller, rx),
            channel,
            DmaDirection::PeripheralToMemory,
            DmaPriority::Medium,
        ),
        tx: DmaConfig::single(
            DmaStream::new(controller, tx),
            channel,
            DmaDirection::MemoryToPeripheral,
            DmaPriority::High,
        ),
    }
}

fn accel() -> Result<BusConfig, ConfigError> {
    SpiBusBuilder::new(1, SpiTiming::mode3(4))
        .sclk(af(Port::A, 5, AF_SPI1_2, Speed::Mhz100))
        .miso(af(Port::A, 6, AF_SPI1_2, Speed::Mhz50))
        .mosi(af(Port::A, 7, AF_SPI1_2, Speed::Mhz50))
        .chip_select(0, chip_select(Port::A, 4))
        .dma(spi_dma(DmaController::Dma2, 0, 3, 3))
        .irq(IrqConfig::new(IrqLine::DmaRx, irq::DMA2_STREAM0, irq::PRIO_HIGH))
        .irq(IrqConfig::new(IrqLine::DmaTx, irq::DMA2_STREAM3, irq::PRIO_HIGH))
        .build()
}

fn gyro() -> Result<BusConfig, ConfigError> {
    SpiBusBuilder::new(2, SpiTiming::mode3(2))
        .sclk(af(Port::B, 13, AF_SPI1_2, Speed::Mhz100))
        .miso(af(Port::B, 14, AF_SPI1_2, Speed::Mhz50))
        .mosi(af(Port::B, 15, AF_SPI1_2, Speed::Mhz50))
        .chip_select(0, chip_select(Port::B, 12))
        .dma(spi_dma(DmaController::Dma1, 3, 4, 0))
        .irq(IrqConfig::new(IrqLine::DmaRx, irq::DMA1_STREAM3, irq::PRIO_HIGH))
        .irq(IrqConfig::new(IrqLine::DmaTx, irq::DMA1_STREAM4, irq::PRIO_HIGH))
        .build()
}

/// SPI3 transmit is only wired to DMA1 streams 5 and 7.
fn flash() -> Result<BusConfig, ConfigError> {
    SpiBusBuilder::new(3, SpiTiming::mode3(2))
        .sclk(af(Port::C, 10, AF_SPI3, Speed::Mhz100))
        .miso(af(Port::C, 11, AF_SPI3, Speed::Mhz50))
        .mosi(af(Port::C, 12, AF_SPI3, Speed::Mhz50))
        .chip_select(0, chip_select(Port::D, 2))
        .dma(spi_dma(DmaController::Dma1, 0, 5, 0))
        .irq(IrqConfig::new(IrqLine::DmaRx, irq::DMA1_STREAM0, irq::PRIO_HIGH))
        .irq(IrqConfig::new(IrqLine::DmaTx, irq::DMA1_STREAM5, irq::PRIO_HIGH))
        .build()
}

fn mag() -> Result<BusConfig, ConfigError> {
    I2cBusBuilder::new(1, 400_000)
        .duty(DutyCycle::Ratio2)
        .transfer_timeout(I2C_TRANSFER_TIMEOUT)
        .scl(i2c_line(Port::B, 6))
        .sda(i2c_line(Port::B, 7))
        .irq(IrqConfig::new(IrqLine::Event, irq::I2C1_EV, irq::PRIO_HIGHEST))
        .irq(IrqConfig::new(IrqLine::Error, irq::I2C1_ER, irq::PRIO_HIGHEST))
        .build()
}

fn flexiport() -> Result<BusConfig, ConfigError> {
    I2cBusBuilder::new(2, 400_000)
        .duty(DutyCycle::Ratio2)
        .transfer_timeout(I2C_TRANSFER_TIMEOUT)
        .scl(i2c_line(Port::B, 10))
        .sda(i2c_line(Port::B, 11))
        .irq(IrqConfig::new(IrqLine::Event, irq::I2C2_EV, irq::PRIO_HIGHEST))
        .irq(IrqConfig::new(IrqLine::Error, irq::I2C2_ER, irq::PRIO_HIGHEST))
        .build()
}

/// The barometer only supports standard mode; run well below it.
fn pressure() -> Result<BusConfig, ConfigError> {
    I2cBusBuilder::new(3, 40_000)
        .duty(DutyCycle::Ratio2)
        .transfer_timeout(I2C_TRANSFER_TIMEOUT)
        .scl(i2c_line(Port::A, 8))
        .sda(i2c_line(Port::C, 9))
        .irq(IrqConfig::new(IrqLine::Event, irq::I2C3_EV, irq::PRIO_HIGHEST))
        .irq(IrqConfig::new(IrqLine::Error, irq::I2C3_ER, irq::PRIO_HIGHEST))
        .build()
}

fn gps() -> Result<BusConfig, ConfigError> {
    UsartBusBuilder::new(1, UsartTiming::n81(57_600))
        .tx(serial_line(Port::A, 9, AF_USART1_3))
        .rx(serial_line(Port::A, 10, AF_USART1_3))
        .irq(IrqConfig::new(IrqLine::Global, irq::USART1, irq::PRIO_MID))
        .build()
}

/// UART4 on PA0/PA1; PC10/PC11 belong to the flash bus.
fn aux() -> Result<BusConfig, ConfigError> {
    UsartBusBuilder::new(4, UsartTiming::n81(230_400))
        .tx(serial_line(Port::A, 0, AF_UART4_6))
        .rx(serial_line(Port::A, 1, AF_UART4_6))
        .irq(IrqConfig::new(IrqLine::Global, irq::UART4, irq::PRIO_HIGH))
        .build()
}

fn telemetry() -> Result<BusConfig, ConfigError> {
    UsartBusBuilder::new(6, UsartTiming::n81(57_600))
        .tx(serial_line(Port::C, 6, AF_UART4_6))
        .rx(serial_line(Port::C, 7, AF_UART4_6))
        .irq(IrqConfig::new(IrqLine::Global, irq::USART6, irq::PRIO_MID))
        .build()
}

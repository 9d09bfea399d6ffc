#![allow(dead_code)]

use bus_manager::config::{
    DmaConfig, DmaController, DmaDirection, DmaPair, DmaPriority, DmaStream,
    IrqConfig, IrqLine, OutputType, Pin, PinConfig, Port, Priority, Pull,
    Speed, SpiBusBuilder, SpiTiming, I2cBusBuilder, Vector,
};
use bus_manager::{
    BusConfig, BusDriver, BusFault, BusManager, DriverError, IrqOutcome,
    Segment, Target,
};
use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;

// ---------------------------------------------------------------------------
// Mock protocol engine
// ---------------------------------------------------------------------------

/// How the mock answers interrupts while a segment is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Complete,
    /// Never finishes; the waiter must time out.
    Hang,
    Fail(BusFault),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub target: Target,
    pub tx: Vec<u8>,
    pub rx_len: usize,
    pub last: bool,
}

#[derive(Debug, Default)]
pub struct MockEngine {
    pub fail_init: Option<DriverError>,
    pub init_calls: usize,
    pub mode: Mode,
    pub in_flight: bool,
    pub log: Vec<Record>,
    pub aborts: usize,
    /// Byte every received position is filled with.
    pub fill: u8,
}

impl MockEngine {
    pub fn failing(err: DriverError) -> Self {
        Self { fail_init: Some(err), ..Default::default() }
    }
}

impl BusDriver for MockEngine {
    fn init(&mut self, _config: &BusConfig) -> Result<(), DriverError> {
        self.init_calls += 1;
        match self.fail_init {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn start(&mut self, segment: &Segment<'_>) -> Result<(), DriverError> {
        if self.in_flight {
            return Err(DriverError::Busy);
        }
        self.in_flight = true;
        self.log.push(Record {
            target: segment.target,
            tx: segment.tx.to_vec(),
            rx_len: segment.rx_len,
            last: segment.last,
        });
        Ok(())
    }

    fn on_interrupt(&mut self, _line: IrqLine) -> IrqOutcome {
        if !self.in_flight {
            return IrqOutcome::Pending;
        }
        match self.mode {
            Mode::Complete => IrqOutcome::Complete,
            Mode::Hang => IrqOutcome::Pending,
            Mode::Fail(fault) => IrqOutcome::Failed(fault),
        }
    }

    fn finish(&mut self, rx: &mut [u8]) -> usize {
        self.in_flight = false;
        rx.fill(self.fill);
        rx.len()
    }

    fn abort(&mut self) {
        self.in_flight = false;
        self.aborts += 1;
    }
}

pub type MockBus = BusManager<CriticalSectionRawMutex, MockEngine>;

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

pub const PRIO: Priority = Priority::new(5, 0);

pub fn af(port: Port, index: u8, function: u8) -> PinConfig {
    PinConfig::alternate(
        Pin::new(port, index),
        function,
        Speed::Mhz50,
        OutputType::PushPull,
        Pull::Up,
    )
}

pub fn open_drain(port: Port, index: u8) -> PinConfig {
    PinConfig::alternate(
        Pin::new(port, index),
        4,
        Speed::Mhz50,
        OutputType::OpenDrain,
        Pull::None,
    )
}

pub fn dma_pair(
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
            DmaPriority::High,
        ),
        tx: DmaConfig::single(
            DmaStream::new(controller, tx),
            channel,
            DmaDirection::MemoryToPeripheral,
            DmaPriority::High,
        ),
    }
}

/// SPI1 with two chip selects on DMA2 streams 0/3.
pub fn spi1() -> BusConfig {
    SpiBusBuilder::new(1, SpiTiming::mode3(4))
        .sclk(af(Port::A, 5, 5))
        .miso(af(Port::A, 6, 5))
        .mosi(af(Port::A, 7, 5))
        .chip_select(0, PinConfig::output(Pin::new(Port::A, 4), Speed::Mhz50, Pull::Up))
        .chip_select(1, PinConfig::output(Pin::new(Port::C, 13), Speed::Mhz50, Pull::Up))
        .dma(dma_pair(DmaController::Dma2, 0, 3, 3))
        .irq(IrqConfig::new(IrqLine::DmaRx, Vector::new(56), PRIO))
        .irq(IrqConfig::new(IrqLine::DmaTx, Vector::new(59), PRIO))
        .build()
        .unwrap()
}

/// I2C `instance` with the given pins and event/error vectors.
pub fn i2c(
    instance: u8,
    scl: (Port, u8),
    sda: (Port, u8),
    vectors: (u8, u8),
    timeout: Duration,
) -> BusConfig {
    I2cBusBuilder::new(instance, 400_000)
        .transfer_timeout(timeout)
        .scl(open_drain(scl.0, scl.1))
        .sda(open_drain(sda.0, sda.1))
        .irq(IrqConfig::new(IrqLine::Event, Vector::new(vectors.0), PRIO))
        .irq(IrqConfig::new(IrqLine::Error, Vector::new(vectors.1), PRIO))
        .build()
        .unwrap()
}

pub fn i2c1() -> BusConfig {
    i2c(1, (Port::B, 6), (Port::B, 7), (31, 32), Duration::from_millis(20))
}

// ---------------------------------------------------------------------------
// Interrupt pump
// ---------------------------------------------------------------------------

/// Stands in for the hardware: keeps firing `line` for `bus` so segments
/// complete (or fail) as the engine's mode dictates. Never returns; race it
/// against the code under test with [`serviced`].
pub async fn pump(bus: &MockBus, line: IrqLine) {
    loop {
        yield_now().await;
        bus.on_interrupt(line);
    }
}

/// Drive `fut` to completion while `bus` interrupts keep firing.
pub async fn serviced<F: core::future::Future>(
    bus: &MockBus,
    line: IrqLine,
    fut: F,
) -> F::Output {
    match embassy_futures::select::select(fut, pump(bus, line)).await {
        embassy_futures::select::Either::First(out) => out,
        embassy_futures::select::Either::Second(()) => unreachable!(),
    }
}

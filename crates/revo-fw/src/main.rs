#![no_std]
#![no_main]

// This mod MUST go first, so that the others see its macros.
mod fmt;

mod board;
mod dma;
mod gpio;
mod i2c;
mod nvic;
mod rcc;
mod regs;
mod spi;
mod time_driver;
mod usart;

use bus_manager::DispatchTable;
use cortex_m_rt::exception;
use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Timer;
use heapless::Vec;
use revo_app::fault::{self, UNROUTED_VECTOR_CODE};
use revo_app::{
    AuxPort, BootError, BootFault, BusRegistry, ComTable, DataReadySignals,
    FaultIndicator, GpsPort, RegistryError, Sequencer, Slot, Stage,
    TelemetryPort,
};
use revo_bsp::{bus_config, data_ready_lines, irq, BusRole, ComRole, BUS_COUNT};
use static_cell::StaticCell;
use stm32f4::stm32f405::interrupt;

#[cfg(feature = "defmt")]
use defmt_rtt as _;
#[cfg(feature = "defmt")]
use panic_probe as _;
#[cfg(not(feature = "defmt"))]
use panic_reset as _;

use board::{
    DeviceBuses, Exti, I2cBus, RevoBoard, SerialBus, SpiBus, StatusLed,
};
use i2c::I2cEngine;
use spi::SpiEngine;
use usart::UsartEngine;

type Mutex = CriticalSectionRawMutex;
type Signals = DataReadySignals<Mutex, Exti>;

// Statics
static DISPATCH: DispatchTable<'static, Mutex, { irq::VECTOR_COUNT }> =
    DispatchTable::new();

static FLASH_BUS: StaticCell<SpiBus> = StaticCell::new();
static ACCEL_BUS: StaticCell<SpiBus> = StaticCell::new();
static GYRO_BUS: StaticCell<SpiBus> = StaticCell::new();
static MAG_BUS: StaticCell<I2cBus> = StaticCell::new();
static PRESSURE_BUS: StaticCell<I2cBus> = StaticCell::new();
static FLEXIPORT_BUS: StaticCell<I2cBus> = StaticCell::new();
static GPS_BUS: StaticCell<SerialBus> = StaticCell::new();
static AUX_BUS: StaticCell<SerialBus> = StaticCell::new();
static TELEM_BUS: StaticCell<SerialBus> = StaticCell::new();

static GPS_PORT: StaticCell<GpsPort<'static, Mutex, UsartEngine>> = StaticCell::new();
static AUX_PORT: StaticCell<AuxPort<'static, Mutex, UsartEngine>> = StaticCell::new();
static TELEM_PORT: StaticCell<TelemetryPort<'static, Mutex, UsartEngine>> =
    StaticCell::new();

static DATA_READY: StaticCell<Signals> = StaticCell::new();
static COM: StaticCell<ComTable<'static>> = StaticCell::new();

const HEARTBEAT_ON_MS: u64 = 100;
const HEARTBEAT_OFF_MS: u64 = 900;

// Every board vector goes through the dispatch table; one that fires
// without a registered service halts the board.
macro_rules! dispatched_vectors {
    ($($vector:ident),* $(,)?) => {
        $(
            #[interrupt]
            fn $vector() {
                fault::service_vector(&DISPATCH, irq::$vector, &mut StatusLed);
            }
        )*

        const _: () = assert!(
            [$(irq::$vector),*].len() == irq::ROUTED.len(),
            "a routed board vector has no handler",
        );
    };
}

dispatched_vectors!(
    EXTI4,
    DMA1_STREAM0,
    DMA1_STREAM3,
    DMA1_STREAM4,
    DMA1_STREAM5,
    EXTI9_5,
    I2C1_EV,
    I2C1_ER,
    I2C2_EV,
    I2C2_ER,
    USART1,
    UART4,
    DMA2_STREAM0,
    DMA2_STREAM3,
    USART6,
    I2C3_EV,
    I2C3_ER,
);

#[interrupt]
fn TIM2() {
    time_driver::on_interrupt();
}

#[exception]
unsafe fn DefaultHandler(irqn: i16) -> ! {
    error!("no handler for irq {}", irqn);
    fault::halt(UNROUTED_VECTOR_CODE, &mut StatusLed)
}

/// Everything the boot needs, placed in statics.
struct Wiring {
    registry: BusRegistry<'static>,
    devices: DeviceBuses,
    data_ready: &'static Signals,
    com: &'static ComTable<'static>,
}

/// Build the bus managers and endpoints of this build. Touches no
/// hardware; descriptors that fail to build end the boot before the
/// first stage.
fn wire() -> Result<Wiring, BootError> {
    let spi = |role| Ok::<_, BootError>(SpiBus::new(bus_config(role)?, SpiEngine::new()));
    let i2c = |role| Ok::<_, BootError>(I2cBus::new(bus_config(role)?, I2cEngine::new()));
    let serial =
        |role| Ok::<_, BootError>(SerialBus::new(bus_config(role)?, UsartEngine::new()));

    let devices = DeviceBuses {
        flash: FLASH_BUS.init(spi(BusRole::Flash)?),
        accel: ACCEL_BUS.init(spi(BusRole::Accel)?),
        gyro: GYRO_BUS.init(spi(BusRole::Gyro)?),
        mag: MAG_BUS.init(i2c(BusRole::Mag)?),
        pressure: PRESSURE_BUS.init(i2c(BusRole::Pressure)?),
    };

    let mut com = ComTable::new();
    let mut slots: Vec<Slot<'static>, BUS_COUNT> = Vec::new();
    for role in BusRole::ALL.into_iter().filter(|r| r.is_enabled()) {
        let slot = match role {
            BusRole::Flash => Slot::new(role, devices.flash),
            BusRole::Accel => Slot::new(role, devices.accel),
            BusRole::Gyro => Slot::new(role, devices.gyro),
            BusRole::Mag => Slot::new(role, devices.mag),
            BusRole::Pressure => Slot::new(role, devices.pressure),
            BusRole::Flexiport => Slot::new(role, &*FLEXIPORT_BUS.init(i2c(role)?)),
            BusRole::Gps => {
                let bus: &'static SerialBus = GPS_BUS.init(serial(role)?);
                let port = &*GPS_PORT.init(GpsPort::new(ComRole::Gps, bus));
                com.register(port);
                Slot::with_service(role, bus, port)
            }
            BusRole::Aux => {
                let bus: &'static SerialBus = AUX_BUS.init(serial(role)?);
                let port = &*AUX_PORT.init(AuxPort::new(ComRole::Aux, bus));
                com.register(port);
                Slot::with_service(role, bus, port)
            }
            BusRole::Telemetry => {
                let bus: &'static SerialBus = TELEM_BUS.init(serial(role)?);
                let port = &*TELEM_PORT.init(TelemetryPort::new(ComRole::Telemetry, bus));
                com.register(port);
                Slot::with_service(role, bus, port)
            }
        };
        slots.push(slot).map_err(|_| RegistryError::TooManyBuses)?;
    }

    Ok(Wiring {
        registry: BusRegistry::new(&slots)?,
        devices,
        data_ready: DATA_READY.init(DataReadySignals::new(Exti, data_ready_lines()?)),
        com: COM.init(com),
    })
}

// Application main entry point.
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let mut led = StatusLed::init();
    info!("revo-fw {}", env!("CARGO_PKG_VERSION"));

    let wiring = match wire() {
        Ok(wiring) => wiring,
        Err(error) => BootFault { stage: Stage::SystemClocks, error }.halt(&mut led),
    };

    let mut board = RevoBoard::new(wiring.devices);
    let sequencer = Sequencer::new(&wiring.registry, &DISPATCH, wiring.data_ready);
    let booted = match sequencer.run(&mut board).await {
        Ok(booted) => booted,
        Err(fault) => fault.halt(&mut led),
    };

    for role in &booted.report.disabled {
        info!("{:?} not in this build", role);
    }
    for (role, err) in &booted.report.missing {
        warn!("{:?} missing: {:?}", role, err);
    }
    if board.flash_id.is_some() {
        debug!("flash identified");
    }
    if board.baro_calibration.is_none() {
        warn!("no barometer calibration");
    }

    if let Ok(id) = wiring.com.get_com_endpoint(ComRole::Telemetry) {
        if let Some(telemetry) = wiring.com.endpoint(id) {
            let _ = telemetry.send(b"revo up\r\n");
        }
    }

    loop {
        led.set(true);
        Timer::after_millis(HEARTBEAT_ON_MS).await;
        led.set(false);
        Timer::after_millis(HEARTBEAT_OFF_MS).await;
    }
}

mod common;

use std::sync::Mutex as StdMutex;

use bus_manager::config::{IrqLine, Port, RegisterBlock, Vector};
use bus_manager::{
    BusHandle, DispatchError, DispatchTable, I2cBusDevice, IrqService,
    VectorService,
};
use embassy_futures::select::{select, Either};
use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Duration;
use embedded_hal_async::i2c::I2c;

use common::*;

type Table<'a> = DispatchTable<'a, CriticalSectionRawMutex, 82>;

/// Generic routine that records every (handle, line) it is invoked with.
#[derive(Default)]
struct Recorder {
    calls: StdMutex<Vec<(BusHandle, IrqLine)>>,
}

impl IrqService for Recorder {
    fn on_irq(&self, handle: BusHandle, line: IrqLine) {
        self.calls.lock().unwrap().push((handle, line));
    }
}

impl Recorder {
    fn calls(&self) -> Vec<(BusHandle, IrqLine)> {
        self.calls.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct VectorRecorder {
    fired: StdMutex<Vec<Vector>>,
}

impl VectorService for VectorRecorder {
    fn on_vector(&self, vector: Vector) {
        self.fired.lock().unwrap().push(vector);
    }
}

const MAG: BusHandle = BusHandle::for_block(RegisterBlock::I2c(1));
const BARO: BusHandle = BusHandle::for_block(RegisterBlock::I2c(3));

#[test]
fn vector_resolves_to_its_own_handle() {
    let i2c_class = Recorder::default();
    let table = Table::new();
    table
        .register_handler(Vector::new(31), MAG, IrqLine::Event, &i2c_class)
        .unwrap();
    table
        .register_handler(Vector::new(72), BARO, IrqLine::Event, &i2c_class)
        .unwrap();

    table.dispatch(Vector::new(72)).unwrap();
    table.dispatch(Vector::new(31)).unwrap();
    table.dispatch(Vector::new(72)).unwrap();

    assert_eq!(
        i2c_class.calls(),
        vec![
            (BARO, IrqLine::Event),
            (MAG, IrqLine::Event),
            (BARO, IrqLine::Event),
        ]
    );
}

#[test]
fn unregistered_vector_is_an_error() {
    let table = Table::new();
    assert_eq!(
        table.dispatch(Vector::new(40)),
        Err(DispatchError::Unregistered(Vector::new(40)))
    );
}

#[test]
fn registration_happens_once() {
    let service = Recorder::default();
    let table = Table::new();
    table
        .register_handler(Vector::new(31), MAG, IrqLine::Event, &service)
        .unwrap();

    assert_eq!(
        table.register_handler(Vector::new(31), BARO, IrqLine::Event, &service),
        Err(DispatchError::AlreadyRegistered(Vector::new(31)))
    );
    assert_eq!(table.registered(Vector::new(31)), Some(MAG));
}

#[test]
fn out_of_range_vector_is_rejected() {
    let service = Recorder::default();
    let table = Table::new();
    assert_eq!(
        table.register_handler(Vector::new(200), MAG, IrqLine::Event, &service),
        Err(DispatchError::OutOfRange(Vector::new(200)))
    );
    assert_eq!(
        table.dispatch(Vector::new(200)),
        Err(DispatchError::OutOfRange(Vector::new(200)))
    );
}

#[test]
fn register_bus_is_all_or_nothing() {
    let service = Recorder::default();
    let table = Table::new();
    // Claim the error vector of I2C1 up front.
    table
        .register_handler(Vector::new(32), BARO, IrqLine::Error, &service)
        .unwrap();

    let config = i2c1();
    assert_eq!(
        table.register_bus(&config, MAG, &service),
        Err(DispatchError::AlreadyRegistered(Vector::new(32)))
    );
    assert!(!table.is_registered(Vector::new(31)));
}

#[test]
fn register_bus_routes_every_line() {
    let service = Recorder::default();
    let table = Table::new();
    let config = i2c1();
    table.register_bus(&config, MAG, &service).unwrap();

    table.dispatch(Vector::new(32)).unwrap();
    table.dispatch(Vector::new(31)).unwrap();
    assert_eq!(
        service.calls(),
        vec![(MAG, IrqLine::Error), (MAG, IrqLine::Event)]
    );
}

#[test]
fn vector_routines_receive_their_vector() {
    let exti = VectorRecorder::default();
    let table = Table::new();
    table.register_vector(Vector::new(23), &exti).unwrap();

    table.dispatch(Vector::new(23)).unwrap();
    assert_eq!(*exti.fired.lock().unwrap(), vec![Vector::new(23)]);
    assert_eq!(table.registered(Vector::new(23)), None);
}

/// Platform interrupt entry for `vector`, firing repeatedly.
async fn fire(table: &Table<'_>, vector: u8) {
    loop {
        yield_now().await;
        table.dispatch(Vector::new(vector)).unwrap();
    }
}

#[futures_test::test]
async fn dispatched_interrupts_complete_transfers_on_the_right_bus() {
    let mag = MockBus::new(i2c1(), MockEngine::default());
    let baro = MockBus::new(
        i2c(3, (Port::A, 8), (Port::C, 9), (72, 73), Duration::from_millis(20)),
        MockEngine::default(),
    );
    let table = Table::new();
    let mag_handle = mag.init().unwrap();
    let baro_handle = baro.init().unwrap();
    table.register_bus(mag.config(), mag_handle, &mag).unwrap();
    table.register_bus(baro.config(), baro_handle, &baro).unwrap();

    let mut dev = I2cBusDevice::new(mag.bus().unwrap());
    match select(dev.write(0x1E, &[0x00, 0x18]), fire(&table, 31)).await {
        Either::First(result) => result.unwrap(),
        Either::Second(()) => unreachable!(),
    }

    assert_eq!(mag.with_driver(|d| d.log.len()), Ok(1));
    assert_eq!(baro.with_driver(|d| d.log.len()), Ok(0));
}

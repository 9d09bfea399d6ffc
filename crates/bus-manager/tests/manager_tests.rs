mod common;

use bus_manager::config::{BusClass, IrqLine, Port, RegisterBlock};
use bus_manager::{
    BusError, BusFault, BusHandle, DriverError, I2cBusDevice, ManagedBus,
    SpiBusDevice, Target, TransferError,
};
use embassy_futures::join::join;
use embassy_time::{Duration, Instant};
use embedded_hal_async::i2c::I2c;
use embedded_hal_async::spi::{Operation, SpiDevice};

use common::*;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[futures_test::test]
async fn init_returns_handle_of_register_block() {
    let mgr = MockBus::new(spi1(), MockEngine::default());

    let handle = mgr.init().unwrap();
    assert_eq!(handle, mgr.handle());
    assert_eq!(handle, BusHandle::for_block(mgr.config().block()));
    assert!(mgr.is_active());
}

#[test]
fn every_register_block_has_its_own_handle() {
    let usart1 = BusHandle::for_block(RegisterBlock::Usart(1));
    let usart17 = BusHandle::for_block(RegisterBlock::Usart(17));
    let i2c1 = BusHandle::for_block(RegisterBlock::I2c(1));

    assert_ne!(usart1, usart17);
    assert_ne!(usart1, i2c1);
    assert_eq!(usart17.class(), BusClass::Usart);
    assert_eq!(i2c1.class(), BusClass::I2c);
}

#[futures_test::test]
async fn init_is_one_shot() {
    let mgr = MockBus::new(spi1(), MockEngine::default());

    mgr.init().unwrap();
    assert_eq!(mgr.init(), Err(BusError::AlreadyInitialized));
    assert_eq!(mgr.with_driver(|d| d.init_calls), Ok(1));
}

#[futures_test::test]
async fn failed_init_is_sticky() {
    let mgr = MockBus::new(
        spi1(),
        MockEngine::failing(DriverError::DmaUnavailable),
    );

    assert_eq!(
        mgr.init(),
        Err(BusError::Init(DriverError::DmaUnavailable))
    );
    assert!(mgr.is_failed());
    assert_eq!(mgr.init(), Err(BusError::Failed));
    assert!(matches!(mgr.bus(), Err(BusError::Failed)));
}

#[futures_test::test]
async fn no_shared_access_before_init() {
    let mgr = MockBus::new(i2c1(), MockEngine::default());

    assert!(matches!(mgr.bus(), Err(BusError::NotInitialized)));
    assert_eq!(
        mgr.with_driver(|_| ()),
        Err(BusError::NotInitialized)
    );
}

#[futures_test::test]
async fn interrupts_on_idle_bus_are_ignored() {
    let mgr = MockBus::new(i2c1(), MockEngine::default());

    mgr.on_interrupt(IrqLine::Event);
    assert!(!mgr.is_active());
}

#[futures_test::test]
async fn managed_bus_view_forwards() {
    let mgr = MockBus::new(i2c1(), MockEngine::default());
    let view: &dyn ManagedBus = &mgr;

    assert!(!view.is_active());
    assert!(!view.is_failed());
    let handle = view.init().unwrap();
    assert_eq!(handle, view.handle());
    assert!(mgr.is_active());
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

#[futures_test::test]
async fn spi_transaction_marks_last_segment() {
    let mgr = MockBus::new(spi1(), MockEngine::default());
    mgr.init().unwrap();
    mgr.with_driver(|d| d.fill = 0x68).unwrap();

    let mut dev = SpiBusDevice::new(mgr.bus().unwrap(), 0);
    let mut who = [0u8; 1];
    serviced(&mgr, IrqLine::DmaRx, async {
        dev.transaction(&mut [
            Operation::Write(&[0xF5]),
            Operation::Read(&mut who),
            Operation::DelayNs(1_000),
        ])
        .await
    })
    .await
    .unwrap();

    assert_eq!(who, [0x68]);
    let log = mgr.with_driver(|d| d.log.clone()).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].target, Target::ChipSelect(0));
    assert_eq!(log[0].tx, vec![0xF5]);
    assert!(!log[0].last);
    assert_eq!(log[1].rx_len, 1);
    assert!(log[1].last);
}

#[futures_test::test]
async fn concurrent_transactions_do_not_interleave() {
    let mgr = MockBus::new(spi1(), MockEngine::default());
    mgr.init().unwrap();

    let mut a = SpiBusDevice::new(mgr.bus().unwrap(), 0);
    let mut b = SpiBusDevice::new(mgr.bus().unwrap(), 1);
    let (ra, rb) = serviced(&mgr, IrqLine::DmaRx, async {
        join(
            a.transaction(&mut [
                Operation::Write(&[1]),
                Operation::Write(&[2]),
            ]),
            b.transaction(&mut [
                Operation::Write(&[3]),
                Operation::Write(&[4]),
            ]),
        )
        .await
    })
    .await;
    ra.unwrap();
    rb.unwrap();

    let targets: Vec<Target> = mgr
        .with_driver(|d| d.log.iter().map(|r| r.target).collect())
        .unwrap();
    assert_eq!(targets.len(), 4);
    assert_eq!(targets[0], targets[1]);
    assert_eq!(targets[2], targets[3]);
    assert_ne!(targets[0], targets[2]);
}

#[futures_test::test]
async fn i2c_write_read_uses_address() {
    let mgr = MockBus::new(i2c1(), MockEngine::default());
    mgr.init().unwrap();
    mgr.with_driver(|d| d.fill = 0x48).unwrap();

    let mut dev = I2cBusDevice::new(mgr.bus().unwrap());
    let mut id = [0u8; 3];
    serviced(&mgr, IrqLine::Event, dev.write_read(0x1E, &[0x0A], &mut id))
        .await
        .unwrap();

    assert_eq!(id, [0x48; 3]);
    let log = mgr.with_driver(|d| d.log.clone()).unwrap();
    assert_eq!(log[0].target, Target::Address(0x1E));
    assert_eq!(log[1].rx_len, 3);
    assert!(log[1].last);
}

#[futures_test::test]
async fn bus_fault_is_reported_and_aborts() {
    let mgr = MockBus::new(i2c1(), MockEngine::default());
    mgr.init().unwrap();
    mgr.with_driver(|d| d.mode = Mode::Fail(BusFault::Nack)).unwrap();

    let mut dev = I2cBusDevice::new(mgr.bus().unwrap());
    let result =
        serviced(&mgr, IrqLine::Error, dev.write(0x77, &[0xD0])).await;

    assert_eq!(result, Err(TransferError::Fault(BusFault::Nack)));
    assert_eq!(mgr.with_driver(|d| d.aborts), Ok(1));
    assert!(!mgr.is_busy());
}

#[futures_test::test]
async fn timeout_releases_lock_once_and_bus_recovers() {
    let config =
        i2c(1, (Port::B, 6), (Port::B, 7), (31, 32), Duration::from_millis(10));
    let mgr = MockBus::new(config, MockEngine::default());
    mgr.init().unwrap();
    mgr.with_driver(|d| d.mode = Mode::Hang).unwrap();

    let mut dev = I2cBusDevice::new(mgr.bus().unwrap());
    let started = Instant::now();
    let result =
        serviced(&mgr, IrqLine::Event, dev.write(0x1E, &[0x02, 0x00])).await;

    assert_eq!(result, Err(TransferError::Timeout));
    assert!(started.elapsed() >= Duration::from_millis(10));
    assert_eq!(mgr.with_driver(|d| d.aborts), Ok(1));
    assert!(!mgr.is_busy());

    mgr.with_driver(|d| d.mode = Mode::Complete).unwrap();
    serviced(&mgr, IrqLine::Event, dev.write(0x1E, &[0x02, 0x00]))
        .await
        .unwrap();
    assert_eq!(mgr.with_driver(|d| d.log.len()), Ok(2));
}

#[futures_test::test]
async fn spi_has_no_timeout() {
    let mgr = MockBus::new(spi1(), MockEngine::default());
    assert_eq!(mgr.config().transfer_timeout(), None);
    assert_eq!(
        MockBus::new(i2c1(), MockEngine::default())
            .config()
            .transfer_timeout(),
        Some(Duration::from_millis(20))
    );
}

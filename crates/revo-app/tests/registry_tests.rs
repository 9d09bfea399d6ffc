mod common;

use bus_manager::config::{
    IrqConfig, IrqLine, OutputType, Pin, PinConfig, Port, Pull, Speed,
    UsartBusBuilder, UsartTiming,
};
use bus_manager::{
    BusError, BusHandle, ConfigError, DispatchError, DispatchTable,
    DriverError, Resource,
};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use revo_app::{
    AttachError, BusRegistry, DeviceError, DeviceState, DeviceTable,
    RegistryError, Slot,
};
use revo_bsp::{bus_config, irq, BusRole, DeviceRole};

use common::*;

type Table<'a> = DispatchTable<'a, CriticalSectionRawMutex, { irq::VECTOR_COUNT }>;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn duplicate_roles_are_rejected() {
    let a = ChipBus::new(bus_config(BusRole::Mag).unwrap(), ChipEngine::default());
    let b = ChipBus::new(bus_config(BusRole::Mag).unwrap(), ChipEngine::default());

    let result = BusRegistry::new(&[
        Slot::new(BusRole::Mag, &a),
        Slot::new(BusRole::Mag, &b),
    ]);
    assert!(matches!(result, Err(RegistryError::Duplicate(BusRole::Mag))));
}

#[test]
fn board_descriptor_set_validates() {
    let buses = board_buses();
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();

    assert_eq!(registry.validate(&[]), Ok(()));
}

#[test]
fn colliding_descriptor_is_caught_before_init() {
    let flash = ChipBus::new(bus_config(BusRole::Flash).unwrap(), ChipEngine::default());
    let aux_on_flash_pins = UsartBusBuilder::new(4, UsartTiming::n81(230_400))
        .tx(PinConfig::alternate(
            Pin::new(Port::C, 10),
            8,
            Speed::Mhz2,
            OutputType::PushPull,
            Pull::Up,
        ))
        .rx(PinConfig::alternate(
            Pin::new(Port::C, 11),
            8,
            Speed::Mhz2,
            OutputType::PushPull,
            Pull::Up,
        ))
        .irq(IrqConfig::new(IrqLine::Global, irq::UART4, irq::PRIO_HIGH))
        .build()
        .unwrap();
    let aux = ChipBus::new(aux_on_flash_pins, ChipEngine::default());
    let registry = BusRegistry::new(&[
        Slot::new(BusRole::Flash, &flash),
        Slot::new(BusRole::Aux, &aux),
    ])
    .unwrap();

    assert_eq!(
        registry.validate(&[]),
        Err(ConfigError::Collision {
            resource: Resource::Pin(Pin::new(Port::C, 10)),
            first: 0,
            second: 1,
        })
    );
    assert!(!registry.is_initialized(BusRole::Flash));
    assert!(!registry.is_initialized(BusRole::Aux));
}

#[test]
fn handle_is_available_only_after_init() {
    let buses = board_buses();
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();
    let table = Table::new();

    assert_eq!(
        registry.get_bus_handle(BusRole::Mag),
        Err(RegistryError::NotInitialized(BusRole::Mag))
    );

    let handle = registry.init(BusRole::Mag, &table).unwrap();
    let block = registry.config(BusRole::Mag).unwrap().block();
    assert_eq!(handle, BusHandle::for_block(block));
    assert_eq!(registry.get_bus_handle(BusRole::Mag), Ok(handle));
    assert!(registry.is_initialized(BusRole::Mag));
}

#[test]
fn init_is_one_shot_per_role() {
    let buses = board_buses();
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();
    let table = Table::new();

    registry.init(BusRole::Gyro, &table).unwrap();
    assert_eq!(
        registry.init(BusRole::Gyro, &table),
        Err(RegistryError::Bus(BusRole::Gyro, BusError::AlreadyInitialized))
    );
}

#[test]
fn undeclared_role_cannot_be_initialized() {
    let gyro = ChipBus::new(bus_config(BusRole::Gyro).unwrap(), ChipEngine::default());
    let registry = BusRegistry::new(&[Slot::new(BusRole::Gyro, &gyro)]).unwrap();
    let table = Table::new();

    assert_eq!(
        registry.init(BusRole::Accel, &table),
        Err(RegistryError::NotDeclared(BusRole::Accel))
    );
    assert_eq!(
        registry.get_bus_handle(BusRole::Accel),
        Err(RegistryError::NotInitialized(BusRole::Accel))
    );
}

#[test]
fn failed_bring_up_leaves_no_handle() {
    let buses = board_buses_with(|role| match role {
        BusRole::Pressure => ChipEngine::failing(DriverError::RegisterBlockState),
        _ => ChipEngine::default(),
    });
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();
    let table = Table::new();

    assert_eq!(
        registry.init(BusRole::Pressure, &table),
        Err(RegistryError::Bus(
            BusRole::Pressure,
            BusError::Init(DriverError::RegisterBlockState)
        ))
    );
    assert_eq!(
        registry.get_bus_handle(BusRole::Pressure),
        Err(RegistryError::NotInitialized(BusRole::Pressure))
    );
}

#[test]
fn retrying_a_failed_bus_reports_the_failure() {
    let buses = board_buses_with(|role| match role {
        BusRole::Pressure => ChipEngine::failing(DriverError::RegisterBlockState),
        _ => ChipEngine::default(),
    });
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();
    let table = Table::new();

    assert!(registry.init(BusRole::Pressure, &table).is_err());
    assert_eq!(
        registry.init(BusRole::Pressure, &table),
        Err(RegistryError::Bus(BusRole::Pressure, BusError::Failed))
    );
}

// ---------------------------------------------------------------------------
// Interrupt routing
// ---------------------------------------------------------------------------

#[test]
fn init_routes_every_vector_of_the_bus() {
    let buses = board_buses();
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();
    let table = Table::new();

    let handle = registry.init(BusRole::Accel, &table).unwrap();
    assert_eq!(table.registered(irq::DMA2_STREAM0), Some(handle));
    assert_eq!(table.registered(irq::DMA2_STREAM3), Some(handle));
    assert!(!table.is_registered(irq::DMA1_STREAM3));
}

#[test]
fn dispatch_reaches_exactly_the_registered_bus() {
    let buses = board_buses();
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();
    let table = Table::new();

    registry.init(BusRole::Mag, &table).unwrap();
    registry.init(BusRole::Pressure, &table).unwrap();

    assert_eq!(table.dispatch(irq::I2C1_ER), Ok(()));

    let mag = bus(&buses, BusRole::Mag);
    let pressure = bus(&buses, BusRole::Pressure);
    assert_eq!(mag.with_driver(|d| d.irqs.clone()), Ok(vec![IrqLine::Error]));
    assert_eq!(pressure.with_driver(|d| d.irqs.len()), Ok(0));
}

#[test]
fn unrouted_vector_is_reported() {
    let table = Table::new();

    assert_eq!(
        table.dispatch(irq::USART6),
        Err(DispatchError::Unregistered(irq::USART6))
    );
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

#[test]
fn mag_and_pressure_get_distinct_handles_and_no_cross_attach() {
    let buses = board_buses();
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();
    let table = Table::new();
    let mut devices = DeviceTable::new();

    let mag = registry.init(BusRole::Mag, &table).unwrap();
    let pressure = registry.init(BusRole::Pressure, &table).unwrap();
    assert_ne!(mag, pressure);

    let err = devices.attach(&registry, DeviceRole::Baro, mag).unwrap_err();
    assert_eq!(
        err,
        AttachError::WrongBus { device: DeviceRole::Baro, handle: mag }
    );
    assert!(err.is_configuration());
    assert_eq!(devices.state(DeviceRole::Baro), None);

    let baro = devices.attach(&registry, DeviceRole::Baro, pressure).unwrap();
    assert_eq!(baro.bus, pressure);
}

#[test]
fn attach_to_a_bus_that_is_not_live_fails() {
    let buses = board_buses_with(|role| match role {
        BusRole::Gyro => ChipEngine::failing(DriverError::DmaUnavailable),
        _ => ChipEngine::default(),
    });
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();
    let table = Table::new();
    let mut devices = DeviceTable::new();

    // Declared, never initialized.
    let accel = bus(&buses, BusRole::Accel).handle();
    let err = devices.attach(&registry, DeviceRole::Accel, accel).unwrap_err();
    assert_eq!(err, AttachError::NotLive(accel));
    assert!(err.is_configuration());

    // Initialization failed.
    assert!(registry.init(BusRole::Gyro, &table).is_err());
    let gyro = bus(&buses, BusRole::Gyro).handle();
    assert_eq!(
        devices.attach(&registry, DeviceRole::Gyro, gyro),
        Err(AttachError::NotLive(gyro))
    );
}

#[test]
fn double_attach_keeps_the_first() {
    let buses = board_buses();
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();
    let table = Table::new();
    let mut devices = DeviceTable::new();

    let mag = registry.init(BusRole::Mag, &table).unwrap();
    let pressure = registry.init(BusRole::Pressure, &table).unwrap();
    let first = devices.attach(&registry, DeviceRole::Mag, mag).unwrap();

    assert_eq!(
        devices.attach(&registry, DeviceRole::Mag, mag),
        Err(AttachError::AlreadyAttached(DeviceRole::Mag))
    );
    assert_eq!(
        devices.attach(&registry, DeviceRole::Mag, pressure),
        Err(AttachError::AlreadyAttached(DeviceRole::Mag))
    );
    assert_eq!(devices.state(DeviceRole::Mag), Some(DeviceState::Attached));
    assert_eq!(first.bus, mag);
}

#[futures_test::test]
async fn initialize_requires_attachment_and_runs_once() {
    let buses = board_buses();
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();
    let table = Table::new();
    let mut devices = DeviceTable::new();

    assert_eq!(
        devices.initialize(DeviceRole::Gyro, |_| async { Ok(()) }).await,
        Err(DeviceError::NotAttached(DeviceRole::Gyro))
    );

    let gyro = registry.init(BusRole::Gyro, &table).unwrap();
    devices.attach(&registry, DeviceRole::Gyro, gyro).unwrap();
    assert_eq!(
        devices.get_device_handle(DeviceRole::Gyro),
        Err(AttachError::NotAttached(DeviceRole::Gyro))
    );

    let handle = devices
        .initialize(DeviceRole::Gyro, |_| async { Ok(()) })
        .await
        .unwrap();
    assert_eq!(handle.bus, gyro);
    assert_eq!(devices.get_device_handle(DeviceRole::Gyro), Ok(handle));
    assert_eq!(
        devices.initialize(DeviceRole::Gyro, |_| async { Ok(()) }).await,
        Err(DeviceError::AlreadyInitialized(DeviceRole::Gyro))
    );
}

#[futures_test::test]
async fn identity_failure_is_recorded() {
    let buses = board_buses();
    let slots = slots(&buses);
    let registry = BusRegistry::new(&slots).unwrap();
    let table = Table::new();
    let mut devices = DeviceTable::new();

    let accel = registry.init(BusRole::Accel, &table).unwrap();
    devices.attach(&registry, DeviceRole::Accel, accel).unwrap();

    let mismatch = DeviceError::Mismatch { expected: 0x03, found: 0x00 };
    assert_eq!(
        devices
            .initialize(DeviceRole::Accel, |_| async move { Err(mismatch) })
            .await,
        Err(mismatch)
    );
    assert!(mismatch.is_identity());
    assert_eq!(
        devices.state(DeviceRole::Accel),
        Some(DeviceState::Failed(mismatch))
    );
    assert_eq!(
        devices.get_device_handle(DeviceRole::Accel),
        Err(AttachError::NotAttached(DeviceRole::Accel))
    );
}

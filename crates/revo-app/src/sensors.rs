//! Bring-up of the on-board devices over their managed buses, with the
//! register settings of this board.
//!
//! A [`Board`](crate::board::Board) implementation calls these from
//! `bring_up_device` with the bus the device handle names.

use bus_manager::{BusDriver, BusManager, I2cBusDevice, SharedBus, SpiBusDevice};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Delay;
use revo_bsp::{DeviceRole, BMA180_CONFIG, HMC5883_CONFIG, MPU6000_CONFIG};
use revo_sensors::bmp085::Calibration;
use revo_sensors::w25x::JedecId;
use revo_sensors::{Bma180, Bmp085, Hmc5883, Mpu6000, W25x};

use crate::devices::DeviceHandle;
use crate::error::DeviceError;

fn spi_device<'a, M: RawMutex, D: BusDriver>(
    device: DeviceHandle,
    bus: &'a BusManager<M, D>,
) -> Result<SpiBusDevice<'a, M, D>, DeviceError> {
    let shared = checked(device, bus)?;
    let cs = device.role.chip_select().unwrap_or_default();
    Ok(SpiBusDevice::new(shared, cs))
}

fn i2c_device<'a, M: RawMutex, D: BusDriver>(
    device: DeviceHandle,
    bus: &'a BusManager<M, D>,
) -> Result<I2cBusDevice<'a, M, D>, DeviceError> {
    Ok(I2cBusDevice::new(checked(device, bus)?))
}

fn checked<'a, M: RawMutex, D: BusDriver>(
    device: DeviceHandle,
    bus: &'a BusManager<M, D>,
) -> Result<SharedBus<'a, M, D>, DeviceError> {
    if device.bus != bus.handle() {
        return Err(DeviceError::NotAttached(device.role));
    }
    Ok(bus.bus()?)
}

/// Read the flash JEDEC id; only Winbond parts are accepted.
pub async fn bring_up_flash<M: RawMutex, D: BusDriver>(
    device: DeviceHandle,
    bus: &BusManager<M, D>,
) -> Result<JedecId, DeviceError> {
    let id = W25x::new(spi_device(device, bus)?).init().await?;
    info!("flash: {} bytes", id.size_bytes());
    Ok(id)
}

pub async fn bring_up_gyro<M: RawMutex, D: BusDriver>(
    device: DeviceHandle,
    bus: &BusManager<M, D>,
) -> Result<(), DeviceError> {
    let mut gyro = Mpu6000::new(spi_device(device, bus)?, Delay);
    gyro.init(&MPU6000_CONFIG).await?;
    Ok(())
}

pub async fn bring_up_accel<M: RawMutex, D: BusDriver>(
    device: DeviceHandle,
    bus: &BusManager<M, D>,
) -> Result<(), DeviceError> {
    let mut accel = Bma180::new(spi_device(device, bus)?, Delay);
    accel.init(&BMA180_CONFIG).await?;
    Ok(())
}

pub async fn bring_up_mag<M: RawMutex, D: BusDriver>(
    device: DeviceHandle,
    bus: &BusManager<M, D>,
) -> Result<(), DeviceError> {
    let mut mag = Hmc5883::new(i2c_device(device, bus)?);
    mag.init(&HMC5883_CONFIG).await?;
    Ok(())
}

/// Identify the barometer and return its factory calibration.
pub async fn bring_up_baro<M: RawMutex, D: BusDriver>(
    device: DeviceHandle,
    bus: &BusManager<M, D>,
) -> Result<Calibration, DeviceError> {
    let mut baro = Bmp085::new(i2c_device(device, bus)?);
    let calibration = baro.init().await?;
    Ok(calibration)
}

/// Bring up whichever device `device` names. For boards that keep all
/// their buses on one engine type.
pub async fn bring_up<M: RawMutex, D: BusDriver>(
    device: DeviceHandle,
    bus: &BusManager<M, D>,
) -> Result<(), DeviceError> {
    match device.role {
        DeviceRole::Flash => bring_up_flash(device, bus).await.map(|_| ()),
        DeviceRole::Gyro => bring_up_gyro(device, bus).await,
        DeviceRole::Accel => bring_up_accel(device, bus).await,
        DeviceRole::Mag => bring_up_mag(device, bus).await,
        DeviceRole::Baro => bring_up_baro(device, bus).await.map(|_| ()),
    }
}

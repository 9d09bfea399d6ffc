//! The Revolution board behind the bring-up sequence: clock tree, time
//! base, data-ready lines and per-device bring-up over the live buses.

use bus_manager::config::{DataReady, Edge, PinConfig, Priority};
use bus_manager::BusManager;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use revo_app::{
    sensors, Board, BoardError, DeviceError, DeviceHandle, ExtiPending,
    FaultIndicator,
};
use revo_bsp::{BusRole, DeviceRole, STATUS_LED};
use revo_sensors::bmp085::Calibration;
use revo_sensors::w25x::JedecId;

use crate::i2c::I2cEngine;
use crate::regs::{self, Reg};
use crate::spi::SpiEngine;
use crate::usart::UsartEngine;
use crate::{gpio, nvic, rcc, time_driver};

pub type SpiBus = BusManager<CriticalSectionRawMutex, SpiEngine>;
pub type I2cBus = BusManager<CriticalSectionRawMutex, I2cEngine>;
pub type SerialBus = BusManager<CriticalSectionRawMutex, UsartEngine>;

const EXTI_IMR: Reg = Reg::at(regs::EXTI, 0x00);
const EXTI_RTSR: Reg = Reg::at(regs::EXTI, 0x08);
const EXTI_FTSR: Reg = Reg::at(regs::EXTI, 0x0C);
const EXTI_PR: Reg = Reg::at(regs::EXTI, 0x14);

/// Pending register of the external interrupt controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exti;

impl ExtiPending for Exti {
    fn take_pending(&self, line: u8) -> bool {
        let bit = 1 << line;
        if !EXTI_PR.is_set(bit) {
            return false;
        }
        // Write one to clear.
        EXTI_PR.write(bit);
        true
    }
}

/// Heartbeat LED. Stateless, so interrupt handlers can halt on it too.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusLed;

impl StatusLed {
    pub fn init() -> Self {
        gpio::set_high(STATUS_LED.pin);
        gpio::configure(&STATUS_LED);
        Self
    }
}

impl FaultIndicator for StatusLed {
    fn set(&mut self, on: bool) {
        if on {
            gpio::set_low(STATUS_LED.pin);
        } else {
            gpio::set_high(STATUS_LED.pin);
        }
    }

    fn pause(&mut self, ms: u32) {
        cortex_m::asm::delay(ms.saturating_mul(rcc::SYSCLK_HZ / 1_000));
    }
}

/// Sensor and storage buses, by device.
pub struct DeviceBuses {
    pub flash: &'static SpiBus,
    pub accel: &'static SpiBus,
    pub gyro: &'static SpiBus,
    pub mag: &'static I2cBus,
    pub pressure: &'static I2cBus,
}

pub struct RevoBoard {
    buses: DeviceBuses,
    pub flash_id: Option<JedecId>,
    pub baro_calibration: Option<Calibration>,
}

impl RevoBoard {
    pub fn new(buses: DeviceBuses) -> Self {
        Self { buses, flash_id: None, baro_calibration: None }
    }

    fn spi(&self, device: DeviceHandle) -> Result<&'static SpiBus, DeviceError> {
        match device.role.bus_role() {
            BusRole::Flash => Ok(self.buses.flash),
            BusRole::Accel => Ok(self.buses.accel),
            BusRole::Gyro => Ok(self.buses.gyro),
            _ => Err(DeviceError::NotAttached(device.role)),
        }
    }

    fn i2c(&self, device: DeviceHandle) -> Result<&'static I2cBus, DeviceError> {
        match device.role.bus_role() {
            BusRole::Mag => Ok(self.buses.mag),
            BusRole::Pressure => Ok(self.buses.pressure),
            _ => Err(DeviceError::NotAttached(device.role)),
        }
    }
}

impl Board for RevoBoard {
    async fn init_clocks(&mut self) -> Result<(), BoardError> {
        nvic::init_grouping();
        rcc::init().map_err(|err| {
            error!("clock tree: {:?}", err);
            BoardError::NoResponse
        })
    }

    async fn init_delay(&mut self) -> Result<(), BoardError> {
        time_driver::init();
        Ok(())
    }

    async fn init_debug_pins(&mut self, pins: &[PinConfig]) -> Result<(), BoardError> {
        for pin in pins {
            gpio::set_low(pin.pin);
            gpio::configure(pin);
        }
        Ok(())
    }

    async fn mount_filesystem(&mut self, store: DeviceHandle) -> Result<(), BoardError> {
        info!("filesystem on {:?}", store);
        Ok(())
    }

    async fn init_object_system(&mut self) -> Result<(), BoardError> {
        debug!("object system: nothing to start");
        Ok(())
    }

    async fn init_alarms(&mut self) -> Result<(), BoardError> {
        debug!("alarms: nothing to start");
        Ok(())
    }

    async fn init_task_monitor(&mut self) -> Result<(), BoardError> {
        debug!("task monitor: nothing to start");
        Ok(())
    }

    async fn init_iap(&mut self) -> Result<(), BoardError> {
        debug!("iap: nothing to start");
        Ok(())
    }

    async fn bring_up_device(&mut self, device: DeviceHandle) -> Result<(), DeviceError> {
        match device.role {
            DeviceRole::Flash => {
                let id = sensors::bring_up_flash(device, self.spi(device)?).await?;
                self.flash_id = Some(id);
                Ok(())
            }
            DeviceRole::Gyro => sensors::bring_up_gyro(device, self.spi(device)?).await,
            DeviceRole::Accel => {
                sensors::bring_up_accel(device, self.spi(device)?).await
            }
            DeviceRole::Mag => sensors::bring_up_mag(device, self.i2c(device)?).await,
            DeviceRole::Baro => {
                let calibration =
                    sensors::bring_up_baro(device, self.i2c(device)?).await?;
                self.baro_calibration = Some(calibration);
                Ok(())
            }
        }
    }

    async fn init_data_ready(
        &mut self,
        role: DeviceRole,
        line: &DataReady,
        priority: Priority,
    ) -> Result<(), BoardError> {
        debug!("{:?} data ready on line {}", role, line.line());
        rcc::enable_syscfg();
        gpio::configure(line.pin());

        let n = usize::from(line.line());
        let bit = 1u32 << n;
        let port = rcc::port_index(line.pin().pin.port) as u32;
        let shift = (n % 4) * 4;
        Reg::at(regs::SYSCFG, 0x08 + 4 * (n / 4))
            .modify(|v| (v & !(0xF << shift)) | (port << shift));

        let (rising, falling) = match line.edge() {
            Edge::Rising => (true, false),
            Edge::Falling => (false, true),
            Edge::Both => (true, true),
        };
        if rising {
            EXTI_RTSR.set(bit);
        } else {
            EXTI_RTSR.clear(bit);
        }
        if falling {
            EXTI_FTSR.set(bit);
        } else {
            EXTI_FTSR.clear(bit);
        }

        EXTI_PR.write(bit);
        EXTI_IMR.set(bit);
        nvic::enable(line.vector(), priority);
        Ok(())
    }
}

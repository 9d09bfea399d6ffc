//! InvenSense MPU-6000 six-axis gyro/accelerometer, SPI interface.

use bitflags::bitflags;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::{Operation, SpiDevice};

use crate::error::{check_identity, Error};

const READ: u8 = 0x80;
const WHO_AM_I_VALUE: u8 = 0x68;
/// Reset takes up to 100 ms; poll this many times, 10 ms apart.
const RESET_POLLS: u8 = 15;
const RESET_POLL_MS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    SmplrtDiv = 0x19,
    Config = 0x1A,
    GyroConfig = 0x1B,
    AccelConfig = 0x1C,
    FifoEn = 0x23,
    IntPinCfg = 0x37,
    IntEnable = 0x38,
    IntStatus = 0x3A,
    UserCtrl = 0x6A,
    PwrMgmt1 = 0x6B,
    FifoCountH = 0x72,
    WhoAmI = 0x75,
}

bitflags! {
    /// FIFO_EN: sensor outputs written to the FIFO.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct FifoSources: u8 {
        const TEMP   = 0b1000_0000;
        const GYRO_X = 0b0100_0000;
        const GYRO_Y = 0b0010_0000;
        const GYRO_Z = 0b0001_0000;
        const ACCEL  = 0b0000_1000;
    }
}

bitflags! {
    /// INT_PIN_CFG
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct IntPinCfg: u8 {
        /// Interrupt pin active low.
        const ACTIVE_LOW   = 0b1000_0000;
        const OPEN_DRAIN   = 0b0100_0000;
        /// Hold the pin until cleared instead of a 50 us pulse.
        const LATCH        = 0b0010_0000;
        /// Any register read clears the interrupt status.
        const CLEAR_ANY_RD = 0b0001_0000;
    }
}

bitflags! {
    /// INT_ENABLE
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct IntEnable: u8 {
        const FIFO_OFLOW = 0b0001_0000;
        const DATA_RDY   = 0b0000_0001;
    }
}

bitflags! {
    /// USER_CTRL
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct UserCtrl: u8 {
        const FIFO_EN    = 0b0100_0000;
        /// Disable the I2C slave interface; required in SPI mode.
        const I2C_IF_DIS = 0b0001_0000;
        const FIFO_RESET = 0b0000_0100;
    }
}

bitflags! {
    /// PWR_MGMT_1 flag bits; the clock source lives in the low three bits.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct PwrMgmt: u8 {
        const DEVICE_RESET = 0b1000_0000;
        const SLEEP        = 0b0100_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ClockSource {
    Internal = 0,
    PllGyroX = 1,
    PllGyroY = 2,
    PllGyroZ = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum GyroRange {
    Dps250 = 0x00,
    Dps500 = 0x08,
    Dps1000 = 0x10,
    Dps2000 = 0x18,
}

/// Digital low-pass filter (DLPF_CFG); also selects the 8 kHz (256 Hz
/// setting) or 1 kHz internal sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LowPass {
    Hz256 = 0,
    Hz188 = 1,
    Hz98 = 2,
    Hz42 = 3,
    Hz20 = 4,
    Hz10 = 5,
    Hz5 = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub clock: ClockSource,
    pub user_ctrl: UserCtrl,
    /// Output rate = internal rate / (1 + divider).
    pub sample_divider: u8,
    pub filter: LowPass,
    pub gyro_range: GyroRange,
    pub fifo: FifoSources,
    pub int_pin: IntPinCfg,
    pub int_enable: IntEnable,
}

pub struct Mpu6000<SPI, D> {
    spi: SPI,
    delay: D,
}

impl<E, SPI, D> Mpu6000<SPI, D>
where
    SPI: SpiDevice<Error = E>,
    D: DelayNs,
{
    pub fn new(spi: SPI, delay: D) -> Self {
        Self { spi, delay }
    }

    pub async fn read_register(&mut self, reg: Register) -> Result<u8, Error<E>> {
        let mut value = [0u8];
        self.spi
            .transaction(&mut [
                Operation::Write(&[reg as u8 | READ]),
                Operation::Read(&mut value),
            ])
            .await?;
        Ok(value[0])
    }

    pub async fn write_register(
        &mut self,
        reg: Register,
        value: u8,
    ) -> Result<(), Error<E>> {
        self.spi.write(&[reg as u8, value]).await?;
        Ok(())
    }

    /// Read WHO_AM_I and compare it with the MPU-6000 identity.
    pub async fn probe(&mut self) -> Result<(), Error<E>> {
        let id = self.read_register(Register::WhoAmI).await?;
        check_identity(&[WHO_AM_I_VALUE], &[id])
    }

    /// Identify, reset and program the device.
    pub async fn init(&mut self, config: &Config) -> Result<(), Error<E>> {
        self.probe().await?;
        self.reset().await?;

        self.write_register(Register::PwrMgmt1, config.clock as u8).await?;
        self.write_register(
            Register::UserCtrl,
            (config.user_ctrl | UserCtrl::I2C_IF_DIS).bits(),
        )
        .await?;
        self.write_register(Register::SmplrtDiv, config.sample_divider)
            .await?;
        self.write_register(Register::Config, config.filter as u8).await?;
        self.write_register(Register::GyroConfig, config.gyro_range as u8)
            .await?;
        self.write_register(Register::FifoEn, config.fifo.bits()).await?;
        self.write_register(Register::IntPinCfg, config.int_pin.bits())
            .await?;
        self.write_register(Register::IntEnable, config.int_enable.bits())
            .await
    }

    async fn reset(&mut self) -> Result<(), Error<E>> {
        self.write_register(Register::PwrMgmt1, PwrMgmt::DEVICE_RESET.bits())
            .await?;
        for _ in 0..RESET_POLLS {
            self.delay.delay_ms(RESET_POLL_MS).await;
            let pwr = PwrMgmt::from_bits_retain(
                self.read_register(Register::PwrMgmt1).await?,
            );
            if !pwr.contains(PwrMgmt::DEVICE_RESET) {
                return Ok(());
            }
        }
        Err(Error::ResetTimeout)
    }

    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }
}

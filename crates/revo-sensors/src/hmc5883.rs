//! Honeywell HMC5883L three-axis magnetometer, I2C interface.

use embedded_hal::i2c;
use embedded_hal_async::i2c::I2c;

use crate::error::{absent_on_nack, check_identity, Error};

pub const ADDRESS: u8 = 0x1E;
const IDENTITY: [u8; 3] = *b"H43";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    ConfigA = 0x00,
    ConfigB = 0x01,
    Mode = 0x02,
    DataXMsb = 0x03,
    Status = 0x09,
    IdA = 0x0A,
}

/// Output data rate, CRA bits 4:2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputRate {
    Hz0_75 = 0x00,
    Hz1_5 = 0x04,
    Hz3 = 0x08,
    Hz7_5 = 0x0C,
    Hz15 = 0x10,
    Hz30 = 0x14,
    Hz75 = 0x18,
}

/// Measurement configuration, CRA bits 1:0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Measurement {
    Normal = 0x00,
    PositiveBias = 0x01,
    NegativeBias = 0x02,
}

/// Gain, CRB bits 7:5, named by full-scale range in gauss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Gain {
    Ga0_88 = 0x00,
    Ga1_3 = 0x20,
    Ga1_9 = 0x40,
    Ga2_5 = 0x60,
    Ga4_0 = 0x80,
    Ga4_7 = 0xA0,
    Ga5_6 = 0xC0,
    Ga8_1 = 0xE0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    Continuous = 0x00,
    Single = 0x01,
    Idle = 0x03,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub rate: OutputRate,
    pub measurement: Measurement,
    pub gain: Gain,
    pub mode: Mode,
}

pub struct Hmc5883<I2C> {
    i2c: I2C,
}

impl<E, I2C> Hmc5883<I2C>
where
    E: i2c::Error,
    I2C: I2c<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    pub async fn write_register(
        &mut self,
        reg: Register,
        value: u8,
    ) -> Result<(), Error<E>> {
        self.i2c.write(ADDRESS, &[reg as u8, value]).await?;
        Ok(())
    }

    /// Read the three identification registers and expect `"H43"`.
    pub async fn probe(&mut self) -> Result<(), Error<E>> {
        let mut id = [0u8; 3];
        self.i2c
            .write_read(ADDRESS, &[Register::IdA as u8], &mut id)
            .await
            .map_err(absent_on_nack)?;
        check_identity(&IDENTITY, &id)
    }

    pub async fn init(&mut self, config: &Config) -> Result<(), Error<E>> {
        self.probe().await?;
        self.write_register(
            Register::ConfigA,
            config.rate as u8 | config.measurement as u8,
        )
        .await?;
        self.write_register(Register::ConfigB, config.gain as u8).await?;
        self.write_register(Register::Mode, config.mode as u8).await
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

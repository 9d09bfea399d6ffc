//! Bosch BMP085 barometric pressure sensor, I2C interface.

use embedded_hal::i2c;
use embedded_hal_async::i2c::I2c;

use crate::error::{absent_on_nack, check_identity, Error};

pub const ADDRESS: u8 = 0x77;
const CHIP_ID_REG: u8 = 0xD0;
const CHIP_ID_VALUE: u8 = 0x55;
const CALIBRATION_REG: u8 = 0xAA;

/// Factory calibration coefficients (EEPROM 0xAA..0xBF).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

impl Calibration {
    fn from_bytes(raw: &[u8; 22]) -> Self {
        let word = |i: usize| u16::from_be_bytes([raw[2 * i], raw[2 * i + 1]]);
        Self {
            ac1: word(0) as i16,
            ac2: word(1) as i16,
            ac3: word(2) as i16,
            ac4: word(3),
            ac5: word(4),
            ac6: word(5),
            b1: word(6) as i16,
            b2: word(7) as i16,
            mb: word(8) as i16,
            mc: word(9) as i16,
            md: word(10) as i16,
        }
    }

    /// An erased word reads 0x0000 or 0xFFFF.
    fn is_valid(raw: &[u8; 22]) -> bool {
        raw.chunks_exact(2)
            .all(|w| !matches!((w[0], w[1]), (0x00, 0x00) | (0xFF, 0xFF)))
    }
}

pub struct Bmp085<I2C> {
    i2c: I2C,
    calibration: Option<Calibration>,
}

impl<E, I2C> Bmp085<I2C>
where
    E: i2c::Error,
    I2C: I2c<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c, calibration: None }
    }

    pub async fn probe(&mut self) -> Result<(), Error<E>> {
        let mut id = [0u8];
        self.i2c
            .write_read(ADDRESS, &[CHIP_ID_REG], &mut id)
            .await
            .map_err(absent_on_nack)?;
        check_identity(&[CHIP_ID_VALUE], &id)
    }

    /// Identify the sensor and load its calibration coefficients.
    pub async fn init(&mut self) -> Result<Calibration, Error<E>> {
        self.probe().await?;
        let mut raw = [0u8; 22];
        self.i2c
            .write_read(ADDRESS, &[CALIBRATION_REG], &mut raw)
            .await?;
        if !Calibration::is_valid(&raw) {
            return Err(Error::BadCalibration);
        }
        let calibration = Calibration::from_bytes(&raw);
        self.calibration = Some(calibration);
        Ok(calibration)
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

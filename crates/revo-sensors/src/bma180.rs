//! Bosch BMA180 three-axis accelerometer, SPI interface.
//!
//! Range and bandwidth live in EEPROM-backed image registers, writable only
//! while `ee_w` is set in CTRL_REG0.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::{Operation, SpiDevice};

use crate::error::{check_identity, Error};

const READ: u8 = 0x80;
const CHIP_ID_VALUE: u8 = 0x03;
const SOFT_RESET: u8 = 0xB6;
/// Wake-up after soft reset.
const RESET_US: u32 = 1_500;

const EE_W: u8 = 0b0001_0000;
const NEW_DATA_INT: u8 = 0b0000_0010;
const RANGE_MASK: u8 = 0b0000_1110;
const RANGE_SHIFT: u8 = 1;
const BW_MASK: u8 = 0b1111_0000;
const BW_SHIFT: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    ChipId = 0x00,
    AccXLsb = 0x02,
    CtrlReg0 = 0x0D,
    Reset = 0x10,
    BwTcs = 0x20,
    CtrlReg3 = 0x21,
    OffsetLsb1 = 0x35,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Range {
    G1 = 0,
    G1_5 = 1,
    G2 = 2,
    G3 = 3,
    G4 = 4,
    G8 = 5,
    G16 = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Bandwidth {
    Hz10 = 0,
    Hz20 = 1,
    Hz40 = 2,
    Hz75 = 3,
    Hz150 = 4,
    Hz300 = 5,
    Hz600 = 6,
    Hz1200 = 7,
    HighPass = 8,
    BandPass = 9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub range: Range,
    pub bandwidth: Bandwidth,
    /// Raise the interrupt pin on every new sample.
    pub data_ready: bool,
}

pub struct Bma180<SPI, D> {
    spi: SPI,
    delay: D,
}

impl<E, SPI, D> Bma180<SPI, D>
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

    async fn modify(
        &mut self,
        reg: Register,
        mask: u8,
        bits: u8,
    ) -> Result<(), Error<E>> {
        let value = self.read_register(reg).await?;
        self.write_register(reg, (value & !mask) | (bits & mask)).await
    }

    pub async fn probe(&mut self) -> Result<(), Error<E>> {
        let id = self.read_register(Register::ChipId).await?;
        check_identity(&[CHIP_ID_VALUE], &[id])
    }

    /// Identify, soft-reset and program range, bandwidth and the
    /// data-ready interrupt.
    pub async fn init(&mut self, config: &Config) -> Result<(), Error<E>> {
        self.probe().await?;
        self.write_register(Register::Reset, SOFT_RESET).await?;
        self.delay.delay_us(RESET_US).await;

        self.modify(Register::CtrlReg0, EE_W, EE_W).await?;
        self.modify(
            Register::OffsetLsb1,
            RANGE_MASK,
            (config.range as u8) << RANGE_SHIFT,
        )
        .await?;
        self.modify(Register::BwTcs, BW_MASK, (config.bandwidth as u8) << BW_SHIFT)
            .await?;
        let int = if config.data_ready { NEW_DATA_INT } else { 0 };
        self.modify(Register::CtrlReg3, NEW_DATA_INT, int).await?;
        self.modify(Register::CtrlReg0, EE_W, 0).await
    }

    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }
}

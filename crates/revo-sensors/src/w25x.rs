//! Winbond W25X serial NOR flash, SPI interface. Only what bring-up needs:
//! identification and the busy flag.

use embedded_hal_async::spi::{Operation, SpiDevice};

use crate::error::{check_identity, Error};

const JEDEC_ID: u8 = 0x9F;
const READ_STATUS: u8 = 0x05;
const WINBOND: u8 = 0xEF;
const STATUS_BUSY: u8 = 0x01;

/// JEDEC identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JedecId {
    pub manufacturer: u8,
    pub memory_type: u8,
    /// Capacity as a power of two in bytes.
    pub capacity: u8,
}

impl JedecId {
    pub fn size_bytes(&self) -> u32 {
        1u32.checked_shl(u32::from(self.capacity)).unwrap_or(0)
    }
}

pub struct W25x<SPI> {
    spi: SPI,
}

impl<E, SPI> W25x<SPI>
where
    SPI: SpiDevice<Error = E>,
{
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    pub async fn jedec_id(&mut self) -> Result<JedecId, Error<E>> {
        let mut id = [0u8; 3];
        self.spi
            .transaction(&mut [
                Operation::Write(&[JEDEC_ID]),
                Operation::Read(&mut id),
            ])
            .await?;
        Ok(JedecId { manufacturer: id[0], memory_type: id[1], capacity: id[2] })
    }

    pub async fn is_busy(&mut self) -> Result<bool, Error<E>> {
        let mut status = [0u8];
        self.spi
            .transaction(&mut [
                Operation::Write(&[READ_STATUS]),
                Operation::Read(&mut status),
            ])
            .await?;
        Ok(status[0] & STATUS_BUSY != 0)
    }

    /// Check the manufacturer and return the full identification.
    pub async fn init(&mut self) -> Result<JedecId, Error<E>> {
        let id = self.jedec_id().await?;
        check_identity(&[WINBOND], &[id.manufacturer])?;
        Ok(id)
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

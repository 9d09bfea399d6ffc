//! `embedded-hal-async` device views of a shared bus, so sensor drivers
//! written against the HAL traits run on a managed bus unchanged.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Timer;
use embedded_hal_async::{i2c, spi};

use crate::driver::{BusDriver, Target};
use crate::error::TransferError;
use crate::handle::SharedBus;

/// One chip-select slot on a shared SPI bus.
pub struct SpiBusDevice<'a, M: RawMutex, D: BusDriver> {
    bus: SharedBus<'a, M, D>,
    cs: u8,
}

impl<'a, M: RawMutex, D: BusDriver> SpiBusDevice<'a, M, D> {
    pub fn new(bus: SharedBus<'a, M, D>, cs: u8) -> Self {
        Self { bus, cs }
    }
}

impl<M: RawMutex, D: BusDriver> spi::ErrorType for SpiBusDevice<'_, M, D> {
    type Error = TransferError;
}

impl<M: RawMutex, D: BusDriver> spi::SpiDevice for SpiBusDevice<'_, M, D> {
    async fn transaction(
        &mut self,
        operations: &mut [spi::Operation<'_, u8>],
    ) -> Result<(), TransferError> {
        let target = Target::ChipSelect(self.cs);
        let mut guard = self.bus.lock().await?;
        // Chip select is released after the last data-carrying operation.
        let last = operations
            .iter()
            .rposition(|op| !matches!(op, spi::Operation::DelayNs(_)));
        for (i, op) in operations.iter_mut().enumerate() {
            let end = Some(i) == last;
            match op {
                spi::Operation::Read(buf) => {
                    guard.segment(target, &[], buf, end).await?;
                }
                spi::Operation::Write(buf) => {
                    guard.segment(target, *buf, &mut [], end).await?;
                }
                spi::Operation::Transfer(rx, tx) => {
                    guard.segment(target, *tx, rx, end).await?;
                }
                spi::Operation::TransferInPlace(buf) => {
                    guard.segment_in_place(target, buf, end).await?;
                }
                spi::Operation::DelayNs(ns) => {
                    Timer::after_nanos(u64::from(*ns)).await;
                }
            }
        }
        Ok(())
    }
}

/// A shared two-wire bus; the address is per transaction.
pub struct I2cBusDevice<'a, M: RawMutex, D: BusDriver> {
    bus: SharedBus<'a, M, D>,
}

impl<'a, M: RawMutex, D: BusDriver> I2cBusDevice<'a, M, D> {
    pub fn new(bus: SharedBus<'a, M, D>) -> Self {
        Self { bus }
    }
}

impl<M: RawMutex, D: BusDriver> i2c::ErrorType for I2cBusDevice<'_, M, D> {
    type Error = TransferError;
}

impl<M: RawMutex, D: BusDriver> i2c::I2c for I2cBusDevice<'_, M, D> {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), TransferError> {
        let target = Target::Address(address);
        let mut guard = self.bus.lock().await?;
        let count = operations.len();
        for (i, op) in operations.iter_mut().enumerate() {
            let end = i + 1 == count;
            match op {
                i2c::Operation::Read(buf) => {
                    guard.segment(target, &[], buf, end).await?;
                }
                i2c::Operation::Write(buf) => {
                    guard.segment(target, *buf, &mut [], end).await?;
                }
            }
        }
        Ok(())
    }
}

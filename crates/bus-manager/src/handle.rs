use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::MutexGuard;
use embassy_time::with_timeout;

use crate::config::{BusClass, RegisterBlock};
use crate::driver::{BusDriver, Segment, Target};
use crate::error::TransferError;
use crate::manager::BusManager;

/// Opaque runtime identifier of an initialized bus.
///
/// Derived from the register block, so there is exactly one handle per
/// physical peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusHandle(u16);

impl BusHandle {
    /// Class in the high byte, instance number in the low byte.
    pub const fn for_block(block: RegisterBlock) -> Self {
        let (class, instance) = match block {
            RegisterBlock::Spi(n) => (0u16, n),
            RegisterBlock::I2c(n) => (1, n),
            RegisterBlock::Usart(n) => (2, n),
        };
        Self(class << 8 | instance as u16)
    }

    pub const fn class(&self) -> BusClass {
        match self.0 >> 8 {
            0 => BusClass::Spi,
            1 => BusClass::I2c,
            _ => BusClass::Usart,
        }
    }

    pub const fn raw(&self) -> u16 {
        self.0
    }
}

/// Shared reference to an initialized bus, handed to every device on it.
///
/// Holds no ownership; transfers go through [`SharedBus::lock`].
pub struct SharedBus<'a, M: RawMutex, D: BusDriver> {
    manager: &'a BusManager<M, D>,
}

impl<M: RawMutex, D: BusDriver> Clone for SharedBus<'_, M, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex, D: BusDriver> Copy for SharedBus<'_, M, D> {}

impl<'a, M: RawMutex, D: BusDriver> SharedBus<'a, M, D> {
    /// Only created by `BusManager::bus` once the bus is active.
    pub(crate) fn new(manager: &'a BusManager<M, D>) -> Self {
        Self { manager }
    }

    pub fn handle(&self) -> BusHandle {
        self.manager.handle()
    }

    /// Wait for exclusive use of the bus. The lock is released when the
    /// guard drops, whatever the outcome of its transfers.
    pub async fn lock(&self) -> Result<BusGuard<'a, M, D>, TransferError> {
        let guard = self.manager.transfer_lock.lock().await;
        if !self.manager.is_active() {
            return Err(TransferError::NotInitialized);
        }
        Ok(BusGuard { manager: self.manager, _guard: guard })
    }
}

/// Exclusive access to a bus for the length of one transaction.
pub struct BusGuard<'a, M: RawMutex, D: BusDriver> {
    manager: &'a BusManager<M, D>,
    _guard: MutexGuard<'a, M, ()>,
}

impl<M: RawMutex, D: BusDriver> BusGuard<'_, M, D> {
    /// Write `tx`, then read `rx.len()` bytes. Returns the number of bytes
    /// received.
    pub async fn segment(
        &mut self,
        target: Target,
        tx: &[u8],
        rx: &mut [u8],
        last: bool,
    ) -> Result<usize, TransferError> {
        self.begin(&Segment { target, tx, rx_len: rx.len(), last })?;
        self.complete(rx).await
    }

    /// Clock out `buf` and replace it with the bytes clocked in.
    pub async fn segment_in_place(
        &mut self,
        target: Target,
        buf: &mut [u8],
        last: bool,
    ) -> Result<usize, TransferError> {
        self.begin(&Segment { target, tx: &*buf, rx_len: buf.len(), last })?;
        self.complete(buf).await
    }

    fn begin(&mut self, segment: &Segment<'_>) -> Result<(), TransferError> {
        self.manager.done.reset();
        self.manager
            .with_driver(|driver| driver.start(segment))
            .map_err(|_| TransferError::NotInitialized)??;
        Ok(())
    }

    async fn complete(&mut self, rx: &mut [u8]) -> Result<usize, TransferError> {
        let outcome = match self.manager.config().transfer_timeout() {
            Some(limit) => {
                match with_timeout(limit, self.manager.done.wait()).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        self.abort();
                        warn!("bus {:?} transfer timed out", self.manager.handle());
                        return Err(TransferError::Timeout);
                    }
                }
            }
            None => self.manager.done.wait().await,
        };
        match outcome {
            Ok(()) => self
                .manager
                .with_driver(|driver| driver.finish(rx))
                .map_err(|_| TransferError::NotInitialized),
            Err(fault) => {
                self.abort();
                Err(TransferError::Fault(fault))
            }
        }
    }

    fn abort(&mut self) {
        // A late completion must not satisfy the next segment's wait.
        let _ = self.manager.with_driver(|driver| driver.abort());
        self.manager.done.reset();
    }
}

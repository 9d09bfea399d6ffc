use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

use crate::config::{BusConfig, IrqLine};
use crate::dispatch::IrqService;
use crate::driver::{BusDriver, BusFault, IrqOutcome};
use crate::error::BusError;
use crate::handle::{BusHandle, SharedBus};

/// Lifecycle of a bus. There is no way back from `Active` or `Failed`:
/// peripherals are only recycled by a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    /// Peripheral untouched; resources available.
    Idle,
    /// Engine configured; transfers may be issued.
    Active,
    /// Bring-up was attempted and failed.
    Failed,
}

struct Inner<D> {
    phase: Phase,
    driver: D,
}

/// Owner of one physical bus: its descriptor, its protocol engine and the
/// lock that serializes transfers.
///
/// The engine sits behind a blocking mutex so the interrupt path can reach
/// it; tasks serialize whole transactions through the async
/// `transfer_lock` and wait for completion on `done`.
pub struct BusManager<M: RawMutex, D: BusDriver> {
    handle: BusHandle,
    config: BusConfig,
    inner: BlockingMutex<M, RefCell<Inner<D>>>,
    pub(crate) transfer_lock: Mutex<M, ()>,
    pub(crate) done: Signal<M, Result<(), BusFault>>,
}

impl<M: RawMutex, D: BusDriver> BusManager<M, D> {
    /// Create a manager for `config`. Nothing is touched until
    /// [`BusManager::init`].
    pub const fn new(config: BusConfig, driver: D) -> Self {
        Self {
            handle: BusHandle::for_block(config.block()),
            config,
            inner: BlockingMutex::new(RefCell::new(Inner {
                phase: Phase::Idle,
                driver,
            })),
            transfer_lock: Mutex::new(()),
            done: Signal::new(),
        }
    }

    /// Bring the bus up and return its handle.
    ///
    /// One-shot: a second call fails with `AlreadyInitialized`, and a bus
    /// whose bring-up failed stays `Failed`.
    pub fn init(&self) -> Result<BusHandle, BusError> {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            match inner.phase {
                Phase::Active => return Err(BusError::AlreadyInitialized),
                Phase::Failed => return Err(BusError::Failed),
                Phase::Idle => {}
            }
            match inner.driver.init(&self.config) {
                Ok(()) => {
                    inner.phase = Phase::Active;
                    info!("bus {:?} up", self.config.block());
                    Ok(self.handle)
                }
                Err(err) => {
                    inner.phase = Phase::Failed;
                    error!("bus {:?} bring-up failed: {:?}", self.config.block(), err);
                    Err(BusError::Init(err))
                }
            }
        })
    }

    /// Handle of this bus, whether or not it is initialized.
    pub fn handle(&self) -> BusHandle {
        self.handle
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.phase() == Phase::Active
    }

    pub fn is_failed(&self) -> bool {
        self.phase() == Phase::Failed
    }

    fn phase(&self) -> Phase {
        self.inner.lock(|inner| inner.borrow().phase)
    }

    /// Shared access for transfers. Fails until the bus is initialized.
    pub fn bus(&self) -> Result<SharedBus<'_, M, D>, BusError> {
        match self.phase() {
            Phase::Active => Ok(SharedBus::new(self)),
            Phase::Idle => Err(BusError::NotInitialized),
            Phase::Failed => Err(BusError::Failed),
        }
    }

    /// Run `f` on the engine of an active bus. Holds the blocking mutex
    /// for the duration of `f`, so keep it short.
    pub fn with_driver<R>(
        &self,
        f: impl FnOnce(&mut D) -> R,
    ) -> Result<R, BusError> {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            match inner.phase {
                Phase::Active => Ok(f(&mut inner.driver)),
                Phase::Idle => Err(BusError::NotInitialized),
                Phase::Failed => Err(BusError::Failed),
            }
        })
    }

    /// `true` while a task holds the transfer lock.
    pub fn is_busy(&self) -> bool {
        self.transfer_lock.try_lock().is_err()
    }

    /// Interrupt-side entry: let the engine service `line` and wake the
    /// waiting transfer when the segment ends.
    pub fn on_interrupt(&self, line: IrqLine) {
        let outcome = self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            match inner.phase {
                Phase::Active => Some(inner.driver.on_interrupt(line)),
                _ => None,
            }
        });
        match outcome {
            Some(IrqOutcome::Pending) => {}
            Some(IrqOutcome::Complete) => self.done.signal(Ok(())),
            Some(IrqOutcome::Failed(fault)) => self.done.signal(Err(fault)),
            None => {
                warn!("{:?} interrupt on inactive bus {:?}", line, self.config.block())
            }
        }
    }
}

impl<M: RawMutex, D: BusDriver> IrqService for BusManager<M, D> {
    fn on_irq(&self, handle: BusHandle, line: IrqLine) {
        if handle != self.handle {
            error!("bus {:?} got interrupt for {:?}", self.handle, handle);
            return;
        }
        self.on_interrupt(line);
    }
}

/// Object-safe view of a [`BusManager`], for tables holding buses with
/// different engines.
pub trait ManagedBus {
    fn handle(&self) -> BusHandle;
    fn config(&self) -> &BusConfig;
    fn init(&self) -> Result<BusHandle, BusError>;
    fn is_active(&self) -> bool;
    fn is_failed(&self) -> bool;
}

impl<M: RawMutex, D: BusDriver> ManagedBus for BusManager<M, D> {
    fn handle(&self) -> BusHandle {
        BusManager::handle(self)
    }

    fn config(&self) -> &BusConfig {
        BusManager::config(self)
    }

    fn init(&self) -> Result<BusHandle, BusError> {
        BusManager::init(self)
    }

    fn is_active(&self) -> bool {
        BusManager::is_active(self)
    }

    fn is_failed(&self) -> bool {
        BusManager::is_failed(self)
    }
}

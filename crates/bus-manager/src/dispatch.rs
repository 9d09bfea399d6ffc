//! Interrupt vector to bus-instance dispatch.
//!
//! Several bus instances share one interrupt routine per peripheral class.
//! Instead of one named trampoline per instance, the platform's real
//! interrupt entry points call [`DispatchTable::dispatch`] with their
//! vector number; the table supplies the handle registered for it.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;

use crate::config::{BusConfig, IrqLine, Vector};
use crate::error::DispatchError;
use crate::handle::BusHandle;

/// Generic interrupt routine of a bus class. Runs in interrupt context:
/// clear status, signal the waiter, return.
pub trait IrqService {
    fn on_irq(&self, handle: BusHandle, line: IrqLine);
}

/// Routine for a non-bus vector, e.g. external interrupt lines carrying
/// sensor data-ready signals.
pub trait VectorService {
    fn on_vector(&self, vector: Vector);
}

#[derive(Clone, Copy)]
enum Entry<'a> {
    Bus {
        handle: BusHandle,
        line: IrqLine,
        service: &'a (dyn IrqService + Sync),
    },
    Vector(&'a (dyn VectorService + Sync)),
}

/// Vector table of `N` entries, each registered once at boot.
pub struct DispatchTable<'a, M: RawMutex, const N: usize> {
    slots: BlockingMutex<M, RefCell<[Option<Entry<'a>>; N]>>,
}

impl<'a, M: RawMutex, const N: usize> Default for DispatchTable<'a, M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, M: RawMutex, const N: usize> DispatchTable<'a, M, N> {
    pub const fn new() -> Self {
        Self { slots: BlockingMutex::new(RefCell::new([None; N])) }
    }

    fn index(vector: Vector) -> Result<usize, DispatchError> {
        let index = usize::from(vector.number());
        if index < N {
            Ok(index)
        } else {
            Err(DispatchError::OutOfRange(vector))
        }
    }

    fn insert(&self, vector: Vector, entry: Entry<'a>) -> Result<(), DispatchError> {
        let index = Self::index(vector)?;
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            if slots[index].is_some() {
                return Err(DispatchError::AlreadyRegistered(vector));
            }
            slots[index] = Some(entry);
            Ok(())
        })
    }

    /// Route `vector` to `service` on behalf of the bus `handle`.
    pub fn register_handler(
        &self,
        vector: Vector,
        handle: BusHandle,
        line: IrqLine,
        service: &'a (dyn IrqService + Sync),
    ) -> Result<(), DispatchError> {
        self.insert(vector, Entry::Bus { handle, line, service })
    }

    /// Register every interrupt line of a bus. All vectors are checked,
    /// against the table and against each other, before any is claimed, so
    /// a failure leaves the table unchanged.
    pub fn register_bus(
        &self,
        config: &BusConfig,
        handle: BusHandle,
        service: &'a (dyn IrqService + Sync),
    ) -> Result<(), DispatchError> {
        let irqs = config.irqs();
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            for (i, irq) in irqs.iter().enumerate() {
                let index = Self::index(irq.vector)?;
                let repeated = irqs[..i].iter().any(|prev| prev.vector == irq.vector);
                if repeated || slots[index].is_some() {
                    return Err(DispatchError::AlreadyRegistered(irq.vector));
                }
            }
            for irq in irqs {
                let index = usize::from(irq.vector.number());
                slots[index] = Some(Entry::Bus { handle, line: irq.line, service });
            }
            Ok(())
        })?;
        debug!("irq routes for {:?} registered", handle);
        Ok(())
    }

    /// Route `vector` to a non-bus routine.
    pub fn register_vector(
        &self,
        vector: Vector,
        service: &'a (dyn VectorService + Sync),
    ) -> Result<(), DispatchError> {
        self.insert(vector, Entry::Vector(service))
    }

    /// Bus handle registered for `vector`, if any.
    pub fn registered(&self, vector: Vector) -> Option<BusHandle> {
        let index = Self::index(vector).ok()?;
        self.slots.lock(|slots| match slots.borrow()[index] {
            Some(Entry::Bus { handle, .. }) => Some(handle),
            _ => None,
        })
    }

    pub fn is_registered(&self, vector: Vector) -> bool {
        Self::index(vector)
            .map(|index| self.slots.lock(|slots| slots.borrow()[index].is_some()))
            .unwrap_or(false)
    }

    /// Entry point for the platform interrupt handler of `vector`.
    ///
    /// The routine runs outside the table lock. An `Unregistered` result
    /// means a vector fired that nothing enabled; the caller must treat it
    /// as fatal.
    pub fn dispatch(&self, vector: Vector) -> Result<(), DispatchError> {
        let index = Self::index(vector)?;
        let entry = self.slots.lock(|slots| slots.borrow()[index]);
        match entry {
            Some(Entry::Bus { handle, line, service }) => {
                service.on_irq(handle, line);
                Ok(())
            }
            Some(Entry::Vector(service)) => {
                service.on_vector(vector);
                Ok(())
            }
            None => {
                error!("unregistered vector {} fired", vector.number());
                Err(DispatchError::Unregistered(vector))
            }
        }
    }
}

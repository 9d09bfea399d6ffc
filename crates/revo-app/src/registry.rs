//! Board buses keyed by role.

use bus_manager::config::DataReady;
use bus_manager::validate::{validate, validate_data_ready};
use bus_manager::{
    BusConfig, BusError, BusHandle, ConfigError, DispatchTable, IrqService,
    ManagedBus,
};
use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;
use revo_bsp::{BusRole, BUS_COUNT};

use crate::error::RegistryError;

/// One declared bus: the manager that owns it and the routine its
/// interrupt vectors go to. For engine-driven buses the two are the same
/// `BusManager`; serial buses route their interrupts to their endpoint.
#[derive(Clone, Copy)]
pub struct Slot<'a> {
    role: BusRole,
    bus: &'a (dyn ManagedBus + Sync),
    service: &'a (dyn IrqService + Sync),
}

impl<'a> Slot<'a> {
    /// A bus serving its own interrupts.
    pub fn new<B>(role: BusRole, bus: &'a B) -> Self
    where
        B: ManagedBus + IrqService + Sync,
    {
        Self { role, bus, service: bus }
    }

    /// A bus whose interrupts go to `service`.
    pub fn with_service(
        role: BusRole,
        bus: &'a (dyn ManagedBus + Sync),
        service: &'a (dyn IrqService + Sync),
    ) -> Self {
        Self { role, bus, service }
    }

    pub fn role(&self) -> BusRole {
        self.role
    }
}

/// Every bus of the board. Construction checks the complete descriptor
/// set for collisions, so a colliding board never reaches the hardware.
pub struct BusRegistry<'a> {
    slots: Vec<Slot<'a>, BUS_COUNT>,
}

impl<'a> BusRegistry<'a> {
    pub fn new(slots: &[Slot<'a>]) -> Result<Self, RegistryError> {
        let mut registry = Self { slots: Vec::new() };
        for slot in slots {
            if registry.slot(slot.role).is_some() {
                return Err(RegistryError::Duplicate(slot.role));
            }
            registry
                .slots
                .push(*slot)
                .map_err(|_| RegistryError::TooManyBuses)?;
        }
        Ok(registry)
    }

    /// Pairwise resource check over every declared bus, then over the
    /// data-ready lines against the buses.
    pub fn validate(&self, data_ready: &[&DataReady]) -> Result<(), ConfigError> {
        let configs: Vec<&BusConfig, BUS_COUNT> =
            self.slots.iter().map(|slot| slot.bus.config()).collect();
        validate(&configs)?;
        validate_data_ready(&configs, data_ready)
    }

    fn slot(&self, role: BusRole) -> Option<&Slot<'a>> {
        self.slots.iter().find(|slot| slot.role == role)
    }

    pub fn is_declared(&self, role: BusRole) -> bool {
        self.slot(role).is_some()
    }

    pub fn config(&self, role: BusRole) -> Option<&BusConfig> {
        self.slot(role).map(|slot| slot.bus.config())
    }

    /// Route the interrupt vectors of `role` through `table`, then bring
    /// the bus up. Routes go in first: the engine may unmask its vectors
    /// during bring-up, and an interrupt reaching an idle bus is dropped
    /// rather than fatal.
    pub fn init<M: RawMutex, const N: usize>(
        &self,
        role: BusRole,
        table: &DispatchTable<'a, M, N>,
    ) -> Result<BusHandle, RegistryError> {
        let slot = self.slot(role).ok_or(RegistryError::NotDeclared(role))?;
        let bus = slot.bus;
        if bus.is_active() {
            return Err(RegistryError::Bus(role, BusError::AlreadyInitialized));
        }
        if bus.is_failed() {
            return Err(RegistryError::Bus(role, BusError::Failed));
        }
        table
            .register_bus(bus.config(), bus.handle(), slot.service)
            .map_err(|err| RegistryError::Dispatch(role, err))?;
        let handle = bus.init().map_err(|err| RegistryError::Bus(role, err))?;
        info!("{:?} bus ready as {:?}", role, handle);
        Ok(handle)
    }

    pub fn is_initialized(&self, role: BusRole) -> bool {
        self.slot(role).is_some_and(|slot| slot.bus.is_active())
    }

    /// Handle of an initialized bus.
    pub fn get_bus_handle(&self, role: BusRole) -> Result<BusHandle, RegistryError> {
        match self.slot(role) {
            Some(slot) if slot.bus.is_active() => Ok(slot.bus.handle()),
            _ => Err(RegistryError::NotInitialized(role)),
        }
    }

    /// Role of the live bus behind `handle`.
    pub fn live_role(&self, handle: BusHandle) -> Option<BusRole> {
        self.slots
            .iter()
            .find(|slot| slot.bus.handle() == handle && slot.bus.is_active())
            .map(|slot| slot.role)
    }

    pub fn roles(&self) -> impl Iterator<Item = BusRole> + '_ {
        self.slots.iter().map(|slot| slot.role)
    }
}

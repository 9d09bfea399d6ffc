//! Device attachment: which device sits on which live bus, and whether it
//! answered its identity check.

use core::future::Future;

use bus_manager::BusHandle;
use revo_bsp::DeviceRole;

use crate::error::{AttachError, DeviceError};
use crate::registry::BusRegistry;

/// Right to issue transfers to a device. Holds no ownership of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceHandle {
    pub role: DeviceRole,
    pub bus: BusHandle,
}

/// Where a device stands after attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Bound to its bus, not yet probed.
    Attached,
    /// Identity verified and registers programmed.
    Ready,
    /// Bring-up was attempted and failed.
    Failed(DeviceError),
}

#[derive(Debug, Clone, Copy)]
struct Attachment {
    bus: BusHandle,
    state: DeviceState,
}

pub const DEVICE_COUNT: usize = DeviceRole::ALL.len();

fn index(role: DeviceRole) -> usize {
    match role {
        DeviceRole::Flash => 0,
        DeviceRole::Gyro => 1,
        DeviceRole::Accel => 2,
        DeviceRole::Mag => 3,
        DeviceRole::Baro => 4,
    }
}

#[derive(Debug, Default)]
pub struct DeviceTable {
    slots: [Option<Attachment>; DEVICE_COUNT],
}

impl DeviceTable {
    pub const fn new() -> Self {
        Self { slots: [None; DEVICE_COUNT] }
    }

    /// Bind `role` to the bus behind `handle`.
    ///
    /// The handle must name a live bus, and that bus must be the one the
    /// device is declared on. A second attachment of the same role is
    /// rejected and leaves the first one untouched.
    pub fn attach(
        &mut self,
        registry: &BusRegistry<'_>,
        role: DeviceRole,
        handle: BusHandle,
    ) -> Result<DeviceHandle, AttachError> {
        if self.slots[index(role)].is_some() {
            return Err(AttachError::AlreadyAttached(role));
        }
        let bus_role =
            registry.live_role(handle).ok_or(AttachError::NotLive(handle))?;
        if bus_role != role.bus_role() {
            return Err(AttachError::WrongBus { device: role, handle });
        }
        self.slots[index(role)] =
            Some(Attachment { bus: handle, state: DeviceState::Attached });
        debug!("{:?} attached to {:?}", role, handle);
        Ok(DeviceHandle { role, bus: handle })
    }

    /// Run the identity handshake and register programming of an attached
    /// device. `bring_up` does the bus work; its outcome is recorded
    /// either way. One attempt per device.
    pub async fn initialize<F, Fut>(
        &mut self,
        role: DeviceRole,
        bring_up: F,
    ) -> Result<DeviceHandle, DeviceError>
    where
        F: FnOnce(DeviceHandle) -> Fut,
        Fut: Future<Output = Result<(), DeviceError>>,
    {
        let slot = self.slots[index(role)]
            .as_mut()
            .ok_or(DeviceError::NotAttached(role))?;
        if slot.state != DeviceState::Attached {
            return Err(DeviceError::AlreadyInitialized(role));
        }
        let handle = DeviceHandle { role, bus: slot.bus };
        match bring_up(handle).await {
            Ok(()) => {
                slot.state = DeviceState::Ready;
                info!("{:?} ready", role);
                Ok(handle)
            }
            Err(err) => {
                slot.state = DeviceState::Failed(err);
                Err(err)
            }
        }
    }

    pub fn state(&self, role: DeviceRole) -> Option<DeviceState> {
        self.slots[index(role)].map(|slot| slot.state)
    }

    /// Handle of a device that passed bring-up.
    pub fn get_device_handle(
        &self,
        role: DeviceRole,
    ) -> Result<DeviceHandle, AttachError> {
        match self.slots[index(role)] {
            Some(Attachment { bus, state: DeviceState::Ready }) => {
                Ok(DeviceHandle { role, bus })
            }
            _ => Err(AttachError::NotAttached(role)),
        }
    }
}

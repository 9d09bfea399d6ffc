//! Services the bring-up sequence needs from the rest of the firmware.

use bus_manager::config::{DataReady, PinConfig, Priority};
use revo_bsp::DeviceRole;

use crate::devices::DeviceHandle;
use crate::error::{BoardError, DeviceError};

/// System services, storage and per-device bring-up, in the order the
/// boot sequence calls them. Every call is made at most once per boot.
#[allow(async_fn_in_trait)]
pub trait Board {
    /// Clock tree and flash wait states.
    async fn init_clocks(&mut self) -> Result<(), BoardError>;

    /// Microsecond delay timer.
    async fn init_delay(&mut self) -> Result<(), BoardError>;

    async fn init_debug_pins(&mut self, pins: &[PinConfig]) -> Result<(), BoardError>;

    /// Mount the filesystem stored on `store`.
    async fn mount_filesystem(&mut self, store: DeviceHandle) -> Result<(), BoardError>;

    async fn init_object_system(&mut self) -> Result<(), BoardError>;

    async fn init_alarms(&mut self) -> Result<(), BoardError>;

    async fn init_task_monitor(&mut self) -> Result<(), BoardError>;

    /// In-application programming hook.
    async fn init_iap(&mut self) -> Result<(), BoardError>;

    /// Identify and program the device behind `device`.
    async fn bring_up_device(&mut self, device: DeviceHandle) -> Result<(), DeviceError>;

    /// Program the pin, edge and line of a data-ready signal and unmask its
    /// vector at `priority`.
    async fn init_data_ready(
        &mut self,
        role: DeviceRole,
        line: &DataReady,
        priority: Priority,
    ) -> Result<(), BoardError>;
}

/// Something that can show a halt pattern, usually the heartbeat LED.
pub trait FaultIndicator {
    fn set(&mut self, on: bool);

    /// Busy-wait for `ms` milliseconds. Interrupts are off when this runs.
    fn pause(&mut self, ms: u32);
}

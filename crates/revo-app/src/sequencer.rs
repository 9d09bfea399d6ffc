//! Staged board bring-up.
//!
//! Stages run strictly in order and each either succeeds or ends the
//! boot with the stage it failed in. Buses left out of the build and
//! optional devices that do not answer are reported, not fatal.

use bus_manager::config::DataReady;
use bus_manager::DispatchTable;
use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;
use revo_bsp::{
    shared_vector_priority, BusRole, BusStage, DeviceRole, BUS_COUNT, DEBUG_PINS,
};

use crate::board::{Board, FaultIndicator};
use crate::devices::{DeviceHandle, DeviceTable, DEVICE_COUNT};
use crate::drdy::{DataReadySignals, ExtiPending};
use crate::error::{BootError, DeviceError};
use crate::fault;
use crate::registry::BusRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    SystemClocks,
    DelayTimer,
    DebugPins,
    NonVolatileStoreBus,
    NonVolatileStore,
    Filesystem,
    /// Object system, alarms, task monitor and the IAP hook.
    ObjectSystem,
    CommunicationBuses,
    SensorBuses,
    DeviceAttachment,
    Complete,
}

impl Stage {
    /// Blinks of the halt pattern for a failure in this stage.
    pub const fn blink_code(&self) -> u8 {
        *self as u8 + 1
    }
}

/// Where and why the boot stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootFault {
    pub stage: Stage,
    pub error: BootError,
}

impl BootFault {
    /// Disable interrupts and blink the stage code forever.
    pub fn halt<I: FaultIndicator>(self, indicator: &mut I) -> ! {
        error!("boot failed in {:?}: {:?}", self.stage, self.error);
        fault::halt(self.stage.blink_code(), indicator)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootReport {
    /// Buses this build leaves out.
    pub disabled: Vec<BusRole, BUS_COUNT>,
    /// Optional devices that failed bring-up.
    pub missing: Vec<(DeviceRole, DeviceError), DEVICE_COUNT>,
}

/// Result of a complete boot.
#[derive(Debug)]
pub struct Booted {
    pub devices: DeviceTable,
    pub report: BootReport,
}

pub struct Sequencer<'r, 'a, M: RawMutex, P: ExtiPending, const N: usize> {
    registry: &'r BusRegistry<'a>,
    dispatch: &'r DispatchTable<'a, M, N>,
    data_ready: &'a DataReadySignals<M, P>,
    stage: Stage,
}

impl<'r, 'a, M, P, const N: usize> Sequencer<'r, 'a, M, P, N>
where
    M: RawMutex + Sync,
    P: ExtiPending + Sync,
{
    pub fn new(
        registry: &'r BusRegistry<'a>,
        dispatch: &'r DispatchTable<'a, M, N>,
        data_ready: &'a DataReadySignals<M, P>,
    ) -> Self {
        Self { registry, dispatch, data_ready, stage: Stage::SystemClocks }
    }

    /// Bring the board up. On failure nothing after the failing stage has
    /// been touched.
    pub async fn run<B: Board>(mut self, board: &mut B) -> Result<Booted, BootFault> {
        let mut devices = DeviceTable::new();
        let mut report = BootReport::default();
        match self.boot(board, &mut devices, &mut report).await {
            Ok(()) => {
                self.enter(Stage::Complete);
                Ok(Booted { devices, report })
            }
            Err(error) => Err(BootFault { stage: self.stage, error }),
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        info!("boot: {:?}", stage);
    }

    async fn boot<B: Board>(
        &mut self,
        board: &mut B,
        devices: &mut DeviceTable,
        report: &mut BootReport,
    ) -> Result<(), BootError> {
        // The descriptor set is checked before the first hardware call.
        self.enter(Stage::SystemClocks);
        let lines: Vec<&DataReady, 3> =
            self.data_ready.lines().iter().map(|(_, line)| line).collect();
        self.registry.validate(&lines)?;
        board.init_clocks().await?;

        self.enter(Stage::DelayTimer);
        board.init_delay().await?;

        if DEBUG_PINS.is_empty() {
            debug!("no debug pins in this build");
        } else {
            self.enter(Stage::DebugPins);
            board.init_debug_pins(DEBUG_PINS).await?;
        }

        self.enter(Stage::NonVolatileStoreBus);
        self.init_buses(BusStage::NonVolatileStore, report)?;

        self.enter(Stage::NonVolatileStore);
        let store = self.bring_up(board, devices, DeviceRole::Flash).await?;

        self.enter(Stage::Filesystem);
        board.mount_filesystem(store).await?;

        self.enter(Stage::ObjectSystem);
        board.init_object_system().await?;
        board.init_alarms().await?;
        board.init_task_monitor().await?;
        board.init_iap().await?;

        self.enter(Stage::CommunicationBuses);
        self.init_buses(BusStage::Communication, report)?;

        self.enter(Stage::SensorBuses);
        self.init_buses(BusStage::Sensor, report)?;

        self.enter(Stage::DeviceAttachment);
        for role in DeviceRole::ALL {
            if role == DeviceRole::Flash {
                continue;
            }
            match self.bring_up(board, devices, role).await {
                Err(BootError::Device(role, err)) if !role.is_mandatory() => {
                    warn!("{:?} unavailable: {:?}", role, err);
                    // Capacity covers every device.
                    let _ = report.missing.push((role, err));
                }
                result => {
                    result?;
                }
            }
        }
        self.route_data_ready(board, devices).await
    }

    /// Initialize every bus of `stage` this build enables, in role order.
    fn init_buses(
        &self,
        stage: BusStage,
        report: &mut BootReport,
    ) -> Result<(), BootError> {
        for role in BusRole::ALL.into_iter().filter(|r| r.stage() == stage) {
            if !role.is_enabled() {
                debug!("{:?} not in this build", role);
                let _ = report.disabled.push(role);
                continue;
            }
            self.registry.init(role, self.dispatch)?;
        }
        Ok(())
    }

    async fn bring_up<B: Board>(
        &self,
        board: &mut B,
        devices: &mut DeviceTable,
        role: DeviceRole,
    ) -> Result<DeviceHandle, BootError> {
        let bus = self.registry.get_bus_handle(role.bus_role())?;
        devices.attach(self.registry, role, bus)?;
        devices
            .initialize(role, move |device| board.bring_up_device(device))
            .await
            .map_err(|err| BootError::Device(role, err))
    }

    /// Route and unmask the data-ready lines of the devices that came up.
    /// Lines of missing devices stay masked.
    async fn route_data_ready<B: Board>(
        &self,
        board: &mut B,
        devices: &DeviceTable,
    ) -> Result<(), BootError> {
        let lines = self.data_ready.lines();
        for (role, line) in lines {
            if devices.get_device_handle(*role).is_err() {
                continue;
            }
            let vector = line.vector();
            if !self.dispatch.is_registered(vector) {
                self.dispatch.register_vector(vector, self.data_ready)?;
            }
            let priority =
                shared_vector_priority(lines, vector).unwrap_or(line.priority());
            board.init_data_ready(*role, line, priority).await?;
        }
        Ok(())
    }
}

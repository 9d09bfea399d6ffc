#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use bus_manager::config::{DataReady, IrqLine, PinConfig, Priority};
use bus_manager::{
    BusConfig, BusDriver, BusFault, BusManager, DriverError, IrqOutcome,
    Segment, SerialDriver, Target,
};
use embassy_futures::select::{select, Either};
use embassy_futures::yield_now;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use revo_app::{
    Board, BoardError, DeviceError, DeviceHandle, ExtiPending, FaultIndicator,
    Slot,
};
use revo_bsp::{bus_config, BusRole, DeviceRole};

// ---------------------------------------------------------------------------
// Register-file engine
// ---------------------------------------------------------------------------

/// Protocol engine fronting a scripted chip. The first byte written in a
/// transaction selects the command; bytes read after it come from
/// `responses[command..]`. Writes of two bytes or more are logged.
#[derive(Debug)]
pub struct ChipEngine {
    pub fail_init: Option<DriverError>,
    pub responses: [u8; 256],
    /// Two-wire address the chip answers on; other addresses are NACKed.
    pub address: Option<u8>,
    pub writes: Vec<Vec<u8>>,
    pub irqs: Vec<IrqLine>,
    command: u8,
    rx: Vec<u8>,
    in_flight: bool,
    nack: bool,
}

impl Default for ChipEngine {
    fn default() -> Self {
        Self {
            fail_init: None,
            responses: [0; 256],
            address: None,
            writes: Vec::new(),
            irqs: Vec::new(),
            command: 0,
            rx: Vec::new(),
            in_flight: false,
            nack: false,
        }
    }
}

impl ChipEngine {
    pub fn failing(err: DriverError) -> Self {
        Self { fail_init: Some(err), ..Default::default() }
    }

    /// Respond to `command` with `bytes`.
    pub fn respond(mut self, command: u8, bytes: &[u8]) -> Self {
        let start = usize::from(command);
        self.responses[start..start + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn at(mut self, address: u8) -> Self {
        self.address = Some(address);
        self
    }
}

impl BusDriver for ChipEngine {
    fn init(&mut self, _config: &BusConfig) -> Result<(), DriverError> {
        match self.fail_init {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn start(&mut self, segment: &Segment<'_>) -> Result<(), DriverError> {
        if self.in_flight {
            return Err(DriverError::Busy);
        }
        self.in_flight = true;
        self.nack = matches!(
            (segment.target, self.address),
            (Target::Address(a), Some(b)) if a != b
        );
        if let Some(&first) = segment.tx.first() {
            self.command = first;
        }
        if segment.tx.len() >= 2 {
            self.writes.push(segment.tx.to_vec());
        }
        let start = usize::from(self.command);
        self.rx = (0..segment.rx_len)
            .map(|i| self.responses[(start + i) % 256])
            .collect();
        Ok(())
    }

    fn on_interrupt(&mut self, line: IrqLine) -> IrqOutcome {
        self.irqs.push(line);
        if !self.in_flight {
            return IrqOutcome::Pending;
        }
        if self.nack {
            IrqOutcome::Failed(BusFault::Nack)
        } else {
            IrqOutcome::Complete
        }
    }

    fn finish(&mut self, rx: &mut [u8]) -> usize {
        self.in_flight = false;
        let n = rx.len().min(self.rx.len());
        rx[..n].copy_from_slice(&self.rx[..n]);
        n
    }

    fn abort(&mut self) {
        self.in_flight = false;
    }
}

pub type ChipBus = BusManager<CriticalSectionRawMutex, ChipEngine>;

/// Keep firing `line` on `bus` so segments complete.
pub async fn pump(bus: &ChipBus, line: IrqLine) {
    loop {
        yield_now().await;
        bus.on_interrupt(line);
    }
}

pub async fn serviced<F: core::future::Future>(
    bus: &ChipBus,
    line: IrqLine,
    fut: F,
) -> F::Output {
    match select(fut, pump(bus, line)).await {
        Either::First(out) => out,
        Either::Second(()) => unreachable!(),
    }
}

/// Every bus this build enables, each on its board descriptor.
pub fn board_buses() -> Vec<(BusRole, ChipBus)> {
    board_buses_with(|_| ChipEngine::default())
}

pub fn board_buses_with(
    engine: impl Fn(BusRole) -> ChipEngine,
) -> Vec<(BusRole, ChipBus)> {
    BusRole::ALL
        .into_iter()
        .filter(|role| role.is_enabled())
        .map(|role| (role, ChipBus::new(bus_config(role).unwrap(), engine(role))))
        .collect()
}

pub fn slots(buses: &[(BusRole, ChipBus)]) -> Vec<Slot<'_>> {
    buses.iter().map(|(role, bus)| Slot::new(*role, bus)).collect()
}

pub fn bus<'a>(buses: &'a [(BusRole, ChipBus)], role: BusRole) -> &'a ChipBus {
    &buses.iter().find(|(r, _)| *r == role).unwrap().1
}

// ---------------------------------------------------------------------------
// Serial engine
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SerialEngine {
    pub incoming: VecDeque<u8>,
    pub sent: Vec<u8>,
    /// Transmit register full; writes are refused.
    pub tx_full: bool,
    pub tx_irq: bool,
}

impl BusDriver for SerialEngine {
    fn init(&mut self, _config: &BusConfig) -> Result<(), DriverError> {
        Ok(())
    }

    fn start(&mut self, _segment: &Segment<'_>) -> Result<(), DriverError> {
        Err(DriverError::Unsupported)
    }

    fn on_interrupt(&mut self, _line: IrqLine) -> IrqOutcome {
        IrqOutcome::Pending
    }

    fn finish(&mut self, _rx: &mut [u8]) -> usize {
        0
    }

    fn abort(&mut self) {}
}

impl SerialDriver for SerialEngine {
    fn read_byte(&mut self) -> Option<u8> {
        self.incoming.pop_front()
    }

    fn write_byte(&mut self, byte: u8) -> bool {
        if self.tx_full {
            return false;
        }
        self.sent.push(byte);
        true
    }

    fn set_tx_interrupt(&mut self, enabled: bool) {
        self.tx_irq = enabled;
    }
}

pub type SerialBus = BusManager<CriticalSectionRawMutex, SerialEngine>;

// ---------------------------------------------------------------------------
// External interrupt controller
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MockExti {
    pending: AtomicU32,
}

impl MockExti {
    pub fn raise(&self, line: u8) {
        self.pending.fetch_or(1 << line, Ordering::SeqCst);
    }

    pub fn pending(&self) -> u32 {
        self.pending.load(Ordering::SeqCst)
    }
}

impl ExtiPending for MockExti {
    fn take_pending(&self, line: u8) -> bool {
        let bit = 1 << line;
        self.pending.fetch_and(!bit, Ordering::SeqCst) & bit != 0
    }
}

impl ExtiPending for &MockExti {
    fn take_pending(&self, line: u8) -> bool {
        (**self).take_pending(line)
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Clocks,
    Delay,
    DebugPins(usize),
    Mount(DeviceHandle),
    ObjectSystem,
    Alarms,
    TaskMonitor,
    Iap,
    Device(DeviceRole),
    DataReady(DeviceRole, Priority),
}

#[derive(Debug, Default)]
pub struct MockBoard {
    pub calls: Vec<Call>,
    /// Board service that reports failure.
    pub failing: Option<Call>,
    pub device_errors: Vec<(DeviceRole, DeviceError)>,
}

impl MockBoard {
    fn call(&mut self, call: Call) -> Result<(), BoardError> {
        self.calls.push(call);
        if self.failing == Some(call) {
            Err(BoardError::NoResponse)
        } else {
            Ok(())
        }
    }

    pub fn devices(&self) -> Vec<DeviceRole> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Device(role) => Some(*role),
                _ => None,
            })
            .collect()
    }
}

impl Board for MockBoard {
    async fn init_clocks(&mut self) -> Result<(), BoardError> {
        self.call(Call::Clocks)
    }

    async fn init_delay(&mut self) -> Result<(), BoardError> {
        self.call(Call::Delay)
    }

    async fn init_debug_pins(&mut self, pins: &[PinConfig]) -> Result<(), BoardError> {
        self.call(Call::DebugPins(pins.len()))
    }

    async fn mount_filesystem(&mut self, store: DeviceHandle) -> Result<(), BoardError> {
        self.call(Call::Mount(store))
    }

    async fn init_object_system(&mut self) -> Result<(), BoardError> {
        self.call(Call::ObjectSystem)
    }

    async fn init_alarms(&mut self) -> Result<(), BoardError> {
        self.call(Call::Alarms)
    }

    async fn init_task_monitor(&mut self) -> Result<(), BoardError> {
        self.call(Call::TaskMonitor)
    }

    async fn init_iap(&mut self) -> Result<(), BoardError> {
        self.call(Call::Iap)
    }

    async fn bring_up_device(&mut self, device: DeviceHandle) -> Result<(), DeviceError> {
        self.calls.push(Call::Device(device.role));
        match self.device_errors.iter().find(|(role, _)| *role == device.role) {
            Some((_, err)) => Err(*err),
            None => Ok(()),
        }
    }

    async fn init_data_ready(
        &mut self,
        role: DeviceRole,
        _line: &DataReady,
        priority: Priority,
    ) -> Result<(), BoardError> {
        self.call(Call::DataReady(role, priority))
    }
}

// ---------------------------------------------------------------------------
// Fault indicator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blink {
    On,
    Off,
    Pause(u32),
}

#[derive(Debug, Default)]
pub struct MockLed {
    pub events: Vec<Blink>,
}

impl FaultIndicator for MockLed {
    fn set(&mut self, on: bool) {
        self.events.push(if on { Blink::On } else { Blink::Off });
    }

    fn pause(&mut self, ms: u32) {
        self.events.push(Blink::Pause(ms));
    }
}

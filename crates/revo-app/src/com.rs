//! Byte-stream endpoints on the serial buses.
//!
//! Each endpoint owns a receive and a transmit queue for the lifetime of
//! the firmware. The serial interrupt drains the receive register into the
//! receive queue and feeds the transmit register from the transmit queue;
//! tasks only ever touch the queues.

use core::cell::RefCell;

use bus_manager::config::IrqLine;
use bus_manager::{BusHandle, BusManager, IrqService, SerialDriver};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::signal::Signal;
use heapless::Deque;
use portable_atomic::{AtomicU32, Ordering};
use revo_bsp::com::{
    AUX_RX_CAPACITY, AUX_TX_CAPACITY, GPS_RX_CAPACITY, GPS_TX_CAPACITY,
    TELEM_RX_CAPACITY, TELEM_TX_CAPACITY,
};
use revo_bsp::ComRole;

use crate::error::ComError;

/// Identifier of a configured endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointId {
    pub role: ComRole,
    pub bus: BusHandle,
}

/// Object-safe endpoint view for the endpoint table.
pub trait ComEndpoint {
    fn role(&self) -> ComRole;
    fn bus(&self) -> BusHandle;
    fn is_up(&self) -> bool;
    /// Queue as much of `bytes` as fits; returns how many were taken.
    fn send(&self, bytes: &[u8]) -> Result<usize, ComError>;
    /// Move queued received bytes into `buf`; returns how many.
    fn receive(&self, buf: &mut [u8]) -> usize;
    /// Received bytes dropped because the queue was full.
    fn overruns(&self) -> u32;
}

struct Queues<const RX: usize, const TX: usize> {
    rx: Deque<u8, RX>,
    tx: Deque<u8, TX>,
}

pub type GpsPort<'a, M, D> = ComPort<'a, M, D, GPS_RX_CAPACITY, GPS_TX_CAPACITY>;
pub type AuxPort<'a, M, D> = ComPort<'a, M, D, AUX_RX_CAPACITY, AUX_TX_CAPACITY>;
pub type TelemetryPort<'a, M, D> =
    ComPort<'a, M, D, TELEM_RX_CAPACITY, TELEM_TX_CAPACITY>;

/// Serial endpoint with `RX`/`TX` bytes of queue.
pub struct ComPort<'a, M: RawMutex, D: SerialDriver, const RX: usize, const TX: usize>
{
    role: ComRole,
    bus: &'a BusManager<M, D>,
    queues: BlockingMutex<M, RefCell<Queues<RX, TX>>>,
    received: Signal<M, ()>,
    overruns: AtomicU32,
}

impl<'a, M, D, const RX: usize, const TX: usize> ComPort<'a, M, D, RX, TX>
where
    M: RawMutex,
    D: SerialDriver,
{
    pub const fn new(role: ComRole, bus: &'a BusManager<M, D>) -> Self {
        Self {
            role,
            bus,
            queues: BlockingMutex::new(RefCell::new(Queues {
                rx: Deque::new(),
                tx: Deque::new(),
            })),
            received: Signal::new(),
            overruns: AtomicU32::new(0),
        }
    }

    pub fn manager(&self) -> &'a BusManager<M, D> {
        self.bus
    }

    /// Wait until at least one byte is queued, then drain into `buf`.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, ComError> {
        self.bus.bus().map_err(ComError::Bus)?;
        loop {
            let n = self.drain(buf);
            if n > 0 || buf.is_empty() {
                return Ok(n);
            }
            self.received.wait().await;
        }
    }

    fn drain(&self, buf: &mut [u8]) -> usize {
        self.queues.lock(|queues| {
            let mut queues = queues.borrow_mut();
            let mut n = 0;
            for slot in buf.iter_mut() {
                match queues.rx.pop_front() {
                    Some(byte) => {
                        *slot = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            n
        })
    }

    /// Interrupt side: move bytes between the engine and the queues.
    fn service(&self) {
        let mut dropped = 0u32;
        let mut got = false;
        let result = self.bus.with_driver(|driver| {
            self.queues.lock(|queues| {
                let mut queues = queues.borrow_mut();
                while let Some(byte) = driver.read_byte() {
                    got = true;
                    if queues.rx.push_back(byte).is_err() {
                        dropped += 1;
                    }
                }
                while let Some(&byte) = queues.tx.front() {
                    if !driver.write_byte(byte) {
                        break;
                    }
                    queues.tx.pop_front();
                }
                if queues.tx.is_empty() {
                    driver.set_tx_interrupt(false);
                }
            })
        });
        if result.is_err() {
            warn!("{:?} interrupt while port down", self.role);
            return;
        }
        if dropped > 0 {
            self.overruns.fetch_add(dropped, Ordering::Relaxed);
        }
        if got {
            self.received.signal(());
        }
    }
}

impl<M, D, const RX: usize, const TX: usize> ComEndpoint for ComPort<'_, M, D, RX, TX>
where
    M: RawMutex,
    D: SerialDriver,
{
    fn role(&self) -> ComRole {
        self.role
    }

    fn bus(&self) -> BusHandle {
        self.bus.handle()
    }

    fn is_up(&self) -> bool {
        self.bus.is_active()
    }

    fn send(&self, bytes: &[u8]) -> Result<usize, ComError> {
        self.bus.bus().map_err(ComError::Bus)?;
        let queued = self.queues.lock(|queues| {
            let mut queues = queues.borrow_mut();
            bytes
                .iter()
                .take_while(|byte| queues.tx.push_back(**byte).is_ok())
                .count()
        });
        if queued > 0 {
            self.bus
                .with_driver(|driver| driver.set_tx_interrupt(true))
                .map_err(ComError::Bus)?;
        }
        Ok(queued)
    }

    fn receive(&self, buf: &mut [u8]) -> usize {
        self.drain(buf)
    }

    fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }
}

impl<M, D, const RX: usize, const TX: usize> IrqService for ComPort<'_, M, D, RX, TX>
where
    M: RawMutex,
    D: SerialDriver,
{
    fn on_irq(&self, handle: BusHandle, line: IrqLine) {
        if handle != self.bus.handle() || line != IrqLine::Global {
            error!("{:?} port got {:?} for {:?}", self.role, line, handle);
            return;
        }
        self.service();
    }
}

/// Endpoints of this build, looked up by role.
pub struct ComTable<'a> {
    endpoints: [Option<&'a (dyn ComEndpoint + Sync)>; 3],
}

impl Default for ComTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn index(role: ComRole) -> usize {
    match role {
        ComRole::Gps => 0,
        ComRole::Aux => 1,
        ComRole::Telemetry => 2,
    }
}

impl<'a> ComTable<'a> {
    pub const fn new() -> Self {
        Self { endpoints: [None; 3] }
    }

    pub fn register(&mut self, endpoint: &'a (dyn ComEndpoint + Sync)) {
        self.endpoints[index(endpoint.role())] = Some(endpoint);
    }

    /// Identifier of the endpoint for `role`, if it exists and its bus is
    /// up.
    pub fn get_com_endpoint(&self, role: ComRole) -> Result<EndpointId, ComError> {
        match self.endpoints[index(role)] {
            Some(endpoint) if endpoint.is_up() => {
                Ok(EndpointId { role, bus: endpoint.bus() })
            }
            _ => Err(ComError::NotConfigured(role)),
        }
    }

    pub fn endpoint(&self, id: EndpointId) -> Option<&'a (dyn ComEndpoint + Sync)> {
        self.endpoints[index(id.role)].filter(|endpoint| endpoint.bus() == id.bus)
    }
}

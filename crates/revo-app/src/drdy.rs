//! Sensor data-ready signals.
//!
//! Each data-ready pin feeds an external interrupt line; several lines can
//! share one vector (EXTI5..9). The vector routine asks the controller
//! which of its lines are pending and signals the matching sensors.

use bus_manager::config::{DataReady, Vector};
use bus_manager::VectorService;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use heapless::Vec;
use revo_bsp::{DataReadyLines, DeviceRole};

/// Pending flags of the external interrupt controller.
pub trait ExtiPending {
    /// Read and clear the pending flag of `line`.
    fn take_pending(&self, line: u8) -> bool;
}

const LINE_COUNT: usize = 3;

pub struct DataReadySignals<M: RawMutex, P: ExtiPending> {
    exti: P,
    lines: DataReadyLines,
    signals: [Signal<M, ()>; LINE_COUNT],
}

impl<M: RawMutex, P: ExtiPending> DataReadySignals<M, P> {
    pub fn new(exti: P, lines: DataReadyLines) -> Self {
        Self {
            exti,
            lines,
            signals: [Signal::new(), Signal::new(), Signal::new()],
        }
    }

    pub fn lines(&self) -> &[(DeviceRole, DataReady)] {
        &self.lines
    }

    /// Distinct vectors serving the lines, each listed once.
    pub fn vectors(&self) -> Vec<Vector, LINE_COUNT> {
        let mut vectors = Vec::new();
        for (_, line) in &self.lines {
            if !vectors.contains(&line.vector()) {
                // At most one vector per line.
                let _ = vectors.push(line.vector());
            }
        }
        vectors
    }

    /// "New sample" signal of `role`, `None` if it has no data-ready line.
    pub fn signal(&self, role: DeviceRole) -> Option<&Signal<M, ()>> {
        self.lines
            .iter()
            .position(|(r, _)| *r == role)
            .map(|i| &self.signals[i])
    }

    pub fn line(&self, role: DeviceRole) -> Option<&DataReady> {
        self.lines.iter().find(|(r, _)| *r == role).map(|(_, line)| line)
    }
}

impl<M: RawMutex, P: ExtiPending> VectorService for DataReadySignals<M, P> {
    fn on_vector(&self, vector: Vector) {
        for ((role, line), signal) in self.lines.iter().zip(&self.signals) {
            if line.vector() == vector && self.exti.take_pending(line.line()) {
                trace!("{:?} data ready", role);
                signal.signal(());
            }
        }
    }
}

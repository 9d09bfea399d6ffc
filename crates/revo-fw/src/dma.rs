//! One DMA stream, programmed from its [`DmaConfig`].

use bus_manager::config::{
    Burst, DmaConfig, DmaController, DmaDirection, DmaPriority, FifoPolicy,
    FifoThreshold,
};

use crate::rcc;
use crate::regs::{self, wait_for, Reg};

const CR_EN: u32 = 1 << 0;
const CR_DMEIE: u32 = 1 << 1;
const CR_TEIE: u32 = 1 << 2;
const CR_TCIE: u32 = 1 << 4;
const CR_MINC: u32 = 1 << 10;
const FCR_DMDIS: u32 = 1 << 2;

const FEIF: u32 = 1 << 0;
const DMEIF: u32 = 1 << 2;
const TEIF: u32 = 1 << 3;
const HTIF: u32 = 1 << 4;
const TCIF: u32 = 1 << 5;
const ALL_FLAGS: u32 = FEIF | DMEIF | TEIF | HTIF | TCIF;

const DISABLE_SPINS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    Idle,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy)]
pub struct Stream {
    base: usize,
    index: usize,
    /// Static part of the control word: channel, direction, sizes,
    /// priority and bursts.
    control: u32,
    fifo: u32,
}

impl Stream {
    pub fn new(config: &DmaConfig) -> Self {
        let base = match config.stream.controller {
            DmaController::Dma1 => regs::DMA1,
            DmaController::Dma2 => regs::DMA2,
        };
        let dir = match config.direction {
            DmaDirection::PeripheralToMemory => 0b00,
            DmaDirection::MemoryToPeripheral => 0b01,
        };
        let priority = match config.priority {
            DmaPriority::Low => 0b00,
            DmaPriority::Medium => 0b01,
            DmaPriority::High => 0b10,
            DmaPriority::VeryHigh => 0b11,
        };
        let control = (u32::from(config.channel) << 25)
            | (burst(config.memory_burst) << 23)
            | (burst(config.peripheral_burst) << 21)
            | (priority << 16)
            | CR_MINC
            | (dir << 6);
        let fifo = match config.fifo {
            FifoPolicy::Direct => 0,
            FifoPolicy::Fifo(threshold) => {
                FCR_DMDIS
                    | match threshold {
                        FifoThreshold::Quarter => 0b00,
                        FifoThreshold::Half => 0b01,
                        FifoThreshold::ThreeQuarters => 0b10,
                        FifoThreshold::Full => 0b11,
                    }
            }
        };
        Self { base, index: usize::from(config.stream.stream), control, fifo }
    }

    fn reg(&self, offset: usize) -> Reg {
        Reg::at(self.base, 0x10 + 0x18 * self.index + offset)
    }

    fn flag_shift(&self) -> u32 {
        [0, 6, 16, 22][self.index % 4]
    }

    fn status(&self) -> Reg {
        Reg::at(self.base, if self.index < 4 { 0x00 } else { 0x04 })
    }

    fn clear_reg(&self) -> Reg {
        Reg::at(self.base, if self.index < 4 { 0x08 } else { 0x0C })
    }

    /// Clock the controller, point the stream at `peripheral` and leave it
    /// disabled. `complete_irq` enables the transfer-complete interrupt;
    /// errors always interrupt.
    pub fn init(&self, controller: DmaController, peripheral: usize, complete_irq: bool) {
        rcc::enable_dma(controller);
        self.stop();
        self.reg(0x08).write(peripheral as u32);
        self.reg(0x14).write(self.fifo);
        let irqs = CR_TEIE | CR_DMEIE | if complete_irq { CR_TCIE } else { 0 };
        self.reg(0x00).write(self.control | irqs);
    }

    /// Move `len` bytes to or from `memory`.
    pub fn start(&self, memory: usize, len: usize) {
        self.clear_flags();
        self.reg(0x04).write(len as u32);
        self.reg(0x0C).write(memory as u32);
        self.reg(0x00).set(CR_EN);
    }

    pub fn stop(&self) {
        self.reg(0x00).clear(CR_EN);
        let _ = wait_for(DISABLE_SPINS, || !self.reg(0x00).is_set(CR_EN));
        self.clear_flags();
    }

    pub fn clear_flags(&self) {
        self.clear_reg().write(ALL_FLAGS << self.flag_shift());
    }

    /// Read and clear the stream flags.
    pub fn take_event(&self) -> StreamEvent {
        let flags = (self.status().read() >> self.flag_shift()) & ALL_FLAGS;
        self.clear_reg().write(flags << self.flag_shift());
        if flags & (TEIF | DMEIF) != 0 {
            StreamEvent::Error
        } else if flags & TCIF != 0 {
            StreamEvent::Complete
        } else {
            StreamEvent::Idle
        }
    }
}

fn burst(burst: Burst) -> u32 {
    match burst {
        Burst::Single => 0b00,
        Burst::Incr4 => 0b01,
        Burst::Incr8 => 0b10,
        Burst::Incr16 => 0b11,
    }
}

//! Interrupt-driven USART engine for the serial endpoints. Bytes move one
//! at a time through the data register; segments are not supported.

use bus_manager::config::{
    DataBits, FlowControl, IrqLine, Parity, Protocol, RegisterBlock, StopBits,
};
use bus_manager::{
    BusConfig, BusDriver, DriverError, IrqOutcome, Segment, SerialDriver,
};

use crate::regs::{self, Reg};
use crate::{gpio, nvic, rcc};

const SR: usize = 0x00;
const DR: usize = 0x04;
const BRR: usize = 0x08;
const CR1: usize = 0x0C;
const CR2: usize = 0x10;
const CR3: usize = 0x14;

const SR_ORE: u32 = 1 << 3;
const SR_RXNE: u32 = 1 << 5;
const SR_TXE: u32 = 1 << 7;

const CR1_RE: u32 = 1 << 2;
const CR1_TE: u32 = 1 << 3;
const CR1_RXNEIE: u32 = 1 << 5;
const CR1_TXEIE: u32 = 1 << 7;
const CR1_PS: u32 = 1 << 9;
const CR1_PCE: u32 = 1 << 10;
const CR1_M: u32 = 1 << 12;
const CR1_UE: u32 = 1 << 13;
const CR3_RTSE: u32 = 1 << 8;
const CR3_CTSE: u32 = 1 << 9;

pub struct UsartEngine {
    base: usize,
}

impl Default for UsartEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn block_base(block: RegisterBlock) -> Option<usize> {
    match block {
        RegisterBlock::Usart(1) => Some(regs::USART1),
        RegisterBlock::Usart(2) => Some(regs::USART2),
        RegisterBlock::Usart(3) => Some(regs::USART3),
        RegisterBlock::Usart(4) => Some(regs::UART4),
        RegisterBlock::Usart(5) => Some(regs::UART5),
        RegisterBlock::Usart(6) => Some(regs::USART6),
        _ => None,
    }
}

impl UsartEngine {
    pub const fn new() -> Self {
        Self { base: 0 }
    }

    fn reg(&self, offset: usize) -> Reg {
        Reg::at(self.base, offset)
    }
}

impl BusDriver for UsartEngine {
    fn init(&mut self, config: &BusConfig) -> Result<(), DriverError> {
        let base = block_base(config.block()).ok_or(DriverError::Unsupported)?;
        let Protocol::Usart(timing) = config.protocol() else {
            return Err(DriverError::Unsupported);
        };
        if timing.baud == 0 {
            return Err(DriverError::Unsupported);
        }
        if !rcc::enable(config.block()) {
            return Err(DriverError::RegisterBlockState);
        }
        self.base = base;
        if self.reg(CR1).is_set(CR1_UE) {
            return Err(DriverError::RegisterBlockState);
        }
        for (_, pin) in config.pins() {
            gpio::configure(pin);
        }

        // Oversampling by 16: the divider is mantissa and fraction packed.
        let clock = rcc::bus_clock(config.block());
        self.reg(BRR).write((clock + timing.baud / 2) / timing.baud);

        let stop = match timing.stop_bits {
            StopBits::One => 0b00,
            StopBits::Half => 0b01,
            StopBits::Two => 0b10,
            StopBits::OneAndHalf => 0b11,
        };
        self.reg(CR2).write(stop << 12);
        self.reg(CR3).write(match timing.flow {
            FlowControl::None => 0,
            FlowControl::Rts => CR3_RTSE,
            FlowControl::Cts => CR3_CTSE,
            FlowControl::RtsCts => CR3_RTSE | CR3_CTSE,
        });

        let mut cr1 = CR1_UE | CR1_TE | CR1_RE | CR1_RXNEIE;
        if timing.data_bits == DataBits::Nine {
            cr1 |= CR1_M;
        }
        match timing.parity {
            Parity::None => {}
            Parity::Even => cr1 |= CR1_PCE,
            Parity::Odd => cr1 |= CR1_PCE | CR1_PS,
        }
        self.reg(CR1).write(cr1);

        for irq in config.irqs() {
            nvic::enable(irq.vector, irq.priority);
        }
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

impl SerialDriver for UsartEngine {
    fn read_byte(&mut self) -> Option<u8> {
        // Reading DR also clears an overrun.
        if self.reg(SR).read() & (SR_RXNE | SR_ORE) == 0 {
            return None;
        }
        Some(self.reg(DR).read() as u8)
    }

    fn write_byte(&mut self, byte: u8) -> bool {
        if !self.reg(SR).is_set(SR_TXE) {
            return false;
        }
        self.reg(DR).write(u32::from(byte));
        true
    }

    fn set_tx_interrupt(&mut self, enabled: bool) {
        if enabled {
            self.reg(CR1).set(CR1_TXEIE);
        } else {
            self.reg(CR1).clear(CR1_TXEIE);
        }
    }
}

//! Interrupt-driven I2C master engine.
//!
//! A segment writes its bytes, then reads `rx_len` after a repeated
//! START. Only the segment flagged `last` ends with STOP; the next
//! segment of the transaction opens with a repeated START.

use bus_manager::config::{DutyCycle, IrqLine, Protocol, RegisterBlock};
use bus_manager::{
    BusConfig, BusDriver, BusFault, DriverError, IrqOutcome, Segment, Target,
};

use crate::regs::{self, Reg};
use crate::{gpio, nvic, rcc};

pub const I2C_BUFFER: usize = 32;

const CR1: usize = 0x00;
const CR2: usize = 0x04;
const DR: usize = 0x10;
const SR1: usize = 0x14;
const SR2: usize = 0x18;
const CCR: usize = 0x1C;
const TRISE: usize = 0x20;

const CR1_PE: u32 = 1 << 0;
const CR1_START: u32 = 1 << 8;
const CR1_STOP: u32 = 1 << 9;
const CR1_ACK: u32 = 1 << 10;
const CR1_SWRST: u32 = 1 << 15;
const CR2_ITERREN: u32 = 1 << 8;
const CR2_ITEVTEN: u32 = 1 << 9;
const CR2_ITBUFEN: u32 = 1 << 10;

const SR1_SB: u32 = 1 << 0;
const SR1_ADDR: u32 = 1 << 1;
const SR1_BTF: u32 = 1 << 2;
const SR1_RXNE: u32 = 1 << 6;
const SR1_TXE: u32 = 1 << 7;
const SR1_BERR: u32 = 1 << 8;
const SR1_ARLO: u32 = 1 << 9;
const SR1_AF: u32 = 1 << 10;
const SR1_OVR: u32 = 1 << 11;
const SR1_ERRORS: u32 = SR1_BERR | SR1_ARLO | SR1_AF | SR1_OVR;

const CCR_FAST: u32 = 1 << 15;
const CCR_DUTY: u32 = 1 << 14;

const STANDARD_MODE_HZ: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Write,
    Read,
}

#[derive(Debug, Clone, Copy)]
struct Transfer {
    address: u8,
    phase: Phase,
    tx_len: usize,
    rx_len: usize,
    /// Bytes of the current phase already moved.
    done: usize,
    last: bool,
}

/// Register values computed once by `init`, replayed after a reset.
#[derive(Debug, Clone, Copy, Default)]
struct Timing {
    freq: u32,
    ccr: u32,
    trise: u32,
}

pub struct I2cEngine {
    base: usize,
    timing: Timing,
    transfer: Option<Transfer>,
    tx_buf: [u8; I2C_BUFFER],
    rx_buf: [u8; I2C_BUFFER],
}

impl Default for I2cEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn block_base(block: RegisterBlock) -> Option<usize> {
    match block {
        RegisterBlock::I2c(1) => Some(regs::I2C1),
        RegisterBlock::I2c(2) => Some(regs::I2C2),
        RegisterBlock::I2c(3) => Some(regs::I2C3),
        _ => None,
    }
}

fn timing(clock_hz: u32, duty: DutyCycle) -> Option<Timing> {
    let pclk = rcc::PCLK1_HZ;
    let freq = pclk / 1_000_000;
    if clock_hz == 0 {
        return None;
    }
    let (ccr, trise) = if clock_hz <= STANDARD_MODE_HZ {
        ((pclk / (2 * clock_hz)).max(4), freq + 1)
    } else {
        let ccr = match duty {
            DutyCycle::Ratio2 => (pclk / (3 * clock_hz)).max(1),
            DutyCycle::Ratio16To9 => (pclk / (25 * clock_hz)).max(1) | CCR_DUTY,
        };
        (ccr | CCR_FAST, freq * 300 / 1000 + 1)
    };
    Some(Timing { freq, ccr, trise })
}

impl I2cEngine {
    pub const fn new() -> Self {
        Self {
            base: 0,
            timing: Timing { freq: 0, ccr: 0, trise: 0 },
            transfer: None,
            tx_buf: [0; I2C_BUFFER],
            rx_buf: [0; I2C_BUFFER],
        }
    }

    fn reg(&self, offset: usize) -> Reg {
        Reg::at(self.base, offset)
    }

    /// Reset the peripheral and program the stored timing.
    fn configure(&self) {
        self.reg(CR1).write(CR1_SWRST);
        self.reg(CR1).write(0);
        self.reg(CR2).write(self.timing.freq | CR2_ITERREN | CR2_ITEVTEN);
        self.reg(CCR).write(self.timing.ccr);
        self.reg(TRISE).write(self.timing.trise);
        self.reg(CR1).write(CR1_PE);
    }

    /// Reading SR1 then SR2 clears ADDR.
    fn clear_addr(&self) {
        let _ = self.reg(SR1).read();
        let _ = self.reg(SR2).read();
    }

    fn end(&mut self, transfer: &Transfer) -> IrqOutcome {
        self.reg(CR2).clear(CR2_ITBUFEN);
        if transfer.last {
            self.reg(CR1).set(CR1_STOP);
        }
        self.transfer = Some(*transfer);
        IrqOutcome::Complete
    }

    fn on_event(&mut self, mut t: Transfer) -> IrqOutcome {
        let sr1 = self.reg(SR1).read();

        if sr1 & SR1_SB != 0 {
            let read = u8::from(t.phase == Phase::Read);
            self.reg(DR).write(u32::from(t.address << 1 | read));
            return IrqOutcome::Pending;
        }

        if sr1 & SR1_ADDR != 0 {
            match t.phase {
                Phase::Write => {
                    self.clear_addr();
                    if t.tx_len == 0 {
                        return self.end(&t);
                    }
                    self.reg(CR2).set(CR2_ITBUFEN);
                }
                Phase::Read if t.rx_len == 1 => {
                    // NACK the only byte, then release the bus after it.
                    self.reg(CR1).clear(CR1_ACK);
                    self.clear_addr();
                    if t.last {
                        self.reg(CR1).set(CR1_STOP);
                    }
                    self.reg(CR2).set(CR2_ITBUFEN);
                }
                Phase::Read => {
                    self.reg(CR1).set(CR1_ACK);
                    self.clear_addr();
                    self.reg(CR2).set(CR2_ITBUFEN);
                }
            }
            return IrqOutcome::Pending;
        }

        match t.phase {
            Phase::Write => {
                if t.done < t.tx_len && sr1 & SR1_TXE != 0 {
                    self.reg(DR).write(u32::from(self.tx_buf[t.done]));
                    t.done += 1;
                    if t.done == t.tx_len {
                        // Wait for the last byte to leave the shifter.
                        self.reg(CR2).clear(CR2_ITBUFEN);
                    }
                    self.transfer = Some(t);
                    return IrqOutcome::Pending;
                }
                if t.done == t.tx_len && sr1 & SR1_BTF != 0 {
                    if t.rx_len == 0 {
                        return self.end(&t);
                    }
                    self.transfer =
                        Some(Transfer { phase: Phase::Read, done: 0, ..t });
                    self.reg(CR1).set(CR1_START);
                }
                IrqOutcome::Pending
            }
            Phase::Read => {
                if sr1 & SR1_RXNE == 0 || t.done >= t.rx_len {
                    return IrqOutcome::Pending;
                }
                self.rx_buf[t.done] = self.reg(DR).read() as u8;
                t.done += 1;
                let remaining = t.rx_len - t.done;
                if remaining == 1 {
                    self.reg(CR1).clear(CR1_ACK);
                    if t.last {
                        self.reg(CR1).set(CR1_STOP);
                    }
                }
                if remaining == 0 {
                    self.reg(CR2).clear(CR2_ITBUFEN);
                    self.transfer = Some(t);
                    return IrqOutcome::Complete;
                }
                self.transfer = Some(t);
                IrqOutcome::Pending
            }
        }
    }

    fn on_error(&mut self) -> IrqOutcome {
        let sr1 = self.reg(SR1).read();
        self.reg(SR1).write(!(sr1 & SR1_ERRORS));
        self.reg(CR2).clear(CR2_ITBUFEN);
        let fault = if sr1 & SR1_AF != 0 {
            self.reg(CR1).set(CR1_STOP);
            BusFault::Nack
        } else if sr1 & SR1_ARLO != 0 {
            BusFault::ArbitrationLost
        } else if sr1 & SR1_OVR != 0 {
            BusFault::Overrun
        } else if sr1 & SR1_BERR != 0 {
            BusFault::Bus
        } else {
            return IrqOutcome::Pending;
        };
        if self.transfer.is_none() {
            return IrqOutcome::Pending;
        }
        IrqOutcome::Failed(fault)
    }
}

impl BusDriver for I2cEngine {
    fn init(&mut self, config: &BusConfig) -> Result<(), DriverError> {
        let base = block_base(config.block()).ok_or(DriverError::Unsupported)?;
        let Protocol::I2c(i2c) = config.protocol() else {
            return Err(DriverError::Unsupported);
        };
        self.timing = timing(i2c.clock_hz, i2c.duty).ok_or(DriverError::Unsupported)?;
        if !rcc::enable(config.block()) {
            return Err(DriverError::RegisterBlockState);
        }
        self.base = base;
        if self.reg(CR1).is_set(CR1_PE) {
            return Err(DriverError::RegisterBlockState);
        }
        for (_, pin) in config.pins() {
            gpio::configure(pin);
        }
        self.configure();
        for irq in config.irqs() {
            nvic::enable(irq.vector, irq.priority);
        }
        Ok(())
    }

    fn start(&mut self, segment: &Segment<'_>) -> Result<(), DriverError> {
        if self.base == 0 {
            return Err(DriverError::RegisterBlockState);
        }
        if self.transfer.is_some() {
            return Err(DriverError::Busy);
        }
        let Target::Address(address) = segment.target else {
            return Err(DriverError::InvalidTarget);
        };
        if address > 0x7F {
            return Err(DriverError::InvalidTarget);
        }
        if segment.tx.len() > I2C_BUFFER || segment.rx_len > I2C_BUFFER {
            return Err(DriverError::Unsupported);
        }
        self.tx_buf[..segment.tx.len()].copy_from_slice(segment.tx);
        let phase = if segment.tx.is_empty() && segment.rx_len > 0 {
            Phase::Read
        } else {
            Phase::Write
        };
        self.transfer = Some(Transfer {
            address,
            phase,
            tx_len: segment.tx.len(),
            rx_len: segment.rx_len,
            done: 0,
            last: segment.last,
        });
        self.reg(CR1).set(CR1_START);
        Ok(())
    }

    fn on_interrupt(&mut self, line: IrqLine) -> IrqOutcome {
        match line {
            IrqLine::Error => self.on_error(),
            IrqLine::Event => match self.transfer {
                Some(t) => self.on_event(t),
                None => {
                    // Nothing running: silence the source.
                    self.reg(CR2).clear(CR2_ITBUFEN);
                    let _ = self.reg(SR1).read();
                    IrqOutcome::Pending
                }
            },
            _ => IrqOutcome::Pending,
        }
    }

    fn finish(&mut self, rx: &mut [u8]) -> usize {
        let Some(t) = self.transfer.take() else {
            return 0;
        };
        let n = rx.len().min(t.rx_len);
        rx[..n].copy_from_slice(&self.rx_buf[..n]);
        n
    }

    fn abort(&mut self) {
        self.transfer = None;
        if self.base == 0 {
            return;
        }
        // A stuck slave can hold SDA; a reset also clears BUSY.
        self.configure();
    }
}

//! SPI master engine, both directions on DMA.
//!
//! Segments are full duplex: `max(tx, rx_len)` bytes are exchanged, the
//! transmit side padded with `0xFF`, and byte `i` received lands in
//! `rx[i]`. Completion is the receive stream finishing.

use bus_manager::config::{
    BitOrder, ClockPhase, ClockPolarity, IrqLine, Pin, PinRole, Protocol,
    RegisterBlock, Vector, WordSize,
};
use bus_manager::{
    BusConfig, BusDriver, BusFault, DriverError, IrqOutcome, Segment, Target,
};
use heapless::Vec;

use crate::dma::{Stream, StreamEvent};
use crate::regs::{self, Reg};
use crate::{gpio, nvic, rcc};

pub const SPI_BUFFER: usize = 64;

const CR1: usize = 0x00;
const CR2: usize = 0x04;
const SR: usize = 0x08;
const DR: usize = 0x0C;

const CR1_CPHA: u32 = 1 << 0;
const CR1_CPOL: u32 = 1 << 1;
const CR1_MSTR: u32 = 1 << 2;
const CR1_SPE: u32 = 1 << 6;
const CR1_LSBFIRST: u32 = 1 << 7;
const CR1_SSI: u32 = 1 << 8;
const CR1_SSM: u32 = 1 << 9;
const CR2_RXDMAEN: u32 = 1 << 0;
const CR2_TXDMAEN: u32 = 1 << 1;

#[derive(Debug, Clone, Copy)]
struct Transfer {
    len: usize,
    rx_len: usize,
    last: bool,
}

pub struct SpiEngine {
    base: usize,
    /// Receive and transmit streams, set by `init`.
    streams: Option<(Stream, Stream)>,
    rx_vector: Option<Vector>,
    chip_selects: Vec<(u8, Pin), 4>,
    /// Chip select held low, kept across segments of one transaction.
    selected: Option<Pin>,
    transfer: Option<Transfer>,
    tx_buf: [u8; SPI_BUFFER],
    rx_buf: [u8; SPI_BUFFER],
}

impl Default for SpiEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SpiEngine {
    pub const fn new() -> Self {
        Self {
            base: 0,
            streams: None,
            rx_vector: None,
            chip_selects: Vec::new(),
            selected: None,
            transfer: None,
            tx_buf: [0xFF; SPI_BUFFER],
            rx_buf: [0; SPI_BUFFER],
        }
    }

    fn reg(&self, offset: usize) -> Reg {
        Reg::at(self.base, offset)
    }

    fn select(&mut self, cs: Pin) {
        if self.selected.is_some_and(|held| held != cs) {
            self.release();
        }
        gpio::set_low(cs);
        self.selected = Some(cs);
    }

    fn release(&mut self) {
        if let Some(cs) = self.selected.take() {
            gpio::set_high(cs);
        }
    }
}

fn block_base(block: RegisterBlock) -> Option<usize> {
    match block {
        RegisterBlock::Spi(1) => Some(regs::SPI1),
        RegisterBlock::Spi(2) => Some(regs::SPI2),
        RegisterBlock::Spi(3) => Some(regs::SPI3),
        _ => None,
    }
}

/// Baud-rate field for a power-of-two prescaler between 2 and 256.
fn baud_field(prescaler: u16) -> Option<u32> {
    if !prescaler.is_power_of_two() || !(2..=256).contains(&prescaler) {
        return None;
    }
    Some(prescaler.trailing_zeros() - 1)
}

impl BusDriver for SpiEngine {
    fn init(&mut self, config: &BusConfig) -> Result<(), DriverError> {
        let base = block_base(config.block()).ok_or(DriverError::Unsupported)?;
        let Protocol::Spi(timing) = config.protocol() else {
            return Err(DriverError::Unsupported);
        };
        if timing.word != WordSize::Bits8 || timing.crc.is_some() {
            return Err(DriverError::Unsupported);
        }
        let br = baud_field(timing.prescaler).ok_or(DriverError::Unsupported)?;
        let dma = config.dma().ok_or(DriverError::DmaUnavailable)?;
        if !rcc::enable(config.block()) {
            return Err(DriverError::RegisterBlockState);
        }
        self.base = base;
        if self.reg(CR1).is_set(CR1_SPE) {
            return Err(DriverError::RegisterBlockState);
        }

        for (role, pin) in config.pins() {
            if let PinRole::ChipSelect(n) = role {
                gpio::set_high(pin.pin);
                self.chip_selects
                    .push((*n, pin.pin))
                    .map_err(|_| DriverError::Unsupported)?;
            }
            gpio::configure(pin);
        }

        let mut cr1 = CR1_MSTR | CR1_SSM | CR1_SSI | (br << 3);
        if timing.polarity == ClockPolarity::IdleHigh {
            cr1 |= CR1_CPOL;
        }
        if timing.phase == ClockPhase::SecondEdge {
            cr1 |= CR1_CPHA;
        }
        if timing.bit_order == BitOrder::LsbFirst {
            cr1 |= CR1_LSBFIRST;
        }
        self.reg(CR1).write(cr1);
        self.reg(CR2).write(CR2_RXDMAEN | CR2_TXDMAEN);
        self.reg(CR1).set(CR1_SPE);

        let data = self.reg(DR).addr();
        let rx = Stream::new(&dma.rx);
        let tx = Stream::new(&dma.tx);
        rx.init(dma.rx.stream.controller, data, true);
        tx.init(dma.tx.stream.controller, data, false);
        self.streams = Some((rx, tx));

        for irq in config.irqs() {
            if irq.line == IrqLine::DmaRx {
                self.rx_vector = Some(irq.vector);
            }
            nvic::enable(irq.vector, irq.priority);
        }
        Ok(())
    }

    fn start(&mut self, segment: &Segment<'_>) -> Result<(), DriverError> {
        if self.transfer.is_some() {
            return Err(DriverError::Busy);
        }
        let (rx, tx) = self.streams.ok_or(DriverError::RegisterBlockState)?;
        let Target::ChipSelect(n) = segment.target else {
            return Err(DriverError::InvalidTarget);
        };
        let cs = self
            .chip_selects
            .iter()
            .find(|(index, _)| *index == n)
            .map(|(_, pin)| *pin)
            .ok_or(DriverError::InvalidTarget)?;
        let len = segment.tx.len().max(segment.rx_len);
        if len > SPI_BUFFER {
            return Err(DriverError::Unsupported);
        }

        self.tx_buf[..segment.tx.len()].copy_from_slice(segment.tx);
        self.tx_buf[segment.tx.len()..len].fill(0xFF);
        self.transfer =
            Some(Transfer { len, rx_len: segment.rx_len, last: segment.last });
        self.select(cs);

        if len == 0 {
            // Nothing to clock; complete through the receive vector.
            let vector = self.rx_vector.ok_or(DriverError::RegisterBlockState)?;
            nvic::pend(vector);
            return Ok(());
        }
        rx.start(self.rx_buf.as_mut_ptr() as usize, len);
        tx.start(self.tx_buf.as_ptr() as usize, len);
        Ok(())
    }

    fn on_interrupt(&mut self, line: IrqLine) -> IrqOutcome {
        let Some((rx, tx)) = self.streams else {
            return IrqOutcome::Pending;
        };
        let event = match line {
            IrqLine::DmaRx => rx.take_event(),
            IrqLine::DmaTx => tx.take_event(),
            _ => return IrqOutcome::Pending,
        };
        let Some(transfer) = self.transfer else {
            return IrqOutcome::Pending;
        };
        let done = match (line, event) {
            (_, StreamEvent::Error) => return IrqOutcome::Failed(BusFault::Dma),
            (IrqLine::DmaRx, StreamEvent::Complete) => true,
            (IrqLine::DmaRx, StreamEvent::Idle) => transfer.len == 0,
            _ => false,
        };
        if !done {
            return IrqOutcome::Pending;
        }
        if transfer.last {
            self.release();
        }
        IrqOutcome::Complete
    }

    fn finish(&mut self, rx: &mut [u8]) -> usize {
        let Some(transfer) = self.transfer.take() else {
            return 0;
        };
        let n = rx.len().min(transfer.rx_len);
        rx[..n].copy_from_slice(&self.rx_buf[..n]);
        n
    }

    fn abort(&mut self) {
        if let Some((rx, tx)) = self.streams {
            tx.stop();
            rx.stop();
            // Drop a stale byte and the overrun it flagged.
            let _ = self.reg(DR).read();
            let _ = self.reg(SR).read();
        }
        self.transfer = None;
        self.release();
    }
}

#![allow(dead_code)]

use core::convert::Infallible;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{self, I2c, Operation as I2cOperation};
use embedded_hal_async::spi::{self, Operation, SpiDevice};

// ---------------------------------------------------------------------------
// Register-file SPI device (MPU-6000 / BMA180 addressing)
// ---------------------------------------------------------------------------

/// First byte selects the register, bit 7 set means read. Subsequent
/// bytes auto-increment.
pub struct SpiRegisters {
    pub regs: [u8; 128],
    pub writes: Vec<(u8, u8)>,
    /// Register and bits that clear themselves after being written.
    pub self_clearing: Option<(u8, u8)>,
}

impl SpiRegisters {
    pub fn new() -> Self {
        Self { regs: [0; 128], writes: Vec::new(), self_clearing: None }
    }

    pub fn with(mut self, reg: u8, value: u8) -> Self {
        self.regs[reg as usize] = value;
        self
    }

    pub fn floating() -> Self {
        Self { regs: [0xFF; 128], ..Self::new() }
    }

    fn store(&mut self, reg: u8, value: u8) {
        self.writes.push((reg, value));
        let mut value = value;
        if let Some((r, mask)) = self.self_clearing {
            if r == reg {
                value &= !mask;
            }
        }
        self.regs[reg as usize] = value;
    }
}

impl spi::ErrorType for SpiRegisters {
    type Error = Infallible;
}

impl SpiDevice for SpiRegisters {
    async fn transaction(
        &mut self,
        operations: &mut [Operation<'_, u8>],
    ) -> Result<(), Infallible> {
        let mut cursor: Option<u8> = None;
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    for b in bytes.iter() {
                        match cursor {
                            None => cursor = Some(b & 0x7F),
                            Some(reg) => {
                                self.store(reg, *b);
                                cursor = Some((reg + 1) & 0x7F);
                            }
                        }
                    }
                }
                Operation::Read(buf) => {
                    let reg = cursor.unwrap_or(0);
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = self.regs[(reg as usize + i) & 0x7F];
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Serial flash answering JEDEC ID and status reads
// ---------------------------------------------------------------------------

pub struct Flash {
    pub jedec: [u8; 3],
    pub status: u8,
}

impl spi::ErrorType for Flash {
    type Error = Infallible;
}

impl SpiDevice for Flash {
    async fn transaction(
        &mut self,
        operations: &mut [Operation<'_, u8>],
    ) -> Result<(), Infallible> {
        let mut command = None;
        for op in operations {
            match op {
                Operation::Write(bytes) => command = bytes.first().copied(),
                Operation::Read(buf) => match command {
                    Some(0x9F) => {
                        let n = buf.len().min(3);
                        buf[..n].copy_from_slice(&self.jedec[..n]);
                    }
                    Some(0x05) => buf.fill(self.status),
                    _ => buf.fill(0xFF),
                },
                _ => {}
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// I2C target with a register file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nack;

impl i2c::Error for Nack {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    }
}

pub struct I2cRegisters {
    pub address: u8,
    pub regs: [u8; 256],
    pub writes: Vec<(u8, u8)>,
}

impl I2cRegisters {
    pub fn new(address: u8) -> Self {
        Self { address, regs: [0; 256], writes: Vec::new() }
    }

    pub fn with(mut self, reg: u8, bytes: &[u8]) -> Self {
        let start = reg as usize;
        self.regs[start..start + bytes.len()].copy_from_slice(bytes);
        self
    }
}

impl i2c::ErrorType for I2cRegisters {
    type Error = Nack;
}

impl I2c for I2cRegisters {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [I2cOperation<'_>],
    ) -> Result<(), Nack> {
        if address != self.address {
            return Err(Nack);
        }
        let mut cursor: Option<u8> = None;
        for op in operations {
            match op {
                I2cOperation::Write(bytes) => {
                    for b in bytes.iter() {
                        match cursor {
                            None => cursor = Some(*b),
                            Some(reg) => {
                                self.writes.push((reg, *b));
                                self.regs[reg as usize] = *b;
                                cursor = Some(reg.wrapping_add(1));
                            }
                        }
                    }
                }
                I2cOperation::Read(buf) => {
                    let reg = cursor.unwrap_or(0);
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = self.regs[reg.wrapping_add(i as u8) as usize];
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Delay that returns immediately and counts calls
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct NoDelay {
    pub calls: usize,
}

impl DelayNs for NoDelay {
    async fn delay_ns(&mut self, _ns: u32) {
        self.calls += 1;
    }
}

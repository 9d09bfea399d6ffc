//! Memory-mapped peripheral registers of the STM32F405.

use core::ptr::{read_volatile, write_volatile};

/// One 32-bit register, by address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reg(usize);

impl Reg {
    pub const fn at(base: usize, offset: usize) -> Self {
        Self(base + offset)
    }

    pub fn read(self) -> u32 {
        // SAFETY: only built from the peripheral map below, every address
        // is a word-aligned register of this part.
        unsafe { read_volatile(self.0 as *const u32) }
    }

    pub fn write(self, value: u32) {
        // SAFETY: as in `read`.
        unsafe { write_volatile(self.0 as *mut u32, value) }
    }

    pub fn modify(self, f: impl FnOnce(u32) -> u32) {
        self.write(f(self.read()));
    }

    pub fn set(self, mask: u32) {
        self.modify(|v| v | mask);
    }

    pub fn clear(self, mask: u32) {
        self.modify(|v| v & !mask);
    }

    pub fn is_set(self, mask: u32) -> bool {
        self.read() & mask != 0
    }

    pub const fn addr(self) -> usize {
        self.0
    }
}

/// Poll `done` at most `spins` times.
pub fn wait_for(spins: u32, mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..spins {
        if done() {
            return true;
        }
    }
    false
}

pub const RCC: usize = 0x4002_3800;
pub const FLASH: usize = 0x4002_3C00;
pub const GPIO: usize = 0x4002_0000;
pub const EXTI: usize = 0x4001_3C00;
pub const SYSCFG: usize = 0x4001_3800;
pub const TIM2: usize = 0x4000_0000;
pub const DMA1: usize = 0x4002_6000;
pub const DMA2: usize = 0x4002_6400;

pub const SPI1: usize = 0x4001_3000;
pub const SPI2: usize = 0x4000_3800;
pub const SPI3: usize = 0x4000_3C00;

pub const I2C1: usize = 0x4000_5400;
pub const I2C2: usize = 0x4000_5800;
pub const I2C3: usize = 0x4000_5C00;

pub const USART1: usize = 0x4001_1000;
pub const USART2: usize = 0x4000_4400;
pub const USART3: usize = 0x4000_4800;
pub const UART4: usize = 0x4000_4C00;
pub const UART5: usize = 0x4000_5000;
pub const USART6: usize = 0x4001_1400;

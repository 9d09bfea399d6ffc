//! Clock tree: 8 MHz crystal to a 168 MHz core, and peripheral clock
//! gates.

use bus_manager::config::{DmaController, Port, RegisterBlock};

use crate::regs::{self, wait_for, Reg};

pub const SYSCLK_HZ: u32 = 168_000_000;
/// APB1, a quarter of the core clock.
pub const PCLK1_HZ: u32 = SYSCLK_HZ / 4;
/// APB2, half the core clock.
pub const PCLK2_HZ: u32 = SYSCLK_HZ / 2;
/// Timers on a divided APB run at twice its clock.
pub const TIMER1_HZ: u32 = PCLK1_HZ * 2;

const CR: Reg = Reg::at(regs::RCC, 0x00);
const PLLCFGR: Reg = Reg::at(regs::RCC, 0x04);
const CFGR: Reg = Reg::at(regs::RCC, 0x08);
const AHB1ENR: Reg = Reg::at(regs::RCC, 0x30);
const APB1ENR: Reg = Reg::at(regs::RCC, 0x40);
const APB2ENR: Reg = Reg::at(regs::RCC, 0x44);
const FLASH_ACR: Reg = Reg::at(regs::FLASH, 0x00);

const CR_HSEON: u32 = 1 << 16;
const CR_HSERDY: u32 = 1 << 17;
const CR_PLLON: u32 = 1 << 24;
const CR_PLLRDY: u32 = 1 << 25;

const PLL_M: u32 = 8;
const PLL_N: u32 = 336;
/// Encodes a divide-by-two main output.
const PLL_P: u32 = 0;
const PLL_Q: u32 = 7;
const PLLSRC_HSE: u32 = 1 << 22;

const CFGR_SW_PLL: u32 = 0b10;
const CFGR_SWS_MASK: u32 = 0b11 << 2;
const CFGR_SWS_PLL: u32 = 0b10 << 2;
const CFGR_PPRE1_DIV4: u32 = 0b101 << 10;
const CFGR_PPRE2_DIV2: u32 = 0b100 << 13;

/// Five wait states with prefetch and both caches on.
const ACR_168MHZ: u32 = 5 | (1 << 8) | (1 << 9) | (1 << 10);

const STARTUP_SPINS: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    Crystal,
    Pll,
    Switch,
}

/// Run the core from the PLL fed by the crystal. Flash latency is raised
/// before the switch.
pub fn init() -> Result<(), ClockError> {
    CR.set(CR_HSEON);
    if !wait_for(STARTUP_SPINS, || CR.is_set(CR_HSERDY)) {
        return Err(ClockError::Crystal);
    }

    PLLCFGR.write(
        PLL_M | (PLL_N << 6) | (PLL_P << 16) | PLLSRC_HSE | (PLL_Q << 24),
    );
    CR.set(CR_PLLON);
    if !wait_for(STARTUP_SPINS, || CR.is_set(CR_PLLRDY)) {
        return Err(ClockError::Pll);
    }

    FLASH_ACR.write(ACR_168MHZ);
    CFGR.write(CFGR_PPRE1_DIV4 | CFGR_PPRE2_DIV2 | CFGR_SW_PLL);
    if !wait_for(STARTUP_SPINS, || CFGR.read() & CFGR_SWS_MASK == CFGR_SWS_PLL) {
        return Err(ClockError::Switch);
    }
    Ok(())
}

pub fn enable_port(port: Port) {
    AHB1ENR.set(1 << port_index(port));
}

pub fn enable_dma(controller: DmaController) {
    AHB1ENR.set(match controller {
        DmaController::Dma1 => 1 << 21,
        DmaController::Dma2 => 1 << 22,
    });
}

pub fn enable_syscfg() {
    APB2ENR.set(1 << 14);
}

pub fn enable_tim2() {
    APB1ENR.set(1 << 0);
}

/// Open the clock gate of `block`. `false` for blocks this part lacks.
pub fn enable(block: RegisterBlock) -> bool {
    let (reg, bit) = match block {
        RegisterBlock::Spi(1) => (APB2ENR, 12),
        RegisterBlock::Spi(2) => (APB1ENR, 14),
        RegisterBlock::Spi(3) => (APB1ENR, 15),
        RegisterBlock::I2c(n @ 1..=3) => (APB1ENR, 20 + u32::from(n)),
        RegisterBlock::Usart(1) => (APB2ENR, 4),
        RegisterBlock::Usart(n @ 2..=5) => (APB1ENR, 15 + u32::from(n)),
        RegisterBlock::Usart(6) => (APB2ENR, 5),
        _ => return false,
    };
    reg.set(1 << bit);
    true
}

/// Kernel clock of the bus `block` hangs off.
pub const fn bus_clock(block: RegisterBlock) -> u32 {
    match block {
        RegisterBlock::Spi(1) | RegisterBlock::Usart(1) | RegisterBlock::Usart(6) => {
            PCLK2_HZ
        }
        _ => PCLK1_HZ,
    }
}

pub const fn port_index(port: Port) -> usize {
    match port {
        Port::A => 0,
        Port::B => 1,
        Port::C => 2,
        Port::D => 3,
        Port::E => 4,
    }
}

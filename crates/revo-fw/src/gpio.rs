use bus_manager::config::{OutputType, Pin, PinConfig, PinMode, Pull, Speed};

use crate::rcc;
use crate::regs::{self, Reg};

const PORT_STRIDE: usize = 0x400;

fn reg(pin: Pin, offset: usize) -> Reg {
    Reg::at(regs::GPIO + rcc::port_index(pin.port) * PORT_STRIDE, offset)
}

/// Program mode, drive, speed, pull and alternate function of one pin.
pub fn configure(config: &PinConfig) {
    let pin = config.pin;
    rcc::enable_port(pin.port);
    let n = u32::from(pin.index);

    let (mode, af) = match config.mode {
        PinMode::Input => (0b00, None),
        PinMode::Output => (0b01, None),
        PinMode::Alternate(af) => (0b10, Some(u32::from(af))),
        PinMode::Analog => (0b11, None),
    };
    let speed = match config.speed {
        Speed::Mhz2 => 0b00,
        Speed::Mhz25 => 0b01,
        Speed::Mhz50 => 0b10,
        Speed::Mhz100 => 0b11,
    };
    let pull = match config.pull {
        Pull::None => 0b00,
        Pull::Up => 0b01,
        Pull::Down => 0b10,
    };

    if let Some(af) = af {
        let (afr, shift) = if n < 8 { (0x20, n * 4) } else { (0x24, (n - 8) * 4) };
        reg(pin, afr).modify(|v| (v & !(0xF << shift)) | (af << shift));
    }
    match config.output {
        OutputType::PushPull => reg(pin, 0x04).clear(1 << n),
        OutputType::OpenDrain => reg(pin, 0x04).set(1 << n),
    }
    reg(pin, 0x08).modify(|v| (v & !(0b11 << (2 * n))) | (speed << (2 * n)));
    reg(pin, 0x0C).modify(|v| (v & !(0b11 << (2 * n))) | (pull << (2 * n)));
    reg(pin, 0x00).modify(|v| (v & !(0b11 << (2 * n))) | (mode << (2 * n)));
}

pub fn set_high(pin: Pin) {
    reg(pin, 0x18).write(1 << pin.index);
}

pub fn set_low(pin: Pin) {
    reg(pin, 0x18).write(1 << (u32::from(pin.index) + 16));
}

//! Interrupt vectors and priority levels used by the board.

use bus_manager::config::{Priority, Vector};

/// Number of peripheral vectors on the STM32F405.
pub const VECTOR_COUNT: usize = 82;

pub const PRIO_HIGHEST: Priority = Priority::new(4, 0);
pub const PRIO_HIGH: Priority = Priority::new(5, 0);
pub const PRIO_MID: Priority = Priority::new(8, 0);
pub const PRIO_LOW: Priority = Priority::new(12, 0);

pub const EXTI4: Vector = Vector::new(10);
pub const DMA1_STREAM0: Vector = Vector::new(11);
pub const DMA1_STREAM3: Vector = Vector::new(14);
pub const DMA1_STREAM4: Vector = Vector::new(15);
pub const DMA1_STREAM5: Vector = Vector::new(16);
/// Shared by EXTI lines 5 to 9.
pub const EXTI9_5: Vector = Vector::new(23);
pub const I2C1_EV: Vector = Vector::new(31);
pub const I2C1_ER: Vector = Vector::new(32);
pub const I2C2_EV: Vector = Vector::new(33);
pub const I2C2_ER: Vector = Vector::new(34);
pub const USART1: Vector = Vector::new(37);
pub const UART4: Vector = Vector::new(52);
pub const DMA2_STREAM0: Vector = Vector::new(56);
pub const DMA2_STREAM3: Vector = Vector::new(59);
pub const USART6: Vector = Vector::new(71);
pub const I2C3_EV: Vector = Vector::new(72);
pub const I2C3_ER: Vector = Vector::new(73);

/// Every vector a bus or data-ready line of this board can raise. The
/// firmware installs one handler for each.
pub const ROUTED: [Vector; 17] = [
    EXTI4,
    DMA1_STREAM0,
    DMA1_STREAM3,
    DMA1_STREAM4,
    DMA1_STREAM5,
    EXTI9_5,
    I2C1_EV,
    I2C1_ER,
    I2C2_EV,
    I2C2_ER,
    USART1,
    UART4,
    DMA2_STREAM0,
    DMA2_STREAM3,
    USART6,
    I2C3_EV,
    I2C3_ER,
];

//! Interrupt controller access by vector number.

use bus_manager::config::{Priority, Vector, PRIORITY_BITS};
use cortex_m::interrupt::InterruptNumber;
use cortex_m::peripheral::{NVIC, SCB};

#[derive(Debug, Clone, Copy)]
struct Irqn(u16);

// SAFETY: built from board vectors, all below the device vector count.
unsafe impl InterruptNumber for Irqn {
    fn number(self) -> u16 {
        self.0
    }
}

impl From<Vector> for Irqn {
    fn from(vector: Vector) -> Self {
        Self(u16::from(vector.number()))
    }
}

const AIRCR_VECTKEY: u32 = 0x05FA << 16;
/// Every implemented priority bit selects preemption.
const AIRCR_PRIGROUP_ALL_PREEMPT: u32 = 3 << 8;

/// Give all priority bits to preemption. The board never assigns a
/// sub-priority.
pub fn init_grouping() {
    // SAFETY: runs once, before any vector is unmasked.
    let scb = unsafe { &*SCB::PTR };
    // SAFETY: a write carrying the key only changes the grouping field.
    unsafe { scb.aircr.write(AIRCR_VECTKEY | AIRCR_PRIGROUP_ALL_PREEMPT) };
}

/// Program `priority` on `vector` and unmask it.
pub fn enable(vector: Vector, priority: Priority) {
    let irq = Irqn::from(vector);
    let level = priority.preemption << (8 - PRIORITY_BITS);
    // SAFETY: changing the priority of a masked vector, then unmasking
    // it once its service is registered.
    unsafe {
        let mut nvic = cortex_m::Peripherals::steal().NVIC;
        NVIC::mask(irq);
        nvic.set_priority(irq, level);
        NVIC::unmask(irq);
    }
}

pub fn disable(vector: Vector) {
    NVIC::mask(Irqn::from(vector));
}

/// Raise `vector` from software.
pub fn pend(vector: Vector) {
    NVIC::pend(Irqn::from(vector));
}

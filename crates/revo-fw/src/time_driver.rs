//! 1 MHz time base on TIM2.
//!
//! The 32-bit counter is extended to 64 bits by counting half periods:
//! overflow and the compare at half range each advance `period`, so the
//! top bit of the counter and the low bit of `period` always agree after
//! the interrupt and `now` is consistent without a critical section.
//! Compare channel 1 is the wake-up alarm.

use core::cell::{Cell, RefCell};
use core::sync::atomic::{compiler_fence, AtomicU32, Ordering};
use core::task::Waker;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time_driver::Driver;
use embassy_time_queue_utils::Queue;

use crate::rcc;
use crate::regs::{self, Reg};

const CR1: Reg = Reg::at(regs::TIM2, 0x00);
const DIER: Reg = Reg::at(regs::TIM2, 0x0C);
const SR: Reg = Reg::at(regs::TIM2, 0x10);
const EGR: Reg = Reg::at(regs::TIM2, 0x14);
const CNT: Reg = Reg::at(regs::TIM2, 0x24);
const PSC: Reg = Reg::at(regs::TIM2, 0x28);
const ARR: Reg = Reg::at(regs::TIM2, 0x2C);
const CCR1: Reg = Reg::at(regs::TIM2, 0x34);
const CCR4: Reg = Reg::at(regs::TIM2, 0x40);

const CR1_CEN: u32 = 1 << 0;
const EGR_UG: u32 = 1 << 0;
// Same positions in DIER (enable) and SR (flag).
const UPDATE: u32 = 1 << 0;
const CC1: u32 = 1 << 1;
const CC4: u32 = 1 << 4;

const HALF: u32 = 1 << 31;
/// Alarms further out than this are armed by a later half period.
const ARM_WINDOW: u64 = 0xC000_0000;

const TICK_HZ: u32 = 1_000_000;

struct TimerDriver {
    period: AtomicU32,
    alarm_at: Mutex<CriticalSectionRawMutex, Cell<u64>>,
    queue: Mutex<CriticalSectionRawMutex, RefCell<Queue>>,
}

embassy_time_driver::time_driver_impl!(static DRIVER: TimerDriver = TimerDriver {
    period: AtomicU32::new(0),
    alarm_at: Mutex::new(Cell::new(u64::MAX)),
    queue: Mutex::new(RefCell::new(Queue::new())),
});

fn calc_now(period: u32, counter: u32) -> u64 {
    (u64::from(period) << 31) + u64::from(counter ^ ((period & 1) << 31))
}

/// Start counting. Called once the core runs from the PLL, since the
/// prescaler assumes that timer clock.
pub fn init() {
    rcc::enable_tim2();
    CR1.write(0);
    PSC.write(rcc::TIMER1_HZ / TICK_HZ - 1);
    ARR.write(u32::MAX);
    CCR4.write(HALF);
    // Load the prescaler without taking the update interrupt.
    EGR.write(EGR_UG);
    SR.write(0);
    DIER.write(UPDATE | CC4);
    CR1.write(CR1_CEN);
}

/// TIM2 interrupt body.
pub fn on_interrupt() {
    DRIVER.on_interrupt()
}

impl TimerDriver {
    fn on_interrupt(&self) {
        let sr = SR.read();
        let dier = DIER.read();
        SR.write(!(sr & (UPDATE | CC1 | CC4)));

        if sr & UPDATE != 0 {
            self.next_period();
        }
        if sr & CC4 != 0 {
            self.next_period();
        }
        if sr & dier & CC1 != 0 {
            self.alarm_at.lock(|alarm| alarm.set(u64::MAX));
            DIER.clear(CC1);
            self.run_queue();
        }
    }

    fn next_period(&self) {
        let period = self.period.fetch_add(1, Ordering::Relaxed) + 1;
        let t = u64::from(period) << 31;
        self.alarm_at.lock(|alarm| {
            let at = alarm.get();
            if at < t + ARM_WINDOW {
                // Now within range of the compare register.
                DIER.set(CC1);
            }
        });
    }

    fn run_queue(&self) {
        self.queue.lock(|queue| self.rearm(&mut queue.borrow_mut()));
    }

    /// Wake what is due and arm the alarm for the earliest remaining
    /// deadline.
    fn rearm(&self, queue: &mut Queue) {
        let mut next = queue.next_expiration(self.now());
        while !self.set_alarm(next) {
            next = queue.next_expiration(self.now());
        }
    }

    /// `false` if `timestamp` has already passed; the caller then runs
    /// the queue again.
    fn set_alarm(&self, timestamp: u64) -> bool {
        self.alarm_at.lock(|alarm| alarm.set(timestamp));
        if timestamp == u64::MAX {
            DIER.clear(CC1);
            return true;
        }

        let now = self.now();
        if timestamp <= now {
            self.alarm_at.lock(|alarm| alarm.set(u64::MAX));
            DIER.clear(CC1);
            return false;
        }

        CCR1.write(timestamp as u32);
        if timestamp - now < ARM_WINDOW {
            DIER.set(CC1);
        } else {
            DIER.clear(CC1);
        }

        // The counter may have passed the compare value while arming.
        if timestamp <= self.now() {
            self.alarm_at.lock(|alarm| alarm.set(u64::MAX));
            DIER.clear(CC1);
            return false;
        }
        true
    }
}

impl Driver for TimerDriver {
    fn now(&self) -> u64 {
        let period = self.period.load(Ordering::Relaxed);
        compiler_fence(Ordering::Acquire);
        calc_now(period, CNT.read())
    }

    fn schedule_wake(&self, at: u64, waker: &Waker) {
        self.queue.lock(|queue| {
            let mut queue = queue.borrow_mut();
            if queue.schedule_wake(at, waker) {
                self.rearm(&mut queue);
            }
        })
    }
}

//! Terminal fault handling. A halted board keeps interrupts disabled and
//! blinks a code on the fault indicator until it is reset.

use bus_manager::config::Vector;
use bus_manager::DispatchTable;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::board::FaultIndicator;

/// Code blinked when an interrupt fires that nothing registered.
pub const UNROUTED_VECTOR_CODE: u8 = 12;

const BLINK_MS: u32 = 200;
const GAP_MS: u32 = 1_000;

/// One round of the halt pattern: `code` blinks, then a pause.
pub fn blink<I: FaultIndicator>(code: u8, indicator: &mut I) {
    for _ in 0..code {
        indicator.set(true);
        indicator.pause(BLINK_MS);
        indicator.set(false);
        indicator.pause(BLINK_MS);
    }
    indicator.pause(GAP_MS);
}

pub fn halt<I: FaultIndicator>(code: u8, indicator: &mut I) -> ! {
    #[cfg(target_os = "none")]
    cortex_m::interrupt::disable();
    error!("halted with code {}", code);
    loop {
        blink(code, indicator);
    }
}

/// Body of a platform interrupt handler: dispatch `vector`, and halt if
/// it was never registered.
pub fn service_vector<M: RawMutex, I: FaultIndicator, const N: usize>(
    table: &DispatchTable<'_, M, N>,
    vector: Vector,
    indicator: &mut I,
) {
    if let Err(err) = table.dispatch(vector) {
        error!("vector {}: {:?}", vector.number(), err);
        halt(UNROUTED_VECTOR_CODE, indicator);
    }
}

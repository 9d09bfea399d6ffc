const _SERVO_5_6_USERS: u32 = 0
    + if cfg!(feature = "com-aux") { 1 } else { 0 }
    + if cfg!(feature = "debug-pins") { 1 } else { 0 };
const _: () = if _SERVO_5_6_USERS > 1 {
    panic!("com-aux and debug-pins both drive servo outputs 5/6.");
};

mod buses;
mod sensors;

pub use buses::*;
pub use sensors::*;

use bus_manager::config::PinConfig;
use bus_manager::validate::{validate, validate_data_ready};
use bus_manager::{BusConfig, ConfigError};
use heapless::Vec;

use crate::roles::BusRole;

pub const BUS_COUNT: usize = BusRole::ALL.len();

pub type BusSet = Vec<(BusRole, BusConfig), BUS_COUNT>;

cfg_if::cfg_if! {
    if #[cfg(feature = "debug-pins")] {
        use bus_manager::config::{Pin, Port, Pull, Speed};

        const fn probe(port: Port, index: u8) -> PinConfig {
            PinConfig::output(Pin::new(port, index), Speed::Mhz50, Pull::None)
        }

        /// Servo outputs 1 to 6, driven as timing probes.
        pub const DEBUG_PINS: &[PinConfig] = &[
            probe(Port::B, 0),
            probe(Port::B, 1),
            probe(Port::A, 3),
            probe(Port::A, 2),
            probe(Port::A, 1),
            probe(Port::A, 0),
        ];
    } else {
        pub const DEBUG_PINS: &[PinConfig] = &[];
    }
}

/// Heartbeat LED, also the indicator a halted board blinks its code on.
/// Active low.
pub const STATUS_LED: PinConfig = PinConfig::output(
    bus_manager::config::Pin::new(bus_manager::config::Port::B, 4),
    bus_manager::config::Speed::Mhz2,
    bus_manager::config::Pull::None,
);

/// Descriptors of every bus this build brings up, in bring-up order,
/// checked against each other and against the data-ready lines. Runs
/// before any hardware is touched.
pub fn enabled_buses() -> Result<BusSet, ConfigError> {
    let mut set = BusSet::new();
    for role in BusRole::ALL.into_iter().filter(|r| r.is_enabled()) {
        // Capacity covers every role.
        let _ = set.push((role, bus_config(role)?));
    }

    {
        let configs: Vec<&BusConfig, BUS_COUNT> =
            set.iter().map(|(_, config)| config).collect();
        validate(&configs)?;

        let lines = data_ready_lines()?;
        let drdy: Vec<_, 3> = lines.iter().map(|(_, line)| line).collect();
        validate_data_ready(&configs, &drdy)?;
    }

    Ok(set)
}

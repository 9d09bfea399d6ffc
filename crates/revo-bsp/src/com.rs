//! Queue sizes of the serial endpoints.

use crate::roles::ComRole;

pub const GPS_RX_CAPACITY: usize = 192;
pub const GPS_TX_CAPACITY: usize = 10;
pub const AUX_RX_CAPACITY: usize = 10;
pub const AUX_TX_CAPACITY: usize = 150;
pub const TELEM_RX_CAPACITY: usize = 512;
pub const TELEM_TX_CAPACITY: usize = 512;

/// Receive and transmit queue capacity in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ComCapacity {
    pub rx: usize,
    pub tx: usize,
}

impl ComRole {
    pub const fn capacity(&self) -> ComCapacity {
        match self {
            ComRole::Gps => {
                ComCapacity { rx: GPS_RX_CAPACITY, tx: GPS_TX_CAPACITY }
            }
            ComRole::Aux => {
                ComCapacity { rx: AUX_RX_CAPACITY, tx: AUX_TX_CAPACITY }
            }
            ComRole::Telemetry => {
                ComCapacity { rx: TELEM_RX_CAPACITY, tx: TELEM_TX_CAPACITY }
            }
        }
    }
}

//! What each bus, serial endpoint and device is used for on this board.

/// Boot stage a bus is brought up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusStage {
    NonVolatileStore,
    Communication,
    Sensor,
}

/// Every bus the board declares, in bring-up order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusRole {
    /// SPI3, W25X flash.
    Flash,
    /// USART1
    Gps,
    /// UART4
    Aux,
    /// USART6
    Telemetry,
    /// I2C1, HMC5883.
    Mag,
    /// I2C2, external connector.
    Flexiport,
    /// I2C3, BMP085.
    Pressure,
    /// SPI1, BMA180.
    Accel,
    /// SPI2, MPU6000.
    Gyro,
}

impl BusRole {
    pub const ALL: [BusRole; 9] = [
        BusRole::Flash,
        BusRole::Gps,
        BusRole::Aux,
        BusRole::Telemetry,
        BusRole::Mag,
        BusRole::Flexiport,
        BusRole::Pressure,
        BusRole::Accel,
        BusRole::Gyro,
    ];

    pub const fn stage(&self) -> BusStage {
        match self {
            BusRole::Flash => BusStage::NonVolatileStore,
            BusRole::Gps | BusRole::Aux | BusRole::Telemetry => {
                BusStage::Communication
            }
            BusRole::Mag
            | BusRole::Flexiport
            | BusRole::Pressure
            | BusRole::Accel
            | BusRole::Gyro => BusStage::Sensor,
        }
    }

    /// Whether this build brings the bus up. Disabled optional buses keep
    /// their descriptor; they are simply never initialized.
    pub const fn is_enabled(&self) -> bool {
        match self {
            BusRole::Gps => cfg!(feature = "gps"),
            BusRole::Aux => cfg!(feature = "com-aux"),
            BusRole::Telemetry => cfg!(feature = "com-telem"),
            BusRole::Flexiport => cfg!(feature = "flexiport-i2c"),
            BusRole::Flash
            | BusRole::Mag
            | BusRole::Pressure
            | BusRole::Accel
            | BusRole::Gyro => true,
        }
    }

    /// Missing optional buses are not a boot fault.
    pub const fn is_mandatory(&self) -> bool {
        !matches!(
            self,
            BusRole::Gps | BusRole::Aux | BusRole::Telemetry | BusRole::Flexiport
        )
    }

    pub const fn com(&self) -> Option<ComRole> {
        match self {
            BusRole::Gps => Some(ComRole::Gps),
            BusRole::Aux => Some(ComRole::Aux),
            BusRole::Telemetry => Some(ComRole::Telemetry),
            _ => None,
        }
    }
}

/// Byte-stream endpoints layered on the serial buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ComRole {
    Gps,
    Aux,
    Telemetry,
}

impl ComRole {
    pub const ALL: [ComRole; 3] = [ComRole::Gps, ComRole::Aux, ComRole::Telemetry];

    pub const fn bus_role(&self) -> BusRole {
        match self {
            ComRole::Gps => BusRole::Gps,
            ComRole::Aux => BusRole::Aux,
            ComRole::Telemetry => BusRole::Telemetry,
        }
    }
}

/// Devices attached to the board buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceRole {
    Flash,
    Gyro,
    Accel,
    Mag,
    Baro,
}

impl DeviceRole {
    /// Attachment order; the flash is attached with the store, before the
    /// others.
    pub const ALL: [DeviceRole; 5] = [
        DeviceRole::Flash,
        DeviceRole::Gyro,
        DeviceRole::Accel,
        DeviceRole::Mag,
        DeviceRole::Baro,
    ];

    /// The only bus this device may be attached to.
    pub const fn bus_role(&self) -> BusRole {
        match self {
            DeviceRole::Flash => BusRole::Flash,
            DeviceRole::Gyro => BusRole::Gyro,
            DeviceRole::Accel => BusRole::Accel,
            DeviceRole::Mag => BusRole::Mag,
            DeviceRole::Baro => BusRole::Pressure,
        }
    }

    /// An absent optional device is reported, not fatal.
    pub const fn is_mandatory(&self) -> bool {
        !matches!(self, DeviceRole::Baro)
    }

    /// Chip select index on SPI devices; I2C devices answer on their
    /// address.
    pub const fn chip_select(&self) -> Option<u8> {
        match self {
            DeviceRole::Flash | DeviceRole::Gyro | DeviceRole::Accel => Some(0),
            DeviceRole::Mag | DeviceRole::Baro => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_device_sits_on_an_enabled_mandatory_bus() {
        for device in DeviceRole::ALL {
            let bus = device.bus_role();
            assert!(bus.is_enabled());
            assert!(bus.is_mandatory());
        }
    }

    #[test]
    fn com_roles_round_trip_through_their_bus() {
        for com in ComRole::ALL {
            assert_eq!(com.bus_role().com(), Some(com));
            assert_eq!(com.bus_role().stage(), BusStage::Communication);
        }
    }
}

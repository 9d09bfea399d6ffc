use bus_manager::config::{
    DataReady, Edge, Pin, PinConfig, Port, Priority, Pull, Speed, Vector,
};
use bus_manager::ConfigError;
use heapless::Vec;
use revo_sensors::bma180::{self, Bandwidth, Range};
use revo_sensors::hmc5883::{self, Gain, Measurement, OutputRate};
use revo_sensors::mpu6000::{
    self, ClockSource, FifoSources, GyroRange, IntEnable, IntPinCfg, LowPass,
    UserCtrl,
};

use crate::irq;
use crate::roles::DeviceRole;

/// 8 kHz gyro rate divided down to 1 kHz, FIFO fed with temperature and
/// the three gyro axes.
pub const MPU6000_CONFIG: mpu6000::Config = mpu6000::Config {
    clock: ClockSource::PllGyroX,
    user_ctrl: UserCtrl::FIFO_EN,
    sample_divider: 7,
    filter: LowPass::Hz256,
    gyro_range: GyroRange::Dps500,
    fifo: FifoSources::TEMP
        .union(FifoSources::GYRO_X)
        .union(FifoSources::GYRO_Y)
        .union(FifoSources::GYRO_Z),
    int_pin: IntPinCfg::CLEAR_ANY_RD,
    int_enable: IntEnable::DATA_RDY,
};

pub const BMA180_CONFIG: bma180::Config = bma180::Config {
    range: Range::G8,
    bandwidth: Bandwidth::Hz600,
    data_ready: true,
};

pub const HMC5883_CONFIG: hmc5883::Config = hmc5883::Config {
    rate: OutputRate::Hz75,
    measurement: Measurement::Normal,
    gain: Gain::Ga1_9,
    mode: hmc5883::Mode::Continuous,
};

const fn drdy_pin(port: Port, index: u8) -> PinConfig {
    PinConfig::input(Pin::new(port, index), Speed::Mhz100, Pull::None)
}

/// Data-ready line of a sensor, `None` for devices without one.
pub fn data_ready(role: DeviceRole) -> Result<Option<DataReady>, ConfigError> {
    let (pin, line, vector, priority) = match role {
        DeviceRole::Mag => (drdy_pin(Port::B, 5), 5, irq::EXTI9_5, irq::PRIO_LOW),
        DeviceRole::Accel => (drdy_pin(Port::C, 4), 4, irq::EXTI4, irq::PRIO_LOW),
        DeviceRole::Gyro => {
            (drdy_pin(Port::D, 8), 8, irq::EXTI9_5, irq::PRIO_HIGH)
        }
        DeviceRole::Flash | DeviceRole::Baro => return Ok(None),
    };
    DataReady::new(pin, line, Edge::Rising, vector, priority).map(Some)
}

pub type DataReadyLines = Vec<(DeviceRole, DataReady), 3>;

/// Every data-ready line on the board.
pub fn data_ready_lines() -> Result<DataReadyLines, ConfigError> {
    let mut lines = DataReadyLines::new();
    for role in DeviceRole::ALL {
        if let Some(line) = data_ready(role)? {
            // Capacity matches the devices that have a line.
            let _ = lines.push((role, line));
        }
    }
    Ok(lines)
}

/// Priority to program for a vector shared by several lines: the most
/// urgent of them, since the controller holds one priority per vector.
pub fn shared_vector_priority(
    lines: &[(DeviceRole, DataReady)],
    vector: Vector,
) -> Option<Priority> {
    lines
        .iter()
        .map(|(_, line)| line)
        .filter(|line| line.vector() == vector)
        .map(|line| line.priority())
        .min_by_key(|p| (p.preemption, p.sub))
}

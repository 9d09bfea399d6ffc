mod common;

use common::{Flash, I2cRegisters, NoDelay, SpiRegisters};
use revo_sensors::bma180::{self, Bandwidth, Range};
use revo_sensors::bmp085::{self, Calibration};
use revo_sensors::hmc5883::{self, Gain, Measurement, OutputRate};
use revo_sensors::mpu6000::{
    self, ClockSource, FifoSources, GyroRange, IntEnable, IntPinCfg, LowPass,
    UserCtrl,
};
use revo_sensors::{Bma180, Bmp085, Error, Hmc5883, Mpu6000, W25x};

fn mpu_config() -> mpu6000::Config {
    mpu6000::Config {
        clock: ClockSource::PllGyroX,
        user_ctrl: UserCtrl::FIFO_EN,
        sample_divider: 7,
        filter: LowPass::Hz256,
        gyro_range: GyroRange::Dps500,
        fifo: FifoSources::TEMP
            | FifoSources::GYRO_X
            | FifoSources::GYRO_Y
            | FifoSources::GYRO_Z,
        int_pin: IntPinCfg::CLEAR_ANY_RD,
        int_enable: IntEnable::DATA_RDY,
    }
}

#[futures_test::test]
async fn mpu6000_programs_registers_in_order() {
    let mut spi = SpiRegisters::new().with(0x75, 0x68);
    spi.self_clearing = Some((0x6B, 0x80));
    let mut mpu = Mpu6000::new(spi, NoDelay::default());

    mpu.init(&mpu_config()).await.unwrap();

    let (spi, delay) = mpu.release();
    assert_eq!(
        spi.writes,
        vec![
            (0x6B, 0x80),
            (0x6B, 0x01),
            (0x6A, 0x50),
            (0x19, 7),
            (0x1A, 0x00),
            (0x1B, 0x08),
            (0x23, 0xF0),
            (0x37, 0x10),
            (0x38, 0x01),
        ]
    );
    assert_eq!(delay.calls, 1);
}

#[futures_test::test]
async fn mpu6000_stuck_in_reset_times_out() {
    let spi = SpiRegisters::new().with(0x75, 0x68);
    let mut mpu = Mpu6000::new(spi, NoDelay::default());

    assert_eq!(mpu.init(&mpu_config()).await, Err(Error::ResetTimeout));
    let (_, delay) = mpu.release();
    assert_eq!(delay.calls, 15);
}

#[futures_test::test]
async fn mpu6000_floating_bus_is_absent_and_untouched() {
    let mut mpu = Mpu6000::new(SpiRegisters::floating(), NoDelay::default());

    assert_eq!(mpu.init(&mpu_config()).await, Err(Error::Absent));
    let (spi, _) = mpu.release();
    assert!(spi.writes.is_empty());
}

#[futures_test::test]
async fn mpu6000_other_part_is_a_mismatch() {
    let spi = SpiRegisters::new().with(0x75, 0x70);
    let mut mpu = Mpu6000::new(spi, NoDelay::default());

    assert_eq!(
        mpu.probe().await,
        Err(Error::Mismatch { expected: 0x68, found: 0x70 })
    );
}

#[futures_test::test]
async fn bma180_preserves_neighbouring_bits() {
    let spi = SpiRegisters::new()
        .with(0x00, 0x03)
        .with(0x35, 0b0000_0001)
        .with(0x20, 0b0000_0101);
    let mut bma = Bma180::new(spi, NoDelay::default());

    bma.init(&bma180::Config {
        range: Range::G8,
        bandwidth: Bandwidth::Hz600,
        data_ready: true,
    })
    .await
    .unwrap();

    let (spi, delay) = bma.release();
    assert_eq!(spi.writes[0], (0x10, 0xB6));
    assert_eq!(spi.writes[1], (0x0D, 0x10));
    assert_eq!(spi.regs[0x35], 0b0000_1011);
    assert_eq!(spi.regs[0x20], 0b0110_0101);
    assert_eq!(spi.regs[0x21], 0b0000_0010);
    // Image registers locked again.
    assert_eq!(spi.regs[0x0D] & 0x10, 0);
    assert_eq!(delay.calls, 1);
}

#[futures_test::test]
async fn bma180_absent() {
    let spi = SpiRegisters::new();
    let mut bma = Bma180::new(spi, NoDelay::default());
    assert_eq!(bma.probe().await, Err(Error::Absent));
}

fn hmc_config() -> hmc5883::Config {
    hmc5883::Config {
        rate: OutputRate::Hz75,
        measurement: Measurement::Normal,
        gain: Gain::Ga1_9,
        mode: hmc5883::Mode::Continuous,
    }
}

#[futures_test::test]
async fn hmc5883_identifies_and_configures() {
    let i2c = I2cRegisters::new(hmc5883::ADDRESS).with(0x0A, b"H43");
    let mut mag = Hmc5883::new(i2c);

    mag.init(&hmc_config()).await.unwrap();

    let i2c = mag.release();
    assert_eq!(i2c.writes, vec![(0x00, 0x18), (0x01, 0x40), (0x02, 0x00)]);
}

#[futures_test::test]
async fn hmc5883_unanswered_address_is_absent() {
    let i2c = I2cRegisters::new(0x1D);
    let mut mag = Hmc5883::new(i2c);

    assert_eq!(mag.init(&hmc_config()).await, Err(Error::Absent));
    assert!(mag.release().writes.is_empty());
}

#[futures_test::test]
async fn hmc5883_wrong_identity() {
    let i2c = I2cRegisters::new(hmc5883::ADDRESS).with(0x0A, b"H44");
    let mut mag = Hmc5883::new(i2c);

    assert_eq!(
        mag.probe().await,
        Err(Error::Mismatch { expected: 0x483433, found: 0x483434 })
    );
}

const BMP085_EEPROM: [u8; 22] = [
    0x01, 0x98, 0xFF, 0xB8, 0xC7, 0xD1, 0x7F, 0xE5, 0x7F, 0xF5, 0x5A, 0x71,
    0x18, 0x2E, 0x00, 0x04, 0x80, 0x00, 0xDD, 0xF9, 0x0B, 0x34,
];

#[futures_test::test]
async fn bmp085_loads_calibration() {
    let i2c = I2cRegisters::new(bmp085::ADDRESS)
        .with(0xD0, &[0x55])
        .with(0xAA, &BMP085_EEPROM);
    let mut baro = Bmp085::new(i2c);

    let cal = baro.init().await.unwrap();

    assert_eq!(
        cal,
        Calibration {
            ac1: 408,
            ac2: -72,
            ac3: -14383,
            ac4: 32741,
            ac5: 32757,
            ac6: 23153,
            b1: 6190,
            b2: 4,
            mb: -32768,
            mc: -8711,
            md: 2868,
        }
    );
    assert_eq!(baro.calibration(), Some(&cal));
}

#[futures_test::test]
async fn bmp085_erased_calibration_is_rejected() {
    let i2c = I2cRegisters::new(bmp085::ADDRESS).with(0xD0, &[0x55]);
    let mut baro = Bmp085::new(i2c);

    assert_eq!(baro.init().await, Err(Error::BadCalibration));
    assert_eq!(baro.calibration(), None);
}

#[futures_test::test]
async fn bmp085_unanswered_address_is_absent() {
    let mut baro = Bmp085::new(I2cRegisters::new(0x50));

    assert_eq!(baro.probe().await, Err(Error::Absent));
}

#[futures_test::test]
async fn w25x_reports_capacity() {
    let mut flash = W25x::new(Flash { jedec: [0xEF, 0x30, 0x16], status: 0 });

    let id = flash.init().await.unwrap();

    assert_eq!(id.size_bytes(), 4 * 1024 * 1024);
    assert_eq!(flash.is_busy().await, Ok(false));
}

#[futures_test::test]
async fn w25x_other_vendor_is_a_mismatch() {
    let mut flash = W25x::new(Flash { jedec: [0xC2, 0x20, 0x16], status: 0x01 });

    assert_eq!(
        flash.init().await,
        Err(Error::Mismatch { expected: 0xEF, found: 0xC2 })
    );
    assert_eq!(flash.is_busy().await, Ok(true));
}

use embassy_time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPolarity {
    IdleLow,
    IdleHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPhase {
    /// Sample on the first clock transition.
    FirstEdge,
    /// Sample on the second clock transition.
    SecondEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WordSize {
    Bits8,
    Bits16,
}

/// SPI master timing. The bus clock is the peripheral clock divided by
/// `prescaler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiTiming {
    pub prescaler: u16,
    pub polarity: ClockPolarity,
    pub phase: ClockPhase,
    pub word: WordSize,
    pub bit_order: BitOrder,
    /// CRC polynomial, `None` when hardware CRC is off.
    pub crc: Option<u16>,
}

impl SpiTiming {
    /// Clock idles high, data sampled on the second edge (SPI mode 3),
    /// 8-bit MSB-first words, no CRC.
    pub const fn mode3(prescaler: u16) -> Self {
        Self {
            prescaler,
            polarity: ClockPolarity::IdleHigh,
            phase: ClockPhase::SecondEdge,
            word: WordSize::Bits8,
            bit_order: BitOrder::MsbFirst,
            crc: None,
        }
    }
}

/// Fast-mode low/high clock ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DutyCycle {
    Ratio2,
    Ratio16To9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cTiming {
    pub clock_hz: u32,
    pub duty: DutyCycle,
    /// Upper bound for a single transfer segment, arbitration and
    /// clock stretching included.
    pub transfer_timeout: Duration,
}

/// Highest clock the two-wire peripheral supports (fast mode).
pub const I2C_MAX_CLOCK_HZ: u32 = 400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Eight,
    Nine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    Half,
    One,
    OneAndHalf,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlowControl {
    None,
    Rts,
    Cts,
    RtsCts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsartTiming {
    pub baud: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow: FlowControl,
}

impl UsartTiming {
    /// 8N1 without flow control.
    pub const fn n81(baud: u32) -> Self {
        Self {
            baud,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow: FlowControl::None,
        }
    }
}

/// Protocol parameters, one variant per bus class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    Spi(SpiTiming),
    I2c(I2cTiming),
    Usart(UsartTiming),
}

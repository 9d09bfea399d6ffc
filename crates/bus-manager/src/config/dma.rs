#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaController {
    Dma1,
    Dma2,
}

/// One stream of a DMA controller. A stream serves exactly one
/// (bus, direction) pair for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaStream {
    pub controller: DmaController,
    pub stream: u8,
}

impl DmaStream {
    pub const fn new(controller: DmaController, stream: u8) -> Self {
        Self { controller, stream }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaDirection {
    PeripheralToMemory,
    MemoryToPeripheral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaPriority {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Burst {
    Single,
    Incr4,
    Incr8,
    Incr16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoThreshold {
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

/// Direct mode bypasses the stream FIFO; the threshold only matters when
/// the FIFO is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoPolicy {
    Direct,
    Fifo(FifoThreshold),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaConfig {
    pub stream: DmaStream,
    /// Request channel selecting which peripheral drives the stream.
    pub channel: u8,
    pub direction: DmaDirection,
    pub priority: DmaPriority,
    pub fifo: FifoPolicy,
    pub memory_burst: Burst,
    pub peripheral_burst: Burst,
}

impl DmaConfig {
    /// Byte-wide, single-beat stream without FIFO.
    pub const fn single(
        stream: DmaStream,
        channel: u8,
        direction: DmaDirection,
        priority: DmaPriority,
    ) -> Self {
        Self {
            stream,
            channel,
            direction,
            priority,
            fifo: FifoPolicy::Direct,
            memory_burst: Burst::Single,
            peripheral_burst: Burst::Single,
        }
    }
}

/// Receive and transmit streams of one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaPair {
    pub rx: DmaConfig,
    pub tx: DmaConfig,
}

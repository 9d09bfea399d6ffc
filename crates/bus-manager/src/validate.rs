//! Cross-descriptor resource checks.
//!
//! Run over the complete descriptor set before any hardware is touched. A
//! register block, DMA stream, pin or bus interrupt vector belongs to at
//! most one descriptor.

use crate::config::{BusConfig, DataReady};
use crate::error::{ConfigError, Resource};

fn collision(resource: Resource, first: usize, second: usize) -> ConfigError {
    ConfigError::Collision { resource, first, second }
}

/// Check that no two `configs` claim the same register block, DMA
/// stream, pin or interrupt vector. Indices in the error refer to
/// positions in `configs`.
pub fn validate(configs: &[&BusConfig]) -> Result<(), ConfigError> {
    for (i, a) in configs.iter().enumerate() {
        for (j, b) in configs.iter().enumerate().skip(i + 1) {
            if a.block() == b.block() {
                return Err(collision(Resource::RegisterBlock(a.block()), i, j));
            }
            for stream in a.dma_streams() {
                if b.dma_streams().any(|s| s == stream) {
                    return Err(collision(Resource::DmaStream(stream), i, j));
                }
            }
            for (_, pin) in a.pins() {
                if b.pins().iter().any(|(_, p)| p.pin == pin.pin) {
                    return Err(collision(Resource::Pin(pin.pin), i, j));
                }
            }
            for irq in a.irqs() {
                if b.irqs().iter().any(|other| other.vector == irq.vector) {
                    return Err(collision(Resource::Vector(irq.vector), i, j));
                }
            }
        }
    }
    Ok(())
}

/// Check data-ready lines against each other and against `buses`.
///
/// Data-ready pins must not be claimed by a bus and each external
/// interrupt line serves one sensor. Several lines may share a vector
/// (EXTI5..9 fire one vector); a vector used by a bus may not be reused.
/// Indices in a collision refer to positions in `lines`, except for the
/// second index of a bus collision, which is a position in `buses`.
pub fn validate_data_ready(
    buses: &[&BusConfig],
    lines: &[&DataReady],
) -> Result<(), ConfigError> {
    for (i, a) in lines.iter().enumerate() {
        for (j, b) in lines.iter().enumerate().skip(i + 1) {
            if a.line() == b.line() {
                return Err(collision(Resource::ExtiLine(a.line()), i, j));
            }
            if a.pin().pin == b.pin().pin {
                return Err(collision(Resource::Pin(a.pin().pin), i, j));
            }
        }
        for (j, bus) in buses.iter().enumerate() {
            let pin = a.pin().pin;
            if bus.pins().iter().any(|(_, p)| p.pin == pin) {
                return Err(collision(Resource::Pin(pin), i, j));
            }
            if bus.irqs().iter().any(|irq| irq.vector == a.vector()) {
                return Err(collision(Resource::Vector(a.vector()), i, j));
            }
        }
    }
    Ok(())
}

#![no_std]
//! Board support for the Revolution flight controller: bus, sensor and
//! serial endpoint descriptors, interrupt vectors and build-time port
//! selection.

mod board;
pub mod com;
pub mod irq;
mod roles;

// Flatten
pub use board::*;
pub use roles::*;

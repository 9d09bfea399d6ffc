#![no_std]
//! Bring-up drivers for the sensors and flash of the Revolution board.
//!
//! Each driver verifies its device identity and programs the registers the
//! board needs; measurement decoding is left to the consumers.

pub mod bma180;
pub mod bmp085;
mod error;
pub mod hmc5883;
pub mod mpu6000;
pub mod w25x;

pub use bma180::Bma180;
pub use bmp085::Bmp085;
pub use error::Error;
pub use hmc5883::Hmc5883;
pub use mpu6000::Mpu6000;
pub use w25x::W25x;

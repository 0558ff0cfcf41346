//! Device drivers for the twine I2C bus
//!
//! Drivers program against [`twine_hal::I2cBus`], so they run on the
//! PSoC 6 master, the simulated controller, or any other implementation:
//!
//! - Accelerometer (LSM303AGR)
//! - Segment e-paper digit encoding

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod display;
pub mod sensor;

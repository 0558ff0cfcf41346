//! PSoC 6 support for the twine I2C engine
//!
//! This crate binds the board-agnostic engine to the PSoC 6 CM4 core:
//!
//! - [`mmio::Mmio`] - volatile implementation of `RegisterAccess`
//! - [`scb`] - SCB0 register map and the port 6 I2C pin routing
//! - [`gpio`] - port pins for side-band lines and pin-name parsing
//! - [`wait::CycleWait`] - poll pacing in core clock cycles
//!
//! # Usage
//!
//! ```ignore
//! let regs = unsafe { Mmio::steal() };
//! let mut bus = scb::scb0_master(regs, CycleWait::new(8), BusConfig::default());
//! bus.init()?;
//! ```

#![no_std]

pub mod gpio;
pub mod mmio;
pub mod scb;
pub mod wait;

pub use mmio::Mmio;
pub use twine_hal::{InputPin, OutputPin, RegisterAccess};

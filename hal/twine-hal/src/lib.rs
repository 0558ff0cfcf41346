//! Twine Hardware Abstraction Layer
//!
//! This crate defines the hardware abstraction traits shared by the I2C
//! master engine, the chip-specific HALs and the device drivers. Code above
//! this crate never touches a hardware address directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Drivers / firmware (twine-drivers)     │
//! └─────────────────────────────────────────┘
//!                     │  I2cBus
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  Transaction engine (twine-core)        │
//! └─────────────────────────────────────────┘
//!                     │  RegisterAccess
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ twine-hal-    │       │ simulated SCB │
//! │    psoc6      │       │   (tests)     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`mmio::RegisterAccess`] - Word-wide register reads and writes
//! - [`i2c::I2cBus`] - Register-oriented I2C transfers
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;
pub mod mmio;

// Re-export key traits at crate root for convenience
pub use gpio::{InputPin, OutputPin};
pub use i2c::{I2cBus, I2cConfig};
pub use mmio::RegisterAccess;

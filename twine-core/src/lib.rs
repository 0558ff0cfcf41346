//! Board-agnostic I2C master engine
//!
//! Drives the I2C master of an SCB-style serial controller through a
//! [`RegisterAccess`](twine_hal::RegisterAccess) implementation:
//!
//! - Register map and pin routing as data ([`regs`])
//! - Bounded polling with pluggable wait strategies ([`wait`])
//! - Phase-by-phase transaction sequencing ([`engine`])
//! - The public master handle and bus bring-up ([`master`])
//! - A behavioral controller model for host tests (`sim` feature)
//!
//! ```text
//! driver ──► I2cBus / embedded-hal I2c
//!                    │
//!                I2cMaster ──► Sequencer ──► wait_until
//!                    │              │
//!                    └──────► RegisterAccess ◄── Mmio (target) / SimScb (host)
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

mod fmt;

pub mod config;
pub mod engine;
pub mod error;
pub mod master;
pub mod regs;
pub mod wait;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use config::{BusConfig, ConfigError, TimeoutBudgets};
pub use engine::{Phase, Transaction};
pub use error::{Error, Stage};
pub use master::{I2cMaster, InterruptSnapshot};
pub use regs::{PinRouting, ScbRegisters};
pub use wait::{Spin, WaitStrategy};

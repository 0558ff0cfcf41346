//! Sensors

pub mod lsm303agr;

pub use lsm303agr::{Acceleration, DataRate, Lsm303Config, Lsm303Error, Lsm303agr};

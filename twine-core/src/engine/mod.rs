//! Transaction engine
//!
//! Runs one I2C transaction as an explicit sequence of phases. Each phase
//! pushes at most one byte per step and waits on a single controller bit
//! with its own budget, so every failure maps to a named reason and the
//! number of bytes moved before it stays observable.

pub mod phase;
pub mod sequencer;

pub use phase::Phase;
pub use sequencer::{Direction, Sequencer, Transaction, TransferData};

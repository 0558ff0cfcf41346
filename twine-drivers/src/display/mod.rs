//! Displays

pub mod segment;

pub use segment::{SegmentError, SegmentFrame};

//! Transaction phases

use crate::error::Error;

/// Where a transaction is, or where it ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No transaction has run
    #[default]
    Idle,
    /// Address byte (write direction, or first read header) on the wire
    AddressWrite,
    /// Register pointer byte on the wire
    RegisterPointer,
    /// Payload bytes being written
    DataTransfer,
    /// Repeated START with the read-direction address
    RepeatedStartAddressRead,
    /// Payload bytes being received
    DataReceive,
    /// STOP issued, waiting for the bus to go idle
    Stop,
    /// Transaction completed
    Done,
    /// Transaction aborted
    Failed(Error),
}

impl Phase {
    const fn rank(&self) -> u8 {
        match self {
            Phase::Idle => 0,
            Phase::AddressWrite => 1,
            Phase::RegisterPointer => 2,
            Phase::DataTransfer => 3,
            Phase::RepeatedStartAddressRead => 4,
            Phase::DataReceive => 5,
            Phase::Stop => 6,
            Phase::Done | Phase::Failed(_) => 7,
        }
    }

    /// Transaction has finished, successfully or not
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed(_))
    }

    pub const fn is_failed(&self) -> bool {
        matches!(self, Phase::Failed(_))
    }

    /// Failure reason of a failed transaction
    pub const fn failure(&self) -> Option<Error> {
        match self {
            Phase::Failed(error) => Some(*error),
            _ => None,
        }
    }

    /// Whether `next` may follow `self`
    ///
    /// Phases only move forward, except that a repeated START may return
    /// to an address phase, and any live phase may fail.
    pub const fn may_advance_to(&self, next: &Phase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Phase::Failed(_) => true,
            Phase::AddressWrite | Phase::RepeatedStartAddressRead
                if !matches!(self, Phase::Idle | Phase::Stop) =>
            {
                true
            }
            _ => next.rank() > self.rank(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only() {
        assert!(Phase::Idle.may_advance_to(&Phase::AddressWrite));
        assert!(Phase::AddressWrite.may_advance_to(&Phase::RegisterPointer));
        assert!(Phase::RegisterPointer.may_advance_to(&Phase::RepeatedStartAddressRead));
        assert!(Phase::DataReceive.may_advance_to(&Phase::Stop));
        assert!(Phase::Stop.may_advance_to(&Phase::Done));
        assert!(!Phase::DataTransfer.may_advance_to(&Phase::RegisterPointer));
        assert!(!Phase::Stop.may_advance_to(&Phase::DataReceive));
    }

    #[test]
    fn test_repeated_start_returns_to_address() {
        assert!(Phase::DataReceive.may_advance_to(&Phase::AddressWrite));
        assert!(Phase::DataTransfer.may_advance_to(&Phase::RepeatedStartAddressRead));
        assert!(!Phase::Stop.may_advance_to(&Phase::AddressWrite));
    }

    #[test]
    fn test_terminal_phases_are_final() {
        let failed = Phase::Failed(Error::AddressNack);
        assert!(failed.is_terminal());
        assert!(failed.is_failed());
        assert_eq!(failed.failure(), Some(Error::AddressNack));
        assert!(!failed.may_advance_to(&Phase::Done));
        assert!(!Phase::Done.may_advance_to(&Phase::Idle));
        assert!(Phase::DataTransfer.may_advance_to(&Phase::Failed(Error::StopTimeout)));
    }
}

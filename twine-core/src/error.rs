//! Transaction failure reasons
//!
//! Every failure names the step that went wrong so a caller can tell a
//! missing device from a busy bus or a wedged controller.

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Step of a transaction that pushes a byte and waits for completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// Address byte after the initial START
    Address,
    /// Register pointer byte
    Pointer,
    /// Payload byte of a write
    Data,
    /// Address byte after a repeated START
    ReadAddress,
}

/// I2C master failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Bus did not become idle before the transaction could start
    BusBusyTimeout,
    /// Transmit FIFO stayed full
    TxFifoTimeout(Stage),
    /// Controller never reported the byte phase as complete
    ByteCompletionTimeout(Stage),
    /// No device acknowledged the address
    AddressNack,
    /// Device rejected the register pointer
    PointerNack,
    /// Device rejected a payload byte
    DataNack {
        /// Index of the rejected byte within its write buffer
        index: usize,
    },
    /// Device stopped responding after the repeated START
    ReadAddressNack,
    /// Receive FIFO stayed empty
    RxFifoTimeout {
        /// Index of the missing byte within its read buffer
        index: usize,
    },
    /// Bus did not return to idle after STOP
    StopTimeout,
    /// Another master won arbitration
    ArbitrationLost,
    /// Transaction attempted before `init`
    NotInitialized,
    /// Read requested with a zero length
    EmptyRead,
    /// Address does not fit in seven bits
    InvalidAddress(u8),
}

impl Error {
    /// Distinct negative status code for each failure
    ///
    /// Codes are stable so they can be logged or reported over a link
    /// without carrying the enum itself.
    pub const fn status_code(&self) -> i16 {
        match self {
            Error::BusBusyTimeout => -1,
            Error::TxFifoTimeout(_) => -2,
            Error::ByteCompletionTimeout(Stage::Address) => -3,
            Error::AddressNack => -4,
            Error::ByteCompletionTimeout(Stage::Pointer) => -5,
            Error::PointerNack => -6,
            Error::ByteCompletionTimeout(Stage::Data) => -7,
            Error::DataNack { .. } => -8,
            Error::ByteCompletionTimeout(Stage::ReadAddress) => -9,
            Error::ReadAddressNack => -10,
            Error::RxFifoTimeout { .. } => -11,
            Error::StopTimeout => -12,
            Error::ArbitrationLost => -13,
            Error::NotInitialized => -14,
            Error::EmptyRead => -100,
            Error::InvalidAddress(_) => -101,
        }
    }

    /// True for failures caused by a peer not acknowledging
    pub const fn is_nack(&self) -> bool {
        matches!(
            self,
            Error::AddressNack
                | Error::PointerNack
                | Error::DataNack { .. }
                | Error::ReadAddressNack
        )
    }

    /// True for failures caused by an exhausted wait budget
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::BusBusyTimeout
                | Error::TxFifoTimeout(_)
                | Error::ByteCompletionTimeout(_)
                | Error::RxFifoTimeout { .. }
                | Error::StopTimeout
        )
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::AddressNack | Error::ReadAddressNack => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            }
            Error::PointerNack | Error::DataNack { .. } => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
            }
            Error::ArbitrationLost => ErrorKind::ArbitrationLoss,
            Error::BusBusyTimeout | Error::StopTimeout => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}

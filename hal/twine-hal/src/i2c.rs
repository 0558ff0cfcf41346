//! I2C bus abstractions
//!
//! Provides the register-oriented transfer contract that device drivers
//! program against. Every transfer addresses one register of one device:
//! the register pointer byte always follows the device address.

/// Register-oriented I2C master
///
/// Implementations run one complete bus transaction per call and return
/// only after the bus has been released (or the transaction failed).
/// Calls are not reentrant: callers sharing a bus between execution
/// contexts must serialize access themselves.
pub trait I2cBus {
    /// Error type for I2C operations
    type Error;

    /// Write a single byte to a device register
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `register` - Device register pointer
    /// * `value` - Byte to store
    fn write_byte(&mut self, address: u8, register: u8, value: u8) -> Result<(), Self::Error> {
        self.write_bytes(address, register, &[value])
    }

    /// Write consecutive bytes starting at a device register
    ///
    /// An empty `data` slice only moves the device's register pointer.
    fn write_bytes(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read a single byte from a device register
    fn read_byte(&mut self, address: u8, register: u8) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.read_into(address, register, &mut buf)?;
        Ok(buf[0])
    }

    /// Read `buf.len()` consecutive bytes starting at a device register
    ///
    /// The first byte received lands in `buf[0]`. On error the contents of
    /// `buf` are unspecified and must not be trusted.
    fn read_into(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), Self::Error>;
}

impl<T: I2cBus + ?Sized> I2cBus for &mut T {
    type Error = T::Error;

    fn write_byte(&mut self, address: u8, register: u8, value: u8) -> Result<(), Self::Error> {
        (**self).write_byte(address, register, value)
    }

    fn write_bytes(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), Self::Error> {
        (**self).write_bytes(address, register, data)
    }

    fn read_byte(&mut self, address: u8, register: u8) -> Result<u8, Self::Error> {
        (**self).read_byte(address, register)
    }

    fn read_into(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read_into(address, register, buf)
    }
}

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            frequency: 100_000, // 100kHz standard mode
        }
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self { frequency: 400_000 };

    /// Fast mode plus (1 MHz)
    pub const FAST_PLUS: Self = Self {
        frequency: 1_000_000,
    };

    /// Anything above 100 kHz needs fast-mode timing
    pub const fn is_fast_mode(&self) -> bool {
        self.frequency > Self::STANDARD.frequency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the last write and answers reads with a fixed pattern
    #[derive(Default)]
    struct Recorder {
        last_write: Option<(u8, u8, usize)>,
    }

    impl I2cBus for Recorder {
        type Error = ();

        fn write_bytes(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), ()> {
            self.last_write = Some((address, register, data.len()));
            Ok(())
        }

        fn read_into(&mut self, _address: u8, register: u8, buf: &mut [u8]) -> Result<(), ()> {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = register.wrapping_add(i as u8);
            }
            Ok(())
        }
    }

    #[test]
    fn test_write_byte_default() {
        let mut bus = Recorder::default();
        bus.write_byte(0x19, 0x20, 0x57).unwrap();
        assert_eq!(bus.last_write, Some((0x19, 0x20, 1)));
    }

    #[test]
    fn test_read_byte_default() {
        let mut bus = Recorder::default();
        assert_eq!(bus.read_byte(0x19, 0x0F).unwrap(), 0x0F);
    }

    #[test]
    fn test_speed_presets() {
        assert_eq!(I2cConfig::default(), I2cConfig::STANDARD);
        assert!(!I2cConfig::STANDARD.is_fast_mode());
        assert!(I2cConfig::FAST.is_fast_mode());
        assert!(I2cConfig::FAST_PLUS.is_fast_mode());
    }
}

//! LSM303AGR accelerometer
//!
//! The accelerometer half of the LSM303AGR eCompass, used in normal mode.
//! Output registers are read in one burst by setting the auto-increment
//! bit on the register pointer.
//!
//! # Register usage
//!
//! - `WHO_AM_I_A` identifies the part (0x33)
//! - `CTRL_REG1_A` selects data rate, low-power mode and enabled axes
//! - `STATUS_REG_A` flags new data
//! - `OUT_X_L_A`..`OUT_Z_H_A` hold three little-endian 16-bit samples

use twine_hal::I2cBus;

/// Accelerometer 7-bit address
pub const ADDRESS: u8 = 0x19;

/// Expected `WHO_AM_I_A` value
pub const DEVICE_ID: u8 = 0x33;

/// Register pointer bit that enables auto-increment for burst reads
pub const AUTO_INCREMENT: u8 = 0x80;

/// Accelerometer register addresses
pub mod reg {
    /// Device identification
    pub const WHO_AM_I_A: u8 = 0x0F;
    /// Data rate and axis enables
    pub const CTRL_REG1_A: u8 = 0x20;
    /// Full scale and resolution
    pub const CTRL_REG4_A: u8 = 0x23;
    /// Data-ready and overrun flags
    pub const STATUS_REG_A: u8 = 0x27;
    /// First output register (X low byte)
    pub const OUT_X_L_A: u8 = 0x28;
}

/// `STATUS_REG_A`: new X, Y and Z data available
const ZYXDA: u8 = 1 << 3;

/// Output data rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRate {
    PowerDown = 0,
    Hz1 = 1,
    Hz10 = 2,
    Hz25 = 3,
    Hz50 = 4,
    Hz100 = 5,
    Hz200 = 6,
    Hz400 = 7,
}

/// Accelerometer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lsm303Config {
    pub data_rate: DataRate,
    /// 8-bit low-power mode instead of 10-bit normal mode
    pub low_power: bool,
    pub x_enabled: bool,
    pub y_enabled: bool,
    pub z_enabled: bool,
}

impl Default for Lsm303Config {
    fn default() -> Self {
        Self {
            data_rate: DataRate::Hz100,
            low_power: false,
            x_enabled: true,
            y_enabled: true,
            z_enabled: true,
        }
    }
}

impl Lsm303Config {
    /// `CTRL_REG1_A` value for this configuration
    pub fn ctrl_reg1(&self) -> u8 {
        ((self.data_rate as u8) << 4)
            | (u8::from(self.low_power) << 3)
            | (u8::from(self.z_enabled) << 2)
            | (u8::from(self.y_enabled) << 1)
            | u8::from(self.x_enabled)
    }
}

/// Raw acceleration sample, left-justified 16-bit per axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Acceleration {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Acceleration {
    /// Decode the six output registers in X, Y, Z order
    pub fn from_le_bytes(buf: [u8; 6]) -> Self {
        Self {
            x: i16::from_le_bytes([buf[0], buf[1]]),
            y: i16::from_le_bytes([buf[2], buf[3]]),
            z: i16::from_le_bytes([buf[4], buf[5]]),
        }
    }
}

/// Accelerometer error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lsm303Error<E> {
    /// Bus transfer failed
    Bus(E),
    /// `WHO_AM_I_A` returned something other than [`DEVICE_ID`]
    WrongDevice(u8),
}

impl<E> From<E> for Lsm303Error<E> {
    fn from(e: E) -> Self {
        Lsm303Error::Bus(e)
    }
}

/// LSM303AGR accelerometer on an I2C bus
pub struct Lsm303agr<B> {
    bus: B,
    address: u8,
}

impl<B: I2cBus> Lsm303agr<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            address: ADDRESS,
        }
    }

    /// Use a non-default address
    pub fn with_address(bus: B, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn who_am_i(&mut self) -> Result<u8, Lsm303Error<B::Error>> {
        Ok(self.bus.read_byte(self.address, reg::WHO_AM_I_A)?)
    }

    /// Verify the part and apply `config`
    pub fn init(&mut self, config: &Lsm303Config) -> Result<(), Lsm303Error<B::Error>> {
        let id = self.who_am_i()?;
        if id != DEVICE_ID {
            return Err(Lsm303Error::WrongDevice(id));
        }
        self.bus
            .write_byte(self.address, reg::CTRL_REG1_A, config.ctrl_reg1())?;
        Ok(())
    }

    /// New sample available on all three axes
    pub fn data_ready(&mut self) -> Result<bool, Lsm303Error<B::Error>> {
        let status = self.bus.read_byte(self.address, reg::STATUS_REG_A)?;
        Ok(status & ZYXDA != 0)
    }

    /// Read X, Y and Z in one burst
    pub fn read_raw(&mut self) -> Result<Acceleration, Lsm303Error<B::Error>> {
        let mut buf = [0u8; 6];
        self.bus
            .read_into(self.address, reg::OUT_X_L_A | AUTO_INCREMENT, &mut buf)?;
        Ok(Acceleration::from_le_bytes(buf))
    }

    /// Give back the bus
    pub fn release(self) -> B {
        self.bus
    }
}

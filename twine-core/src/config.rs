//! Bus configuration
//!
//! Clock speed and wait budgets for one I2C master. Budgets count poll
//! iterations, not time, so they stay meaningful regardless of core
//! clock or wait strategy.

use twine_hal::I2cConfig;

/// Poll-iteration budgets for each kind of wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeoutBudgets {
    /// Waiting for the bus to go idle, before START and after STOP
    pub bus_idle: u32,
    /// Waiting for a pushed byte to complete on the wire
    pub byte_completion: u32,
    /// Waiting for room in the transmit FIFO
    pub tx_fifo: u32,
    /// Waiting for a received byte
    pub rx_fifo: u32,
}

impl Default for TimeoutBudgets {
    fn default() -> Self {
        Self {
            bus_idle: 1_000_000,
            byte_completion: 1_000_000,
            tx_fifo: 100_000,
            rx_fifo: 100_000,
        }
    }
}

/// Master configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BusConfig {
    /// SCL frequency in Hz
    pub frequency_hz: u32,
    pub budgets: TimeoutBudgets,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            frequency_hz: I2cConfig::STANDARD.frequency,
            budgets: TimeoutBudgets::default(),
        }
    }
}

/// Configuration rejected by [`BusConfig::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A wait budget of zero would fail every transaction
    ZeroBudget(&'static str),
    /// Frequency outside the standard to fast-plus range
    FrequencyOutOfRange(u32),
}

impl BusConfig {
    pub const MIN_FREQUENCY_HZ: u32 = 1_000;
    pub const MAX_FREQUENCY_HZ: u32 = I2cConfig::FAST_PLUS.frequency;

    pub fn i2c(&self) -> I2cConfig {
        I2cConfig {
            frequency: self.frequency_hz,
        }
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(Self::MIN_FREQUENCY_HZ..=Self::MAX_FREQUENCY_HZ).contains(&self.frequency_hz) {
            return Err(ConfigError::FrequencyOutOfRange(self.frequency_hz));
        }

        let budgets = [
            ("bus_idle", self.budgets.bus_idle),
            ("byte_completion", self.budgets.byte_completion),
            ("tx_fifo", self.budgets.tx_fifo),
            ("rx_fifo", self.budgets.rx_fifo),
        ];
        for (name, budget) in budgets {
            if budget == 0 {
                return Err(ConfigError::ZeroBudget(name));
            }
        }

        Ok(())
    }
}

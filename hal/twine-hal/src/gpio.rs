//! GPIO pin abstractions
//!
//! Side-band control lines that accompany bus peripherals (reset, busy,
//! interrupt) are driven through these traits so drivers stay independent of
//! the port register layout.

/// Logic level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level == Level::High
    }
}

/// Digital output pin
pub trait OutputPin {
    /// Drive the pin to `level`
    fn set_level(&mut self, level: Level);

    /// Set the pin high (logic 1)
    fn set_high(&mut self) {
        self.set_level(Level::High);
    }

    /// Set the pin low (logic 0)
    fn set_low(&mut self) {
        self.set_level(Level::Low);
    }

    /// Level the pin is currently driven to
    ///
    /// May read a hardware register.
    fn output_level(&mut self) -> Level;
}

/// Digital input pin
pub trait InputPin {
    /// Sample the pin
    fn level(&mut self) -> Level;

    /// Check if the pin reads high (logic 1)
    fn is_high(&mut self) -> bool {
        self.level() == Level::High
    }

    /// Check if the pin reads low (logic 0)
    fn is_low(&mut self) -> bool {
        self.level() == Level::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Latch(Level);

    impl OutputPin for Latch {
        fn set_level(&mut self, level: Level) {
            self.0 = level;
        }

        fn output_level(&mut self) -> Level {
            self.0
        }
    }

    impl InputPin for Latch {
        fn level(&mut self) -> Level {
            self.0
        }
    }

    #[test]
    fn test_level_conversions() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(Level::from(false), Level::Low);
        assert!(bool::from(Level::High));
        assert!(!bool::from(Level::Low));
    }

    #[test]
    fn test_default_helpers() {
        let mut pin = Latch(Level::Low);
        pin.set_high();
        assert_eq!(pin.output_level(), Level::High);
        assert!(pin.is_high());

        pin.set_low();
        assert!(pin.is_low());
    }
}

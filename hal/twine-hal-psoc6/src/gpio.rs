//! GPIO ports for PSoC 6
//!
//! Port register layout, drive-mode values and plain port pins for
//! side-band lines such as a display's reset and busy signals.

use twine_hal::gpio::Level;
use twine_hal::{InputPin, OutputPin, RegisterAccess};

/// GPIO port register block base
pub const GPIO_BASE: u32 = 0x4031_0000;
/// Distance between two GPIO port blocks
pub const GPIO_PORT_STRIDE: u32 = 0x80;
/// HSIOM port block base
pub const HSIOM_BASE: u32 = 0x4030_0000;
/// Distance between two HSIOM port blocks
pub const HSIOM_PORT_STRIDE: u32 = 0x10;

/// Highest port number on the package
pub const MAX_PORT: u8 = 14;
/// Pins per port
pub const PINS_PER_PORT: u8 = 8;

/// Drive-mode field values in `CFG`
pub mod drive {
    /// Bits per pin in `CFG`
    pub const FIELD_WIDTH: u8 = 4;

    pub const HIGHZ: u8 = 0;
    pub const PULLUP: u8 = 2;
    pub const PULLDOWN: u8 = 3;
    pub const OD_DRIVES_LOW: u8 = 4;
    pub const OD_DRIVES_HIGH: u8 = 5;
    pub const STRONG: u8 = 6;
    /// Input buffer enable, top bit of each field
    pub const IN_EN: u8 = 1 << 3;
}

/// HSIOM function numbers
pub mod hsiom {
    /// Pin driven by the port's OUT register
    pub const GPIO: u8 = 0x00;
    /// Pin owned by the SCB I2C block
    pub const SCB_I2C: u8 = 0x12;
}

/// Register addresses of one GPIO port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioPort {
    pub port: u8,
}

impl GpioPort {
    pub const fn new(port: u8) -> Self {
        Self { port }
    }

    const fn base(&self) -> u32 {
        GPIO_BASE + self.port as u32 * GPIO_PORT_STRIDE
    }

    pub const fn out(&self) -> u32 {
        self.base()
    }

    pub const fn out_clr(&self) -> u32 {
        self.base() + 0x04
    }

    pub const fn out_set(&self) -> u32 {
        self.base() + 0x08
    }

    pub const fn input(&self) -> u32 {
        self.base() + 0x10
    }

    pub const fn cfg(&self) -> u32 {
        self.base() + 0x44
    }

    /// Mux select register for pins 0..=3
    pub const fn hsiom_sel0(&self) -> u32 {
        HSIOM_BASE + self.port as u32 * HSIOM_PORT_STRIDE
    }

    /// Mux select register and field shift for `pin`
    pub const fn hsiom_field(&self, pin: u8) -> (u32, u32) {
        let register = self.hsiom_sel0() + (pin as u32 / 4) * 4;
        (register, (pin as u32 % 4) * 8)
    }
}

/// Parsed pin name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinName {
    pub port: u8,
    pub pin: u8,
    /// Logic is active-low
    pub inverted: bool,
}

/// Parse a pin name from config
///
/// Supports formats:
/// - "P6.0" -> port 6, pin 0
/// - "!P10.1" -> port 10, pin 1, inverted
pub fn parse_pin_name(s: &str) -> Option<PinName> {
    let s = s.trim();

    let (s, inverted) = match s.strip_prefix('!') {
        Some(rest) => (rest, true),
        None => (s, false),
    };

    let (port, pin) = s.strip_prefix('P')?.split_once('.')?;
    let port: u8 = port.parse().ok()?;
    let pin: u8 = pin.parse().ok()?;
    if port > MAX_PORT || pin >= PINS_PER_PORT {
        return None;
    }

    Some(PinName {
        port,
        pin,
        inverted,
    })
}

/// Single pin of a GPIO port
pub struct PortPin<R> {
    regs: R,
    port: GpioPort,
    pin: u8,
    inverted: bool,
}

impl<R: RegisterAccess> PortPin<R> {
    pub fn new(regs: R, name: PinName) -> Self {
        Self {
            regs,
            port: GpioPort::new(name.port),
            pin: name.pin,
            inverted: name.inverted,
        }
    }

    fn mask(&self) -> u32 {
        1 << self.pin
    }

    fn configure(&mut self, mode: u8) {
        let (select, shift) = self.port.hsiom_field(self.pin);
        self.regs
            .modify(select, 0x1F << shift, u32::from(hsiom::GPIO) << shift);

        let shift = u32::from(self.pin) * u32::from(drive::FIELD_WIDTH);
        self.regs
            .modify(self.port.cfg(), 0xF << shift, u32::from(mode) << shift);
    }

    /// Route the pin to GPIO as a push-pull output at `initial`
    pub fn into_output(mut self, initial: Level) -> Self {
        self.set_level(initial);
        self.configure(drive::STRONG);
        self
    }

    /// Route the pin to GPIO as a floating input
    pub fn into_input(mut self) -> Self {
        self.configure(drive::HIGHZ | drive::IN_EN);
        self
    }

    fn logical(&self, physical: bool) -> Level {
        Level::from(physical != self.inverted)
    }
}

impl<R: RegisterAccess> OutputPin for PortPin<R> {
    fn set_level(&mut self, level: Level) {
        let physical = bool::from(level) != self.inverted;
        let register = if physical {
            self.port.out_set()
        } else {
            self.port.out_clr()
        };
        let mask = self.mask();
        self.regs.write(register, mask);
    }

    fn output_level(&mut self) -> Level {
        let physical = self.regs.read(self.port.out()) & self.mask() != 0;
        self.logical(physical)
    }
}

impl<R: RegisterAccess> InputPin for PortPin<R> {
    fn level(&mut self) -> Level {
        let physical = self.regs.read(self.port.input()) & self.mask() != 0;
        self.logical(physical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Port 10 OUT/OUT_CLR/OUT_SET/IN/CFG plus HSIOM, as plain words
    struct Port10 {
        out: u32,
        input: u32,
        cfg: u32,
        hsiom: u32,
    }

    impl RegisterAccess for Port10 {
        fn read(&mut self, address: u32) -> u32 {
            match address {
                0x4031_0500 => self.out,
                0x4031_0510 => self.input,
                0x4031_0544 => self.cfg,
                0x4030_00A0 => self.hsiom,
                _ => 0,
            }
        }

        fn write(&mut self, address: u32, value: u32) {
            match address {
                0x4031_0504 => self.out &= !value,
                0x4031_0508 => self.out |= value,
                0x4031_0544 => self.cfg = value,
                0x4030_00A0 => self.hsiom = value,
                _ => {}
            }
        }
    }

    fn port10() -> Port10 {
        Port10 {
            out: 0,
            input: 0,
            cfg: 0,
            hsiom: 0xFFFF_FFFF,
        }
    }

    #[test]
    fn test_parse_pin_name() {
        assert_eq!(
            parse_pin_name("P6.0"),
            Some(PinName { port: 6, pin: 0, inverted: false })
        );
        assert_eq!(
            parse_pin_name(" !P10.1 "),
            Some(PinName { port: 10, pin: 1, inverted: true })
        );
        assert_eq!(parse_pin_name("P6"), None);
        assert_eq!(parse_pin_name("P6.8"), None);
        assert_eq!(parse_pin_name("P15.0"), None);
        assert_eq!(parse_pin_name("PA0"), None);
        assert_eq!(parse_pin_name(""), None);
    }

    #[test]
    fn test_port_addresses() {
        let port = GpioPort::new(10);
        assert_eq!(port.out(), 0x4031_0500);
        assert_eq!(port.out_set(), 0x4031_0508);
        assert_eq!(port.input(), 0x4031_0510);
        assert_eq!(port.cfg(), 0x4031_0544);
        assert_eq!(port.hsiom_sel0(), 0x4030_00A0);
        assert_eq!(GpioPort::new(6).cfg(), 0x4031_0344);
    }

    #[test]
    fn test_output_pin_configures_and_drives() {
        let name = parse_pin_name("P10.0").unwrap();
        let mut pin = PortPin::new(port10(), name).into_output(Level::High);

        assert_eq!(pin.regs.cfg & 0xF, u32::from(drive::STRONG));
        assert_eq!(pin.regs.hsiom & 0x1F, 0);
        assert_eq!(pin.regs.hsiom & !0x1F, 0xFFFF_FFE0);
        assert_eq!(pin.output_level(), Level::High);

        pin.set_low();
        assert_eq!(pin.regs.out, 0);
    }

    #[test]
    fn test_inverted_input() {
        let name = parse_pin_name("!P10.1").unwrap();
        let mut pin = PortPin::new(port10(), name).into_input();
        assert_eq!(pin.regs.cfg, u32::from(drive::HIGHZ | drive::IN_EN) << 4);

        assert!(pin.is_high());
        pin.regs.input = 1 << 1;
        assert!(pin.is_low());
    }
}

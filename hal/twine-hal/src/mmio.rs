//! Register access abstraction
//!
//! Every hardware register the I2C engine touches is reached through
//! [`RegisterAccess`]. The target HAL implements it with volatile accesses;
//! host tests implement it with a simulated register file.

/// Word-wide access to memory-mapped registers
///
/// Addresses are fixed per bus instance and validated by whoever built the
/// register map, so accesses cannot fail. A stuck peripheral shows up as a
/// timeout in the layer above, never here.
///
/// Calls must reach the hardware in program order.
pub trait RegisterAccess {
    /// Read the register at `address`
    ///
    /// Takes `&mut self` because reading a FIFO data register pops it.
    fn read(&mut self, address: u32) -> u32;

    /// Write `value` to the register at `address`
    fn write(&mut self, address: u32, value: u32);

    /// Read-modify-write: set every bit in `mask`
    fn set_bits(&mut self, address: u32, mask: u32) {
        let value = self.read(address);
        self.write(address, value | mask);
    }

    /// Read-modify-write: clear every bit in `mask`
    fn clear_bits(&mut self, address: u32, mask: u32) {
        let value = self.read(address);
        self.write(address, value & !mask);
    }

    /// Read-modify-write: replace the bits under `mask` with `bits`
    fn modify(&mut self, address: u32, mask: u32, bits: u32) {
        let value = self.read(address);
        self.write(address, (value & !mask) | (bits & mask));
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    fn read(&mut self, address: u32) -> u32 {
        (**self).read(address)
    }

    fn write(&mut self, address: u32, value: u32) {
        (**self).write(address, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Four-word register file starting at address 0
    struct Words([u32; 4]);

    impl RegisterAccess for Words {
        fn read(&mut self, address: u32) -> u32 {
            self.0[(address / 4) as usize]
        }

        fn write(&mut self, address: u32, value: u32) {
            self.0[(address / 4) as usize] = value;
        }
    }

    #[test]
    fn test_set_and_clear_bits() {
        let mut regs = Words([0; 4]);
        regs.set_bits(4, 0b1010);
        assert_eq!(regs.read(4), 0b1010);

        regs.set_bits(4, 0b0001);
        assert_eq!(regs.read(4), 0b1011);

        regs.clear_bits(4, 0b1000);
        assert_eq!(regs.read(4), 0b0011);

        // Other words untouched
        assert_eq!(regs.read(0), 0);
        assert_eq!(regs.read(8), 0);
    }

    #[test]
    fn test_modify_field() {
        let mut regs = Words([0xFFFF_FFFF, 0, 0, 0]);
        regs.modify(0, 0x3F, 0x36);
        assert_eq!(regs.read(0), 0xFFFF_FFF6);
    }

    #[test]
    fn test_mut_ref_forwarding() {
        let mut regs = Words([0; 4]);
        {
            let mut borrowed = &mut regs;
            borrowed.write(12, 0xAB);
            borrowed.set_bits(12, 0x100);
        }
        assert_eq!(regs.read(12), 0x1AB);
    }
}

//! SCB register map
//!
//! Register addresses are computed from a controller base address so the
//! same engine can drive any SCB instance. Bit positions follow the
//! controller's I2C master register set; board crates supply the base
//! addresses and pin routing.

/// Register offsets from an SCB base address
pub mod offset {
    pub const CTRL: u32 = 0x000;
    pub const I2C_CTRL: u32 = 0x060;
    pub const I2C_STATUS: u32 = 0x064;
    pub const I2C_M_CMD: u32 = 0x068;
    pub const I2C_CFG: u32 = 0x070;
    pub const TX_FIFO_CTRL: u32 = 0x204;
    pub const TX_FIFO_STATUS: u32 = 0x208;
    pub const TX_FIFO_WR: u32 = 0x240;
    pub const RX_FIFO_CTRL: u32 = 0x304;
    pub const RX_FIFO_STATUS: u32 = 0x308;
    pub const RX_FIFO_RD: u32 = 0x340;
    pub const INTR_M: u32 = 0xF00;
    pub const INTR_S: u32 = 0xF40;
    pub const INTR_TX: u32 = 0xF80;
    pub const INTR_RX: u32 = 0xFC0;
}

/// Register bit fields
pub mod bits {
    /// CTRL: controller enabled
    pub const CTRL_ENABLED: u32 = 1 << 31;

    /// I2C_CTRL: master mode enable
    pub const I2C_CTRL_MASTER_MODE: u32 = 1 << 0;
    /// I2C_CTRL: slave mode enable
    pub const I2C_CTRL_SLAVE_MODE: u32 = 1 << 1;

    /// I2C_STATUS: a transfer is in progress on the bus
    pub const I2C_STATUS_BUS_BUSY: u32 = 1 << 8;

    /// I2C_M_CMD: generate (repeated) START
    pub const M_CMD_START: u32 = 1 << 0;
    /// I2C_M_CMD: generate STOP
    pub const M_CMD_STOP: u32 = 1 << 1;
    /// I2C_M_CMD: acknowledge the received byte
    pub const M_CMD_ACK: u32 = 1 << 2;
    /// I2C_M_CMD: not-acknowledge the received byte
    pub const M_CMD_NACK: u32 = 1 << 3;

    /// TX_FIFO_STATUS: room for at least one entry
    pub const TX_FIFO_NOT_FULL: u32 = 1 << 0;
    /// TX_FIFO_STATUS: no entries pending
    pub const TX_FIFO_EMPTY: u32 = 1 << 1;
    /// RX_FIFO_STATUS: at least one entry available
    pub const RX_FIFO_NOT_EMPTY: u32 = 1 << 0;

    /// INTR_M: peer did not acknowledge
    pub const INTR_M_NACK: u32 = 1 << 0;
    /// INTR_M: arbitration lost to another master
    pub const INTR_M_ARB_LOST: u32 = 1 << 1;
    /// INTR_M: STOP condition generated
    pub const INTR_M_STOP: u32 = 1 << 2;
    /// INTR_M: byte phase complete
    pub const INTR_M_DONE: u32 = 1 << 3;

    /// I2C_CFG timing word for standard mode
    pub const I2C_CFG_STANDARD: u32 = 0x10;
    /// I2C_CFG timing word for fast and fast-plus modes
    pub const I2C_CFG_FAST: u32 = 0x20;

    /// Write-one-to-clear value for an entire cause register
    pub const CLEAR_ALL: u32 = 0xFFFF_FFFF;
}

/// One interrupt group: cause, set, mask and masked registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptGroup {
    /// Raw cause register (write-one-to-clear)
    pub cause: u32,
    pub set: u32,
    pub mask: u32,
    pub masked: u32,
}

impl InterruptGroup {
    const fn at(address: u32) -> Self {
        Self {
            cause: address,
            set: address + 0x4,
            mask: address + 0x8,
            masked: address + 0xC,
        }
    }
}

/// Absolute register addresses of one SCB instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScbRegisters {
    pub base: u32,
    pub ctrl: u32,
    pub i2c_ctrl: u32,
    pub i2c_status: u32,
    pub i2c_m_cmd: u32,
    pub i2c_cfg: u32,
    pub tx_fifo_ctrl: u32,
    pub tx_fifo_status: u32,
    pub tx_fifo_wr: u32,
    pub rx_fifo_ctrl: u32,
    pub rx_fifo_status: u32,
    pub rx_fifo_rd: u32,
    pub intr_m: InterruptGroup,
    pub intr_s: InterruptGroup,
    pub intr_tx: InterruptGroup,
    pub intr_rx: InterruptGroup,
}

impl ScbRegisters {
    /// Compute the register map of the SCB at `base`
    pub const fn at(base: u32) -> Self {
        Self {
            base,
            ctrl: base + offset::CTRL,
            i2c_ctrl: base + offset::I2C_CTRL,
            i2c_status: base + offset::I2C_STATUS,
            i2c_m_cmd: base + offset::I2C_M_CMD,
            i2c_cfg: base + offset::I2C_CFG,
            tx_fifo_ctrl: base + offset::TX_FIFO_CTRL,
            tx_fifo_status: base + offset::TX_FIFO_STATUS,
            tx_fifo_wr: base + offset::TX_FIFO_WR,
            rx_fifo_ctrl: base + offset::RX_FIFO_CTRL,
            rx_fifo_status: base + offset::RX_FIFO_STATUS,
            rx_fifo_rd: base + offset::RX_FIFO_RD,
            intr_m: InterruptGroup::at(base + offset::INTR_M),
            intr_s: InterruptGroup::at(base + offset::INTR_S),
            intr_tx: InterruptGroup::at(base + offset::INTR_TX),
            intr_rx: InterruptGroup::at(base + offset::INTR_RX),
        }
    }

    /// Cause registers cleared during initialization
    pub const fn cause_registers(&self) -> [u32; 4] {
        [
            self.intr_m.cause,
            self.intr_s.cause,
            self.intr_tx.cause,
            self.intr_rx.cause,
        ]
    }
}

/// Clock gate and pin routing that connect an SCB to its SCL/SDA pads
///
/// Initialization applies this before touching the controller itself.
/// Each step is a read-modify-write of a single field, so applying it
/// twice leaves the same register state as applying it once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinRouting {
    /// Peripheral clock control register
    pub clock_ctl: u32,
    /// Bits set in `clock_ctl` to ungate the SCB clock
    pub clock_enable: u32,
    /// First port-select register of the pin mux (pins 0..=3)
    pub hsiom_port_sel: u32,
    /// Mux function number that routes the pins to the SCB
    pub hsiom_function: u8,
    /// Port configuration register holding per-pin drive modes
    pub port_cfg: u32,
    /// Width in bits of one pin's drive-mode field in `port_cfg`
    pub drive_field_width: u8,
    /// Drive-mode value written for both bus pins
    pub drive_mode: u8,
    /// Separate input-buffer enable register, if the port has one
    pub input_enable: Option<u32>,
    pub scl_pin: u8,
    pub sda_pin: u8,
}

impl PinRouting {
    /// Mask covering one HSIOM select field
    pub const HSIOM_FIELD_MASK: u32 = 0x1F;

    /// Select register and shift of the mux field for `pin`
    pub const fn hsiom_field(&self, pin: u8) -> (u32, u32) {
        let register = self.hsiom_port_sel + (pin as u32 / 4) * 4;
        let shift = (pin as u32 % 4) * 8;
        (register, shift)
    }

    /// Mask and shifted drive-mode value for `pin` in `port_cfg`
    pub const fn drive_field(&self, pin: u8) -> (u32, u32) {
        let width = self.drive_field_width as u32;
        let shift = pin as u32 * width;
        let mask = ((1u32 << width) - 1) << shift;
        (mask, (self.drive_mode as u32) << shift)
    }

    /// Bus pins in SCL, SDA order
    pub const fn pins(&self) -> [u8; 2] {
        [self.scl_pin, self.sda_pin]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_map_offsets() {
        let map = ScbRegisters::at(0x4060_0000);
        assert_eq!(map.ctrl, 0x4060_0000);
        assert_eq!(map.i2c_status, 0x4060_0064);
        assert_eq!(map.tx_fifo_wr, 0x4060_0240);
        assert_eq!(map.rx_fifo_rd, 0x4060_0340);
        assert_eq!(map.intr_m.cause, 0x4060_0F00);
        assert_eq!(map.intr_m.masked, 0x4060_0F0C);
        assert_eq!(map.intr_rx.mask, 0x4060_0FC8);
    }

    #[test]
    fn test_instances_do_not_overlap() {
        let a = ScbRegisters::at(0x4060_0000);
        let b = ScbRegisters::at(0x4061_0000);
        assert_eq!(b.i2c_m_cmd - a.i2c_m_cmd, 0x1_0000);
    }

    #[test]
    fn test_pin_fields() {
        let routing = PinRouting {
            clock_ctl: 0,
            clock_enable: 1,
            hsiom_port_sel: 0x4030_0060,
            hsiom_function: 0x12,
            port_cfg: 0,
            drive_field_width: 4,
            drive_mode: 0xE,
            input_enable: None,
            scl_pin: 1,
            sda_pin: 5,
        };

        assert_eq!(routing.hsiom_field(1), (0x4030_0060, 8));
        assert_eq!(routing.hsiom_field(5), (0x4030_0064, 8));
        assert_eq!(routing.drive_field(1), (0xF0, 0xE0));
        assert_eq!(routing.drive_field(5), (0xF0_0000, 0xE0_0000));
    }
}

//! SCB0 layout on the CM4 core
//!
//! Addresses and routing values for the board's I2C bus: SCB0 with SCL on
//! P6.0 and SDA on P6.1.

use twine_core::{BusConfig, I2cMaster, PinRouting, ScbRegisters, WaitStrategy};
use twine_hal::RegisterAccess;

use crate::gpio::{drive, hsiom, GpioPort};

/// SCB0 base address
pub const SCB0_BASE: u32 = 0x4060_0000;

/// Peripheral clock control register for SCB0
pub const PERI_CLOCK_CTL0: u32 = 0x4000_0C00;

/// Clock enable bit in [`PERI_CLOCK_CTL0`]
pub const SCB0_CLOCK_ENABLE: u32 = 1 << 0;

/// Port carrying the I2C pins
pub const I2C_PORT: GpioPort = GpioPort::new(6);

pub const SCL_PIN: u8 = 0;
pub const SDA_PIN: u8 = 1;

/// SCB0 register map
pub const SCB0: ScbRegisters = ScbRegisters::at(SCB0_BASE);

/// Clock gate and pin mux for SCB0 on P6.0/P6.1
///
/// Both pins are open-drain drives-low with the input buffer on.
pub const SCB0_ROUTING: PinRouting = PinRouting {
    clock_ctl: PERI_CLOCK_CTL0,
    clock_enable: SCB0_CLOCK_ENABLE,
    hsiom_port_sel: I2C_PORT.hsiom_sel0(),
    hsiom_function: hsiom::SCB_I2C,
    port_cfg: I2C_PORT.cfg(),
    drive_field_width: drive::FIELD_WIDTH,
    drive_mode: drive::OD_DRIVES_LOW | drive::IN_EN,
    input_enable: None,
    scl_pin: SCL_PIN,
    sda_pin: SDA_PIN,
};

/// Master on SCB0 with the board routing
pub fn scb0_master<R, W>(regs: R, wait: W, config: BusConfig) -> I2cMaster<R, W>
where
    R: RegisterAccess,
    W: WaitStrategy,
{
    I2cMaster::new(regs, wait, SCB0, SCB0_ROUTING, config)
}

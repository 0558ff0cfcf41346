//! I2C master handle
//!
//! Owns the controller's register access, the wait strategy and the bus
//! configuration, and exposes register-oriented transfers on top of the
//! transaction engine. One handle per SCB; callers sharing it between
//! execution contexts wrap it in their own lock.

use embedded_hal::i2c::{ErrorType, Operation, SevenBitAddress};
use heapless::Vec;
use twine_hal::{I2cBus, RegisterAccess};

use crate::config::BusConfig;
use crate::engine::{Phase, Sequencer, Transaction, TransferData};
use crate::error::Error;
use crate::regs::{bits, InterruptGroup, PinRouting, ScbRegisters};
use crate::wait::{Spin, WaitStrategy};

/// Addresses probed by [`I2cMaster::scan`]; both ends are reserved
pub const SCAN_RANGE: core::ops::Range<u8> = 0x08..0x78;

/// Most devices [`I2cMaster::scan`] reports
pub const MAX_SCAN_RESULTS: usize = 16;

/// Raw contents of one interrupt group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptRegisters {
    pub cause: u32,
    pub set: u32,
    pub mask: u32,
    pub masked: u32,
}

/// Raw interrupt state of the whole controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptSnapshot {
    pub master: InterruptRegisters,
    pub slave: InterruptRegisters,
    pub tx: InterruptRegisters,
    pub rx: InterruptRegisters,
}

/// I2C master on one SCB
pub struct I2cMaster<R, W = Spin> {
    regs: R,
    wait: W,
    map: ScbRegisters,
    routing: PinRouting,
    config: BusConfig,
    initialized: bool,
    phase: Phase,
    transferred: usize,
}

impl<R: RegisterAccess, W: WaitStrategy> I2cMaster<R, W> {
    /// Create an uninitialized master
    ///
    /// Nothing is written until [`init`](Self::init) runs.
    pub fn new(
        regs: R,
        wait: W,
        map: ScbRegisters,
        routing: PinRouting,
        config: BusConfig,
    ) -> Self {
        Self {
            regs,
            wait,
            map,
            routing,
            config,
            initialized: false,
            phase: Phase::Idle,
            transferred: 0,
        }
    }

    /// Bring up clock, pins and controller
    ///
    /// Applies the pin routing, puts the SCB in master mode with the
    /// timing word for the configured speed, empties both FIFOs and
    /// clears every interrupt cause. Safe to call again: the resulting
    /// register state is the same.
    pub fn init(&mut self) -> Result<(), Error> {
        let routing = self.routing;
        let map = self.map;

        self.regs.set_bits(routing.clock_ctl, routing.clock_enable);

        let mut input_pins = 0u32;
        for pin in routing.pins() {
            let (select, shift) = routing.hsiom_field(pin);
            self.regs.modify(
                select,
                PinRouting::HSIOM_FIELD_MASK << shift,
                u32::from(routing.hsiom_function) << shift,
            );

            let (mask, drive) = routing.drive_field(pin);
            self.regs.modify(routing.port_cfg, mask, drive);
            input_pins |= 1u32 << pin;
        }
        if let Some(input_enable) = routing.input_enable {
            self.regs.set_bits(input_enable, input_pins);
        }

        self.regs.clear_bits(map.ctrl, bits::CTRL_ENABLED);
        self.regs.write(map.i2c_ctrl, bits::I2C_CTRL_MASTER_MODE);
        let timing = if self.config.i2c().is_fast_mode() {
            bits::I2C_CFG_FAST
        } else {
            bits::I2C_CFG_STANDARD
        };
        self.regs.write(map.i2c_cfg, timing);
        self.regs.write(map.tx_fifo_ctrl, 0);
        self.regs.write(map.rx_fifo_ctrl, 0);
        for cause in map.cause_registers() {
            self.regs.write(cause, bits::CLEAR_ALL);
        }
        self.regs.set_bits(map.ctrl, bits::CTRL_ENABLED);

        self.initialized = self.regs.read(map.ctrl) & bits::CTRL_ENABLED != 0;
        if !self.initialized {
            error!("i2c: SCB at {=u32:#x} did not enable", map.base);
            return Err(Error::NotInitialized);
        }

        debug!(
            "i2c: SCB at {=u32:#x} up, {} Hz",
            map.base, self.config.frequency_hz
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Phase the last transaction ended in
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Payload bytes the last transaction moved before it ended
    pub fn last_transferred(&self) -> usize {
        self.transferred
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Give back the register access and wait strategy
    pub fn release(self) -> (R, W) {
        (self.regs, self.wait)
    }

    /// Write one byte to a device register
    pub fn write_byte(&mut self, address: u8, register: u8, value: u8) -> Result<(), Error> {
        self.write_bytes(address, register, &[value])
    }

    /// Write `data` starting at a device register
    ///
    /// An empty `data` only sets the register pointer. On a NACK,
    /// [`last_transferred`](Self::last_transferred) tells how many payload
    /// bytes the device accepted.
    pub fn write_bytes(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), Error> {
        self.transfer(Transaction::write(address, register, data))
            .map(|_| ())
    }

    /// Read one byte from a device register
    pub fn read_byte(&mut self, address: u8, register: u8) -> Result<u8, Error> {
        let [value] = self.read_bytes::<1>(address, register)?;
        Ok(value)
    }

    /// Read `N` consecutive bytes starting at a device register
    pub fn read_bytes<const N: usize>(&mut self, address: u8, register: u8) -> Result<[u8; N], Error> {
        let mut buf = [0u8; N];
        self.read_into(address, register, &mut buf)?;
        Ok(buf)
    }

    /// Read `buf.len()` bytes starting at a device register
    pub fn read_into(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), Error> {
        self.transfer(Transaction::read(address, register, buf))
            .map(|_| ())
    }

    /// Run one register transaction and record how it ended
    ///
    /// Returns the number of payload bytes moved. A read into an empty
    /// buffer is rejected before the bus is touched.
    pub fn transfer(&mut self, transaction: Transaction<'_>) -> Result<usize, Error> {
        self.check(transaction.address)?;
        if matches!(&transaction.data, TransferData::Read(buf) if buf.is_empty()) {
            return Err(Error::EmptyRead);
        }
        self.run(|seq| seq.run(transaction))
    }

    /// Check whether a device acknowledges its address
    pub fn probe(&mut self, address: u8) -> Result<bool, Error> {
        self.check(address)?;
        let result = self.run(|seq| seq.run_probe(address));
        match result {
            Ok(_) => Ok(true),
            Err(Error::AddressNack) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Probe every non-reserved address
    ///
    /// Stops at the first failure that is not a missing device, since a
    /// wedged bus would fail every remaining probe the same way.
    pub fn scan(&mut self) -> Result<Vec<u8, MAX_SCAN_RESULTS>, Error> {
        let mut found = Vec::new();
        for address in SCAN_RANGE {
            if self.probe(address)? && found.push(address).is_err() {
                warn!("i2c: scan result list full at {=u8:#x}", address);
                break;
            }
        }
        info!("i2c: scan found {} devices", found.len());
        Ok(found)
    }

    /// Read every interrupt register of the controller
    pub fn interrupt_snapshot(&mut self) -> InterruptSnapshot {
        InterruptSnapshot {
            master: self.read_group(self.map.intr_m),
            slave: self.read_group(self.map.intr_s),
            tx: self.read_group(self.map.intr_tx),
            rx: self.read_group(self.map.intr_rx),
        }
    }

    fn read_group(&mut self, group: InterruptGroup) -> InterruptRegisters {
        InterruptRegisters {
            cause: self.regs.read(group.cause),
            set: self.regs.read(group.set),
            mask: self.regs.read(group.mask),
            masked: self.regs.read(group.masked),
        }
    }

    fn check(&self, address: u8) -> Result<(), Error> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        if address > 0x7F {
            return Err(Error::InvalidAddress(address));
        }
        Ok(())
    }

    /// Run the engine once and keep its final phase for diagnostics
    fn run<T>(
        &mut self,
        sequence: impl FnOnce(&mut Sequencer<'_, R, W>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut seq = Sequencer::new(
            &mut self.regs,
            &mut self.wait,
            &self.map,
            &self.config.budgets,
        );
        let result = sequence(&mut seq);
        self.phase = seq.phase();
        self.transferred = seq.transferred();
        result
    }
}

impl<R: RegisterAccess, W: WaitStrategy> I2cBus for I2cMaster<R, W> {
    type Error = Error;

    fn write_bytes(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), Error> {
        I2cMaster::write_bytes(self, address, register, data)
    }

    fn read_into(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), Error> {
        I2cMaster::read_into(self, address, register, buf)
    }
}

impl<R, W> ErrorType for I2cMaster<R, W> {
    type Error = Error;
}

impl<R: RegisterAccess, W: WaitStrategy> embedded_hal::i2c::I2c<SevenBitAddress>
    for I2cMaster<R, W>
{
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        self.check(address)?;
        if operations.is_empty() {
            return Ok(());
        }
        let result = self.run(|seq| seq.run_operations(address, operations));
        result.map(|_| ())
    }
}

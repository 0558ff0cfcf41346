//! Phase sequencing over the SCB register set
//!
//! A [`Sequencer`] borrows the controller for the span of one
//! transaction. The steps are:
//!
//! 1. clear stale master causes and wait for the bus to go idle
//! 2. push the address header and issue START
//! 3. optionally push the register pointer
//! 4. write the payload, or issue a repeated START and receive it
//! 5. issue STOP and wait for the bus to go idle again
//!
//! Every byte pushed waits on completion before the next one is queued.
//! On failure after START the bus is released with a STOP before the
//! error is returned.

use embedded_hal::i2c::Operation;
use twine_hal::RegisterAccess;

use super::phase::Phase;
use crate::config::TimeoutBudgets;
use crate::error::{Error, Stage};
use crate::regs::{bits, ScbRegisters};
use crate::wait::{wait_until, Expect, WaitStrategy};

/// Transfer direction, encoded in the low bit of the address header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Write,
    Read,
}

impl Direction {
    /// Address header byte for a 7-bit `address`
    pub const fn header(self, address: u8) -> u8 {
        match self {
            Direction::Write => address << 1,
            Direction::Read => (address << 1) | 1,
        }
    }

    fn of(operation: &Operation<'_>) -> Self {
        match operation {
            Operation::Write(_) => Direction::Write,
            Operation::Read(_) => Direction::Read,
        }
    }
}

/// Payload of a register transaction
#[derive(Debug)]
pub enum TransferData<'a> {
    Write(&'a [u8]),
    Read(&'a mut [u8]),
}

/// One register-oriented transaction
#[derive(Debug)]
pub struct Transaction<'a> {
    /// 7-bit device address
    pub address: u8,
    /// Register pointer sent after the address, if any
    pub register: Option<u8>,
    pub data: TransferData<'a>,
}

impl<'a> Transaction<'a> {
    pub fn write(address: u8, register: u8, data: &'a [u8]) -> Self {
        Self {
            address,
            register: Some(register),
            data: TransferData::Write(data),
        }
    }

    pub fn read(address: u8, register: u8, buf: &'a mut [u8]) -> Self {
        Self {
            address,
            register: Some(register),
            data: TransferData::Read(buf),
        }
    }

    pub fn direction(&self) -> Direction {
        match self.data {
            TransferData::Write(_) => Direction::Write,
            TransferData::Read(_) => Direction::Read,
        }
    }
}

/// Drives one transaction through its phases
pub struct Sequencer<'a, R: ?Sized, W: ?Sized> {
    regs: &'a mut R,
    wait: &'a mut W,
    map: &'a ScbRegisters,
    budgets: &'a TimeoutBudgets,
    phase: Phase,
    transferred: usize,
    /// Index of the byte in flight within its own buffer
    position: usize,
    started: bool,
}

impl<'a, R, W> Sequencer<'a, R, W>
where
    R: RegisterAccess + ?Sized,
    W: WaitStrategy + ?Sized,
{
    pub fn new(
        regs: &'a mut R,
        wait: &'a mut W,
        map: &'a ScbRegisters,
        budgets: &'a TimeoutBudgets,
    ) -> Self {
        Self {
            regs,
            wait,
            map,
            budgets,
            phase: Phase::Idle,
            transferred: 0,
            position: 0,
            started: false,
        }
    }

    /// Current phase; terminal once a run has returned
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Payload bytes accepted or received so far
    pub fn transferred(&self) -> usize {
        self.transferred
    }

    /// Run a register transaction to completion
    ///
    /// Returns the number of payload bytes moved.
    pub fn run(&mut self, transaction: Transaction<'_>) -> Result<usize, Error> {
        let result = self.sequence(transaction);
        self.conclude(result)
    }

    /// Run a list of operations as one transaction
    ///
    /// Adjacent operations of the same direction share one address
    /// header; a direction change issues a repeated START.
    pub fn run_operations(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<usize, Error> {
        let result = self.sequence_operations(address, operations);
        self.conclude(result)
    }

    /// Address a device with an empty write
    pub fn run_probe(&mut self, address: u8) -> Result<usize, Error> {
        let result = self.sequence_probe(address);
        self.conclude(result)
    }

    fn sequence_probe(&mut self, address: u8) -> Result<(), Error> {
        self.begin()?;
        self.address(address, Direction::Write, false)?;
        self.finish(false)
    }

    fn sequence(&mut self, transaction: Transaction<'_>) -> Result<(), Error> {
        let Transaction {
            address,
            register,
            data,
        } = transaction;

        self.begin()?;
        match data {
            TransferData::Write(bytes) => {
                self.address(address, Direction::Write, false)?;
                if let Some(register) = register {
                    self.pointer(register)?;
                }
                self.send(bytes)?;
                self.finish(false)
            }
            TransferData::Read(buf) => {
                match register {
                    Some(register) => {
                        self.address(address, Direction::Write, false)?;
                        self.pointer(register)?;
                        self.address(address, Direction::Read, true)?;
                    }
                    None => self.address(address, Direction::Read, false)?,
                }
                self.receive(buf, false)?;
                self.finish(true)
            }
        }
    }

    fn sequence_operations(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        self.begin()?;

        let mut current: Option<Direction> = None;
        for index in 0..operations.len() {
            let direction = Direction::of(&operations[index]);
            // Empty reads clock nothing, so look past them for the next byte
            let more_follows = operations[index + 1..]
                .iter()
                .find(|next| !matches!(next, Operation::Read(buf) if buf.is_empty()))
                .map_or(false, |next| matches!(next, Operation::Read(_)));

            if current != Some(direction) {
                if current == Some(Direction::Read) {
                    self.command(bits::M_CMD_NACK);
                }
                self.address(address, direction, current.is_some())?;
                current = Some(direction);
            }

            match &mut operations[index] {
                Operation::Write(bytes) => self.send(bytes)?,
                Operation::Read(buf) => self.receive(buf, more_follows)?,
            }
        }

        self.finish(current == Some(Direction::Read))
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(
            self.phase.may_advance_to(&next),
            "phase {:?} cannot advance to {:?}",
            self.phase,
            next
        );
        trace!("i2c: {} -> {}", self.phase, next);
        self.phase = next;
    }

    fn command(&mut self, command: u32) {
        self.regs.write(self.map.i2c_m_cmd, command);
    }

    fn wait_for(&mut self, address: u32, mask: u32, expect: Expect, budget: u32) -> bool {
        wait_until(&mut *self.regs, &mut *self.wait, address, mask, expect, budget)
    }

    fn begin(&mut self) -> Result<(), Error> {
        self.regs.write(self.map.intr_m.cause, bits::CLEAR_ALL);
        let idle = self.wait_for(
            self.map.i2c_status,
            bits::I2C_STATUS_BUS_BUSY,
            Expect::Clear,
            self.budgets.bus_idle,
        );
        if idle {
            Ok(())
        } else {
            Err(Error::BusBusyTimeout)
        }
    }

    /// Queue one byte once the TX FIFO has room
    fn push(&mut self, byte: u8, stage: Stage) -> Result<(), Error> {
        let room = self.wait_for(
            self.map.tx_fifo_status,
            bits::TX_FIFO_NOT_FULL,
            Expect::Set,
            self.budgets.tx_fifo,
        );
        if !room {
            return Err(Error::TxFifoTimeout(stage));
        }
        self.regs.write(self.map.tx_fifo_wr, u32::from(byte));
        Ok(())
    }

    /// Wait for the byte on the wire to finish and check its acknowledge
    fn complete(&mut self, stage: Stage) -> Result<(), Error> {
        let done = self.wait_for(
            self.map.intr_m.cause,
            bits::INTR_M_DONE | bits::INTR_M_NACK | bits::INTR_M_ARB_LOST,
            Expect::Set,
            self.budgets.byte_completion,
        );
        if !done {
            return Err(Error::ByteCompletionTimeout(stage));
        }

        let cause = self.regs.read(self.map.intr_m.cause);
        self.regs.write(self.map.intr_m.cause, cause);

        if cause & bits::INTR_M_ARB_LOST != 0 {
            return Err(Error::ArbitrationLost);
        }
        if cause & bits::INTR_M_NACK != 0 {
            return Err(match stage {
                Stage::Address => Error::AddressNack,
                Stage::Pointer => Error::PointerNack,
                Stage::Data => Error::DataNack {
                    index: self.position,
                },
                Stage::ReadAddress => Error::ReadAddressNack,
            });
        }
        Ok(())
    }

    fn address(&mut self, address: u8, direction: Direction, repeated: bool) -> Result<(), Error> {
        let (phase, stage) = match (direction, repeated) {
            (Direction::Read, true) => (Phase::RepeatedStartAddressRead, Stage::ReadAddress),
            _ => (Phase::AddressWrite, Stage::Address),
        };
        self.advance(phase);

        self.push(direction.header(address), stage)?;
        self.command(bits::M_CMD_START);
        self.started = true;
        self.complete(stage)
    }

    fn pointer(&mut self, register: u8) -> Result<(), Error> {
        self.advance(Phase::RegisterPointer);
        self.push(register, Stage::Pointer)?;
        self.complete(Stage::Pointer)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.phase != Phase::DataTransfer {
            self.advance(Phase::DataTransfer);
        }
        for (position, &byte) in bytes.iter().enumerate() {
            self.position = position;
            self.push(byte, Stage::Data)?;
            self.complete(Stage::Data)?;
            self.transferred += 1;
        }
        Ok(())
    }

    /// Receive into `buf`, acknowledging every byte but the last
    ///
    /// The last byte is acknowledged too when `more_follows`, so the next
    /// buffer continues the same read.
    fn receive(&mut self, buf: &mut [u8], more_follows: bool) -> Result<(), Error> {
        if self.phase != Phase::DataReceive {
            self.advance(Phase::DataReceive);
        }
        let len = buf.len();
        for (index, slot) in buf.iter_mut().enumerate() {
            self.position = index;
            let ready = self.wait_for(
                self.map.rx_fifo_status,
                bits::RX_FIFO_NOT_EMPTY,
                Expect::Set,
                self.budgets.rx_fifo,
            );
            if !ready {
                return Err(Error::RxFifoTimeout { index });
            }

            *slot = self.regs.read(self.map.rx_fifo_rd) as u8;
            self.transferred += 1;

            if index + 1 < len || more_follows {
                self.command(bits::M_CMD_ACK);
            }
        }
        Ok(())
    }

    fn finish(&mut self, after_read: bool) -> Result<(), Error> {
        self.advance(Phase::Stop);
        let command = if after_read {
            bits::M_CMD_NACK | bits::M_CMD_STOP
        } else {
            bits::M_CMD_STOP
        };
        self.command(command);

        let idle = self.wait_for(
            self.map.i2c_status,
            bits::I2C_STATUS_BUS_BUSY,
            Expect::Clear,
            self.budgets.bus_idle,
        );
        if !idle {
            return Err(Error::StopTimeout);
        }
        self.regs.write(self.map.intr_m.cause, bits::INTR_M_STOP);

        self.advance(Phase::Done);
        Ok(())
    }

    fn conclude(&mut self, result: Result<(), Error>) -> Result<usize, Error> {
        match result {
            Ok(()) => Ok(self.transferred),
            Err(error) => {
                self.abort(error);
                Err(error)
            }
        }
    }

    /// Release the bus after a failure
    ///
    /// A STOP is only issued if this transaction issued a START, the
    /// failure was not the STOP itself, and arbitration was not lost.
    fn abort(&mut self, error: Error) {
        warn!(
            "i2c: {} in {} after {} bytes",
            error, self.phase, self.transferred
        );

        let receiving = self.phase == Phase::DataReceive;
        self.advance(Phase::Failed(error));

        let owns_bus = self.started
            && !matches!(error, Error::StopTimeout | Error::ArbitrationLost);
        if !owns_bus {
            return;
        }

        let command = if receiving {
            bits::M_CMD_NACK | bits::M_CMD_STOP
        } else {
            bits::M_CMD_STOP
        };
        self.command(command);

        let idle = self.wait_for(
            self.map.i2c_status,
            bits::I2C_STATUS_BUS_BUSY,
            Expect::Clear,
            self.budgets.bus_idle,
        );
        if !idle {
            warn!("i2c: bus still busy after abort");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimDevice, SimScb};
    use crate::wait::StepCounter;

    const MAP: ScbRegisters = ScbRegisters::at(0x4060_0000);

    fn budgets() -> TimeoutBudgets {
        TimeoutBudgets {
            bus_idle: 50,
            byte_completion: 50,
            tx_fifo: 50,
            rx_fifo: 50,
        }
    }

    #[test]
    fn test_write_phases_end_done() {
        let mut sim = SimScb::new(MAP).with_device(SimDevice::new(0x50));
        let mut steps = StepCounter::default();
        let budgets = budgets();
        let mut seq = Sequencer::new(&mut sim, &mut steps, &MAP, &budgets);

        assert_eq!(seq.run(Transaction::write(0x50, 0x10, &[1, 2])), Ok(2));
        assert_eq!(seq.phase(), Phase::Done);
        assert_eq!(sim.pushed(), &[0xA0, 0x10, 1, 2]);
        assert_eq!(sim.commands(), &[bits::M_CMD_START, bits::M_CMD_STOP]);
    }

    #[test]
    fn test_read_issues_repeated_start_and_nacks_last() {
        let device = SimDevice::new(0x50).with_registers(0x10, &[7, 8, 9]);
        let mut sim = SimScb::new(MAP).with_device(device);
        let mut steps = StepCounter::default();
        let budgets = budgets();
        let mut buf = [0u8; 3];
        let mut seq = Sequencer::new(&mut sim, &mut steps, &MAP, &budgets);

        assert_eq!(seq.run(Transaction::read(0x50, 0x10, &mut buf)), Ok(3));
        assert_eq!(buf, [7, 8, 9]);
        assert_eq!(sim.pushed(), &[0xA0, 0x10, 0xA1]);
        assert_eq!(
            sim.commands(),
            &[
                bits::M_CMD_START,
                bits::M_CMD_START,
                bits::M_CMD_ACK,
                bits::M_CMD_ACK,
                bits::M_CMD_NACK | bits::M_CMD_STOP,
            ]
        );
    }

    #[test]
    fn test_registerless_operations_merge_by_direction() {
        let device = SimDevice::new(0x3C).with_registers(0x05, &[0x11, 0x22, 0x33]);
        let mut sim = SimScb::new(MAP).with_device(device);
        let mut steps = StepCounter::default();
        let budgets = budgets();
        let mut first = [0u8; 1];
        let mut rest = [0u8; 2];
        let mut ops = [
            Operation::Write(&[0x05]),
            Operation::Read(&mut first),
            Operation::Read(&mut rest),
        ];
        let mut seq = Sequencer::new(&mut sim, &mut steps, &MAP, &budgets);

        assert_eq!(seq.run_operations(0x3C, &mut ops), Ok(4));
        assert_eq!(first, [0x11]);
        assert_eq!(rest, [0x22, 0x33]);
        assert_eq!(sim.pushed(), &[0x78, 0x05, 0x79]);
    }

    #[test]
    fn test_read_then_write_nacks_before_restart() {
        let device = SimDevice::new(0x3C).with_register(0x00, 0x5A);
        let mut sim = SimScb::new(MAP).with_device(device);
        let mut steps = StepCounter::default();
        let budgets = budgets();
        let mut buf = [0u8; 1];
        let mut ops = [Operation::Read(&mut buf), Operation::Write(&[0x01, 0xEE])];
        let mut seq = Sequencer::new(&mut sim, &mut steps, &MAP, &budgets);

        assert_eq!(seq.run_operations(0x3C, &mut ops), Ok(3));
        assert_eq!(buf, [0x5A]);
        assert_eq!(
            sim.commands(),
            &[
                bits::M_CMD_START,
                bits::M_CMD_NACK,
                bits::M_CMD_START,
                bits::M_CMD_STOP,
            ]
        );
        assert_eq!(sim.device(0x3C).unwrap().register(0x01), 0xEE);
    }

    #[test]
    fn test_arbitration_loss_does_not_stop() {
        let mut sim = SimScb::new(MAP).with_device(SimDevice::new(0x50));
        sim.faults.arbitration_lost = true;
        let mut steps = StepCounter::default();
        let budgets = budgets();
        let mut seq = Sequencer::new(&mut sim, &mut steps, &MAP, &budgets);

        assert_eq!(
            seq.run(Transaction::write(0x50, 0, &[1])),
            Err(Error::ArbitrationLost)
        );
        assert_eq!(seq.phase(), Phase::Failed(Error::ArbitrationLost));
        assert_eq!(sim.stops(), 0);
    }

    #[test]
    fn test_tx_fifo_full_times_out() {
        let mut sim = SimScb::new(MAP).with_device(SimDevice::new(0x50));
        sim.faults.tx_fifo_full = true;
        let mut steps = StepCounter::default();
        let budgets = budgets();
        let mut seq = Sequencer::new(&mut sim, &mut steps, &MAP, &budgets);

        assert_eq!(
            seq.run(Transaction::write(0x50, 0, &[1])),
            Err(Error::TxFifoTimeout(Stage::Address))
        );
        // START was never issued, so the bus is left alone
        assert_eq!(sim.stops(), 0);
        assert_eq!(sim.reads_of(MAP.tx_fifo_status), 50);
    }

    #[test]
    fn test_read_header_nack_stops() {
        let device = SimDevice::new(0x50).with_register(0x10, 0x42);
        let mut sim = SimScb::new(MAP).with_device(device);
        sim.faults.nack_read_header = true;
        let mut steps = StepCounter::default();
        let budgets = budgets();
        let mut buf = [0u8; 1];
        let mut seq = Sequencer::new(&mut sim, &mut steps, &MAP, &budgets);

        assert_eq!(
            seq.run(Transaction::read(0x50, 0x10, &mut buf)),
            Err(Error::ReadAddressNack)
        );
        assert_eq!(seq.phase(), Phase::Failed(Error::ReadAddressNack));
        assert_eq!(
            sim.commands(),
            &[bits::M_CMD_START, bits::M_CMD_START, bits::M_CMD_STOP]
        );
        assert!(!sim.bus_busy());
    }

    /// Run `transaction` with completion stalling after `completed` bytes
    fn stalled_after(completed: usize, transaction: Transaction<'_>) -> (Result<usize, Error>, SimScb) {
        let device = SimDevice::new(0x50).with_registers(0x10, &[1, 2]);
        let mut sim = SimScb::new(MAP).with_device(device);
        sim.faults.stall_completion_after = Some(completed);
        let mut steps = StepCounter::default();
        let budgets = budgets();
        let result = Sequencer::new(&mut sim, &mut steps, &MAP, &budgets).run(transaction);
        (result, sim)
    }

    #[test]
    fn test_pointer_completion_timeout() {
        let (result, sim) = stalled_after(1, Transaction::write(0x50, 0x10, &[1]));
        assert_eq!(result, Err(Error::ByteCompletionTimeout(Stage::Pointer)));
        assert_eq!(sim.commands(), &[bits::M_CMD_START, bits::M_CMD_STOP]);
        assert_eq!(sim.pushed(), &[0xA0, 0x10]);
    }

    #[test]
    fn test_data_completion_timeout() {
        let (result, sim) = stalled_after(2, Transaction::write(0x50, 0x10, &[1, 2]));
        assert_eq!(result, Err(Error::ByteCompletionTimeout(Stage::Data)));
        assert_eq!(sim.commands(), &[bits::M_CMD_START, bits::M_CMD_STOP]);
        assert_eq!(sim.device(0x50).unwrap().written(), 0);
    }

    #[test]
    fn test_read_address_completion_timeout() {
        let mut buf = [0u8; 2];
        let (result, sim) = stalled_after(2, Transaction::read(0x50, 0x10, &mut buf));
        assert_eq!(result, Err(Error::ByteCompletionTimeout(Stage::ReadAddress)));
        assert_eq!(
            sim.commands(),
            &[bits::M_CMD_START, bits::M_CMD_START, bits::M_CMD_STOP]
        );
        assert!(!sim.bus_busy());
    }

    #[test]
    fn test_data_nack_index_is_within_failing_buffer() {
        let device = SimDevice::new(0x3C).nack_data_at(1);
        let mut sim = SimScb::new(MAP).with_device(device);
        let mut steps = StepCounter::default();
        let budgets = budgets();
        let mut buf = [0u8; 2];
        let mut ops = [Operation::Read(&mut buf), Operation::Write(&[0x10, 1, 2])];
        let mut seq = Sequencer::new(&mut sim, &mut steps, &MAP, &budgets);

        assert_eq!(
            seq.run_operations(0x3C, &mut ops),
            Err(Error::DataNack { index: 2 })
        );
        assert_eq!(seq.transferred(), 4);
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn test_empty_read_does_not_extend_ack_run() {
        let device = SimDevice::new(0x3C).with_registers(0x00, &[0x11, 0x22, 0x33]);
        let mut sim = SimScb::new(MAP).with_device(device);
        let mut steps = StepCounter::default();
        let budgets = budgets();
        let mut buf = [0u8; 2];
        let mut empty = [0u8; 0];
        let mut ops = [Operation::Read(&mut buf), Operation::Read(&mut empty)];
        let mut seq = Sequencer::new(&mut sim, &mut steps, &MAP, &budgets);

        assert_eq!(seq.run_operations(0x3C, &mut ops), Ok(2));
        assert_eq!(buf, [0x11, 0x22]);
        assert_eq!(
            sim.commands(),
            &[
                bits::M_CMD_START,
                bits::M_CMD_ACK,
                bits::M_CMD_NACK | bits::M_CMD_STOP,
            ]
        );
    }

    #[test]
    fn test_probe_missing_device() {
        let mut sim = SimScb::new(MAP);
        let mut steps = StepCounter::default();
        let budgets = budgets();
        let mut seq = Sequencer::new(&mut sim, &mut steps, &MAP, &budgets);

        assert_eq!(seq.run_probe(0x20), Err(Error::AddressNack));
        assert_eq!(sim.stops(), 1);
        assert!(!sim.bus_busy());
    }
}

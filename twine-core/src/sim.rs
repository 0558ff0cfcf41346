//! Simulated SCB controller
//!
//! A behavioral model of the I2C master register set with register-style
//! devices attached to its bus. The controller advances the wire whenever
//! a register is read: a latched START consumes the header byte from the
//! TX FIFO, and while writing, each queued byte is shifted to the
//! addressed device. Reads are served through the RX FIFO, one byte per
//! ACK command.
//!
//! Everything that is not part of the master register set (routing,
//! clock gates, configuration) is a plain word store.

use heapless::{Deque, LinearMap, Vec};
use twine_hal::RegisterAccess;

use crate::regs::{bits, ScbRegisters};

/// Most devices one bus can host
pub const MAX_DEVICES: usize = 4;
/// TX and RX FIFO depth
pub const FIFO_DEPTH: usize = 8;

const TRACE_LEN: usize = 256;

/// Register-file device on the simulated bus
///
/// The first byte of every write sets the register pointer; following
/// bytes are stored and advance it. Reads return bytes from the pointer
/// onwards.
#[derive(Debug, Clone)]
pub struct SimDevice {
    address: u8,
    memory: [u8; 256],
    pointer: u8,
    pointer_mask: u8,
    nack_pointer: bool,
    nack_data_at: Option<usize>,
    written: usize,
}

impl SimDevice {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            memory: [0; 256],
            pointer: 0,
            pointer_mask: 0xFF,
            nack_pointer: false,
            nack_data_at: None,
            written: 0,
        }
    }

    /// Only the bits in `mask` of a pointer byte select a register
    ///
    /// Devices that use the top pointer bit as an auto-increment flag
    /// are modeled with a mask of `0x7F`.
    pub fn with_pointer_mask(mut self, mask: u8) -> Self {
        self.pointer_mask = mask;
        self
    }

    pub fn with_register(mut self, register: u8, value: u8) -> Self {
        self.memory[register as usize] = value;
        self
    }

    pub fn with_registers(mut self, start: u8, values: &[u8]) -> Self {
        for (offset, &value) in values.iter().enumerate() {
            let index = (start as usize + offset) % self.memory.len();
            self.memory[index] = value;
        }
        self
    }

    /// Reject every register pointer byte
    pub fn nack_pointer(mut self) -> Self {
        self.nack_pointer = true;
        self
    }

    /// Reject the payload byte at `index` of each write
    pub fn nack_data_at(mut self, index: usize) -> Self {
        self.nack_data_at = Some(index);
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn register(&self, register: u8) -> u8 {
        self.memory[register as usize]
    }

    pub fn set_register(&mut self, register: u8, value: u8) {
        self.memory[register as usize] = value;
    }

    /// Payload bytes accepted by the most recent write
    pub fn written(&self) -> usize {
        self.written
    }

    fn advance_pointer(&mut self) {
        self.pointer = self.pointer.wrapping_add(1) & self.pointer_mask;
    }
}

/// Injected controller faults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    /// Bus-busy status never clears
    pub stuck_busy: bool,
    /// Queued bytes never complete
    pub stall_completion: bool,
    /// Bytes complete until this many have crossed the wire, headers
    /// included, then stall
    pub stall_completion_after: Option<usize>,
    /// TX FIFO never reports room
    pub tx_fifo_full: bool,
    /// Devices never return data
    pub rx_starved: bool,
    /// Devices return this many bytes per read, then nothing
    pub rx_starve_after: Option<usize>,
    /// Read-direction headers are not acknowledged
    pub nack_read_header: bool,
    /// Every START loses arbitration
    pub arbitration_lost: bool,
    /// Controller enable bit does not stick
    pub ignore_enable: bool,
    /// STOP is counted but the bus stays owned
    pub hold_after_stop: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wire {
    Idle,
    Writing { device: usize, pointer_set: bool },
    Reading { device: usize },
    /// Transfer ended by a NACK; the bus stays owned until STOP
    Held,
}

/// Simulated SCB with attached devices
pub struct SimScb {
    map: ScbRegisters,
    registers: LinearMap<u32, u32, 32>,
    reads: LinearMap<u32, u32, 32>,
    devices: Vec<SimDevice, MAX_DEVICES>,
    tx_fifo: Deque<u8, FIFO_DEPTH>,
    rx_fifo: Deque<u8, FIFO_DEPTH>,
    intr_m: u32,
    intr_m_mask: u32,
    wire: Wire,
    start_pending: bool,
    pushed: Vec<u8, TRACE_LEN>,
    commands: Vec<u32, TRACE_LEN>,
    stops: usize,
    /// Bytes moved across the wire since creation
    completed: usize,
    /// Bytes served by the current read
    served: usize,
    /// Faults applied from now on
    pub faults: Faults,
}

impl SimScb {
    pub fn new(map: ScbRegisters) -> Self {
        Self {
            map,
            registers: LinearMap::new(),
            reads: LinearMap::new(),
            devices: Vec::new(),
            tx_fifo: Deque::new(),
            rx_fifo: Deque::new(),
            intr_m: 0,
            intr_m_mask: 0,
            wire: Wire::Idle,
            start_pending: false,
            pushed: Vec::new(),
            commands: Vec::new(),
            stops: 0,
            completed: 0,
            served: 0,
            faults: Faults::default(),
        }
    }

    /// Attach a device; returns it back if the bus is full
    pub fn attach(&mut self, device: SimDevice) -> Result<(), SimDevice> {
        self.devices.push(device)
    }

    pub fn with_device(mut self, device: SimDevice) -> Self {
        let _ = self.attach(device);
        self
    }

    pub fn map(&self) -> &ScbRegisters {
        &self.map
    }

    pub fn device(&self, address: u8) -> Option<&SimDevice> {
        self.devices.iter().find(|d| d.address == address)
    }

    pub fn device_mut(&mut self, address: u8) -> Option<&mut SimDevice> {
        self.devices.iter_mut().find(|d| d.address == address)
    }

    /// Every byte written to the TX FIFO, headers included
    pub fn pushed(&self) -> &[u8] {
        &self.pushed
    }

    /// Every word written to the master command register
    pub fn commands(&self) -> &[u32] {
        &self.commands
    }

    /// Number of STOP commands issued
    pub fn stops(&self) -> usize {
        self.stops
    }

    /// Number of reads of the register at `address`
    pub fn reads_of(&self, address: u32) -> u32 {
        self.reads.get(&address).copied().unwrap_or(0)
    }

    /// Forget recorded traffic, keeping devices and register contents
    pub fn clear_trace(&mut self) {
        self.pushed.clear();
        self.commands.clear();
        self.reads.clear();
        self.stops = 0;
    }

    /// Current value of a register without side effects
    pub fn peek(&self, address: u32) -> u32 {
        if address == self.map.intr_m.cause {
            self.intr_m
        } else if address == self.map.intr_m.mask {
            self.intr_m_mask
        } else if address == self.map.i2c_status {
            self.status()
        } else {
            self.registers.get(&address).copied().unwrap_or(0)
        }
    }

    /// Bus is owned by a transaction
    pub fn bus_busy(&self) -> bool {
        self.faults.stuck_busy || self.wire != Wire::Idle
    }

    fn status(&self) -> u32 {
        if self.bus_busy() {
            bits::I2C_STATUS_BUS_BUSY
        } else {
            0
        }
    }

    fn count_read(&mut self, address: u32) {
        let count = self.reads.get(&address).copied().unwrap_or(0);
        let _ = self.reads.insert(address, count.saturating_add(1));
    }

    fn store(&mut self, address: u32, value: u32) {
        let _ = self.registers.insert(address, value);
    }

    fn load_rx(&mut self, device: usize) {
        let exhausted = self
            .faults
            .rx_starve_after
            .map_or(false, |limit| self.served >= limit);
        if self.faults.rx_starved || exhausted {
            return;
        }
        self.served += 1;
        let dev = &mut self.devices[device];
        let byte = dev.memory[dev.pointer as usize];
        dev.advance_pointer();
        let _ = self.rx_fifo.push_back(byte);
    }

    /// Move one queued byte across the wire
    fn step(&mut self) {
        let stalled = self
            .faults
            .stall_completion_after
            .map_or(false, |limit| self.completed >= limit);
        if self.faults.stall_completion || stalled {
            return;
        }

        if self.start_pending {
            let Some(header) = self.tx_fifo.pop_front() else {
                return;
            };
            self.start_pending = false;
            self.completed += 1;

            if self.faults.arbitration_lost {
                self.intr_m |= bits::INTR_M_ARB_LOST;
                self.wire = Wire::Idle;
                return;
            }

            let address = header >> 1;
            let read = header & 1 != 0;
            match self.devices.iter().position(|d| d.address == address) {
                Some(_) if read && self.faults.nack_read_header => {
                    self.intr_m |= bits::INTR_M_NACK | bits::INTR_M_DONE;
                    self.wire = Wire::Held;
                }
                None => {
                    self.intr_m |= bits::INTR_M_NACK | bits::INTR_M_DONE;
                    self.wire = Wire::Held;
                }
                Some(device) if read => {
                    self.intr_m |= bits::INTR_M_DONE;
                    self.wire = Wire::Reading { device };
                    self.served = 0;
                    self.load_rx(device);
                }
                Some(device) => {
                    self.intr_m |= bits::INTR_M_DONE;
                    self.devices[device].written = 0;
                    self.wire = Wire::Writing {
                        device,
                        pointer_set: false,
                    };
                }
            }
            return;
        }

        let Wire::Writing { device, pointer_set } = self.wire else {
            return;
        };
        let Some(byte) = self.tx_fifo.pop_front() else {
            return;
        };
        self.completed += 1;

        let dev = &mut self.devices[device];
        if !pointer_set {
            if dev.nack_pointer {
                self.intr_m |= bits::INTR_M_NACK | bits::INTR_M_DONE;
                self.wire = Wire::Held;
                return;
            }
            dev.pointer = byte & dev.pointer_mask;
            self.wire = Wire::Writing {
                device,
                pointer_set: true,
            };
        } else {
            if dev.nack_data_at == Some(dev.written) {
                self.intr_m |= bits::INTR_M_NACK | bits::INTR_M_DONE;
                self.wire = Wire::Held;
                return;
            }
            dev.memory[dev.pointer as usize] = byte;
            dev.advance_pointer();
            dev.written += 1;
        }
        self.intr_m |= bits::INTR_M_DONE;
    }

    fn command(&mut self, command: u32) {
        let _ = self.commands.push(command);

        if command & bits::M_CMD_ACK != 0 {
            if let Wire::Reading { device } = self.wire {
                self.load_rx(device);
            }
        }
        if command & bits::M_CMD_NACK != 0 && matches!(self.wire, Wire::Reading { .. }) {
            self.wire = Wire::Held;
        }
        if command & bits::M_CMD_STOP != 0 {
            self.stops += 1;
            if !self.faults.hold_after_stop {
                self.wire = Wire::Idle;
            }
            self.start_pending = false;
            self.tx_fifo.clear();
            self.rx_fifo.clear();
            self.intr_m |= bits::INTR_M_STOP;
        }
        if command & bits::M_CMD_START != 0 {
            self.start_pending = true;
        }
    }
}

impl RegisterAccess for SimScb {
    fn read(&mut self, address: u32) -> u32 {
        self.count_read(address);
        self.step();

        let map = self.map;
        if address == map.i2c_status {
            self.status()
        } else if address == map.tx_fifo_status {
            let mut status = 0;
            if !self.faults.tx_fifo_full && !self.tx_fifo.is_full() {
                status |= bits::TX_FIFO_NOT_FULL;
            }
            if self.tx_fifo.is_empty() {
                status |= bits::TX_FIFO_EMPTY;
            }
            status
        } else if address == map.rx_fifo_status {
            if self.rx_fifo.is_empty() {
                0
            } else {
                bits::RX_FIFO_NOT_EMPTY
            }
        } else if address == map.rx_fifo_rd {
            self.rx_fifo.pop_front().map_or(0xFF, u32::from)
        } else if address == map.intr_m.cause || address == map.intr_m.set {
            self.intr_m
        } else if address == map.intr_m.mask {
            self.intr_m_mask
        } else if address == map.intr_m.masked {
            self.intr_m & self.intr_m_mask
        } else {
            self.registers.get(&address).copied().unwrap_or(0)
        }
    }

    fn write(&mut self, address: u32, value: u32) {
        let map = self.map;
        if address == map.tx_fifo_wr {
            let byte = value as u8;
            let _ = self.pushed.push(byte);
            if !self.faults.tx_fifo_full {
                let _ = self.tx_fifo.push_back(byte);
            }
        } else if address == map.i2c_m_cmd {
            self.command(value);
        } else if address == map.intr_m.cause {
            self.intr_m &= !value;
        } else if address == map.intr_m.set {
            self.intr_m |= value;
        } else if address == map.intr_m.mask {
            self.intr_m_mask = value;
        } else if address == map.intr_s.cause
            || address == map.intr_tx.cause
            || address == map.intr_rx.cause
        {
            let cause = self.registers.get(&address).copied().unwrap_or(0);
            self.store(address, cause & !value);
        } else if address == map.ctrl && self.faults.ignore_enable {
            self.store(address, value & !bits::CTRL_ENABLED);
        } else {
            self.store(address, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: ScbRegisters = ScbRegisters::at(0x4060_0000);

    fn start(sim: &mut SimScb, header: u8) {
        sim.write(MAP.tx_fifo_wr, u32::from(header));
        sim.write(MAP.i2c_m_cmd, bits::M_CMD_START);
    }

    #[test]
    fn test_missing_device_nacks_address() {
        let mut sim = SimScb::new(MAP);
        start(&mut sim, 0x42 << 1);
        let cause = sim.read(MAP.intr_m.cause);
        assert_eq!(cause & bits::INTR_M_NACK, bits::INTR_M_NACK);
        assert!(sim.bus_busy());

        sim.write(MAP.i2c_m_cmd, bits::M_CMD_STOP);
        assert!(!sim.bus_busy());
        assert_eq!(sim.stops(), 1);
    }

    #[test]
    fn test_write_sets_pointer_then_stores() {
        let mut sim = SimScb::new(MAP).with_device(SimDevice::new(0x19));
        start(&mut sim, 0x19 << 1);
        assert_eq!(sim.read(MAP.intr_m.cause), bits::INTR_M_DONE);

        for byte in [0x20, 0xAA, 0xBB] {
            sim.write(MAP.intr_m.cause, bits::CLEAR_ALL);
            sim.write(MAP.tx_fifo_wr, byte);
            assert_eq!(sim.read(MAP.intr_m.cause), bits::INTR_M_DONE);
        }

        let device = sim.device(0x19).unwrap();
        assert_eq!(device.register(0x20), 0xAA);
        assert_eq!(device.register(0x21), 0xBB);
        assert_eq!(device.written(), 2);
        assert_eq!(sim.pushed(), &[0x32, 0x20, 0xAA, 0xBB]);
    }

    #[test]
    fn test_read_serves_one_byte_per_ack() {
        let device = SimDevice::new(0x19).with_registers(0x10, &[1, 2, 3]);
        let mut sim = SimScb::new(MAP).with_device(device);

        start(&mut sim, 0x19 << 1);
        sim.read(MAP.intr_m.cause);
        sim.write(MAP.tx_fifo_wr, 0x10);
        sim.read(MAP.intr_m.cause);
        start(&mut sim, (0x19 << 1) | 1);
        sim.read(MAP.intr_m.cause);

        assert_eq!(sim.read(MAP.rx_fifo_rd), 1);
        assert_eq!(sim.read(MAP.rx_fifo_status), 0);
        sim.write(MAP.i2c_m_cmd, bits::M_CMD_ACK);
        assert_eq!(sim.read(MAP.rx_fifo_rd), 2);
    }

    #[test]
    fn test_cause_registers_are_write_one_to_clear() {
        let mut sim = SimScb::new(MAP);
        sim.write(MAP.intr_m.set, bits::INTR_M_DONE | bits::INTR_M_NACK);
        sim.write(MAP.intr_m.cause, bits::INTR_M_NACK);
        assert_eq!(sim.peek(MAP.intr_m.cause), bits::INTR_M_DONE);

        sim.write(MAP.intr_s.cause, bits::CLEAR_ALL);
        assert_eq!(sim.peek(MAP.intr_s.cause), 0);
    }

    #[test]
    fn test_read_header_nack_leaves_bus_held() {
        let mut sim = SimScb::new(MAP).with_device(SimDevice::new(0x19));
        sim.faults.nack_read_header = true;

        start(&mut sim, 0x19 << 1);
        assert_eq!(sim.read(MAP.intr_m.cause), bits::INTR_M_DONE);
        sim.write(MAP.intr_m.cause, bits::CLEAR_ALL);

        start(&mut sim, (0x19 << 1) | 1);
        let cause = sim.read(MAP.intr_m.cause);
        assert_eq!(cause & bits::INTR_M_NACK, bits::INTR_M_NACK);
        assert!(sim.bus_busy());
    }

    #[test]
    fn test_completion_stalls_after_limit() {
        let mut sim = SimScb::new(MAP).with_device(SimDevice::new(0x19));
        sim.faults.stall_completion_after = Some(1);

        start(&mut sim, 0x19 << 1);
        assert_eq!(sim.read(MAP.intr_m.cause), bits::INTR_M_DONE);
        sim.write(MAP.intr_m.cause, bits::CLEAR_ALL);

        sim.write(MAP.tx_fifo_wr, 0x20);
        assert_eq!(sim.read(MAP.intr_m.cause), 0);
        assert_eq!(sim.read(MAP.tx_fifo_status) & bits::TX_FIFO_EMPTY, 0);
    }

    #[test]
    fn test_receive_starves_after_limit() {
        let device = SimDevice::new(0x19).with_registers(0, &[1, 2, 3]);
        let mut sim = SimScb::new(MAP).with_device(device);
        sim.faults.rx_starve_after = Some(2);

        start(&mut sim, (0x19 << 1) | 1);
        sim.read(MAP.intr_m.cause);
        assert_eq!(sim.read(MAP.rx_fifo_rd), 1);
        sim.write(MAP.i2c_m_cmd, bits::M_CMD_ACK);
        assert_eq!(sim.read(MAP.rx_fifo_rd), 2);
        sim.write(MAP.i2c_m_cmd, bits::M_CMD_ACK);
        assert_eq!(sim.read(MAP.rx_fifo_status), 0);
    }

    #[test]
    fn test_stuck_busy_and_read_counts() {
        let mut sim = SimScb::new(MAP);
        sim.faults.stuck_busy = true;
        for _ in 0..3 {
            assert_eq!(sim.read(MAP.i2c_status), bits::I2C_STATUS_BUS_BUSY);
        }
        assert_eq!(sim.reads_of(MAP.i2c_status), 3);
    }
}

//! Twine - PSoC 6 I2C demo firmware
//!
//! Brings up SCB0 as an I2C master from the values in bus.toml, looks for
//! the LSM303AGR accelerometer and logs an acceleration sample every
//! sample period over RTT.
//!
//! The master lives in a critical-section mutex so that any later
//! interrupt-context user serializes with the main loop.

#![no_std]
#![no_main]

use core::cell::RefCell;

use cortex_m_rt::entry;
use critical_section::Mutex;
use defmt::*;
use {defmt_rtt as _, panic_probe as _};

use twine_core::{BusConfig, I2cMaster, TimeoutBudgets};
use twine_drivers::sensor::lsm303agr::{Lsm303Config, Lsm303Error, Lsm303agr, DEVICE_ID};
use twine_hal::gpio::Level;
use twine_hal::{InputPin, OutputPin};
use twine_hal_psoc6::gpio::{parse_pin_name, PortPin};
use twine_hal_psoc6::scb;
use twine_hal_psoc6::wait::CycleWait;
use twine_hal_psoc6::Mmio;

/// Constants generated from bus.toml
mod bus_config {
    include!(concat!(env!("OUT_DIR"), "/bus_config.rs"));
}

type Bus = I2cMaster<Mmio, CycleWait>;

/// The board's only I2C master, once initialized
static BUS: Mutex<RefCell<Option<Bus>>> = Mutex::new(RefCell::new(None));

/// E-paper reset pulse width
const RESET_PULSE_MS: u32 = 10;

#[entry]
fn main() -> ! {
    info!("Twine firmware starting...");

    let config = BusConfig {
        frequency_hz: bus_config::FREQUENCY_HZ,
        budgets: TimeoutBudgets {
            bus_idle: bus_config::BUS_IDLE_BUDGET,
            byte_completion: bus_config::BYTE_COMPLETION_BUDGET,
            tx_fifo: bus_config::TX_FIFO_BUDGET,
            rx_fifo: bus_config::RX_FIFO_BUDGET,
        },
    };
    if let Err(e) = config.validate() {
        error!("Bus configuration rejected: {}", e);
        park();
    }

    // SAFETY: SCB0 and its pins are driven only through this master
    let regs = unsafe { Mmio::steal() };
    let mut master = scb::scb0_master(regs, CycleWait::new(bus_config::POLL_CYCLES), config);
    if let Err(e) = master.init() {
        error!("SCB0 init failed: {}", e);
        park();
    }
    info!("SCB0 up at {} Hz", config.frequency_hz);

    match master.scan() {
        Ok(found) => {
            for address in found.iter() {
                info!("Device at {=u8:#x}", *address);
            }
        }
        Err(e) => warn!("Bus scan aborted: {}", e),
    }

    critical_section::with(|cs| BUS.borrow_ref_mut(cs).replace(master));

    reset_epaper();

    let detected = match with_bus(|bus| sensor(bus).who_am_i()) {
        Some(Ok(DEVICE_ID)) => true,
        Some(Ok(id)) => {
            warn!("Unexpected WHO_AM_I {=u8:#x}", id);
            false
        }
        Some(Err(e)) => {
            warn!("Accelerometer not answering: {}", e);
            false
        }
        None => false,
    };

    if detected {
        match with_bus(|bus| sensor(bus).init(&Lsm303Config::default())) {
            Some(Ok(())) => info!("LSM303AGR initialized"),
            Some(Err(e)) => warn!("LSM303AGR init failed: {}", e),
            None => {}
        }
    }

    loop {
        if detected {
            match with_bus(|bus| sensor(bus).read_raw()) {
                Some(Ok(sample)) => info!("accel x={} y={} z={}", sample.x, sample.y, sample.z),
                Some(Err(Lsm303Error::Bus(e))) => warn!("Sample failed: {} (code {})", e, e.status_code()),
                Some(Err(e)) => warn!("Sample failed: {}", e),
                None => {}
            }
        }
        delay_ms(bus_config::SAMPLE_PERIOD_MS);
    }
}

/// Run `f` with exclusive access to the bus
fn with_bus<T>(f: impl FnOnce(&mut Bus) -> T) -> Option<T> {
    critical_section::with(|cs| BUS.borrow_ref_mut(cs).as_mut().map(f))
}

fn sensor(bus: &mut Bus) -> Lsm303agr<&mut Bus> {
    Lsm303agr::with_address(bus, bus_config::ACCEL_ADDRESS)
}

/// Pulse the e-paper reset line and report its busy line
fn reset_epaper() {
    let (Some(reset), Some(busy)) = (
        parse_pin_name(bus_config::EPAPER_RESET_PIN),
        parse_pin_name(bus_config::EPAPER_BUSY_PIN),
    ) else {
        warn!("E-paper pins not usable, skipping reset");
        return;
    };

    // SAFETY: the e-paper port is not touched elsewhere
    let mut reset = PortPin::new(unsafe { Mmio::steal() }, reset).into_output(Level::High);
    let mut busy = PortPin::new(unsafe { Mmio::steal() }, busy).into_input();

    reset.set_low();
    delay_ms(RESET_PULSE_MS);
    reset.set_high();
    delay_ms(RESET_PULSE_MS);

    info!("E-paper reset, busy={}", busy.is_high());
}

fn delay_ms(ms: u32) {
    cortex_m::asm::delay(ms.saturating_mul(bus_config::CORE_CLOCK_HZ / 1_000));
}

/// Stop here, leaving the RTT log readable
fn park() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

//! Build script for twine-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates bus.toml at compile time
//! - Generates the bus constants included by main.rs

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use twine_hal_psoc6::gpio::parse_pin_name;

/// Flash and SRAM below these belong to the CM0+ image
const CM4_FLASH_START: u64 = 0x1000_2000;
const CM4_RAM_START: u64 = 0x0800_2000;

fn main() {
    validate_memory_layout();
    setup_linker();
    let config = validate_config();
    generate_constants(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Refuse a memory.x that would overwrite the CM0+ image
fn validate_memory_layout() {
    let memory_x = include_str!("memory.x");
    let mut errors = Vec::new();

    for (region, start) in [("FLASH", CM4_FLASH_START), ("RAM", CM4_RAM_START)] {
        match region_origin(memory_x, region) {
            Some(origin) if origin >= start => {}
            Some(origin) => errors.push(format!(
                "{} origin {:#010x} is below the CM4 start {:#010x}",
                region, origin, start
            )),
            None => errors.push(format!("memory.x has no {} region", region)),
        }
    }

    report("Invalid memory.x layout", &errors);
}

/// ORIGIN of `region` in a linker MEMORY block
fn region_origin(memory_x: &str, region: &str) -> Option<u64> {
    let line = memory_x
        .lines()
        .map(str::trim)
        .find(|line| line.split_whitespace().next() == Some(region))?;
    let origin = line.split("ORIGIN").nth(1)?;
    let value = origin.trim_start_matches([' ', '=']).split([',', ' ']).next()?;
    u64::from_str_radix(value.trim_start_matches("0x"), 16).ok()
}

/// Values pulled out of a validated bus.toml
struct BusToml {
    core_clock_hz: i64,
    poll_cycles: i64,
    frequency_hz: i64,
    budgets: [(&'static str, i64); 4],
    accel_address: i64,
    sample_period_ms: i64,
    reset_pin: String,
    busy_pin: String,
}

/// Validate bus.toml at compile time
fn validate_config() -> BusToml {
    println!("cargo:rerun-if-changed=bus.toml");

    let config_path = Path::new("bus.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: bus.toml not found!                                      ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a bus.toml configuration file.            ║\n\
            ║  Please create one in the twine-firmware directory.              ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read bus.toml                                  ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in bus.toml                          ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();

    for section in ["board", "bus", "budgets", "accelerometer", "epaper"] {
        if !matches!(config.get(section), Some(toml::Value::Table(_))) {
            errors.push(format!("Missing [{}] section", section));
        }
    }
    report("Missing required sections in bus.toml", &errors);

    let core_clock_hz = integer(&config, "board", "core_clock_hz", 1_000_000..=200_000_000, &mut errors);
    let poll_cycles = integer(&config, "board", "poll_cycles", 0..=1_000_000, &mut errors);
    let frequency_hz = integer(&config, "bus", "frequency_hz", 1_000..=1_000_000, &mut errors);
    let budgets = ["bus_idle", "byte_completion", "tx_fifo", "rx_fifo"]
        .map(|name| (name, integer(&config, "budgets", name, 1..=u32::MAX as i64, &mut errors)));
    let accel_address = integer(&config, "accelerometer", "address", 0x08..=0x77, &mut errors);
    let sample_period_ms = integer(&config, "accelerometer", "sample_period_ms", 1..=60_000, &mut errors);
    let reset_pin = pin(&config, "reset_pin", &mut errors);
    let busy_pin = pin(&config, "busy_pin", &mut errors);

    report("Invalid bus configuration", &errors);
    println!("cargo:warning=bus.toml validated successfully");

    BusToml {
        core_clock_hz,
        poll_cycles,
        frequency_hz,
        budgets,
        accel_address,
        sample_period_ms,
        reset_pin,
        busy_pin,
    }
}

/// Fetch `[section] key` as an integer within `range`
fn integer(
    config: &toml::Value,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> i64 {
    match config.get(section).and_then(|s| s.get(key)) {
        Some(toml::Value::Integer(value)) if range.contains(value) => *value,
        Some(toml::Value::Integer(_)) => {
            errors.push(format!(
                "[{}] {} must be {}-{}",
                section,
                key,
                range.start(),
                range.end()
            ));
            0
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            0
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            0
        }
    }
}

/// Fetch an `[epaper]` pin name, checking the "P<port>.<pin>" format
fn pin(config: &toml::Value, key: &str, errors: &mut Vec<String>) -> String {
    let name = match config.get("epaper").and_then(|s| s.get(key)) {
        Some(toml::Value::String(name)) => name.trim().to_string(),
        Some(_) => {
            errors.push(format!("[epaper] {} must be a string", key));
            return String::new();
        }
        None => {
            errors.push(format!("[epaper] missing '{}'", key));
            return String::new();
        }
    };

    if parse_pin_name(&name).is_none() {
        errors.push(format!("[epaper] {} '{}' is not a pin like P10.0", key, name));
    }
    name
}

/// Abort the build with every collected error
fn report(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write `bus_config.rs` into OUT_DIR
fn generate_constants(config: &BusToml) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let mut f = File::create(out_dir.join("bus_config.rs")).unwrap();

    writeln!(f, "// Generated from bus.toml by build.rs").unwrap();
    writeln!(f, "pub const CORE_CLOCK_HZ: u32 = {};", config.core_clock_hz).unwrap();
    writeln!(f, "pub const POLL_CYCLES: u32 = {};", config.poll_cycles).unwrap();
    writeln!(f, "pub const FREQUENCY_HZ: u32 = {};", config.frequency_hz).unwrap();
    for (name, budget) in config.budgets {
        writeln!(f, "pub const {}_BUDGET: u32 = {};", name.to_uppercase(), budget).unwrap();
    }
    writeln!(f, "pub const ACCEL_ADDRESS: u8 = {:#04x};", config.accel_address).unwrap();
    writeln!(f, "pub const SAMPLE_PERIOD_MS: u32 = {};", config.sample_period_ms).unwrap();
    writeln!(f, "pub const EPAPER_RESET_PIN: &str = {:?};", config.reset_pin).unwrap();
    writeln!(f, "pub const EPAPER_BUSY_PIN: &str = {:?};", config.busy_pin).unwrap();
}

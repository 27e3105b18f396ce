//! GPIO control for BCM2837 boards
//!
//! Drives GPIO pins on a Raspberry Pi 2 v1.2 / 3 / 3+ by mapping the GPIO
//! register block from `/dev/mem`. Needs root unless `--simulate` is given.
//!
//! # Usage
//!
//! ```bash
//! # Show mapping parameters and register layout
//! gpio-ctl info
//!
//! # Configure GPIO18 as output and drive it
//! sudo gpio-ctl mode 18 output
//! sudo gpio-ctl set 18
//! sudo gpio-ctl read 18
//! sudo gpio-ctl clear 18
//!
//! # Blink an LED on GPIO18 ten times
//! sudo gpio-ctl blink 18 --count 10 --interval-ms 1000
//!
//! # Try it without hardware
//! gpio-ctl --simulate status
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::info;
use rpi3_gpio::registers::regs;
use rpi3_gpio::{Function, Gpio, MapConfig, RegisterBlock, SimulatedRegisters};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// GPIO control through /dev/mem
#[derive(Parser)]
#[command(name = "gpio-ctl")]
#[command(version = "0.1.0")]
#[command(about = "Memory-mapped GPIO control for BCM2837 (Raspberry Pi 2 v1.2 - 3+)")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Mapping configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use in-memory loopback registers instead of /dev/mem
    #[arg(long, global = true)]
    simulate: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show mapping parameters and register layout
    Info {
        /// Print the effective configuration as TOML
        #[arg(long)]
        toml: bool,
    },

    /// Set a pin's function (resets to input first)
    Mode {
        /// BCM GPIO number
        pin: u8,

        /// input, output or alt0-alt5
        function: Function,
    },

    /// Drive a pin high
    Set {
        /// BCM GPIO number
        pin: u8,
    },

    /// Drive a pin low
    Clear {
        /// BCM GPIO number
        pin: u8,
    },

    /// Read a pin's level
    Read {
        /// BCM GPIO number
        pin: u8,
    },

    /// Show function and level of every pin
    Status,

    /// Blink a pin as output
    Blink {
        /// BCM GPIO number
        #[arg(default_value_t = 18)]
        pin: u8,

        /// Number of on/off cycles
        #[arg(short = 'n', long, default_value_t = 10)]
        count: u32,

        /// Time spent in each state
        #[arg(short, long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = load_config(cli.config.as_deref())?;

    if let Commands::Info { toml } = cli.command {
        return handle_info(&config, toml);
    }

    if cli.simulate {
        info!("using simulated registers");
        let mut gpio = Gpio::with_pin_count(SimulatedRegisters::new(), config.pin_count);
        return handle_pins(&mut gpio, cli.command);
    }

    let mut gpio = Gpio::open(&config).with_context(|| {
        format!(
            "Failed to map GPIO block from {} (root is required for /dev/mem)",
            config.device_path.display()
        )
    })?;

    let result = handle_pins(&mut gpio, cli.command);
    gpio.close().context("Failed to unmap GPIO block")?;
    result
}

fn load_config(path: Option<&Path>) -> Result<MapConfig> {
    match path {
        Some(path) => MapConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(MapConfig::default()),
    }
}

fn handle_info(config: &MapConfig, as_toml: bool) -> Result<()> {
    if as_toml {
        let text = toml::to_string(config).context("Failed to serialize config")?;
        print!("{}", text);
        return Ok(());
    }

    println!("{}", "=".repeat(60));
    println!("{}", "BCM2837 GPIO Mapping".cyan().bold());
    println!("{}", "=".repeat(60));

    println!("\n{}", "Mapping:".white().bold());
    println!("  Device: {}", config.device_path.display());
    println!("  Peripheral base: {:#010X}", config.peripheral_base);
    println!("  GPIO offset: {:#X}", config.gpio_offset);
    println!("  GPIO base: {:#010X}", config.gpio_base());
    println!("  Block length: {} bytes", config.block_len);
    println!("  Pins: 0-{}", config.pin_count.saturating_sub(1));

    println!("\n{}", "Registers:".white().bold());
    let layout = [
        ("GPFSEL0-5", regs::GPFSEL0, "function select, 3 bits/pin"),
        ("GPSET0-1", regs::GPSET0, "output set, write 1 to drive high"),
        ("GPCLR0-1", regs::GPCLR0, "output clear, write 1 to drive low"),
        ("GPLEV0-1", regs::GPLEV0, "pin level, read-only"),
    ];
    for (name, offset, description) in layout {
        println!(
            "  {:<10} +{:#04X} {:#010X}  {}",
            name.cyan(),
            offset.byte_offset(),
            config.gpio_base() + offset.byte_offset() as u64,
            description.dimmed()
        );
    }

    println!("\n{}", "=".repeat(60));
    Ok(())
}

fn handle_pins<R: RegisterBlock>(gpio: &mut Gpio<R>, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Info { .. } => {}

        Commands::Mode { pin, function } => {
            gpio.set_function(pin, function)?;
            println!("{} GPIO{} -> {}", "[OK]".green().bold(), pin, function);
        }

        Commands::Set { pin } => {
            gpio.set_high(pin)?;
            println!("{} GPIO{} high", "[OK]".green().bold(), pin);
        }

        Commands::Clear { pin } => {
            gpio.set_low(pin)?;
            println!("{} GPIO{} low", "[OK]".green().bold(), pin);
        }

        Commands::Read { pin } => {
            let high = gpio.read_level(pin)?;
            println!("GPIO{}: {}", pin, level_label(high));
        }

        Commands::Status => print_status(gpio)?,

        Commands::Blink {
            pin,
            count,
            interval_ms,
        } => blink(gpio, pin, count, Duration::from_millis(interval_ms))?,
    }

    Ok(())
}

fn level_label(high: bool) -> colored::ColoredString {
    if high {
        "high".green()
    } else {
        "low".dimmed()
    }
}

fn print_status<R: RegisterBlock>(gpio: &Gpio<R>) -> Result<()> {
    println!("{}", "=".repeat(40));
    println!("{}", "GPIO Status".cyan().bold());
    println!("{}", "=".repeat(40));
    println!("  {:<6} {:<8} {}", "Pin", "Function", "Level");

    for pin in 0..gpio.pin_count() {
        let function = gpio.function(pin)?;
        let high = gpio.read_level(pin)?;
        let function = match function {
            Function::Input => function.to_string().normal(),
            Function::Output => function.to_string().yellow(),
            _ => function.to_string().cyan(),
        };
        println!("  {:<6} {:<8} {}", pin, function, level_label(high));
    }

    println!("{}", "=".repeat(40));
    Ok(())
}

fn blink<R: RegisterBlock>(gpio: &mut Gpio<R>, pin: u8, count: u32, interval: Duration) -> Result<()> {
    gpio.set_function_input(pin)?;
    gpio.set_function_output(pin)?;

    println!(
        "{} Blinking GPIO{} {} times ({} ms)",
        "[*]".cyan().bold(),
        pin,
        count,
        interval.as_millis()
    );

    for i in 0..count {
        gpio.set_high(pin)?;
        log::debug!("cycle {}: high", i + 1);
        thread::sleep(interval);

        gpio.set_low(pin)?;
        log::debug!("cycle {}: low", i + 1);
        thread::sleep(interval);
    }

    println!("{} Done", "[OK]".green().bold());
    Ok(())
}

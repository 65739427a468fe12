//! padctl - configuration tool for OpenPad FSR dance pads.
//!
//! Thin application root over the device core: it owns the [`DeviceContext`],
//! drives the 10 ms tick loop, and maps subcommands onto the context's
//! command surface. All state lives on the device; every write here is
//! confirmed by the core's read-after-write before padctl reports success.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "padctl")]
#[command(about = "Configure OpenPad FSR dance pad controllers over USB HID")]
#[command(version)]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Seconds to wait for a pad to enumerate
    #[arg(long, global = true, default_value_t = 3)]
    wait: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the connected pad's identity and sensor state
    Info,
    /// Stream live sensor values and polling rate
    Monitor {
        /// Stop after this many seconds (default: run until interrupted)
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Set one sensor's press threshold (normalized, 0..1)
    Threshold { sensor: usize, value: f64 },
    /// Set the shared release threshold ratio (0..1)
    ReleaseThreshold { value: f64 },
    /// Map a sensor to a 1-based button, or 0 to unmap
    Map { sensor: usize, button: u8 },
    /// Rename the pad
    Rename { name: String },
    /// Light rule and LED mapping commands
    #[command(subcommand)]
    Lights(LightsCommands),
    /// Configure one sensor's analog front-end
    Adc {
        sensor: usize,
        /// Digipot resistor value to program
        #[arg(long)]
        resistor: Option<u8>,
        /// Use the 5 V analog reference
        #[arg(long)]
        aref5: bool,
        /// Use the 3.3 V analog reference
        #[arg(long)]
        aref3: bool,
        /// Disable the sensor input
        #[arg(long)]
        disabled: bool,
    },
    /// Persist the device's live configuration
    Save,
    /// Reboot the pad (into the bootloader where supported)
    Reboot,
    /// Load and persist firmware defaults
    FactoryReset,
}

#[derive(Subcommand)]
enum LightsCommands {
    /// List light rules and their LED mappings
    List,
    /// Create or update a light rule
    SetRule {
        index: u8,
        /// Colors as RRGGBB hex: on, off, on-fade, off-fade
        on: String,
        off: String,
        #[arg(default_value = "000000")]
        on_fade: String,
        #[arg(default_value = "000000")]
        off_fade: String,
        #[arg(long)]
        fade_on: bool,
        #[arg(long)]
        fade_off: bool,
    },
    /// Disable a light rule
    DisableRule { index: u8 },
    /// Create or update an LED mapping
    SetMapping {
        index: u8,
        rule: u8,
        sensor: u8,
        led_begin: u8,
        led_end: u8,
    },
    /// Disable an LED mapping
    DisableMapping { index: u8 },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let mut session = commands::Session::open(cli.wait, cli.json)?;
    match cli.command {
        Commands::Info => session.info(),
        Commands::Monitor { seconds } => session.monitor(seconds),
        Commands::Threshold { sensor, value } => session.set_threshold(sensor, value),
        Commands::ReleaseThreshold { value } => session.set_release_threshold(value),
        Commands::Map { sensor, button } => session.map_button(sensor, button),
        Commands::Rename { name } => session.rename(&name),
        Commands::Lights(lights) => session.lights(lights),
        Commands::Adc {
            sensor,
            resistor,
            aref5,
            aref3,
            disabled,
        } => session.adc(sensor, resistor, aref5, aref3, disabled),
        Commands::Save => session.save(),
        Commands::Reboot => session.reboot(),
        Commands::FactoryReset => session.factory_reset(),
    }
}

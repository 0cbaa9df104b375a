//! `heli`: operator command line for the JLab helicity generator.
//!
//! ```text
//! USAGE:
//!   heli status [--regs]                          Print the board status
//!   heli set TSETTLE TSTABLE DELAY PATTERN CLOCK  Write all registers (hex)
//!   heli configure [--mode N] [--pattern N] ...   Change individual selections
//!   heli show mode,pattern,...                    Print selection menus
//! ```
//!
//! Exit status: 0 OK, 1 argument error, 2 bus driver error, 3 library error.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use heli_driver::{
    parse_hex_u32, BusPort, Configuration, FirmwareRevision, GeneratorConfig, HeliError,
    HelicityGenerator, InitFlags, MmapBus, MmapWindow, Selection, SimulatedBus, UnknownSelection,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "heli", about = "JLab helicity generator CLI", version)]
struct Cli {
    /// A24 address of the board (hex). Defaults to HELI_A24_ADDRESS or 0xa00000.
    #[arg(long, global = true, value_parser = hex_u32)]
    address: Option<u32>,

    /// Run against an in-memory board instead of hardware.
    #[arg(long, global = true)]
    simulate: bool,

    /// Device file exposing the A24 bus window.
    #[arg(long, global = true, default_value = "/dev/vme_a24")]
    device: PathBuf,

    /// A24 address of the first byte of the device file (hex).
    #[arg(long, global = true, default_value = "0", value_parser = hex_u32)]
    window_base: u32,

    /// Length of the mapped window (hex).
    #[arg(long, global = true, default_value = "1000000", value_parser = hex_u32)]
    window_size: u32,

    /// Log every register access.
    #[arg(long, global = true)]
    debug: bool,

    /// Firmware revision (2022 or 2023), selects register widths.
    #[arg(long, global = true, value_parser = revision)]
    revision: Option<FirmwareRevision>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the board status.
    Status {
        /// Include a raw register dump.
        #[arg(long)]
        regs: bool,
    },
    /// Write all five configuration registers at once (hex values).
    Set {
        /// Settle time index.
        #[arg(value_parser = hex_u8)]
        tsettle: u8,
        /// Stable time index.
        #[arg(value_parser = hex_u8)]
        tstable: u8,
        /// Reporting delay index.
        #[arg(value_parser = hex_u8)]
        delay: u8,
        /// Helicity pattern index.
        #[arg(value_parser = hex_u8)]
        pattern: u8,
        /// Clock register: mode in bits 0-1, board clock in bit 2.
        #[arg(value_parser = hex_u8)]
        clock: u8,
    },
    /// Change individual selections, then print the status.
    Configure(ConfigureArgs),
    /// Print the selection menus (e.g. `mode,pattern,tstable`).
    Show {
        /// Comma separated menu names.
        selections: String,
    },
}

/// Per-field selections for `heli configure`
#[derive(Args, Default)]
struct ConfigureArgs {
    /// Clock mode index.
    #[arg(short, long)]
    mode: Option<u32>,
    /// Helicity pattern index.
    #[arg(short, long)]
    pattern: Option<u32>,
    /// Reporting delay index.
    #[arg(short, long)]
    delay: Option<u32>,
    /// Settle time index.
    #[arg(short, long)]
    tsettle: Option<u32>,
    /// Stable time index.
    #[arg(short = 's', long)]
    tstable: Option<u32>,
    /// Board clock output index.
    #[arg(short, long)]
    boardclock: Option<u32>,
}

impl ConfigureArgs {
    /// Apply every requested selection; a rejected one does not stop the rest
    fn apply<B: BusPort>(&self, h: &HelicityGenerator<B>) -> Vec<HeliError> {
        [
            self.mode.map(|v| h.select_mode(v)),
            self.pattern.map(|v| h.select_pattern(v)),
            self.delay.map(|v| h.select_reporting_delay(v)),
            self.tsettle.map(|v| h.select_tsettle(v)),
            self.tstable.map(|v| h.select_tstable(v)),
            self.boardclock.map(|v| h.select_board_clock(v)),
        ]
        .into_iter()
        .flatten()
        .filter_map(std::result::Result::err)
        .collect()
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
        }
    };

    let default_filter = if cli.debug { "warn,heli_driver=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("heli: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    if let Cmd::Show { selections } = &cli.command {
        return cmd_show(selections);
    }

    let config = generator_config(&cli);
    if cli.simulate {
        tracing::info!("Using simulated board at A24 {:#08x}", config.bus_address);
        run(SimulatedBus::with_board(config.bus_address), &config, &cli.command)
    } else {
        let window = MmapWindow {
            bus_base: cli.window_base,
            size: cli.window_size as usize,
            file_offset: 0,
        };
        let bus = MmapBus::open(&cli.device, window)
            .with_context(|| format!("Cannot map bus window from {}", cli.device.display()))?;
        run(bus, &config, &cli.command)
    }
}

/// Environment defaults, overridden by command line flags
fn generator_config(cli: &Cli) -> GeneratorConfig {
    let mut config = GeneratorConfig::from_env();
    if let Some(address) = cli.address {
        config.bus_address = address;
    }
    if let Some(revision) = cli.revision {
        config.revision = revision;
    }
    if cli.debug {
        config.flags = config.flags | InitFlags::DEBUG;
    }
    config
}

/// Run a hardware command inside the bus-wide lock
fn run<B: BusPort>(bus: B, config: &GeneratorConfig, cmd: &Cmd) -> Result<()> {
    let heli = HelicityGenerator::open(bus, config)?;

    let (report, failures) = heli.with_bus_lock(|h| match cmd {
        Cmd::Status { regs } => Ok((h.format_status(*regs)?, Vec::new())),
        &Cmd::Set { tsettle, tstable, delay, pattern, clock } => {
            h.set_configuration(&Configuration { tsettle, tstable, delay, pattern, clock })?;
            Ok((h.format_status(false)?, Vec::new()))
        }
        Cmd::Configure(args) => {
            let failures = args.apply(h);
            Ok((h.format_status(true)?, failures))
        }
        Cmd::Show { .. } => Ok((String::new(), Vec::new())),
    })?;

    print!("{report}");

    let count = failures.len();
    match failures.into_iter().next() {
        Some(first) => {
            Err(anyhow::Error::new(first).context(format!("{count} selection(s) rejected")))
        }
        None => Ok(()),
    }
}

fn cmd_show(list: &str) -> Result<()> {
    let selections = Selection::parse_list(list)?;
    for sel in selections {
        println!();
        print!("{}", sel.menu());
    }
    Ok(())
}

/// 1 for argument errors, 2 for bus driver errors, 3 for everything else
fn exit_code(err: &anyhow::Error) -> u8 {
    if err.is::<UnknownSelection>() {
        return 1;
    }
    match err.downcast_ref::<HeliError>() {
        Some(e) if e.is_bus_error() => 2,
        _ => 3,
    }
}

fn hex_u32(s: &str) -> std::result::Result<u32, String> {
    parse_hex_u32(s).ok_or_else(|| format!("{s:?} is not a hex number"))
}

fn hex_u8(s: &str) -> std::result::Result<u8, String> {
    let v = hex_u32(s)?;
    u8::try_from(v).map_err(|_| format!("{s} does not fit in one byte"))
}

fn revision(s: &str) -> std::result::Result<FirmwareRevision, String> {
    FirmwareRevision::from_str_loose(s).ok_or_else(|| format!("unknown firmware revision {s:?}"))
}

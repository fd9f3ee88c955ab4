//! Command line front end for driving a KMTronic RS-485 relay chain.
//!
//! Usage:
//!   relay-manager --relay 4 --open-time 500
//!   relay-manager --relay 2:8 --open-time 500 --impulses 3
//!   relay-manager --relay 2,7,11 --state off --com-port 5 --baud-rate 19200
//!
//! Set RUST_LOG to control logging (info by default).

use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use clap::{ArgGroup, Parser};
use log::{error, info};

use relay_manager::constants::{BAUD_RATE_DEFAULT, COM_PORT_DEFAULT, MAX_LOCATE_TRIES};
use relay_manager::{
    parse_selection, Behavior, PulseController, RelayState, Result, RunConfig, SerialChannel,
    SerialConnectionConfig,
};

/// Drive one or more relays on a KMTronic RS-485 chain.
#[derive(Parser, Debug)]
#[command(version, about)]
#[command(group(ArgGroup::new("behavior").required(true).args(["open_time", "state"])))]
struct Args {
    /// Relays to drive: a number (2), a range (4:10) or a group (2,7,11)
    #[arg(long, value_name = "SET")]
    relay: String,

    /// Hold the relays energized for this many milliseconds per impulse
    #[arg(long, value_name = "MS")]
    open_time: Option<u64>,

    /// Set the relays to a terminal state instead of pulsing: "on" or "off"
    #[arg(long, value_parser = RelayState::from_str)]
    state: Option<RelayState>,

    /// Number of impulses to give (only with --open-time)
    #[arg(long, value_name = "N", default_value_t = 1, requires = "open_time")]
    impulses: u32,

    /// Baud rate for the serial connection
    #[arg(long, value_name = "BAUD", default_value_t = BAUD_RATE_DEFAULT,
          value_parser = clap::value_parser!(u32).range(1..))]
    baud_rate: u32,

    /// COM port number the adapter is attached to
    #[arg(long, value_name = "NUM", default_value_t = COM_PORT_DEFAULT)]
    com_port: u8,
}

fn run(args: Args) -> Result<()> {
    let relays = parse_selection(&args.relay)?;

    let behavior = match (args.open_time, args.state) {
        (Some(millis), None) => {
            info!(
                "Relays asked to be opened {millis} milliseconds, {} impulse(s)",
                args.impulses
            );
            Behavior::Pulse {
                open_time: Duration::from_millis(millis),
                impulses: args.impulses,
            }
        }
        (None, Some(state)) => {
            info!("Relay state set to {state}");
            Behavior::SetState(state)
        }
        _ => unreachable!("clap enforces exactly one of --open-time/--state"),
    };

    info!("Creating serial channel on COM{}...", args.com_port);
    let config = SerialConnectionConfig::with_baud_rate(args.baud_rate);
    let channel = SerialChannel::locate(args.com_port, config, MAX_LOCATE_TRIES)?;

    PulseController::new(channel, &RunConfig { relays, behavior }).run()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

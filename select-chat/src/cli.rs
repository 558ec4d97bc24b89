use std::num::NonZeroUsize;

use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_BIND_HOST, DEFAULT_PORT, RELAY_BUFFER_SIZE, SESSION_BUFFER_SIZE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay, broadcasting every message unit to all other peers.
    Relay(RelayArgs),
    /// Connect to a relay and exchange lines with it.
    Session(SessionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RelayArgs {
    /// Host or address to bind. The first resolved address that binds is used.
    #[arg(long, default_value = DEFAULT_BIND_HOST)]
    pub bind: String,

    /// Port to listen on. Use 0 for an ephemeral port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Read buffer capacity in bytes. One read is relayed as one unit.
    #[arg(long, default_value_t = RELAY_BUFFER_SIZE)]
    pub buffer_size: NonZeroUsize,

    /// Drop a peer as soon as a broadcast write to it fails.
    #[arg(long)]
    pub retire_on_write_failure: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Address of the relay.
    pub address: String,

    /// Port of the relay.
    pub port: u16,

    /// Read buffer capacity in bytes for keyboard and server input.
    #[arg(long, default_value_t = SESSION_BUFFER_SIZE)]
    pub buffer_size: NonZeroUsize,
}

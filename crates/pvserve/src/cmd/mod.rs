use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;
use crate::wire::{EventKind, MetaField};

pub mod get;
pub mod monitor;
pub mod put;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the process variable server.
    Serve(ServeArgs),
    /// Read a channel value.
    Get(GetArgs),
    /// Write a channel value.
    Put(PutArgs),
    /// Subscribe to change notifications and print them.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Get(args) => get::run(args, format),
        Command::Put(args) => put::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Channel topology entry, repeatable. Default topology: ival:i32:1
    /// (initial value 42) and aval:i16:5.
    #[arg(long = "channel", value_name = "NAME:KIND:LEN")]
    pub channels: Vec<String>,
    /// Name of the termination-flag channel.
    #[arg(long, value_name = "NAME", default_value = "done")]
    pub done_channel: String,
    /// Idle poll interval in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 250)]
    pub poll_interval_ms: u64,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Channel name.
    pub name: String,
    /// Derived metadata to request alongside the value (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub meta: Vec<MetaField>,
    /// Requested element count. Omit to request a scalar; array channels
    /// reshape the reply.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Channel name.
    pub name: String,
    /// Values to write; the count must match the channel's length.
    #[arg(required = true)]
    pub values: Vec<f64>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Event categories to subscribe to (comma-separated). Default: all.
    #[arg(long, value_delimiter = ',')]
    pub events: Vec<EventKind>,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {}

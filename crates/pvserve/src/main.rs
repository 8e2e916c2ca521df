use clap::Parser;

use pvserve::cmd::{self, Command};
use pvserve::exit;
use pvserve::logging::{init_logging, LogFormat, LogLevel};
use pvserve::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "pvserve", version, about = "Process variable server CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = std::panic::catch_unwind(move || cmd::run(cli.command, format));

    match result {
        Ok(Ok(code)) => std::process::exit(code),
        Ok(Err(err)) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
        Err(_) => {
            eprintln!("unknown error");
            std::process::exit(exit::UNKNOWN);
        }
    }
}

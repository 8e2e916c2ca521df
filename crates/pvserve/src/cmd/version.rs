use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(_args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            });
            println!("{out}");
        }
        _ => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(SUCCESS)
}

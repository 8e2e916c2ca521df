use crate::client::Client;
use crate::cmd::MonitorArgs;
use crate::exit::{wire_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_event, OutputFormat};
use crate::wire::Response;

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client =
        Client::connect(&args.path).map_err(|err| wire_error("connect failed", err))?;
    let response = client
        .subscribe(&args.events)
        .map_err(|err| wire_error("subscribe failed", err))?;
    if let Response::Error { kind, message } = response {
        return Err(CliError::new(
            FAILURE,
            format!("subscribe: {message} ({kind})"),
        ));
    }

    let mut printed = 0usize;
    loop {
        let message = client
            .recv()
            .map_err(|err| wire_error("receive failed", err))?;
        if let Response::Event { mask, value } = message {
            print_event(mask, &value, format);
            printed = printed.saturating_add(1);
            if let Some(count) = args.count {
                if printed >= count {
                    return Ok(SUCCESS);
                }
            }
        }
    }
}

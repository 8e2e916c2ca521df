use crate::client::Client;
use crate::cmd::PutArgs;
use crate::exit::{wire_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::OutputFormat;
use crate::wire::Response;

pub fn run(args: PutArgs, _format: OutputFormat) -> CliResult<i32> {
    let mut client =
        Client::connect(&args.path).map_err(|err| wire_error("connect failed", err))?;
    let response = client
        .put(&args.name, &args.values)
        .map_err(|err| wire_error("put failed", err))?;

    match response {
        Response::Ok => Ok(SUCCESS),
        Response::Error { kind, message } => Err(CliError::new(
            FAILURE,
            format!("put {}: {message} ({kind})", args.name),
        )),
        other => Err(CliError::new(
            FAILURE,
            format!("unexpected response: {other:?}"),
        )),
    }
}

use crate::client::Client;
use crate::cmd::GetArgs;
use crate::exit::{wire_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_value, OutputFormat};
use crate::wire::Response;

pub fn run(args: GetArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client =
        Client::connect(&args.path).map_err(|err| wire_error("connect failed", err))?;
    let response = client
        .get(&args.name, &args.meta, args.count)
        .map_err(|err| wire_error("get failed", err))?;

    match response {
        Response::Value(body) => {
            print_value(&body, format);
            Ok(SUCCESS)
        }
        Response::Error { kind, message } => Err(CliError::new(
            FAILURE,
            format!("get {}: {message} ({kind})", args.name),
        )),
        other => Err(CliError::new(
            FAILURE,
            format!("unexpected response: {other:?}"),
        )),
    }
}

use std::sync::Arc;
use std::time::Duration;

use pvserve_carrier::ElemKind;
use pvserve_channel::{
    AnyChannel, Channel, ChannelRegistry, DoneChannel, EventBus, NotificationSink, ShutdownFlag,
};

use crate::cmd::ServeArgs;
use crate::exit::{server_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::OutputFormat;
use crate::server::{ServerConfig, ServerLoop};

pub fn run(args: ServeArgs, _format: OutputFormat) -> CliResult<i32> {
    let flag = ShutdownFlag::new();
    let bus = Arc::new(EventBus::new());
    let registry = build_registry(&args, &flag, &bus)?;

    install_ctrlc_handler(flag.clone())?;

    let config = ServerConfig {
        poll_interval: Duration::from_millis(args.poll_interval_ms),
    };
    let mut server = ServerLoop::bind(&args.path, registry, bus, flag, config)
        .map_err(|err| server_error("bind failed", err))?;
    server
        .run()
        .map_err(|err| server_error("server loop failed", err))?;

    Ok(SUCCESS)
}

fn build_registry(
    args: &ServeArgs,
    flag: &ShutdownFlag,
    bus: &Arc<EventBus>,
) -> CliResult<ChannelRegistry> {
    let sink: Arc<dyn NotificationSink> = bus.clone();
    let mut registry = ChannelRegistry::new();

    if args.channels.is_empty() {
        let mut ival = Channel::<i32>::with_sink("ival", 1, sink.clone());
        if let Some(v) = ival.value_mut().first_mut() {
            *v = 42;
        }
        registry.insert(AnyChannel::Int32(ival));
        registry.insert(AnyChannel::Int16(Channel::with_sink("aval", 5, sink.clone())));
    } else {
        for spec in &args.channels {
            let (name, kind, len) = parse_channel_spec(spec)?;
            if name == args.done_channel {
                return Err(CliError::new(
                    FAILURE,
                    format!("channel name {name:?} collides with the termination channel"),
                ));
            }
            let channel = match kind {
                ElemKind::Int16 => AnyChannel::Int16(Channel::with_sink(name, len, sink.clone())),
                ElemKind::Int32 => AnyChannel::Int32(Channel::with_sink(name, len, sink.clone())),
                ElemKind::Float64 => {
                    AnyChannel::Float64(Channel::with_sink(name, len, sink.clone()))
                }
            };
            registry.insert(channel);
        }
    }

    registry.insert(AnyChannel::Done(DoneChannel::new(
        args.done_channel.clone(),
        flag.clone(),
        sink,
    )));
    Ok(registry)
}

fn parse_channel_spec(spec: &str) -> CliResult<(String, ElemKind, usize)> {
    let parts: Vec<&str> = spec.split(':').collect();
    let [name, kind, len] = parts.as_slice() else {
        return Err(CliError::new(
            FAILURE,
            format!("invalid channel spec {spec:?} (expected NAME:KIND:LEN)"),
        ));
    };
    if name.is_empty() {
        return Err(CliError::new(
            FAILURE,
            format!("invalid channel spec {spec:?}: empty name"),
        ));
    }
    let kind = ElemKind::parse(kind).ok_or_else(|| {
        CliError::new(
            FAILURE,
            format!("invalid channel spec {spec:?}: unknown kind {kind:?} (i16, i32, f64)"),
        )
    })?;
    let len: usize = len.parse().map_err(|_| {
        CliError::new(
            FAILURE,
            format!("invalid channel spec {spec:?}: bad length {len:?}"),
        )
    })?;
    if len == 0 {
        return Err(CliError::new(
            FAILURE,
            format!("invalid channel spec {spec:?}: length must be at least 1"),
        ));
    }
    Ok((name.to_string(), kind, len))
}

fn install_ctrlc_handler(flag: ShutdownFlag) -> CliResult<()> {
    ctrlc::set_handler(move || {
        flag.set(true);
    })
    .map_err(|err| CliError::new(FAILURE, format!("signal handler setup failed: {err}")))
}

//! Single-threaded server loop over a Unix domain socket.
//!
//! The loop is a cooperative dispatcher: it polls for new connections and
//! buffered requests on a bounded interval, processes one request at a time,
//! and re-checks the shutdown flag every iteration. Channel read/write never
//! suspends, so each request completes within its dispatch turn.

use std::io;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pvserve_carrier::{AppTag, Carrier, Leaf};
use pvserve_channel::{ChannelRegistry, ConversionError, Event, EventBus, ShutdownFlag, EVENT_LOG, EVENT_VALUE};
use tracing::{debug, info, warn};

use crate::wire::{
    ErrorKind, MessageReader, MessageWriter, MetaField, Request, Response, ValueBody, WireError,
};

/// Errors that can occur running the server loop.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding the socket path failed.
    #[error("failed to bind {path}: {source}")]
    Bind {
        path: PathBuf,
        source: io::Error,
    },

    /// An I/O error on the listening socket.
    #[error("server I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Server loop tuning.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bounded wait between idle poll iterations. The shutdown flag is
    /// observed at most this long after it is set.
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
        }
    }
}

struct Conn {
    reader: MessageReader<UnixStream>,
    writer: MessageWriter<UnixStream>,
    subscription: u8,
}

impl Conn {
    fn new(stream: UnixStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        let reader_stream = stream.try_clone()?;
        Ok(Self {
            reader: MessageReader::new(reader_stream),
            writer: MessageWriter::new(stream),
            subscription: 0,
        })
    }
}

/// Drives I/O multiplexing and dispatches protocol requests into channel
/// read/write calls.
pub struct ServerLoop {
    listener: UnixListener,
    path: PathBuf,
    registry: ChannelRegistry,
    bus: Arc<EventBus>,
    flag: ShutdownFlag,
    poll_interval: Duration,
    conns: Vec<Conn>,
}

impl ServerLoop {
    /// Bind the socket and assemble the loop.
    ///
    /// A stale socket file at `path` is removed first; any other existing
    /// file is an error. The socket is created with mode 0600.
    pub fn bind(
        path: impl AsRef<Path>,
        registry: ChannelRegistry,
        bus: Arc<EventBus>,
        flag: ShutdownFlag,
        config: ServerConfig,
    ) -> Result<Self, ServerError> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| ServerError::Bind {
                path: path.clone(),
                source: e,
            })?;
            if metadata.file_type().is_socket() {
                debug!(?path, "removing stale socket");
                std::fs::remove_file(&path).map_err(|e| ServerError::Bind {
                    path: path.clone(),
                    source: e,
                })?;
            } else {
                return Err(ServerError::Bind {
                    path: path.clone(),
                    source: io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                });
            }
        }

        let listener = UnixListener::bind(&path).map_err(|e| ServerError::Bind {
            path: path.clone(),
            source: e,
        })?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).map_err(|e| {
            ServerError::Bind {
                path: path.clone(),
                source: e,
            }
        })?;
        listener.set_nonblocking(true).map_err(|e| ServerError::Bind {
            path: path.clone(),
            source: e,
        })?;

        info!(?path, "listening on unix domain socket");

        Ok(Self {
            listener,
            path,
            registry,
            bus,
            flag,
            poll_interval: config.poll_interval,
            conns: Vec::new(),
        })
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run until the shutdown flag is set.
    pub fn run(&mut self) -> Result<(), ServerError> {
        for channel in self.registry.iter() {
            debug!(channel = %channel.show(), "serving channel");
        }
        info!(channels = self.registry.len(), "server loop started");

        while !self.flag.is_set() {
            let mut busy = self.accept_new()?;
            busy |= self.service_connections();
            self.forward_events();
            if !busy {
                std::thread::sleep(self.poll_interval);
            }
        }

        info!("termination flag set; shutting down");
        Ok(())
    }

    fn accept_new(&mut self) -> Result<bool, ServerError> {
        let mut accepted = false;
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => match Conn::new(stream) {
                    Ok(conn) => {
                        debug!("accepted connection");
                        self.conns.push(conn);
                        accepted = true;
                    }
                    Err(err) => warn!(%err, "failed to set up connection"),
                },
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(ServerError::Io(err)),
            }
        }
        Ok(accepted)
    }

    /// Process every buffered request on every connection. Returns whether
    /// any request was dispatched.
    fn service_connections(&mut self) -> bool {
        let mut busy = false;
        let mut conns = std::mem::take(&mut self.conns);
        conns.retain_mut(|conn| loop {
            match conn.reader.try_read_message::<Request>() {
                Ok(Some(request)) => {
                    busy = true;
                    let response = dispatch(&mut self.registry, request, &mut conn.subscription);
                    if let Err(err) = conn.writer.write_message(&response) {
                        debug!(%err, "dropping connection on write failure");
                        break false;
                    }
                }
                Ok(None) => break true,
                Err(WireError::ConnectionClosed) => {
                    debug!("peer disconnected");
                    break false;
                }
                Err(err) => {
                    debug!(%err, "dropping connection on protocol error");
                    break false;
                }
            }
        });
        self.conns = conns;
        busy
    }

    /// Drain queued change notifications to subscribed connections.
    fn forward_events(&mut self) {
        let events = self.bus.drain();
        if events.is_empty() {
            return;
        }
        for event in &events {
            debug!(channel = %event.name, mask = event.mask, "change notification");
        }
        self.conns.retain_mut(|conn| {
            for event in &events {
                if conn.subscription & event.mask == 0 {
                    continue;
                }
                let Some(response) = event_response(event) else {
                    continue;
                };
                if let Err(err) = conn.writer.write_message(&response) {
                    debug!(%err, "dropping subscriber on write failure");
                    return false;
                }
            }
            true
        });
    }
}

impl Drop for ServerLoop {
    fn drop(&mut self) {
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket() {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }
}

fn event_response(event: &Event) -> Option<Response> {
    let leaf = event.snapshot.find(AppTag::Value)?;
    Some(Response::Event {
        mask: event.mask,
        value: ValueBody::from_leaf(&event.name, leaf),
    })
}

/// Dispatch one request against the registry.
///
/// Conversion errors become negative acknowledgments for that one request;
/// they never terminate the loop.
fn dispatch(registry: &mut ChannelRegistry, request: Request, subscription: &mut u8) -> Response {
    match request {
        Request::Get { name, meta, count } => get(registry, &name, &meta, count),
        Request::Put { name, values } => put(registry, &name, &values),
        Request::Subscribe { events } => {
            let mask = if events.is_empty() {
                EVENT_VALUE | EVENT_LOG
            } else {
                events.iter().fold(0, |acc, kind| acc | kind.mask())
            };
            *subscription = mask;
            Response::Ok
        }
    }
}

fn get(
    registry: &mut ChannelRegistry,
    name: &str,
    meta: &[MetaField],
    count: Option<usize>,
) -> Response {
    let Some(channel) = registry.attach(name) else {
        return not_found(name);
    };

    // A request without an explicit count asks for a scalar; array channels
    // reshape the leaf on read.
    let value_leaf = match count {
        Some(n) if n > 1 => Carrier::array(AppTag::Value, channel.kind(), n),
        _ => Carrier::scalar(AppTag::Value, channel.kind()),
    };
    let mut carrier = if meta.is_empty() {
        value_leaf
    } else {
        let mut items = vec![value_leaf];
        for field in meta {
            let tag = match field {
                MetaField::HighLimit => AppTag::HighLimit,
                MetaField::LowLimit => AppTag::LowLimit,
            };
            items.push(Carrier::scalar(tag, channel.kind()));
        }
        Carrier::composite(items)
    };

    if let Err(err) = channel.read(&mut carrier) {
        return nak(err);
    }

    let Some(leaf) = carrier.find(AppTag::Value) else {
        return Response::Error {
            kind: ErrorKind::BadRequest,
            message: "read produced no value leaf".to_string(),
        };
    };
    let mut body = ValueBody::from_leaf(name, leaf);
    body.high_limit = first_value(&carrier, AppTag::HighLimit);
    body.low_limit = first_value(&carrier, AppTag::LowLimit);
    Response::Value(body)
}

fn put(registry: &mut ChannelRegistry, name: &str, values: &[f64]) -> Response {
    let Some(channel) = registry.attach(name) else {
        return not_found(name);
    };
    if values.is_empty() {
        return Response::Error {
            kind: ErrorKind::BadRequest,
            message: "put requires at least one value".to_string(),
        };
    }

    let mut leaf = if values.len() == 1 {
        Leaf::scalar(AppTag::Value, channel.kind())
    } else {
        Leaf::array(AppTag::Value, channel.kind(), values.len())
    };
    leaf.put_converted(values);

    match channel.write(&Carrier::Leaf(leaf)) {
        Ok(()) => Response::Ok,
        Err(err) => nak(err),
    }
}

fn first_value(carrier: &Carrier, tag: AppTag) -> Option<f64> {
    carrier.find(tag).and_then(|leaf| leaf.values_f64().first().copied())
}

fn not_found(name: &str) -> Response {
    Response::Error {
        kind: ErrorKind::NotFound,
        message: format!("channel {name:?} does not exist"),
    }
}

fn nak(err: ConversionError) -> Response {
    Response::Error {
        kind: ErrorKind::from(&err),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pvserve_channel::{AnyChannel, Channel, DoneChannel, NotificationSink};

    use super::*;

    fn test_registry(flag: &ShutdownFlag, bus: &Arc<EventBus>) -> ChannelRegistry {
        let sink: Arc<dyn NotificationSink> = bus.clone();
        let mut registry = ChannelRegistry::new();
        let mut ival = Channel::<i32>::with_sink("ival", 1, sink.clone());
        if let Some(v) = ival.value_mut().first_mut() {
            *v = 42;
        }
        registry.insert(AnyChannel::Int32(ival));
        registry.insert(AnyChannel::Int16(Channel::with_sink("aval", 5, sink.clone())));
        registry.insert(AnyChannel::Done(DoneChannel::new("done", flag.clone(), sink)));
        registry
    }

    #[test]
    fn get_unknown_channel_is_not_found() {
        let flag = ShutdownFlag::new();
        let bus = Arc::new(EventBus::new());
        let mut registry = test_registry(&flag, &bus);
        let mut sub = 0u8;

        let response = dispatch(
            &mut registry,
            Request::Get {
                name: "missing".to_string(),
                meta: vec![],
                count: None,
            },
            &mut sub,
        );
        assert!(matches!(
            response,
            Response::Error {
                kind: ErrorKind::NotFound,
                ..
            }
        ));
    }

    #[test]
    fn get_with_meta_returns_limits() {
        let flag = ShutdownFlag::new();
        let bus = Arc::new(EventBus::new());
        let mut registry = test_registry(&flag, &bus);
        let mut sub = 0u8;

        let response = dispatch(
            &mut registry,
            Request::Get {
                name: "ival".to_string(),
                meta: vec![MetaField::HighLimit, MetaField::LowLimit],
                count: None,
            },
            &mut sub,
        );
        let Response::Value(body) = response else {
            panic!("expected a value response, got {response:?}");
        };
        assert_eq!(body.values, vec![42.0]);
        assert_eq!(body.high_limit, Some(i32::MAX as f64));
        assert_eq!(body.low_limit, Some(i32::MIN as f64));
    }

    #[test]
    fn default_get_of_array_channel_reshapes() {
        let flag = ShutdownFlag::new();
        let bus = Arc::new(EventBus::new());
        let mut registry = test_registry(&flag, &bus);
        let mut sub = 0u8;

        let response = dispatch(
            &mut registry,
            Request::Put {
                name: "aval".to_string(),
                values: vec![1.0, 2.0, 3.0, 4.0, 5.0],
            },
            &mut sub,
        );
        assert_eq!(response, Response::Ok);

        let response = dispatch(
            &mut registry,
            Request::Get {
                name: "aval".to_string(),
                meta: vec![],
                count: None,
            },
            &mut sub,
        );
        let Response::Value(body) = response else {
            panic!("expected a value response, got {response:?}");
        };
        assert_eq!(body.values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(body.kind, "i16");
    }

    #[test]
    fn short_put_is_a_size_mismatch_nak() {
        let flag = ShutdownFlag::new();
        let bus = Arc::new(EventBus::new());
        let mut registry = test_registry(&flag, &bus);
        let mut sub = 0u8;

        let response = dispatch(
            &mut registry,
            Request::Put {
                name: "aval".to_string(),
                values: vec![1.0, 2.0, 3.0],
            },
            &mut sub,
        );
        assert!(matches!(
            response,
            Response::Error {
                kind: ErrorKind::SizeMismatch,
                ..
            }
        ));
    }

    #[test]
    fn done_put_sets_the_flag_and_queues_one_event() {
        let flag = ShutdownFlag::new();
        let bus = Arc::new(EventBus::new());
        let mut registry = test_registry(&flag, &bus);
        let mut sub = 0u8;

        let response = dispatch(
            &mut registry,
            Request::Put {
                name: "done".to_string(),
                values: vec![1.0],
            },
            &mut sub,
        );
        assert_eq!(response, Response::Ok);
        assert!(flag.is_set());

        let events = bus.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "done");
        assert_eq!(events[0].mask, EVENT_VALUE | EVENT_LOG);
    }

    #[test]
    fn subscribe_sets_the_connection_mask() {
        let flag = ShutdownFlag::new();
        let bus = Arc::new(EventBus::new());
        let mut registry = test_registry(&flag, &bus);

        let mut sub = 0u8;
        let response = dispatch(&mut registry, Request::Subscribe { events: vec![] }, &mut sub);
        assert_eq!(response, Response::Ok);
        assert_eq!(sub, EVENT_VALUE | EVENT_LOG);

        let response = dispatch(
            &mut registry,
            Request::Subscribe {
                events: vec![crate::wire::EventKind::Log],
            },
            &mut sub,
        );
        assert_eq!(response, Response::Ok);
        assert_eq!(sub, EVENT_LOG);
    }
}

use std::os::unix::net::UnixStream;
use std::path::Path;

use crate::wire::{
    EventKind, MessageReader, MessageWriter, MetaField, Request, Response, Result,
};

/// Blocking client connection to a running server.
pub struct Client {
    reader: MessageReader<UnixStream>,
    writer: MessageWriter<UnixStream>,
}

impl Client {
    /// Connect to a listening server socket.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = UnixStream::connect(path)?;
        let reader_stream = stream.try_clone()?;
        Ok(Self {
            reader: MessageReader::new(reader_stream),
            writer: MessageWriter::new(stream),
        })
    }

    /// Send one request and wait for its response.
    pub fn request(&mut self, request: &Request) -> Result<Response> {
        self.writer.write_message(request)?;
        self.reader.read_message()
    }

    pub fn get(
        &mut self,
        name: &str,
        meta: &[MetaField],
        count: Option<usize>,
    ) -> Result<Response> {
        self.request(&Request::Get {
            name: name.to_string(),
            meta: meta.to_vec(),
            count,
        })
    }

    pub fn put(&mut self, name: &str, values: &[f64]) -> Result<Response> {
        self.request(&Request::Put {
            name: name.to_string(),
            values: values.to_vec(),
        })
    }

    pub fn subscribe(&mut self, events: &[EventKind]) -> Result<Response> {
        self.request(&Request::Subscribe {
            events: events.to_vec(),
        })
    }

    /// Wait for the next pushed message (change notifications arrive here).
    pub fn recv(&mut self) -> Result<Response> {
        self.reader.read_message()
    }
}

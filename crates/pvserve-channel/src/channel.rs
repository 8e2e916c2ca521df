use std::sync::Arc;
use std::time::SystemTime;

use pvserve_carrier::{AppTag, Carrier, Elem, Leaf, Severity, Status, TransferBuf};
use tracing::debug;

use crate::error::{ConversionError, Result};
use crate::sink::{NotificationSink, NullSink, EVENT_LOG, EVENT_VALUE};

/// A named, typed value holder with quality metadata.
///
/// The buffer length is fixed at construction (1 = scalar, >1 = array) and
/// never changes. Reads serialize the current state into a caller-supplied
/// carrier; writes deserialize out of one, refresh the timestamp, and publish
/// a change notification. All access happens on the single dispatch thread;
/// no internal locking.
pub struct Channel<T: Elem> {
    name: String,
    buffer: Vec<T>,
    severity: Severity,
    status: Status,
    stamp: SystemTime,
    sink: Arc<dyn NotificationSink>,
}

impl<T: Elem> Channel<T> {
    /// Create a channel with a zero-initialized buffer of `len` elements.
    ///
    /// `len` must be at least 1.
    pub fn new(name: impl Into<String>, len: usize) -> Self {
        Self::with_sink(name, len, Arc::new(NullSink))
    }

    /// Create a channel publishing change notifications to `sink`.
    pub fn with_sink(name: impl Into<String>, len: usize, sink: Arc<dyn NotificationSink>) -> Self {
        assert!(len >= 1, "channel buffer length must be at least 1");
        Self {
            name: name.into(),
            buffer: vec![T::default(); len],
            severity: Severity::NoAlarm,
            status: Status::NoAlarm,
            stamp: SystemTime::now(),
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn value(&self) -> &[T] {
        &self.buffer
    }

    /// Direct access to the buffer, bypassing the write path.
    ///
    /// Intended for startup initialization only; no timestamp update and no
    /// notification.
    pub fn value_mut(&mut self) -> &mut [T] {
        &mut self.buffer
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn timestamp(&self) -> SystemTime {
        self.stamp
    }

    pub fn set_alarm(&mut self, severity: Severity, status: Status) {
        self.severity = severity;
        self.status = status;
    }

    /// Serialize the current state into `carrier`.
    ///
    /// For a composite carrier the leaves are processed in order; a nested
    /// composite aborts with [`ConversionError::Unsupported`], leaving leaves
    /// processed before it filled in (no rollback).
    pub fn read(&self, carrier: &mut Carrier) -> Result<()> {
        match carrier {
            Carrier::Composite(items) => {
                for item in items {
                    match item {
                        Carrier::Composite(_) => {
                            debug!(channel = %self.name, "read: nested composite carrier");
                            return Err(ConversionError::Unsupported);
                        }
                        Carrier::Leaf(leaf) => self.read_leaf(leaf)?,
                    }
                }
                Ok(())
            }
            Carrier::Leaf(leaf) => self.read_leaf(leaf),
        }
    }

    fn read_leaf(&self, leaf: &mut Leaf) -> Result<()> {
        match leaf.tag() {
            AppTag::Value => {
                leaf.set_alarm(self.severity, self.status);
                leaf.set_stamp(self.stamp);
                if self.buffer.len() > 1 && leaf.is_scalar() {
                    // The leaf cannot represent a multi-element value without
                    // reshaping: allocate array storage and transfer it in.
                    let mut buf = TransferBuf::with_len(self.buffer.len())
                        .map_err(|_| ConversionError::NoMemory)?;
                    buf.as_mut_slice().copy_from_slice(&self.buffer);
                    leaf.adopt(buf);
                } else {
                    leaf.put_converted(&self.buffer);
                }
                Ok(())
            }
            AppTag::HighLimit => {
                leaf.put_scalar(T::MAX_VALUE);
                Ok(())
            }
            AppTag::LowLimit => {
                leaf.put_scalar(T::MIN_VALUE);
                Ok(())
            }
            AppTag::Other(tag) => {
                debug!(channel = %self.name, tag, "read: ignoring unknown application tag");
                Ok(())
            }
        }
    }

    /// Deserialize a new value out of `carrier`.
    ///
    /// Only a single leaf tagged with the plain value is accepted, and its
    /// element count must match the channel's fixed length. On success the
    /// timestamp is refreshed and a snapshot of the new state is published
    /// once with the combined value|log mask. Severity and status are never
    /// modified here.
    pub fn write(&mut self, carrier: &Carrier) -> Result<()> {
        let leaf = match carrier {
            Carrier::Leaf(leaf) if leaf.tag() == AppTag::Value => leaf,
            _ => return Err(ConversionError::Unsupported),
        };
        if leaf.len() != self.buffer.len() {
            return Err(ConversionError::SizeMismatch {
                expected: self.buffer.len(),
                actual: leaf.len(),
            });
        }

        leaf.copy_out(&mut self.buffer);
        self.stamp = SystemTime::now();

        let mut snapshot = self.value_carrier();
        self.read(&mut snapshot)?;
        self.sink.publish(EVENT_VALUE | EVENT_LOG, &self.name, snapshot);
        Ok(())
    }

    /// Diagnostic dump of name and buffer contents.
    pub fn show(&self) -> String {
        let values = self
            .buffer
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} : [{}]", self.name, values)
    }

    // Fresh carrier matching the buffer shape, used for write snapshots.
    fn value_carrier(&self) -> Carrier {
        if self.buffer.len() == 1 {
            Carrier::scalar(AppTag::Value, T::KIND)
        } else {
            Carrier::array(AppTag::Value, T::KIND, self.buffer.len())
        }
    }
}

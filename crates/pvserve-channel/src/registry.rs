use std::collections::BTreeMap;

use pvserve_carrier::{Carrier, ElemKind};

use crate::channel::Channel;
use crate::done::DoneChannel;
use crate::error::Result;

/// Closed variant over the supported channel element kinds.
///
/// The kind set is fixed and known at compile time, so dispatch is a tagged
/// enum rather than open runtime polymorphism.
pub enum AnyChannel {
    Int16(Channel<i16>),
    Int32(Channel<i32>),
    Float64(Channel<f64>),
    Done(DoneChannel),
}

impl AnyChannel {
    pub fn name(&self) -> &str {
        match self {
            AnyChannel::Int16(ch) => ch.name(),
            AnyChannel::Int32(ch) => ch.name(),
            AnyChannel::Float64(ch) => ch.name(),
            AnyChannel::Done(ch) => ch.name(),
        }
    }

    pub fn kind(&self) -> ElemKind {
        match self {
            AnyChannel::Int16(_) => ElemKind::Int16,
            AnyChannel::Int32(_) | AnyChannel::Done(_) => ElemKind::Int32,
            AnyChannel::Float64(_) => ElemKind::Float64,
        }
    }

    /// Fixed buffer length.
    pub fn len(&self) -> usize {
        match self {
            AnyChannel::Int16(ch) => ch.len(),
            AnyChannel::Int32(ch) => ch.len(),
            AnyChannel::Float64(ch) => ch.len(),
            AnyChannel::Done(ch) => ch.inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read(&self, carrier: &mut Carrier) -> Result<()> {
        match self {
            AnyChannel::Int16(ch) => ch.read(carrier),
            AnyChannel::Int32(ch) => ch.read(carrier),
            AnyChannel::Float64(ch) => ch.read(carrier),
            AnyChannel::Done(ch) => ch.read(carrier),
        }
    }

    pub fn write(&mut self, carrier: &Carrier) -> Result<()> {
        match self {
            AnyChannel::Int16(ch) => ch.write(carrier),
            AnyChannel::Int32(ch) => ch.write(carrier),
            AnyChannel::Float64(ch) => ch.write(carrier),
            AnyChannel::Done(ch) => ch.write(carrier),
        }
    }

    /// Diagnostic dump of name and buffer contents.
    pub fn show(&self) -> String {
        match self {
            AnyChannel::Int16(ch) => ch.show(),
            AnyChannel::Int32(ch) => ch.show(),
            AnyChannel::Float64(ch) => ch.show(),
            AnyChannel::Done(ch) => ch.show(),
        }
    }
}

/// Maps channel names to channel instances.
///
/// Channels are inserted once at startup and live for the process lifetime;
/// there is no removal path.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: BTreeMap<String, AnyChannel>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel under its own name, replacing any previous entry
    /// with the same name.
    pub fn insert(&mut self, channel: AnyChannel) -> Option<AnyChannel> {
        self.channels.insert(channel.name().to_string(), channel)
    }

    /// Existence query, answered without attaching.
    pub fn exists(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Attach to a channel by name for a read or write.
    pub fn attach(&mut self, name: &str) -> Option<&mut AnyChannel> {
        self.channels.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnyChannel> {
        self.channels.values()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::shutdown::ShutdownFlag;
    use crate::sink::NullSink;

    use super::*;

    fn sample_registry() -> ChannelRegistry {
        let mut registry = ChannelRegistry::new();
        registry.insert(AnyChannel::Int32(Channel::new("ival", 1)));
        registry.insert(AnyChannel::Int16(Channel::new("aval", 5)));
        registry.insert(AnyChannel::Done(DoneChannel::new(
            "done",
            ShutdownFlag::new(),
            Arc::new(NullSink),
        )));
        registry
    }

    #[test]
    fn exists_answers_without_attaching() {
        let registry = sample_registry();
        assert!(registry.exists("ival"));
        assert!(registry.exists("aval"));
        assert!(registry.exists("done"));
        assert!(!registry.exists("missing"));
    }

    #[test]
    fn attach_resolves_name_to_channel() {
        let mut registry = sample_registry();
        let channel = registry.attach("aval").expect("aval should attach");
        assert_eq!(channel.name(), "aval");
        assert_eq!(channel.kind(), ElemKind::Int16);
        assert_eq!(channel.len(), 5);
        assert!(registry.attach("missing").is_none());
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut registry = sample_registry();
        let old = registry.insert(AnyChannel::Int32(Channel::new("ival", 2)));
        assert!(old.is_some());
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.attach("ival").expect("ival should attach").len(),
            2
        );
    }
}

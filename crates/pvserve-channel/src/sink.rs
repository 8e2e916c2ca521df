use std::collections::VecDeque;
use std::sync::Mutex;

use pvserve_carrier::Carrier;

/// Event category: the value changed.
pub const EVENT_VALUE: u8 = 0x01;
/// Event category: log-worthy update.
pub const EVENT_LOG: u8 = 0x02;

/// Change-notification fan-out point.
///
/// Publishing is best-effort and fire-and-forget. A channel does not know
/// subscriber identities; a sink with nobody attached silently drops the
/// event. Exactly one publish happens per successful write, none on reads or
/// rejected writes.
pub trait NotificationSink: Send + Sync {
    /// Publish a change notification carrying a snapshot of the new state.
    fn publish(&self, mask: u8, name: &str, snapshot: Carrier);
}

/// Sink used when no server context is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn publish(&self, _mask: u8, _name: &str, _snapshot: Carrier) {}
}

/// A published change notification.
#[derive(Debug, Clone)]
pub struct Event {
    pub mask: u8,
    pub name: String,
    pub snapshot: Carrier,
}

/// Queueing sink the serve loop drains after each dispatch turn.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: Mutex<VecDeque<Event>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all queued events, oldest first.
    pub fn drain(&self) -> Vec<Event> {
        match self.queue.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl NotificationSink for EventBus {
    fn publish(&self, mask: u8, name: &str, snapshot: Carrier) {
        let Ok(mut queue) = self.queue.lock() else {
            return;
        };
        queue.push_back(Event {
            mask,
            name: name.to_string(),
            snapshot,
        });
    }
}

#[cfg(test)]
mod tests {
    use pvserve_carrier::{AppTag, ElemKind};

    use super::*;

    #[test]
    fn bus_queues_in_publish_order() {
        let bus = EventBus::new();
        bus.publish(EVENT_VALUE, "a", Carrier::scalar(AppTag::Value, ElemKind::Int32));
        bus.publish(EVENT_LOG, "b", Carrier::scalar(AppTag::Value, ElemKind::Int16));

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "a");
        assert_eq!(events[1].name, "b");
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn null_sink_drops_events() {
        NullSink.publish(
            EVENT_VALUE | EVENT_LOG,
            "nobody",
            Carrier::scalar(AppTag::Value, ElemKind::Int32),
        );
    }
}

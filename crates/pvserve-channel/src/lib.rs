//! Named, typed process variable channels with change notification.
//!
//! A [`Channel`] owns a fixed-length typed buffer plus quality metadata
//! (alarm severity, status, timestamp). It serializes itself into and out of
//! a [`Carrier`](pvserve_carrier::Carrier), computes range limits on demand,
//! and publishes a change notification on every successful write.
//!
//! Channels are created once at startup, registered by name in a
//! [`ChannelRegistry`], and accessed only from the single dispatch thread.

pub mod channel;
pub mod done;
pub mod error;
pub mod registry;
pub mod shutdown;
pub mod sink;

pub use channel::Channel;
pub use done::DoneChannel;
pub use error::ConversionError;
pub use registry::{AnyChannel, ChannelRegistry};
pub use shutdown::ShutdownFlag;
pub use sink::{Event, EventBus, NotificationSink, NullSink, EVENT_LOG, EVENT_VALUE};

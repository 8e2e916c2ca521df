use std::sync::Arc;

use pvserve_carrier::Carrier;

use crate::channel::Channel;
use crate::error::Result;
use crate::shutdown::ShutdownFlag;
use crate::sink::NotificationSink;

/// A length-1 channel that doubles as the server's termination switch.
///
/// After a successful base write the freshly written scalar is copied into
/// the shared shutdown flag: non-zero stops the run loop, zero re-arms it.
/// This is a side channel outside the normal read/write contract; any channel
/// could be designated this way, and exactly one instance is at startup.
pub struct DoneChannel {
    inner: Channel<i32>,
    flag: ShutdownFlag,
}

impl DoneChannel {
    pub fn new(name: impl Into<String>, flag: ShutdownFlag, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            inner: Channel::with_sink(name, 1, sink),
            flag,
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn read(&self, carrier: &mut Carrier) -> Result<()> {
        self.inner.read(carrier)
    }

    pub fn write(&mut self, carrier: &Carrier) -> Result<()> {
        self.inner.write(carrier)?;
        let value = self.inner.value().first().copied().unwrap_or(0);
        self.flag.set(value != 0);
        Ok(())
    }

    pub fn show(&self) -> String {
        self.inner.show()
    }

    pub(crate) fn inner(&self) -> &Channel<i32> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use pvserve_carrier::{AppTag, ElemKind, Leaf};

    use super::*;
    use crate::error::ConversionError;
    use crate::sink::NullSink;

    fn value_leaf(value: i32) -> Carrier {
        let mut leaf = Leaf::scalar(AppTag::Value, ElemKind::Int32);
        leaf.put_scalar(value);
        Carrier::Leaf(leaf)
    }

    #[test]
    fn nonzero_write_sets_the_flag() {
        let flag = ShutdownFlag::new();
        let mut done = DoneChannel::new("done", flag.clone(), Arc::new(NullSink));
        assert!(!flag.is_set());

        done.write(&value_leaf(1)).expect("write should succeed");
        assert!(flag.is_set());

        done.write(&value_leaf(0)).expect("write should succeed");
        assert!(!flag.is_set());
    }

    #[test]
    fn rejected_write_leaves_the_flag_alone() {
        let flag = ShutdownFlag::new();
        let mut done = DoneChannel::new("done", flag.clone(), Arc::new(NullSink));

        let composite = Carrier::composite(vec![value_leaf(1)]);
        assert_eq!(done.write(&composite), Err(ConversionError::Unsupported));
        assert!(!flag.is_set());
    }
}

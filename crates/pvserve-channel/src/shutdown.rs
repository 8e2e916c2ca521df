use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide termination flag.
///
/// Contract: the dispatch thread sets it (through the termination channel or
/// the signal handler) and the run loop polls it once per iteration. Cloning
/// shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, on: bool) {
        self.0.store(on, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

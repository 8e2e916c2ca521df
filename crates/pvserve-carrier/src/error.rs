/// Allocation failure while building a transfer buffer.
///
/// Raised on the reshape path instead of aborting the process.
#[derive(Debug, thiserror::Error)]
#[error("failed to allocate transfer buffer of {len} elements")]
pub struct AllocError {
    pub len: usize,
}

/// Errors that can occur converting between a channel and a carrier.
///
/// All variants are returned to the immediate caller and map to a negative
/// acknowledgment for that one request; none are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// The carrier shape or tag does not fit the operation. Covers writes
    /// with a composite or non-value carrier and reads that encounter a
    /// nested composite.
    #[error("carrier shape or tag not supported for this operation")]
    Unsupported,

    /// Allocation failed while reshaping a scalar leaf into an array.
    #[error("out of memory while reshaping carrier leaf")]
    NoMemory,

    /// The supplied value buffer does not match the channel's fixed length.
    #[error("value length mismatch (expected {expected}, got {actual})")]
    SizeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, ConversionError>;

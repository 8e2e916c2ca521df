use crate::elem::Elem;
use crate::error::AllocError;

/// Owned scratch buffer used for the array-reshape read path.
///
/// Allocation is fallible and reported as [`AllocError`] rather than
/// aborting. The buffer is released exactly once whatever control path is
/// taken: either it is moved into a leaf via [`Leaf::adopt`] or it is
/// dropped on the error path.
///
/// [`Leaf::adopt`]: crate::leaf::Leaf::adopt
#[derive(Debug)]
pub struct TransferBuf<T: Elem> {
    buf: Vec<T>,
}

impl<T: Elem> TransferBuf<T> {
    /// Allocate a zero-filled buffer of `len` elements.
    pub fn with_len(len: usize) -> Result<Self, AllocError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| AllocError { len })?;
        buf.resize(len, T::default());
        Ok(Self { buf })
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.buf
    }

    pub(crate) fn into_vec(self) -> Vec<T> {
        self.buf
    }
}

use std::time::SystemTime;

use crate::alarm::{Severity, Status};
use crate::elem::{Elem, ElemKind};
use crate::tag::AppTag;
use crate::transfer::TransferBuf;

/// Declared dimensionality of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Array { bound: usize },
}

/// Untyped element storage behind a leaf, one variant per [`ElemKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum LeafData {
    Empty,
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Float64(Vec<f64>),
}

impl LeafData {
    fn len(&self) -> usize {
        match self {
            LeafData::Empty => 0,
            LeafData::Int16(v) => v.len(),
            LeafData::Int32(v) => v.len(),
            LeafData::Float64(v) => v.len(),
        }
    }
}

/// A single typed buffer with an application tag and quality slots.
///
/// A leaf starts with a declared kind and shape but empty storage; whoever
/// serves the read fills it in. Value reads additionally stamp severity,
/// status, and a timestamp onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    tag: AppTag,
    kind: ElemKind,
    shape: Shape,
    data: LeafData,
    severity: Severity,
    status: Status,
    stamp: Option<SystemTime>,
}

impl Leaf {
    /// A scalar leaf with empty storage.
    pub fn scalar(tag: AppTag, kind: ElemKind) -> Self {
        Self {
            tag,
            kind,
            shape: Shape::Scalar,
            data: LeafData::Empty,
            severity: Severity::NoAlarm,
            status: Status::NoAlarm,
            stamp: None,
        }
    }

    /// An array leaf with empty storage and the given element bound.
    pub fn array(tag: AppTag, kind: ElemKind, bound: usize) -> Self {
        Self {
            shape: Shape::Array { bound },
            ..Self::scalar(tag, kind)
        }
    }

    pub fn tag(&self) -> AppTag {
        self.tag
    }

    pub fn kind(&self) -> ElemKind {
        self.kind
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.shape, Shape::Scalar)
    }

    /// Number of elements currently stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn stamp(&self) -> Option<SystemTime> {
        self.stamp
    }

    pub fn set_alarm(&mut self, severity: Severity, status: Status) {
        self.severity = severity;
        self.status = status;
    }

    pub fn set_stamp(&mut self, stamp: SystemTime) {
        self.stamp = Some(stamp);
    }

    /// Store a single element, converting into the leaf's declared kind.
    pub fn put_scalar<T: Elem>(&mut self, value: T) {
        self.put_converted(&[value]);
    }

    /// Store a slice, converting element-wise into the leaf's declared kind.
    ///
    /// This is the direct (non-reshape) serialization path; the leaf's
    /// declared bound is assumed to cover `src`.
    pub fn put_converted<T: Elem>(&mut self, src: &[T]) {
        self.data = match self.kind {
            ElemKind::Int16 => LeafData::Int16(convert(src)),
            ElemKind::Int32 => LeafData::Int32(convert(src)),
            ElemKind::Float64 => LeafData::Float64(convert(src)),
        };
    }

    /// Take ownership of a freshly allocated buffer, switching this leaf to
    /// an array of `T`.
    ///
    /// This is the reshape path: a scalar-declared leaf cannot represent a
    /// multi-element value, so the caller allocates array-shaped storage and
    /// transfers it in. The buffer is consumed by move; there is no separate
    /// release step.
    pub fn adopt<T: Elem>(&mut self, buf: TransferBuf<T>) {
        let bound = buf.len();
        self.kind = T::KIND;
        self.shape = Shape::Array { bound };
        self.data = T::wrap(buf.into_vec());
    }

    /// Copy stored elements out, converting element-wise into `T`.
    ///
    /// Copies `min(dst.len(), self.len())` elements; callers validate length
    /// agreement beforehand.
    pub fn copy_out<T: Elem>(&self, dst: &mut [T]) {
        match &self.data {
            LeafData::Empty => {}
            LeafData::Int16(v) => convert_into(v, dst),
            LeafData::Int32(v) => convert_into(v, dst),
            LeafData::Float64(v) => convert_into(v, dst),
        }
    }

    /// Stored elements widened to `f64` (exact for the integer kinds).
    pub fn values_f64(&self) -> Vec<f64> {
        match &self.data {
            LeafData::Empty => Vec::new(),
            LeafData::Int16(v) => v.iter().map(|e| e.to_f64()).collect(),
            LeafData::Int32(v) => v.iter().map(|e| e.to_f64()).collect(),
            LeafData::Float64(v) => v.clone(),
        }
    }
}

fn convert<S: Elem, D: Elem>(src: &[S]) -> Vec<D> {
    src.iter().map(|e| D::from_f64(e.to_f64())).collect()
}

fn convert_into<S: Elem, D: Elem>(src: &[S], dst: &mut [D]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = D::from_f64(s.to_f64());
    }
}

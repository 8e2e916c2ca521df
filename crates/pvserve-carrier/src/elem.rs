use std::fmt;

use crate::leaf::LeafData;

/// The closed set of primitive element kinds a carrier can hold.
///
/// The set is fixed at compile time; channels pick one kind at construction
/// and never change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemKind {
    Int16,
    Int32,
    Float64,
}

impl ElemKind {
    /// Short name as used in channel topology specs ("i16", "i32", "f64").
    pub fn name(self) -> &'static str {
        match self {
            ElemKind::Int16 => "i16",
            ElemKind::Int32 => "i32",
            ElemKind::Float64 => "f64",
        }
    }

    /// Parse a short kind name. Inverse of [`ElemKind::name`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "i16" => Some(ElemKind::Int16),
            "i32" => Some(ElemKind::Int32),
            "f64" => Some(ElemKind::Float64),
            _ => None,
        }
    }
}

impl fmt::Display for ElemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for f64 {}
}

/// A primitive element type usable in channel buffers and carrier leaves.
///
/// Cross-kind conversion goes through `f64`, which represents every value of
/// the supported integer kinds exactly. Narrowing uses `as`-cast semantics.
pub trait Elem:
    sealed::Sealed + Copy + Default + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// The kind tag for this element type.
    const KIND: ElemKind;
    /// Minimum representable value.
    const MIN_VALUE: Self;
    /// Maximum representable value.
    const MAX_VALUE: Self;

    fn to_f64(self) -> f64;
    fn from_f64(raw: f64) -> Self;

    /// Wrap an owned buffer of this type into untyped leaf storage.
    fn wrap(buf: Vec<Self>) -> LeafData;
}

impl Elem for i16 {
    const KIND: ElemKind = ElemKind::Int16;
    const MIN_VALUE: Self = i16::MIN;
    const MAX_VALUE: Self = i16::MAX;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(raw: f64) -> Self {
        raw as i16
    }

    fn wrap(buf: Vec<Self>) -> LeafData {
        LeafData::Int16(buf)
    }
}

impl Elem for i32 {
    const KIND: ElemKind = ElemKind::Int32;
    const MIN_VALUE: Self = i32::MIN;
    const MAX_VALUE: Self = i32::MAX;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(raw: f64) -> Self {
        raw as i32
    }

    fn wrap(buf: Vec<Self>) -> LeafData {
        LeafData::Int32(buf)
    }
}

impl Elem for f64 {
    const KIND: ElemKind = ElemKind::Float64;
    const MIN_VALUE: Self = f64::MIN;
    const MAX_VALUE: Self = f64::MAX;

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(raw: f64) -> Self {
        raw
    }

    fn wrap(buf: Vec<Self>) -> LeafData {
        LeafData::Float64(buf)
    }
}

//! Polymorphic data-exchange container for process variable servers.
//!
//! A [`Carrier`] moves typed data and metadata across the protocol boundary.
//! It is either a single [`Leaf`] (one typed buffer plus quality slots) or a
//! composite (an ordered collection of leaves, e.g. "value + high limit"
//! bundled for a single read). Element types come from a small closed set
//! ([`ElemKind`]); cross-kind marshaling uses C-cast semantics.
//!
//! No I/O and no serialization live here. Wire encoding is the server's
//! concern.

pub mod alarm;
pub mod carrier;
pub mod elem;
pub mod error;
pub mod leaf;
pub mod tag;
pub mod transfer;

pub use alarm::{Severity, Status};
pub use carrier::Carrier;
pub use elem::{Elem, ElemKind};
pub use error::AllocError;
pub use leaf::{Leaf, LeafData, Shape};
pub use tag::AppTag;
pub use transfer::TransferBuf;

use crate::elem::ElemKind;
use crate::leaf::Leaf;
use crate::tag::AppTag;

/// Polymorphic exchange container: a single typed leaf or an ordered
/// collection of sub-carriers.
///
/// Composites are how a reader requests several pieces at once (for example
/// value plus range limits). Nesting a composite inside a composite is
/// representable but no channel operation accepts it.
#[derive(Debug, Clone, PartialEq)]
pub enum Carrier {
    Leaf(Leaf),
    Composite(Vec<Carrier>),
}

impl Carrier {
    /// A single scalar leaf.
    pub fn scalar(tag: AppTag, kind: ElemKind) -> Self {
        Carrier::Leaf(Leaf::scalar(tag, kind))
    }

    /// A single array leaf with the given bound.
    pub fn array(tag: AppTag, kind: ElemKind, bound: usize) -> Self {
        Carrier::Leaf(Leaf::array(tag, kind, bound))
    }

    /// An ordered collection of sub-carriers.
    pub fn composite(items: Vec<Carrier>) -> Self {
        Carrier::Composite(items)
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Carrier::Composite(_))
    }

    /// The leaf, if this carrier is one.
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Carrier::Leaf(leaf) => Some(leaf),
            Carrier::Composite(_) => None,
        }
    }

    /// Iterate the direct leaves of this carrier.
    ///
    /// For a leaf carrier this yields the leaf itself; for a composite it
    /// yields only the top-level leaves, skipping nested composites.
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        let (single, nested): (&[Leaf], &[Carrier]) = match self {
            Carrier::Leaf(leaf) => (std::slice::from_ref(leaf), &[]),
            Carrier::Composite(items) => (&[], items),
        };
        single.iter().chain(nested.iter().filter_map(Carrier::as_leaf))
    }

    /// Find the first leaf carrying the given tag.
    pub fn find(&self, tag: AppTag) -> Option<&Leaf> {
        self.leaves().find(|leaf| leaf.tag() == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_locates_tagged_leaf() {
        let carrier = Carrier::composite(vec![
            Carrier::scalar(AppTag::Value, ElemKind::Int32),
            Carrier::scalar(AppTag::HighLimit, ElemKind::Int32),
        ]);

        assert!(carrier.find(AppTag::HighLimit).is_some());
        assert!(carrier.find(AppTag::LowLimit).is_none());
    }

    #[test]
    fn leaf_carrier_yields_itself() {
        let carrier = Carrier::scalar(AppTag::Value, ElemKind::Int16);
        assert_eq!(carrier.leaves().count(), 1);
        assert!(!carrier.is_composite());
    }
}

use std::any::Any;
use std::rc::{Rc, Weak};

use digest::Digest;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;

use crate::prelude::*;

use super::node::Node;

/// Opaque weak back-reference into an external LRU cache.
///
/// The cache owns its entries and sets or clears the slot; this layer
/// zero-initializes it and drops it on `extract`.
#[derive(Clone, Default)]
pub struct LruSlot(Option<Weak<dyn Any>>);

impl LruSlot {
    pub fn new() -> Self {
        Self(None)
    }

    /// Points the slot at a cache entry.
    pub fn set(&mut self, entry: Weak<dyn Any>) {
        self.0 = Some(entry);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    /// Upgrades the back-reference, if the cache entry is still alive.
    pub fn entry(&self) -> Option<Rc<dyn Any>> {
        self.0.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl std::fmt::Debug for LruSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.0.is_some() {
            "LruSlot(set)"
        } else {
            "LruSlot(empty)"
        })
    }
}

/// An indirect reference to a child node.
///
/// A pointer always knows the child's hash; it may additionally hold
/// the node itself (resident) or not (unresolved, to be materialized
/// through a [`NodeResolver`](super::NodeResolver)). A missing child is
/// `Option::<Pointer<D>>::None`, which projects to the zero hash and
/// counts as clean.
pub struct Pointer<D: Digest> {
    pub clean: bool,
    pub hash: Hash,
    pub node: Option<Box<Node<D>>>,
    /// Back-reference slot owned by the external LRU cache.
    pub lru_slot: LruSlot,
    /// Backend-owned metadata aiding pointer resolution; opaque here.
    pub backend_meta: Option<Rc<dyn Any>>,
}

impl<D: Digest> Pointer<D> {
    /// Creates a clean, unresolved pointer carrying only `hash`.
    pub fn from_hash(hash: Hash) -> Self {
        Self {
            clean: true,
            hash,
            node: None,
            lru_slot: LruSlot::default(),
            backend_meta: None,
        }
    }

    /// Creates a dirty resident pointer around `node`.
    ///
    /// The pointer adopts the node's cached hash, which may itself be
    /// stale until the node's `update_hash` runs.
    pub fn from_node(node: Node<D>) -> Self {
        Self {
            clean: false,
            hash: node.hash(),
            node: Some(Box::new(node)),
            lru_slot: LruSlot::default(),
            backend_meta: None,
        }
    }

    /// Hash projection of an optional pointer.
    ///
    /// A missing pointer projects to the zero hash.
    pub fn project_hash(ptr: Option<&Self>) -> Hash {
        ptr.map_or_else(Hash::zero, |p| p.hash)
    }

    /// A missing pointer is clean.
    pub fn is_clean(ptr: Option<&Self>) -> bool {
        ptr.map_or(true, |p| p.clean)
    }

    /// Makes a copy containing only the hash reference.
    ///
    /// The resident node, LRU slot and backend metadata are all
    /// dropped.
    ///
    /// # Panics
    ///
    /// Panics when the pointer is dirty.
    pub fn extract(&self) -> Self {
        if !self.clean {
            panic!("statetrie: extract called on dirty pointer");
        }

        Self::from_hash(self.hash)
    }

    pub fn extract_opt(ptr: Option<&Self>) -> Option<Self> {
        ptr.map(Self::extract)
    }

    /// Compares two optional pointers.
    ///
    /// Clean pointers compare by projected hash; otherwise both sides
    /// must be resident and the nodes must compare equal.
    pub fn equal_opt(a: Option<&Self>, b: Option<&Self>) -> bool {
        if Self::is_clean(a) && Self::is_clean(b) {
            return Self::project_hash(a) == Self::project_hash(b);
        }

        match (a, b) {
            (Some(a), Some(b)) => match (&a.node, &b.node) {
                (Some(a), Some(b)) => a.equal(b),
                _ => false,
            },
            _ => false,
        }
    }
}

impl<D: Digest> Clone for Pointer<D> {
    fn clone(&self) -> Self {
        Self {
            clean: self.clean,
            hash: self.hash,
            node: self.node.clone(),
            lru_slot: self.lru_slot.clone(),
            backend_meta: self.backend_meta.clone(),
        }
    }
}

impl<D: Digest> std::fmt::Debug for Pointer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pointer")
            .field("clean", &self.clean)
            .field("hash", &self.hash)
            .field("node", &self.node)
            .finish()
    }
}

impl<D: Digest + 'static> Arbitrary for Pointer<D> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        any::<Hash>().prop_map(Pointer::from_hash).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestPointer = Pointer<DefaultDigest>;

    fn hash_of(data: &[u8]) -> Hash {
        Hash::digest::<DefaultDigest>(data)
    }

    #[test]
    fn missing_pointer_projects_to_zero_and_is_clean() {
        assert_eq!(TestPointer::project_hash(None), Hash::zero());
        assert!(TestPointer::is_clean(None));
    }

    #[test]
    fn clean_pointers_compare_by_hash() {
        let a = TestPointer::from_hash(hash_of(b"a"));
        let b = TestPointer::from_hash(hash_of(b"b"));
        assert!(TestPointer::equal_opt(Some(&a), Some(&a.clone())));
        assert!(!TestPointer::equal_opt(Some(&a), Some(&b)));
    }

    #[test]
    fn dirty_pointers_without_nodes_are_unequal() {
        let mut a = TestPointer::from_hash(hash_of(b"a"));
        a.clean = false;
        let mut b = TestPointer::from_hash(hash_of(b"a"));
        b.clean = false;
        assert!(!TestPointer::equal_opt(Some(&a), Some(&b)));
    }

    #[test]
    fn extract_drops_residency_and_slots() {
        let mut inner = InternalNode::new(None, None);
        inner.update_hash();
        inner.clean = true;
        let mut ptr = TestPointer::from_node(Node::Internal(inner));
        ptr.clean = true;
        ptr.backend_meta = Some(Rc::new(42u64));

        let extracted = ptr.extract();
        assert!(extracted.clean);
        assert_eq!(extracted.hash, ptr.hash);
        assert!(extracted.node.is_none());
        assert!(extracted.backend_meta.is_none());
        assert!(!extracted.lru_slot.is_set());
    }

    #[test]
    #[should_panic(expected = "extract called on dirty pointer")]
    fn extract_on_dirty_pointer_panics() {
        let mut ptr = TestPointer::from_hash(hash_of(b"a"));
        ptr.clean = false;
        ptr.extract();
    }
}

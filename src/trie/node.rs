use digest::Digest;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;

use crate::prelude::*;

use super::pointer::Pointer;
use super::value::Value;
use super::{TAG_INTERNAL, TAG_LEAF};

/// Root-relative node identifier: the path bits and the depth at which
/// they apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeID {
    pub path: Hash,
    pub depth: u8,
}

impl NodeID {
    /// Returns the same path re-anchored at the given depth.
    pub fn at_depth(self, depth: u8) -> Self {
        Self { depth, ..self }
    }
}

/// An internal node with two child slots.
pub struct InternalNode<D: Digest> {
    pub clean: bool,
    pub hash: Hash,
    pub left: Option<Pointer<D>>,
    pub right: Option<Pointer<D>>,
}

impl<D: Digest> InternalNode<D> {
    /// Creates a dirty internal node over the given children.
    pub fn new(left: Option<Pointer<D>>, right: Option<Pointer<D>>) -> Self {
        Self {
            clean: false,
            hash: Hash::zero(),
            left,
            right,
        }
    }

    /// Recomputes the cached hash from the child projections.
    ///
    /// Does not mark the node as clean.
    pub fn update_hash(&mut self) {
        let left_hash = Pointer::project_hash(self.left.as_ref());
        let right_hash = Pointer::project_hash(self.right.as_ref());

        self.hash = Hash::digest_parts::<D>(&[
            &[TAG_INTERNAL],
            left_hash.as_ref(),
            right_hash.as_ref(),
        ]);
    }

    /// Makes a copy of the node containing only hash references.
    ///
    /// # Panics
    ///
    /// Panics when the node is dirty.
    pub fn extract(&self) -> Self {
        if !self.clean {
            panic!("statetrie: extract called on dirty node");
        }

        Self {
            clean: true,
            hash: self.hash,
            left: Pointer::extract_opt(self.left.as_ref()),
            right: Pointer::extract_opt(self.right.as_ref()),
        }
    }

    /// Checks that the node is internally consistent with `expected`.
    ///
    /// Both child pointers must be clean; the subtree below them is not
    /// visited.
    pub fn validate(&mut self, expected: Hash) -> Result<()> {
        if !Pointer::is_clean(self.left.as_ref()) || !Pointer::is_clean(self.right.as_ref()) {
            return Err(Error::DirtyPointer);
        }

        self.update_hash();

        if expected != self.hash {
            return Err(Error::HashMismatch {
                expected,
                got: self.hash,
            });
        }

        Ok(())
    }

    /// Compares the node with another node.
    pub fn equal(&self, other: &Node<D>) -> bool {
        match other {
            Node::Internal(other) => {
                if self.clean && other.clean {
                    self.hash == other.hash
                } else {
                    Pointer::equal_opt(self.left.as_ref(), other.left.as_ref())
                        && Pointer::equal_opt(self.right.as_ref(), other.right.as_ref())
                }
            }
            Node::Leaf(_) => false,
        }
    }
}

impl<D: Digest> ToBytes for InternalNode<D> {
    type Output = Vec<u8>;

    fn to_bytes(&self) -> Self::Output {
        let mut data = Vec::with_capacity(1 + 2 * Hash::SIZE);
        data.push(TAG_INTERNAL);
        data.extend_from_slice(Pointer::project_hash(self.left.as_ref()).as_ref());
        data.extend_from_slice(Pointer::project_hash(self.right.as_ref()).as_ref());
        data
    }
}

impl<D: Digest> FromBytesSized for InternalNode<D> {
    fn from_bytes_sized(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < 1 + 2 * Hash::SIZE || buf[0] != TAG_INTERNAL {
            return Err(Error::Malformed);
        }

        let left_hash = Hash::from_bytes(&buf[1..1 + Hash::SIZE])?;
        let right_hash = Hash::from_bytes(&buf[1 + Hash::SIZE..1 + 2 * Hash::SIZE])?;

        let mut node = Self {
            clean: true,
            hash: Hash::zero(),
            left: (left_hash != Hash::zero()).then(|| Pointer::from_hash(left_hash)),
            right: (right_hash != Hash::zero()).then(|| Pointer::from_hash(right_hash)),
        };
        node.update_hash();

        Ok((node, 1 + 2 * Hash::SIZE))
    }
}

impl<D: Digest> FromBytes for InternalNode<D> {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_sized(bytes).map(|(node, _)| node)
    }
}

impl<D: Digest> Clone for InternalNode<D> {
    fn clone(&self) -> Self {
        Self {
            clean: self.clean,
            hash: self.hash,
            left: self.left.clone(),
            right: self.right.clone(),
        }
    }
}

impl<D: Digest> std::fmt::Debug for InternalNode<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalNode")
            .field("clean", &self.clean)
            .field("hash", &self.hash)
            .field("left", &self.left)
            .field("right", &self.right)
            .finish()
    }
}

impl<D: Digest + 'static> Arbitrary for InternalNode<D> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (
            proptest::option::of(any::<Pointer<D>>()),
            proptest::option::of(any::<Pointer<D>>()),
        )
            .prop_map(|(left, right)| {
                let mut node = Self::new(left, right);
                node.update_hash();
                node.clean = true;
                node
            })
            .boxed()
    }
}

/// A leaf node holding a key and its value.
///
/// The key is hash-shaped: raw user keys are digested by the layer
/// above before they reach the tree.
pub struct LeafNode<D: Digest> {
    pub clean: bool,
    pub hash: Hash,
    pub key: Hash,
    pub value: Value<D>,
}

impl<D: Digest> LeafNode<D> {
    /// Creates a dirty leaf node over the given key and value.
    pub fn new(key: Hash, value: Value<D>) -> Self {
        Self {
            clean: false,
            hash: Hash::zero(),
            key,
            value,
        }
    }

    /// Recomputes the cached hash from the key and the value's hash.
    ///
    /// Does not mark the node as clean.
    pub fn update_hash(&mut self) {
        self.hash =
            Hash::digest_parts::<D>(&[&[TAG_LEAF], self.key.as_ref(), self.value.hash.as_ref()]);
    }

    /// Makes a copy of the node containing only hash references.
    ///
    /// # Panics
    ///
    /// Panics when the node is dirty.
    pub fn extract(&self) -> Self {
        if !self.clean {
            panic!("statetrie: extract called on dirty node");
        }

        Self {
            clean: true,
            hash: self.hash,
            key: self.key,
            value: self.value.extract(),
        }
    }

    /// Checks that the node is internally consistent with `expected`.
    pub fn validate(&mut self, expected: Hash) -> Result<()> {
        if !self.value.clean {
            return Err(Error::DirtyValue);
        }

        self.update_hash();

        if expected != self.hash {
            return Err(Error::HashMismatch {
                expected,
                got: self.hash,
            });
        }

        Ok(())
    }

    /// Compares the node with another node.
    pub fn equal(&self, other: &Node<D>) -> bool {
        match other {
            Node::Leaf(other) => {
                if self.clean && other.clean {
                    self.hash == other.hash
                } else {
                    self.key == other.key
                        && Value::equal_opt(Some(&self.value), Some(&other.value))
                }
            }
            Node::Internal(_) => false,
        }
    }
}

impl<D: Digest> ToBytes for LeafNode<D> {
    type Output = Vec<u8>;

    fn to_bytes(&self) -> Self::Output {
        let value = self.value.to_bytes();
        let mut data = Vec::with_capacity(1 + Hash::SIZE + value.len());
        data.push(TAG_LEAF);
        data.extend_from_slice(self.key.as_ref());
        data.extend_from_slice(&value);
        data
    }
}

impl<D: Digest> FromBytesSized for LeafNode<D> {
    fn from_bytes_sized(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < 1 + Hash::SIZE || buf[0] != TAG_LEAF {
            return Err(Error::Malformed);
        }

        let key = Hash::from_bytes(&buf[1..1 + Hash::SIZE])?;
        let (value, value_size) = Value::from_bytes_sized(&buf[1 + Hash::SIZE..])?;

        let mut node = Self {
            clean: true,
            hash: Hash::zero(),
            key,
            value,
        };
        node.update_hash();

        Ok((node, 1 + Hash::SIZE + value_size))
    }
}

impl<D: Digest> FromBytes for LeafNode<D> {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_sized(bytes).map(|(node, _)| node)
    }
}

impl<D: Digest> Clone for LeafNode<D> {
    fn clone(&self) -> Self {
        Self {
            clean: self.clean,
            hash: self.hash,
            key: self.key,
            value: self.value.clone(),
        }
    }
}

impl<D: Digest> std::fmt::Debug for LeafNode<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeafNode")
            .field("clean", &self.clean)
            .field("hash", &self.hash)
            .field("key", &self.key)
            .field("value", &self.value)
            .finish()
    }
}

impl<D: Digest + 'static> Arbitrary for LeafNode<D> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        (any::<Hash>(), any::<Value<D>>())
            .prop_map(|(key, value)| {
                let mut node = Self::new(key, value);
                node.update_hash();
                node.clean = true;
                node
            })
            .boxed()
    }
}

/// A node is either an internal node or a leaf node.
///
/// The serialization tag byte doubles as the variant discriminant.
pub enum Node<D: Digest> {
    Internal(InternalNode<D>),
    Leaf(LeafNode<D>),
}

impl<D: Digest> Node<D> {
    /// Returns the node's cached hash.
    pub fn hash(&self) -> Hash {
        match self {
            Node::Internal(node) => node.hash,
            Node::Leaf(node) => node.hash,
        }
    }

    pub fn is_clean(&self) -> bool {
        match self {
            Node::Internal(node) => node.clean,
            Node::Leaf(node) => node.clean,
        }
    }

    /// Recomputes the cached hash. Does not mark the node as clean.
    pub fn update_hash(&mut self) {
        match self {
            Node::Internal(node) => node.update_hash(),
            Node::Leaf(node) => node.update_hash(),
        }
    }

    /// Makes a copy of the node containing only hash references.
    ///
    /// # Panics
    ///
    /// Panics when the node is dirty.
    pub fn extract(&self) -> Self {
        match self {
            Node::Internal(node) => Node::Internal(node.extract()),
            Node::Leaf(node) => Node::Leaf(node.extract()),
        }
    }

    /// Checks that the node is internally consistent with `expected`.
    ///
    /// This does not verify the whole subtree below the node.
    pub fn validate(&mut self, expected: Hash) -> Result<()> {
        match self {
            Node::Internal(node) => node.validate(expected),
            Node::Leaf(node) => node.validate(expected),
        }
    }

    /// Compares the node with another node.
    pub fn equal(&self, other: &Node<D>) -> bool {
        match self {
            Node::Internal(node) => node.equal(other),
            Node::Leaf(node) => node.equal(other),
        }
    }
}

impl<D: Digest> ToBytes for Node<D> {
    type Output = Vec<u8>;

    fn to_bytes(&self) -> Self::Output {
        match self {
            Node::Internal(node) => node.to_bytes(),
            Node::Leaf(node) => node.to_bytes(),
        }
    }
}

impl<D: Digest> FromBytesSized for Node<D> {
    fn from_bytes_sized(buf: &[u8]) -> Result<(Self, usize)> {
        match buf.first() {
            Some(&TAG_INTERNAL) => {
                InternalNode::from_bytes_sized(buf).map(|(node, size)| (Node::Internal(node), size))
            }
            Some(&TAG_LEAF) => {
                LeafNode::from_bytes_sized(buf).map(|(node, size)| (Node::Leaf(node), size))
            }
            // Covers the empty buffer and reserved or unknown tags.
            _ => Err(Error::Malformed),
        }
    }
}

impl<D: Digest> FromBytes for Node<D> {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_sized(bytes).map(|(node, _)| node)
    }
}

impl<D: Digest> Clone for Node<D> {
    fn clone(&self) -> Self {
        match self {
            Node::Internal(node) => Node::Internal(node.clone()),
            Node::Leaf(node) => Node::Leaf(node.clone()),
        }
    }
}

impl<D: Digest> std::fmt::Debug for Node<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Internal(node) => f.debug_tuple("Internal").field(node).finish(),
            Node::Leaf(node) => f.debug_tuple("Leaf").field(node).finish(),
        }
    }
}

impl<D: Digest + 'static> Arbitrary for Node<D> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            any::<InternalNode<D>>().prop_map(Node::Internal),
            any::<LeafNode<D>>().prop_map(Node::Leaf),
        ]
        .boxed()
    }
}

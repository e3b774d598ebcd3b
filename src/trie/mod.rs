//! Node layer of an authenticated binary prefix tree.
//!
//! The tree maps hash-shaped keys to byte values. Every subtree is
//! named by a digest, and every node caches the digest of its current
//! contents together with a `clean` flag:
//!
//! 1. Node shapes:
//!    - Internal nodes: exactly two child slots, left and right. A
//!      missing child projects to the zero hash.
//!    - Leaf nodes: a key and an owned [`Value`].
//!
//! 2. Hashing mechanism (domain-separated by a leading tag byte):
//!    - Leaf nodes: `hash = H(0x00 || key || value.hash)`
//!    - Internal nodes: `hash = H(0x01 || left.hash || right.hash)`
//!    Where `H` is the digest the tree is instantiated with, and `||`
//!    denotes concatenation.
//!
//! 3. Clean/dirty lifecycle:
//!    Mutations leave a node dirty; `update_hash` recomputes the cached
//!    digest without marking anything clean. The writer that owns the
//!    subtree flips `clean` once the hash reflects the contents. Clean
//!    entities may be compared, checkpointed and reloaded without
//!    recomputing digests for untouched subtrees.
//!
//! 4. Pointer indirection:
//!    A [`Pointer`] decouples a child's identity (its hash) from its
//!    residency (a loaded [`Node`]). An unresolved pointer carries only
//!    the hash and is materialized on demand through a [`NodeResolver`].
//!
//! 5. Extraction:
//!    `extract` produces a hash-skeleton: a copy of a clean node whose
//!    children are resident-but-content-free pointers. It is the unit
//!    of checkpointing and pruning, and it panics on dirty input so a
//!    half-mutated subtree can never be captured.
//!
//! The serialization of each shape starts with the same tag byte used
//! for hash domain separation, so the wire form is self-describing.
mod node;
mod pointer;
mod resolver;
mod value;

pub use node::{InternalNode, LeafNode, Node, NodeID};
pub use pointer::{LruSlot, Pointer};
pub use resolver::{MapResolver, NodeResolver};
pub use value::Value;

/// Tag byte of leaf nodes, in both hash derivation and serialization.
pub const TAG_LEAF: u8 = 0x00;
/// Tag byte of internal nodes, in both hash derivation and serialization.
pub const TAG_INTERNAL: u8 = 0x01;
/// Tag byte marking an absent subtree in subtree serializations.
///
/// Reserved for the layer above; no codec in this module produces it,
/// and a node body starting with it is malformed.
pub const TAG_NIL: u8 = 0x02;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use paste::paste;

    macro_rules! generate_node_tests {
        ($digest:ty) => {
            paste! {
                #[allow(non_snake_case)]
                mod [<$digest _tests>] {
                    use proptest::prelude::*;

                    use super::*;

                    #[test_strategy::proptest(fork = false)]
                    fn test_value_roundtrip(
                        #[strategy(any::<Value<$digest>>())] value: Value<$digest>
                    ) {
                        let encoded = value.to_bytes();
                        let (decoded, consumed) = Value::<$digest>::from_bytes_sized(&encoded)?;
                        prop_assert_eq!(consumed, encoded.len());
                        prop_assert!(decoded.clean);
                        prop_assert_eq!(decoded.hash, value.hash);
                        prop_assert_eq!(decoded.bytes, value.bytes);
                    }

                    #[test_strategy::proptest(fork = false)]
                    fn test_leaf_roundtrip(
                        #[strategy(any::<LeafNode<$digest>>())] leaf: LeafNode<$digest>
                    ) {
                        let encoded = leaf.to_bytes();
                        let (decoded, consumed) = LeafNode::<$digest>::from_bytes_sized(&encoded)?;
                        prop_assert_eq!(consumed, encoded.len());
                        prop_assert_eq!(decoded.hash, leaf.hash);
                        prop_assert_eq!(decoded.key, leaf.key);
                        prop_assert!(Value::equal_opt(Some(&decoded.value), Some(&leaf.value)));
                    }

                    #[test_strategy::proptest(fork = false)]
                    fn test_internal_roundtrip(
                        #[strategy(any::<InternalNode<$digest>>())] node: InternalNode<$digest>
                    ) {
                        let encoded = node.to_bytes();
                        let (decoded, consumed) =
                            InternalNode::<$digest>::from_bytes_sized(&encoded)?;
                        prop_assert_eq!(consumed, encoded.len());
                        prop_assert_eq!(decoded.hash, node.hash);
                        prop_assert_eq!(
                            Pointer::project_hash(decoded.left.as_ref()),
                            Pointer::project_hash(node.left.as_ref())
                        );
                        prop_assert_eq!(
                            Pointer::project_hash(decoded.right.as_ref()),
                            Pointer::project_hash(node.right.as_ref())
                        );

                        // Children come back resident-but-content-free.
                        for child in [&decoded.left, &decoded.right].into_iter().flatten() {
                            prop_assert!(child.clean);
                            prop_assert!(child.node.is_none());
                        }
                    }

                    #[test_strategy::proptest(fork = false)]
                    fn test_update_hash_idempotent(
                        #[strategy(any::<Node<$digest>>())] mut node: Node<$digest>
                    ) {
                        node.update_hash();
                        let first = node.hash();
                        node.update_hash();
                        prop_assert_eq!(first, node.hash());
                    }

                    #[test_strategy::proptest(fork = false)]
                    fn test_extract_preserves_hash(
                        #[strategy(any::<Node<$digest>>())] node: Node<$digest>
                    ) {
                        let extracted = node.extract();
                        prop_assert_eq!(extracted.hash(), node.hash());
                        prop_assert!(extracted.is_clean());
                    }

                    #[test_strategy::proptest(fork = false)]
                    fn test_validate_clean_node_is_pure(
                        #[strategy(any::<Node<$digest>>())] mut node: Node<$digest>
                    ) {
                        let expected = node.hash();
                        $crate::prop_assert_does_not_change!(
                            prop_assert!(node.validate(expected).is_ok()),
                            node.hash()
                        );
                    }

                    #[test_strategy::proptest(fork = false)]
                    fn test_equal_is_reflexive(
                        #[strategy(any::<Node<$digest>>())] node: Node<$digest>
                    ) {
                        prop_assert!(node.equal(&node));
                    }
                }
            }
        };
    }

    type Sha512_256 = sha2::Sha512_256;
    type Sha256 = sha2::Sha256;
    type Blake3 = blake3::Hasher;

    generate_node_tests!(Sha512_256);
    generate_node_tests!(Sha256);
    generate_node_tests!(Blake3);

    // Cross-implementation hash constants, pinned under SHA-512/256.

    #[test]
    fn empty_leaf_hash_constant() {
        let mut leaf = LeafNode::<DefaultDigest>::new(Hash::zero(), Value::new(Vec::new()));
        leaf.value.update_hash();
        leaf.update_hash();
        assert_eq!(
            leaf.hash.to_hex(),
            "c6f4343958604439b5bd456c0a450ff5909db105228e337dcedf15fddcde0813"
        );
    }

    #[test]
    fn empty_internal_hash_constant() {
        let mut node = InternalNode::<DefaultDigest>::new(None, None);
        node.update_hash();
        assert_eq!(
            node.hash.to_hex(),
            "cc986d76ebdab05f73ab289e97d2f6eeefa760569c49cbc02258bb623c2e9d37"
        );
    }

    #[test]
    fn leaf_marshal_scenario() {
        let key = Hash::digest::<DefaultDigest>(b"k");
        let mut leaf = LeafNode::<DefaultDigest>::new(key, Value::new(b"hi".to_vec()));
        leaf.value.update_hash();
        leaf.value.clean = true;
        leaf.update_hash();
        leaf.clean = true;

        let encoded = leaf.to_bytes();
        assert_eq!(encoded.len(), 38);
        assert_eq!(encoded[0], TAG_LEAF);
        assert_eq!(&encoded[1..33], key.as_ref());
        assert_eq!(&encoded[33..37], &[0x02, 0x00, 0x00, 0x00]);
        assert_eq!(&encoded[37..], b"hi");

        let (decoded, consumed) = LeafNode::<DefaultDigest>::from_bytes_sized(&encoded).unwrap();
        assert_eq!(consumed, 38);
        assert_eq!(decoded.hash, leaf.hash);
        assert_eq!(
            leaf.hash.to_hex(),
            "f759a5aa7c4bd361bcfeb848bd9255ad8162e3f12f1a6bb1b739eff6fb1368c7"
        );
    }

    #[test]
    fn internal_marshal_one_child_scenario() {
        let h1 = Hash::digest::<DefaultDigest>(b"left subtree");
        let mut node = InternalNode::<DefaultDigest>::new(Some(Pointer::from_hash(h1)), None);
        node.update_hash();
        node.clean = true;

        let encoded = node.to_bytes();
        assert_eq!(encoded.len(), 65);
        assert_eq!(encoded[0], TAG_INTERNAL);
        assert_eq!(&encoded[1..33], h1.as_ref());
        assert_eq!(&encoded[33..], [0u8; 32]);

        let (decoded, consumed) =
            InternalNode::<DefaultDigest>::from_bytes_sized(&encoded).unwrap();
        assert_eq!(consumed, 65);
        assert_eq!(decoded.hash, node.hash);
        let left = decoded.left.as_ref().unwrap();
        assert!(left.clean);
        assert!(left.node.is_none());
        assert_eq!(left.hash, h1);
        assert!(decoded.right.is_none());
    }
}

use std::collections::HashMap;

use digest::Digest;

use crate::prelude::*;

use super::node::{Node, NodeID};

/// Capability for materializing an unresolved pointer into a node.
///
/// Implementations are storage backends. The returned node must be
/// internally consistent with the requested hash; callers may assume
/// `validate(hash)` has already succeeded on it.
pub trait NodeResolver<D: Digest> {
    /// Resolves the node at `id` whose hash is `hash`.
    fn resolve(&self, id: NodeID, hash: Hash) -> Result<Node<D>>;
}

/// In-memory resolver over marshaled nodes, keyed by hash.
#[derive(Clone, Debug, Default)]
pub struct MapResolver {
    nodes: HashMap<Hash, Vec<u8>>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a marshaled node under its cached hash.
    pub fn insert<D: Digest>(&mut self, node: &Node<D>) {
        self.nodes.insert(node.hash(), node.to_bytes());
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<D: Digest> NodeResolver<D> for MapResolver {
    fn resolve(&self, _id: NodeID, hash: Hash) -> Result<Node<D>> {
        let data = self.nodes.get(&hash).ok_or(Error::NodeNotFound(hash))?;
        let mut node = Node::from_bytes(data)?;
        node.validate(hash)?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::{InternalNode, LeafNode, Pointer, Value};

    fn node_id() -> NodeID {
        NodeID {
            path: Hash::zero(),
            depth: 0,
        }
    }

    fn clean_leaf(bytes: &[u8]) -> Node<DefaultDigest> {
        let mut value = Value::new(bytes.to_vec());
        value.update_hash();
        value.clean = true;
        let mut leaf = LeafNode::new(Hash::digest::<DefaultDigest>(b"key"), value);
        leaf.update_hash();
        leaf.clean = true;
        Node::Leaf(leaf)
    }

    #[test]
    fn resolves_a_stored_node() {
        let leaf = clean_leaf(b"payload");
        let mut resolver = MapResolver::new();
        resolver.insert(&leaf);

        let resolved: Node<DefaultDigest> = resolver.resolve(node_id(), leaf.hash()).unwrap();
        assert!(resolved.is_clean());
        assert_eq!(resolved.hash(), leaf.hash());
        assert!(resolved.equal(&leaf));
    }

    #[test]
    fn resolves_through_an_unresolved_pointer() {
        let leaf = clean_leaf(b"payload");
        let mut resolver = MapResolver::new();
        resolver.insert(&leaf);

        let ptr: Pointer<DefaultDigest> = Pointer::from_hash(leaf.hash());
        assert!(ptr.node.is_none());
        let resolved: Node<DefaultDigest> = resolver.resolve(node_id(), ptr.hash).unwrap();
        assert_eq!(resolved.hash(), ptr.hash);
    }

    #[test]
    fn unknown_hash_is_not_found() {
        let resolver = MapResolver::new();
        let missing = Hash::digest::<DefaultDigest>(b"missing");
        assert!(matches!(
            NodeResolver::<DefaultDigest>::resolve(&resolver, node_id(), missing),
            Err(Error::NodeNotFound(hash)) if hash == missing
        ));
    }

    #[test]
    fn internal_nodes_round_trip_through_the_resolver() {
        let mut node = InternalNode::<DefaultDigest>::new(
            Some(Pointer::from_hash(Hash::digest::<DefaultDigest>(b"left"))),
            None,
        );
        node.update_hash();
        node.clean = true;
        let node = Node::Internal(node);

        let mut resolver = MapResolver::new();
        resolver.insert(&node);

        let resolved: Node<DefaultDigest> = resolver.resolve(node_id(), node.hash()).unwrap();
        assert!(resolved.equal(&node));
    }
}

use thiserror::Error as ThisError;

use crate::hash::Hash;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, ThisError, PartialEq, Eq, Clone)]
pub enum Error {
    /// Buffer shorter than the encoding requires, or a tag byte mismatch.
    #[error("malformed node or value encoding")]
    Malformed,

    /// Namespace identifier of the wrong length.
    #[error("malformed namespace")]
    MalformedNamespace,

    /// Recomputed hash differs from the expected one.
    #[error("hash mismatch (expected: {expected}, got: {got})")]
    HashMismatch { expected: Hash, got: Hash },

    /// An internal node holds a child pointer that is not clean.
    #[error("node has dirty pointers")]
    DirtyPointer,

    /// A leaf node holds a value that is not clean.
    #[error("node has dirty value")]
    DirtyValue,

    /// A pointer could not be materialized into a node.
    #[error("node not found for hash {0}")]
    NodeNotFound(Hash),
}

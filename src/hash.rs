use std::fmt::{Display, Formatter};

use digest::Digest;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;

use crate::prelude::*;

/// A subtree or value digest, fixed at 32 bytes.
///
/// The all-zero hash is distinguished: it is the hash projection of a
/// missing child pointer and never the digest of actual content.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Hash([u8; 32]);

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Arbitrary for Hash {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        any::<[u8; 32]>().prop_map(Hash::new).boxed()
    }
}

impl Hash {
    /// Width of a hash in bytes.
    pub const SIZE: usize = 32;

    /// Creates a new Hash from any type that can be converted into [u8; 32].
    pub fn new<T: Into<[u8; 32]>>(data: T) -> Self {
        Hash(data.into())
    }

    pub fn from_slice(slice: &[u8]) -> Self {
        let mut inner = [0u8; Hash::SIZE];
        inner.copy_from_slice(slice);
        Hash(inner)
    }

    /// Returns the zero hash, the projection of a missing subtree.
    pub fn zero() -> Self {
        Self([0u8; Hash::SIZE])
    }

    pub fn digest<D: Digest>(data: &[u8]) -> Self {
        let mut hasher = D::new();
        hasher.update(data);
        Hash::from_slice(&hasher.finalize())
    }

    /// Digests the concatenation of `parts` without materializing it.
    pub fn digest_parts<D: Digest>(parts: &[&[u8]]) -> Self {
        let mut hasher = D::new();
        for part in parts {
            hasher.update(part);
        }
        Hash::from_slice(&hasher.finalize())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Hash::zero()
    }
}

impl From<[u8; 32]> for Hash {
    fn from(array: [u8; 32]) -> Self {
        Hash(array)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Hash {
    fn as_mut(&mut self) -> &mut [u8] {
        self.0.as_mut()
    }
}

impl From<Hash> for [u8; 32] {
    fn from(val: Hash) -> Self {
        val.0
    }
}

impl FromBytes for Hash {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Hash::SIZE {
            return Err(Error::Malformed);
        }
        let mut array = [0u8; Hash::SIZE];
        array.copy_from_slice(bytes);
        Ok(Hash(array))
    }
}

impl ToBytes for Hash {
    type Output = [u8; 32];

    fn to_bytes(&self) -> Self::Output {
        self.0
    }
}

crate::impl_associate_bytes_types!(Hash);

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Sha512_256;

    crate::test_to_bytes!(Hash);

    #[test]
    fn zero_is_not_a_content_digest() {
        assert_ne!(Hash::digest::<Sha512_256>(&[]), Hash::zero());
    }

    #[test]
    fn digest_parts_matches_concatenation() {
        let parts = Hash::digest_parts::<Sha512_256>(&[b"ab", b"", b"cd"]);
        let whole = Hash::digest::<Sha512_256>(b"abcd");
        assert_eq!(parts, whole);
    }
}

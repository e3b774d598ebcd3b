use std::fmt::{Display, Formatter};

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;

use crate::prelude::*;

/// Size of a chain namespace identifier in bytes.
pub const NAMESPACE_SIZE: usize = 32;

/// A chain namespace identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Namespace([u8; NAMESPACE_SIZE]);

impl Namespace {
    pub fn new(data: [u8; NAMESPACE_SIZE]) -> Self {
        Self(data)
    }

    /// Projects the namespace into a [`RuntimeId`].
    ///
    /// This is a bit-exact copy of the namespace bytes into the key
    /// shape, not a cryptographic derivation; the namespace bytes are
    /// used directly as the key material.
    pub fn to_runtime_id(&self) -> Result<RuntimeId> {
        RuntimeId::from_bytes(&self.to_bytes())
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Arbitrary for Namespace {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        any::<[u8; NAMESPACE_SIZE]>().prop_map(Namespace::new).boxed()
    }
}

impl AsRef<[u8]> for Namespace {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromBytes for Namespace {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NAMESPACE_SIZE {
            return Err(Error::MalformedNamespace);
        }
        let mut array = [0u8; NAMESPACE_SIZE];
        array.copy_from_slice(bytes);
        Ok(Namespace(array))
    }
}

impl ToBytes for Namespace {
    type Output = [u8; NAMESPACE_SIZE];

    fn to_bytes(&self) -> Self::Output {
        self.0
    }
}

crate::impl_associate_bytes_types!(Namespace);

/// A runtime identifier, shaped like a 32-byte public key.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RuntimeId([u8; 32]);

impl RuntimeId {
    pub fn new(data: [u8; 32]) -> Self {
        Self(data)
    }
}

impl Display for RuntimeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for RuntimeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Arbitrary for RuntimeId {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        any::<[u8; 32]>().prop_map(RuntimeId::new).boxed()
    }
}

impl AsRef<[u8]> for RuntimeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromBytes for RuntimeId {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(Error::Malformed);
        }
        let mut array = [0u8; 32];
        array.copy_from_slice(bytes);
        Ok(RuntimeId(array))
    }
}

impl ToBytes for RuntimeId {
    type Output = [u8; 32];

    fn to_bytes(&self) -> Self::Output {
        self.0
    }
}

crate::impl_associate_bytes_types!(RuntimeId);

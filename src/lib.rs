pub mod error;
pub mod hash;
pub mod namespace;
pub mod trie;

pub mod prelude {
    pub use digest::Digest;

    pub use crate::{
        error::{Error, Result},
        hash::Hash,
        namespace::{Namespace, RuntimeId},
        trie::{
            InternalNode, LeafNode, LruSlot, MapResolver, Node, NodeID, NodeResolver, Pointer,
            Value, TAG_INTERNAL, TAG_LEAF, TAG_NIL,
        },
        DefaultDigest, FromBytes, FromBytesSized, FromHex, ToBytes, ToHex,
    };
}

use crate::{error::Result, hash::Hash};
use digest::Digest;

/// Canonical digest of the state store, SHA-512/256.
pub type DefaultDigest = sha2::Sha512_256;

#[doc(hidden)]
/// This is a hidden module to make the macros defined on this crate available for the users.
pub mod __dependencies {
    pub use paste;
    pub use proptest;
}

#[macro_export]
macro_rules! impl_associate_bytes_types {
    ($type:ty) => {
        impl std::hash::Hash for $type {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.to_bytes().hash(state);
            }
        }

        impl $crate::FromHex for $type {
            fn from_hex(input: &str) -> Result<Self> {
                let bytes = hex::decode(input).map_err(|_| Error::Malformed)?;
                Self::from_bytes(&bytes)
            }
        }

        impl $crate::ToHex for $type {
            fn to_hex(&self) -> String {
                hex::encode(ToBytes::to_bytes(self))
            }
        }
    };
}

#[macro_export]
macro_rules! test_to_bytes {
    ($type:ty) => {
        $crate::__dependencies::paste::paste! {
            mod [<test_to_bytes_$type:snake>] {
                use $crate::__dependencies::proptest::prelude::*;

                use $crate::prelude::*;
                use super::$type;

                $crate::test_to_hex!($type);

                #[test]
                fn test_default_is_zero() {
                    assert!(<$type>::default().is_zero());
                }

                #[test_strategy::proptest(fork = false)]
                fn test_is_zero_is_same_as_zero_bytes(item: $type) {
                    prop_assert_eq!(
                        item.is_zero(),
                        item.to_bytes() == <$type>::default().to_bytes()
                    );
                }

                #[test_strategy::proptest(fork = false)]
                fn test_roundtrip(a: $type) {
                    prop_assert_eq!(a.clone(), <$type>::from_bytes(&a.to_bytes())?);
                }

                #[test_strategy::proptest(fork = false)]
                fn test_output_consistency(a: $type) {
                    prop_assert_eq!(a.to_bytes(), <$type>::from_bytes(&a.to_bytes())?.to_bytes());
                }

                #[test_strategy::proptest(fork = false)]
                fn test_is_different_on_different_objects(a: $type, b: $type) {
                    prop_assert_eq!(a == b, a.to_bytes() == b.to_bytes());
                }

                #[test_strategy::proptest(fork = false)]
                fn test_hash_consistency(a: $type, b: $type) {
                    prop_assert_eq!(
                        a == b,
                        a.hash_bytes::<$crate::DefaultDigest>()
                            == b.hash_bytes::<$crate::DefaultDigest>()
                    );
                }
            }
        }
    };
}

#[macro_export]
macro_rules! test_to_hex {
    ($type:ty) => {
        $crate::__dependencies::paste::paste! {
            mod [<test_to_hex_$type:snake>] {
                use $crate::__dependencies::proptest::prelude::*;

                use $crate::prelude::*;
                use super::$type;

                #[test_strategy::proptest(fork = false)]
                fn test_roundtrip(a: $type) {
                    prop_assert_eq!(a.clone(), <$type>::from_hex(&a.to_hex())?);
                }

                #[test_strategy::proptest(fork = false)]
                fn test_output_consistency(a: $type) {
                    prop_assert_eq!(a.to_hex(), <$type>::from_hex(&a.to_hex())?.to_hex());
                }

                #[test_strategy::proptest(fork = false)]
                fn test_is_different_on_different_objects(a: $type, b: $type) {
                    prop_assert_eq!(a == b, a.to_hex() == b.to_hex());
                }
            }
        }
    };
}

#[macro_export]
macro_rules! prop_assert_does_not_change {
    ($action: expr, $value: expr) => {
        let old_value = $value.clone();

        $action;

        prop_assert_eq!($value, old_value);
    };
}

pub trait FromBytes
where
    Self: Sized,
{
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

/// Decoding for values that know their own encoded length.
///
/// Unlike [`FromBytes`], the input may extend past the encoded value;
/// the number of bytes consumed is returned so decoders compose over a
/// single buffer.
pub trait FromBytesSized
where
    Self: Sized,
{
    fn from_bytes_sized(bytes: &[u8]) -> Result<(Self, usize)>;
}

pub trait ToBytes {
    type Output: AsRef<[u8]>;

    /// Converts the value to a representation in bytes.
    fn to_bytes(&self) -> Self::Output;

    /// Converts the value to a representation in bytes, as a vector.
    ///
    /// This is a convenience method, and automatically derived from `to_bytes`.
    fn to_bytes_vec(&self) -> Vec<u8> {
        self.to_bytes().as_ref().to_vec()
    }

    /// Hashes the value using the specified Digest algorithm.
    ///
    /// This is a convenience method, and automatically derived from `to_bytes`.
    fn hash_bytes<D: Digest>(&self) -> Hash {
        Hash::digest::<D>(self.to_bytes().as_ref())
    }

    /// Checks if the value (as bytes) is zero.
    ///
    /// This is useful for checking if a value is empty.
    fn is_zero(&self) -> bool {
        let len = self.to_bytes().as_ref().len();
        self.to_bytes_vec() == vec![0; len]
    }
}

pub trait FromHex
where
    Self: Sized,
{
    fn from_hex(hex: &str) -> Result<Self>;
}

pub trait ToHex {
    fn to_hex(&self) -> String;
}

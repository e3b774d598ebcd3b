use std::marker::PhantomData;

use digest::Digest;
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;

use crate::prelude::*;

use super::pointer::LruSlot;

/// An owned byte payload with its cached content digest.
///
/// The payload may be absent when the value is known only by hash, for
/// example after loading a hash-skeleton; the cached hash is then
/// asserted by whoever built the value. When `clean` is true and the
/// payload is present, `hash` equals the digest of the payload.
pub struct Value<D: Digest> {
    pub clean: bool,
    pub hash: Hash,
    pub bytes: Option<Vec<u8>>,
    /// Back-reference slot owned by the external LRU cache.
    pub lru_slot: LruSlot,
    _digest: PhantomData<D>,
}

impl<D: Digest> Value<D> {
    /// Creates a dirty value holding `bytes`.
    ///
    /// The cached hash is stale (zero) until `update_hash` runs.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            clean: false,
            hash: Hash::zero(),
            bytes: Some(bytes),
            lru_slot: LruSlot::default(),
            _digest: PhantomData,
        }
    }

    /// Creates a clean, payload-free value known only by `hash`.
    pub fn from_hash(hash: Hash) -> Self {
        Self {
            clean: true,
            hash,
            bytes: None,
            lru_slot: LruSlot::default(),
            _digest: PhantomData,
        }
    }

    /// Recomputes the cached hash from the payload.
    ///
    /// An absent payload digests as empty input. Does not mark the
    /// value as clean.
    pub fn update_hash(&mut self) {
        self.hash = Hash::digest::<D>(self.bytes.as_deref().unwrap_or(&[]));
    }

    /// Compares the payload against `other` without requiring residency.
    ///
    /// When the payload is absent, `other` is digested and compared
    /// against the cached hash instead.
    pub fn equal_bytes(&self, other: &[u8]) -> bool {
        match &self.bytes {
            Some(bytes) => bytes == other,
            None => Hash::digest::<D>(other) == self.hash,
        }
    }

    /// Compares two optional values.
    ///
    /// TODO: an absent side currently equals anything, mirroring the
    /// contract this layer was extracted from; tighten to require both
    /// sides absent once the sync layer stops relying on it.
    pub fn equal_opt(a: Option<&Self>, b: Option<&Self>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a.equal_bytes(b.bytes.as_deref().unwrap_or(&[])),
            _ => true,
        }
    }

    /// Makes a copy holding only hash references.
    ///
    /// # Panics
    ///
    /// Panics when the value is dirty; extraction feeds checkpoints and
    /// must never capture a stale hash.
    pub fn extract(&self) -> Self {
        if !self.clean {
            panic!("statetrie: extract called on dirty value");
        }

        Self {
            clean: true,
            hash: self.hash,
            bytes: self.bytes.clone(),
            lru_slot: LruSlot::default(),
            _digest: PhantomData,
        }
    }

    /// Checks that the payload digests to `expected`.
    pub fn validate(&mut self, expected: Hash) -> Result<()> {
        self.update_hash();

        if expected != self.hash {
            return Err(Error::HashMismatch {
                expected,
                got: self.hash,
            });
        }

        Ok(())
    }
}

impl<D: Digest> ToBytes for Value<D> {
    type Output = Vec<u8>;

    fn to_bytes(&self) -> Self::Output {
        let bytes = self.bytes.as_deref().unwrap_or(&[]);
        let mut data = Vec::with_capacity(4 + bytes.len());
        data.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        data.extend_from_slice(bytes);
        data
    }
}

impl<D: Digest> FromBytesSized for Value<D> {
    fn from_bytes_sized(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < 4 {
            return Err(Error::Malformed);
        }

        let len = u32::from_le_bytes(buf[..4].try_into().unwrap()) as usize;

        let mut value = Self {
            clean: true,
            hash: Hash::zero(),
            bytes: None,
            lru_slot: LruSlot::default(),
            _digest: PhantomData,
        };
        if len > 0 {
            // The length prefix is trusted; a shorter buffer zero-fills
            // the tail and `consumed` still reports the full extent.
            let mut bytes = vec![0u8; len];
            let avail = len.min(buf.len() - 4);
            bytes[..avail].copy_from_slice(&buf[4..4 + avail]);
            value.bytes = Some(bytes);
        }
        value.update_hash();

        Ok((value, 4 + len))
    }
}

impl<D: Digest> FromBytes for Value<D> {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_sized(bytes).map(|(value, _)| value)
    }
}

impl<D: Digest> Clone for Value<D> {
    fn clone(&self) -> Self {
        Self {
            clean: self.clean,
            hash: self.hash,
            bytes: self.bytes.clone(),
            lru_slot: self.lru_slot.clone(),
            _digest: PhantomData,
        }
    }
}

impl<D: Digest> std::fmt::Debug for Value<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Value")
            .field("clean", &self.clean)
            .field("hash", &self.hash)
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl<D: Digest + 'static> Arbitrary for Value<D> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        // An empty resident payload is excluded: it encodes as length
        // zero, which decodes back to an absent payload.
        proptest::option::of(vec(any::<u8>(), 1..256))
            .prop_map(|bytes| {
                let mut value = Self {
                    clean: false,
                    hash: Hash::zero(),
                    bytes,
                    lru_slot: LruSlot::default(),
                    _digest: PhantomData,
                };
                value.update_hash();
                value.clean = true;
                value
            })
            .boxed()
    }
}

use std::str::FromStr;

use alloy_primitives::hex;
use blst::min_pk::{AggregatePublicKey, PublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ssz::Encode;
use ssz_derive::{Decode, Encode};
use ssz_types::{FixedVector, typenum::U48};
use tree_hash_derive::TreeHash;

use crate::errors::BlsError;

/// Compressed G1 point identifying a validator key.
#[derive(Debug, PartialEq, Clone, Encode, Decode, TreeHash, Default, Eq, Hash)]
pub struct PubKey {
    pub inner: FixedVector<u8, U48>,
}

impl PubKey {
    pub fn to_bytes(&self) -> &[u8] {
        self.inner.iter().as_slice()
    }

    /// Decompress into a point on the curve, validating group membership.
    pub fn decompress(&self) -> Result<PublicKey, BlsError> {
        PublicKey::key_validate(self.to_bytes()).map_err(|_| BlsError::InvalidPublicKey)
    }

    /// Aggregate the given keys into a single compressed key.
    pub fn aggregate(pubkeys: &[&PubKey]) -> Result<PubKey, BlsError> {
        let decompressed = pubkeys
            .iter()
            .map(|pubkey| pubkey.decompress())
            .collect::<Result<Vec<_>, _>>()?;
        let refs = decompressed.iter().collect::<Vec<_>>();
        let aggregate = AggregatePublicKey::aggregate(&refs, false).map_err(BlsError::Blst)?;
        Ok(PubKey {
            inner: FixedVector::from(aggregate.to_public_key().compress().to_vec()),
        })
    }
}

impl Serialize for PubKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let val = format!("0x{}", hex::encode(self.inner.as_ssz_bytes()));
        serializer.serialize_str(&val)
    }
}

impl<'de> Deserialize<'de> for PubKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let result: String = Deserialize::deserialize(deserializer)?;
        let result = hex::decode(&result).map_err(serde::de::Error::custom)?;
        if result.len() != 48 {
            return Err(serde::de::Error::custom("pubkey must be 48 bytes"));
        }
        Ok(Self {
            inner: FixedVector::from(result),
        })
    }
}

impl FromStr for PubKey {
    type Err = BlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(clean_str).map_err(|_| BlsError::InvalidHexString)?;

        if bytes.len() != 48 {
            return Err(BlsError::InvalidByteLength);
        }

        Ok(PubKey {
            inner: FixedVector::from(bytes),
        })
    }
}

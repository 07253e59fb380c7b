use alloy_primitives::hex;
use blst::{
    BLST_ERROR,
    min_pk::{AggregateSignature, Signature},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ssz::Encode;
use ssz_derive::{Decode, Encode};
use ssz_types::{FixedVector, typenum::U96};
use tree_hash_derive::TreeHash;

use crate::{DST, errors::BlsError, pubkey::PubKey};

/// Compressed serialization of the G2 point at infinity.
const INFINITY_SIGNATURE: [u8; 96] = {
    let mut bytes = [0u8; 96];
    bytes[0] = 0xc0;
    bytes
};

#[derive(Debug, PartialEq, Clone, Encode, Decode, TreeHash, Default, Eq, Hash)]
pub struct BlsSignature {
    pub inner: FixedVector<u8, U96>,
}

impl BlsSignature {
    pub fn to_bytes(&self) -> &[u8] {
        self.inner.iter().as_slice()
    }

    /// The signature produced by aggregating zero signatures.
    pub fn infinity() -> Self {
        BlsSignature {
            inner: FixedVector::from(INFINITY_SIGNATURE.to_vec()),
        }
    }

    pub fn is_infinity(&self) -> bool {
        self.to_bytes() == INFINITY_SIGNATURE
    }

    pub fn decompress(&self) -> Result<Signature, BlsError> {
        Signature::uncompress(self.to_bytes()).map_err(|_| BlsError::InvalidSignature)
    }

    /// Verify this signature over ``message`` under a single public key.
    pub fn verify(&self, pubkey: &PubKey, message: &[u8]) -> Result<bool, BlsError> {
        let signature = self.decompress()?;
        let pubkey = pubkey.decompress()?;
        Ok(signature.verify(true, message, DST, &[], &pubkey, false) == BLST_ERROR::BLST_SUCCESS)
    }

    /// Verify this signature over a single ``message`` signed by the aggregate of ``pubkeys``.
    pub fn fast_aggregate_verify<'a, P>(&self, pubkeys: P, message: &[u8]) -> Result<bool, BlsError>
    where
        P: AsRef<[&'a PubKey]>,
    {
        let signature = self.decompress()?;
        let decompressed = pubkeys
            .as_ref()
            .iter()
            .map(|pubkey| pubkey.decompress())
            .collect::<Result<Vec<_>, _>>()?;
        let refs = decompressed.iter().collect::<Vec<_>>();
        Ok(signature.fast_aggregate_verify(true, message, DST, &refs) == BLST_ERROR::BLST_SUCCESS)
    }

    /// As ``fast_aggregate_verify``, except the empty participant set is valid
    /// iff the signature is the point at infinity.
    pub fn eth_fast_aggregate_verify<'a, P>(
        &self,
        pubkeys: P,
        message: &[u8],
    ) -> Result<bool, BlsError>
    where
        P: AsRef<[&'a PubKey]>,
    {
        if pubkeys.as_ref().is_empty() {
            return Ok(self.is_infinity());
        }
        self.fast_aggregate_verify(pubkeys, message)
    }

    /// Aggregate the given signatures into one.
    pub fn aggregate(signatures: &[&BlsSignature]) -> Result<BlsSignature, BlsError> {
        let decompressed = signatures
            .iter()
            .map(|signature| signature.decompress())
            .collect::<Result<Vec<_>, _>>()?;
        let refs = decompressed.iter().collect::<Vec<_>>();
        let aggregate = AggregateSignature::aggregate(&refs, false).map_err(BlsError::Blst)?;
        Ok(BlsSignature {
            inner: FixedVector::from(aggregate.to_signature().compress().to_vec()),
        })
    }
}

impl Serialize for BlsSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let val = format!("0x{}", hex::encode(self.inner.as_ssz_bytes()));
        serializer.serialize_str(&val)
    }
}

impl<'de> Deserialize<'de> for BlsSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let result: String = Deserialize::deserialize(deserializer)?;
        let result = hex::decode(&result).map_err(serde::de::Error::custom)?;
        if result.len() != 96 {
            return Err(serde::de::Error::custom("signature must be 96 bytes"));
        }
        Ok(Self {
            inner: FixedVector::from(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::private_key::PrivateKey;

    #[test]
    fn sign_and_verify_roundtrip() {
        let private_key = PrivateKey::deterministic(7);
        let pubkey = private_key.public_key().unwrap();
        let signature = private_key.sign(b"cairn test message").unwrap();

        assert!(signature.verify(&pubkey, b"cairn test message").unwrap());
        assert!(!signature.verify(&pubkey, b"a different message").unwrap());
    }

    #[test]
    fn aggregate_verifies_under_all_signers() {
        let message = b"shared message";
        let keys = (0..4).map(PrivateKey::deterministic).collect::<Vec<_>>();
        let pubkeys = keys
            .iter()
            .map(|key| key.public_key().unwrap())
            .collect::<Vec<_>>();
        let signatures = keys
            .iter()
            .map(|key| key.sign(message).unwrap())
            .collect::<Vec<_>>();

        let aggregate =
            BlsSignature::aggregate(&signatures.iter().collect::<Vec<_>>()).unwrap();
        let pubkey_refs = pubkeys.iter().collect::<Vec<_>>();

        assert!(aggregate.fast_aggregate_verify(&pubkey_refs[..], message).unwrap());
        assert!(
            !aggregate
                .fast_aggregate_verify(&pubkey_refs[..3], message)
                .unwrap()
        );
    }

    #[test]
    fn empty_aggregate_requires_infinity() {
        let empty: Vec<&PubKey> = vec![];
        assert!(
            BlsSignature::infinity()
                .eth_fast_aggregate_verify(&empty[..], b"msg")
                .unwrap()
        );
        assert!(
            !BlsSignature::default()
                .eth_fast_aggregate_verify(&empty[..], b"msg")
                .unwrap()
        );
    }
}

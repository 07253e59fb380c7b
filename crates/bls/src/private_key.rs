use alloy_primitives::B256;
use blst::min_pk::SecretKey;
use ethereum_hashing::hash_fixed;
use ssz_derive::{Decode, Encode};
use ssz_types::FixedVector;
use tree_hash_derive::TreeHash;

use crate::{DST, errors::BlsError, pubkey::PubKey, signature::BlsSignature};

/// Secret scalar. Only used by tests and the interop helpers; consensus
/// processing never holds key material.
#[derive(Debug, PartialEq, Clone, Encode, Decode, TreeHash, Default, Eq, Hash)]
pub struct PrivateKey {
    pub inner: B256,
}

impl PrivateKey {
    /// Derive the well-known throwaway key for ``index``. Not secret.
    pub fn deterministic(index: u64) -> PrivateKey {
        let ikm = hash_fixed(&index.to_le_bytes());
        let secret_key = SecretKey::key_gen(&ikm, &[])
            .expect("32 bytes of key material always yield a valid scalar");
        PrivateKey {
            inner: B256::from(secret_key.to_bytes()),
        }
    }

    fn secret_key(&self) -> Result<SecretKey, BlsError> {
        SecretKey::from_bytes(self.inner.as_slice()).map_err(|_| BlsError::InvalidSecretKey)
    }

    pub fn public_key(&self) -> Result<PubKey, BlsError> {
        Ok(PubKey {
            inner: FixedVector::from(self.secret_key()?.sk_to_pk().compress().to_vec()),
        })
    }

    pub fn sign(&self, message: &[u8]) -> Result<BlsSignature, BlsError> {
        Ok(BlsSignature {
            inner: FixedVector::from(
                self.secret_key()?.sign(message, DST, &[]).compress().to_vec(),
            ),
        })
    }
}

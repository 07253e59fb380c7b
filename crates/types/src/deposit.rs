use cairn_bls::{BlsSignature, PubKey};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::{FixedVector, typenum::U33};
use tree_hash_derive::TreeHash;

use crate::primitives::{Gwei, Root};

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct DepositData {
    pub pubkey: PubKey,
    pub withdrawal_credentials: Root,
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: Gwei,

    /// Proof of possession; not checked by the deposit contract.
    pub signature: BlsSignature,
}

/// The message the proof-of-possession signature covers.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct DepositMessage {
    pub pubkey: PubKey,
    pub withdrawal_credentials: Root,
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: Gwei,
}

impl From<&DepositData> for DepositMessage {
    fn from(data: &DepositData) -> Self {
        DepositMessage {
            pubkey: data.pubkey.clone(),
            withdrawal_credentials: data.withdrawal_credentials,
            amount: data.amount,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Deposit {
    /// Branch in the deposit tree, plus the length mix-in level.
    pub proof: FixedVector<Root, U33>,
    pub data: DepositData,
}

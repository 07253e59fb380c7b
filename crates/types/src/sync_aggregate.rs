use cairn_bls::BlsSignature;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::BitVector;
use tree_hash_derive::TreeHash;

use crate::preset::Preset;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "P: Preset")]
pub struct SyncAggregate<P: Preset> {
    pub sync_committee_bits: BitVector<P::SyncCommitteeSize>,
    pub sync_committee_signature: BlsSignature,
}

impl<P: Preset> SyncAggregate<P> {
    /// The aggregate carrying no participants.
    pub fn empty() -> Self {
        SyncAggregate {
            sync_committee_bits: BitVector::new(),
            sync_committee_signature: BlsSignature::infinity(),
        }
    }
}

use cairn_bls::PubKey;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use ssz_types::FixedVector;
use tree_hash_derive::TreeHash;

use crate::preset::Preset;

#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
#[serde(bound = "P: Preset")]
pub struct SyncCommittee<P: Preset> {
    pub pubkeys: FixedVector<PubKey, P::SyncCommitteeSize>,
    pub aggregate_pubkey: PubKey,
}

use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

use crate::{
    checkpoint::Checkpoint,
    primitives::{CommitteeIndex, Root, Slot},
};

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct AttestationData {
    #[serde(with = "serde_utils::quoted_u64")]
    pub slot: Slot,
    #[serde(with = "serde_utils::quoted_u64")]
    pub index: CommitteeIndex,

    /// LMD GHOST vote.
    pub beacon_block_root: Root,

    /// FFG vote.
    pub source: Checkpoint,
    pub target: Checkpoint,
}

impl AttestationData {
    /// Double vote or surround vote.
    pub fn is_slashable_with(&self, other: &AttestationData) -> bool {
        (self != other && self.target.epoch == other.target.epoch)
            || (self.source.epoch < other.source.epoch && other.target.epoch < self.target.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(source: u64, target: u64) -> AttestationData {
        AttestationData {
            source: Checkpoint {
                epoch: source,
                root: Root::ZERO,
            },
            target: Checkpoint {
                epoch: target,
                root: Root::ZERO,
            },
            ..AttestationData::default()
        }
    }

    #[test]
    fn double_vote_is_slashable() {
        let mut a = data(1, 2);
        let b = data(1, 2);
        a.beacon_block_root = Root::repeat_byte(1);
        assert!(a.is_slashable_with(&b));
    }

    #[test]
    fn surround_vote_is_slashable_one_way() {
        let outer = data(1, 5);
        let inner = data(2, 4);
        assert!(outer.is_slashable_with(&inner));
        assert!(!inner.is_slashable_with(&outer));
    }

    #[test]
    fn disjoint_votes_are_not_slashable() {
        assert!(!data(1, 2).is_slashable_with(&data(2, 3)));
    }
}

use cairn_bls::PubKey;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

use crate::{
    constants::{ETH1_ADDRESS_WITHDRAWAL_PREFIX, FAR_FUTURE_EPOCH},
    primitives::{Epoch, Gwei, Root},
    spec::Spec,
};

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Validator {
    pub pubkey: PubKey,

    /// Commitment to the withdrawal destination.
    pub withdrawal_credentials: Root,

    /// Balance at stake, quantized to increments.
    #[serde(with = "serde_utils::quoted_u64")]
    pub effective_balance: Gwei,
    pub slashed: bool,

    /// When criteria for activation were met.
    #[serde(with = "serde_utils::quoted_u64")]
    pub activation_eligibility_epoch: Epoch,
    #[serde(with = "serde_utils::quoted_u64")]
    pub activation_epoch: Epoch,
    #[serde(with = "serde_utils::quoted_u64")]
    pub exit_epoch: Epoch,

    /// When the validator can withdraw funds.
    #[serde(with = "serde_utils::quoted_u64")]
    pub withdrawable_epoch: Epoch,
}

impl Validator {
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    pub fn is_slashable_at(&self, epoch: Epoch) -> bool {
        !self.slashed && self.activation_epoch <= epoch && epoch < self.withdrawable_epoch
    }

    /// Check for an 0x01 prefixed "eth1" withdrawal credential.
    pub fn has_eth1_withdrawal_credential(&self) -> bool {
        self.withdrawal_credentials[0] == ETH1_ADDRESS_WITHDRAWAL_PREFIX
    }

    pub fn is_fully_withdrawable_at(&self, balance: Gwei, epoch: Epoch) -> bool {
        self.has_eth1_withdrawal_credential() && self.withdrawable_epoch <= epoch && balance > 0
    }

    pub fn is_partially_withdrawable(&self, spec: &Spec, balance: Gwei) -> bool {
        self.has_eth1_withdrawal_credential()
            && self.effective_balance == spec.phase0.max_effective_balance
            && balance > spec.phase0.max_effective_balance
    }

    /// Construct the registry entry for a deposit of ``amount``.
    pub fn from_deposit(
        spec: &Spec,
        pubkey: PubKey,
        withdrawal_credentials: Root,
        amount: Gwei,
    ) -> Validator {
        let increment = spec.phase0.effective_balance_increment;
        Validator {
            pubkey,
            withdrawal_credentials,
            effective_balance: (amount - amount % increment).min(spec.phase0.max_effective_balance),
            slashed: false,
            activation_eligibility_epoch: FAR_FUTURE_EPOCH,
            activation_epoch: FAR_FUTURE_EPOCH,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(activation_epoch: Epoch, exit_epoch: Epoch) -> Validator {
        Validator {
            pubkey: PubKey::default(),
            withdrawal_credentials: Root::ZERO,
            effective_balance: 32_000_000_000,
            slashed: false,
            activation_eligibility_epoch: 0,
            activation_epoch,
            exit_epoch,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
        }
    }

    #[test]
    fn activity_window_is_half_open() {
        let v = validator(3, 10);
        assert!(!v.is_active_at(2));
        assert!(v.is_active_at(3));
        assert!(v.is_active_at(9));
        assert!(!v.is_active_at(10));
    }

    #[test]
    fn slashed_validator_is_not_slashable_again() {
        let mut v = validator(0, FAR_FUTURE_EPOCH);
        assert!(v.is_slashable_at(5));
        v.slashed = true;
        assert!(!v.is_slashable_at(5));
    }

    #[test]
    fn deposit_effective_balance_is_quantized_and_capped() {
        let spec = Spec::mainnet();
        let v = Validator::from_deposit(
            &spec,
            PubKey::default(),
            Root::ZERO,
            17_500_000_123,
        );
        assert_eq!(v.effective_balance, 17_000_000_000);

        let capped = Validator::from_deposit(&spec, PubKey::default(), Root::ZERO, 99_000_000_000);
        assert_eq!(capped.effective_balance, 32_000_000_000);
    }
}

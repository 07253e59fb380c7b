//! Per-epoch derived state: shuffled committees, proposer indices, the
//! pubkey reverse map and a flat effective-balance table. Everything here is
//! recomputable from the state; the context only amortizes that work across
//! a transition. It holds compact copies and never borrows from the state.

use std::collections::HashMap;

use cairn_bls::PubKey;
use cairn_types::{
    BeaconState, CommitteeIndex, Epoch, Gwei, Preset, Root, Slot, Spec, ValidatorIndex,
    constants::{DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, MAX_RANDOM_BYTE},
    misc::{compute_epoch_at_slot, compute_start_slot_at_epoch},
};
use ethereum_hashing::{hash, hash_fixed};

use crate::{
    Error,
    error::ensure_rule,
    shuffle::{compute_shuffled_index, shuffle_list},
};

/// One epoch's committee layout.
#[derive(Debug, Clone)]
pub struct ShufflingEpoch {
    pub epoch: Epoch,
    /// Active validator indices in registry order.
    pub active_indices: Vec<ValidatorIndex>,
    /// The same indices in shuffled order; committees are slices of this.
    pub shuffling: Vec<ValidatorIndex>,
    pub committees_per_slot: u64,
}

impl ShufflingEpoch {
    pub fn new<P: Preset>(
        spec: &Spec,
        state: &BeaconState<P>,
        epoch: Epoch,
    ) -> Result<Self, Error> {
        let active_indices = state.get_active_validator_indices(epoch);
        let committees_per_slot = state.get_committee_count_per_slot(spec, epoch);
        let seed = state.get_seed(spec, epoch, DOMAIN_BEACON_ATTESTER);
        let shuffling = shuffle_list(
            active_indices.clone(),
            spec.phase0.shuffle_round_count,
            seed,
            false,
        )
        .ok_or_else(|| Error::Internal(format!("cannot shuffle epoch {epoch}")))?;

        Ok(ShufflingEpoch {
            epoch,
            active_indices,
            shuffling,
            committees_per_slot,
        })
    }

    /// Committee members for ``(slot, committee_index)`` within this epoch.
    pub fn committee<P: Preset>(
        &self,
        slot: Slot,
        index: CommitteeIndex,
    ) -> Result<&[ValidatorIndex], Error> {
        ensure_rule!(
            compute_epoch_at_slot::<P>(slot) == self.epoch,
            "slot {slot} is not in epoch {}",
            self.epoch
        );
        ensure_rule!(
            index < self.committees_per_slot,
            "committee index {index} out of range ({} per slot)",
            self.committees_per_slot
        );

        let committees_per_epoch = self.committees_per_slot * P::slots_per_epoch();
        let position = (slot % P::slots_per_epoch()) * self.committees_per_slot + index;
        let count = self.shuffling.len() as u64;
        let start = (count * position / committees_per_epoch) as usize;
        let end = (count * (position + 1) / committees_per_epoch) as usize;
        Ok(&self.shuffling[start..end])
    }
}

/// Cache of derived per-epoch values, rotated at every epoch boundary.
pub struct EpochsContext {
    pub pubkey_to_index: HashMap<PubKey, ValidatorIndex>,
    /// Effective balance per validator, as of the context's current epoch.
    pub effective_balances: Vec<Gwei>,
    pub previous: ShufflingEpoch,
    pub current: ShufflingEpoch,
    pub next: ShufflingEpoch,
    /// Proposer per slot of the current epoch.
    pub proposers: Vec<ValidatorIndex>,
}

impl EpochsContext {
    pub fn new<P: Preset>(spec: &Spec, state: &BeaconState<P>) -> Result<Self, Error> {
        let current_epoch = state.current_epoch();
        let previous = ShufflingEpoch::new(spec, state, state.previous_epoch())?;
        let current = ShufflingEpoch::new(spec, state, current_epoch)?;
        let next = ShufflingEpoch::new(spec, state, current_epoch + 1)?;

        let mut context = EpochsContext {
            pubkey_to_index: HashMap::with_capacity(state.validators().len()),
            effective_balances: Vec::new(),
            previous,
            current,
            next,
            proposers: Vec::new(),
        };
        context.sync_pubkeys(state);
        context.refresh_effective_balances(state);
        context.proposers = context.compute_proposers(spec, state, current_epoch)?;
        Ok(context)
    }

    /// Advance to the state's (new) current epoch: the old current epoch
    /// becomes historical, the precomputed next becomes current, and the
    /// following epoch's shuffling is derived fresh.
    pub fn rotate_epoch<P: Preset>(
        &mut self,
        spec: &Spec,
        state: &BeaconState<P>,
    ) -> Result<(), Error> {
        let epoch = state.current_epoch();
        if self.next.epoch != epoch {
            return Err(Error::Internal(format!(
                "epochs context is at epoch {}, state moved to {epoch}",
                self.current.epoch
            )));
        }

        self.previous = std::mem::replace(
            &mut self.current,
            std::mem::replace(&mut self.next, ShufflingEpoch::new(spec, state, epoch + 1)?),
        );
        self.sync_pubkeys(state);
        self.refresh_effective_balances(state);
        self.proposers = self.compute_proposers(spec, state, epoch)?;
        Ok(())
    }

    /// Record a freshly deposited validator.
    pub fn add_validator(&mut self, pubkey: PubKey, effective_balance: Gwei) {
        let index = self.effective_balances.len() as u64;
        self.pubkey_to_index.insert(pubkey, index);
        self.effective_balances.push(effective_balance);
    }

    pub fn validator_index(&self, pubkey: &PubKey) -> Option<ValidatorIndex> {
        self.pubkey_to_index.get(pubkey).copied()
    }

    /// Committee for ``(slot, index)``; the slot must fall in one of the
    /// three cached epochs.
    pub fn get_beacon_committee<P: Preset>(
        &self,
        slot: Slot,
        index: CommitteeIndex,
    ) -> Result<&[ValidatorIndex], Error> {
        self.shuffling_at::<P>(compute_epoch_at_slot::<P>(slot))?
            .committee::<P>(slot, index)
    }

    pub fn get_committee_count_per_slot<P: Preset>(&self, epoch: Epoch) -> Result<u64, Error> {
        Ok(self.shuffling_at::<P>(epoch)?.committees_per_slot)
    }

    /// Proposer for a slot of the current epoch.
    pub fn get_beacon_proposer<P: Preset>(&self, slot: Slot) -> Result<ValidatorIndex, Error> {
        let epoch = compute_epoch_at_slot::<P>(slot);
        ensure_rule!(
            epoch == self.current.epoch,
            "proposer requested for slot {slot} outside the current epoch {}",
            self.current.epoch
        );
        self.proposers
            .get((slot % P::slots_per_epoch()) as usize)
            .copied()
            .ok_or_else(|| Error::Internal(format!("no proposer cached for slot {slot}")))
    }

    fn shuffling_at<P: Preset>(&self, epoch: Epoch) -> Result<&ShufflingEpoch, Error> {
        if epoch == self.previous.epoch {
            Ok(&self.previous)
        } else if epoch == self.current.epoch {
            Ok(&self.current)
        } else if epoch == self.next.epoch {
            Ok(&self.next)
        } else {
            Err(Error::Rule(format!(
                "epoch {epoch} is outside the cached shuffling window"
            )))
        }
    }

    fn sync_pubkeys<P: Preset>(&mut self, state: &BeaconState<P>) {
        let validators = state.validators();
        for index in self.pubkey_to_index.len()..validators.len() {
            self.pubkey_to_index
                .insert(validators[index].pubkey.clone(), index as u64);
        }
    }

    fn refresh_effective_balances<P: Preset>(&mut self, state: &BeaconState<P>) {
        self.effective_balances.clear();
        self.effective_balances.extend(
            state
                .validators()
                .iter()
                .map(|validator| validator.effective_balance),
        );
    }

    /// Effective-balance-weighted proposer sampling for every slot of
    /// ``epoch``. A registry with no active validators yields no proposers;
    /// lookups against it fail instead.
    fn compute_proposers<P: Preset>(
        &self,
        spec: &Spec,
        state: &BeaconState<P>,
        epoch: Epoch,
    ) -> Result<Vec<ValidatorIndex>, Error> {
        let indices = &self.shuffling_at::<P>(epoch)?.active_indices;
        if indices.is_empty() {
            return Ok(Vec::new());
        }
        let epoch_seed = state.get_seed(spec, epoch, DOMAIN_BEACON_PROPOSER);

        let start_slot = compute_start_slot_at_epoch::<P>(epoch);
        (start_slot..start_slot + P::slots_per_epoch())
            .map(|slot| {
                let seed = Root::from(hash_fixed(
                    &[epoch_seed.as_slice(), &slot.to_le_bytes()].concat(),
                ));
                self.compute_proposer_index(spec, indices, seed)
            })
            .collect()
    }

    /// The "random byte" acceptance loop: sample candidates through the
    /// shuffle, accept proportionally to effective balance.
    fn compute_proposer_index(
        &self,
        spec: &Spec,
        indices: &[ValidatorIndex],
        seed: Root,
    ) -> Result<ValidatorIndex, Error> {
        if indices.is_empty() {
            return Err(Error::Internal(
                "proposer selection over an empty active set".into(),
            ));
        }

        let total = indices.len();
        let mut i: usize = 0;
        loop {
            let shuffled = compute_shuffled_index(
                i % total,
                total,
                seed,
                spec.phase0.shuffle_round_count,
            )
            .ok_or_else(|| Error::Internal("shuffled index out of range".into()))?;
            let candidate = indices[shuffled];

            let random_bytes = hash(&[seed.as_slice(), &((i / 32) as u64).to_le_bytes()].concat());
            let random_byte = random_bytes[i % 32] as u64;

            let effective_balance = self
                .effective_balances
                .get(candidate as usize)
                .copied()
                .ok_or_else(|| {
                    Error::Internal(format!("no effective balance for validator {candidate}"))
                })?;

            if effective_balance * MAX_RANDOM_BYTE
                >= spec.phase0.max_effective_balance * random_byte
            {
                return Ok(candidate);
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn committee_slices_partition_the_shuffling() {
        let shuffling: Vec<u64> = (0..37).rev().collect();
        let epoch = ShufflingEpoch {
            epoch: 3,
            active_indices: (0..37).collect(),
            shuffling: shuffling.clone(),
            committees_per_slot: 1,
        };

        // Minimal preset: 8 slots per epoch, one committee each.
        let mut seen = Vec::new();
        for slot in 24..32 {
            let members = epoch
                .committee::<cairn_types::Minimal>(slot, 0)
                .unwrap()
                .to_vec();
            assert!(!members.is_empty());
            seen.extend(members);
        }
        assert_eq!(seen, shuffling);
    }

    #[test]
    fn committee_outside_epoch_is_rejected() {
        let epoch = ShufflingEpoch {
            epoch: 3,
            active_indices: (0..8).collect(),
            shuffling: (0..8).collect(),
            committees_per_slot: 1,
        };
        assert!(epoch.committee::<cairn_types::Minimal>(8, 0).is_err());
        assert!(epoch.committee::<cairn_types::Minimal>(24, 1).is_err());
    }
}

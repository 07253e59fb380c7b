//! Fork-combined views over the per-fork containers. The state transition
//! works against these enums and matches on variants only where fork
//! behavior actually diverges.

use std::sync::Arc;

use cairn_bls::{BlsSignature, PubKey};
use ethereum_hashing::hash_fixed;
use ssz::{Decode, Encode};
use ssz_types::{BitVector, FixedVector, VariableList};
use tree_hash::TreeHash;

use crate::{
    altair, bellatrix,
    attestation::Attestation,
    attester_slashing::AttesterSlashing,
    beacon_block_header::BeaconBlockHeader,
    bls_to_execution_change::SignedBLSToExecutionChange,
    capella,
    checkpoint::Checkpoint,
    constants::FAR_FUTURE_EPOCH,
    deneb,
    deposit::Deposit,
    errors::StateError,
    eth_1_data::Eth1Data,
    fork::Fork,
    historical::HistoricalSummary,
    misc::{compute_activation_exit_epoch, compute_domain, compute_epoch_at_slot},
    pending_attestation::PendingAttestation,
    phase0,
    preset::Preset,
    primitives::{
        DepositIndex, Domain, DomainType, Epoch, Gwei, KzgCommitment, ParticipationFlags, Root,
        Slot, Timestamp, ValidatorIndex,
    },
    proposer_slashing::ProposerSlashing,
    spec::{ForkName, Spec},
    sync_aggregate::SyncAggregate,
    sync_committee::SyncCommittee,
    validator::Validator,
    voluntary_exit::SignedVoluntaryExit,
};

#[derive(Debug, PartialEq, Clone)]
pub enum BeaconState<P: Preset> {
    Phase0(phase0::BeaconState<P>),
    Altair(altair::BeaconState<P>),
    Bellatrix(bellatrix::BeaconState<P>),
    Capella(capella::BeaconState<P>),
    Deneb(deneb::BeaconState<P>),
}

#[derive(Debug, PartialEq, Clone)]
pub enum SignedBeaconBlock<P: Preset> {
    Phase0(phase0::SignedBeaconBlock<P>),
    Altair(altair::SignedBeaconBlock<P>),
    Bellatrix(bellatrix::SignedBeaconBlock<P>),
    Capella(capella::SignedBeaconBlock<P>),
    Deneb(deneb::SignedBeaconBlock<P>),
}

macro_rules! map_state {
    ($self:expr, $state:ident => $body:expr) => {
        match $self {
            BeaconState::Phase0($state) => $body,
            BeaconState::Altair($state) => $body,
            BeaconState::Bellatrix($state) => $body,
            BeaconState::Capella($state) => $body,
            BeaconState::Deneb($state) => $body,
        }
    };
}

macro_rules! state_copy_field {
    ($name:ident, $mut_name:ident, $ty:ty) => {
        pub fn $name(&self) -> $ty {
            map_state!(self, state => state.$name)
        }

        pub fn $mut_name(&mut self) -> &mut $ty {
            map_state!(self, state => &mut state.$name)
        }
    };
}

macro_rules! state_ref_field {
    ($name:ident, $mut_name:ident, $ty:ty) => {
        pub fn $name(&self) -> &$ty {
            map_state!(self, state => &state.$name)
        }

        pub fn $mut_name(&mut self) -> &mut $ty {
            map_state!(self, state => &mut state.$name)
        }
    };
}

macro_rules! state_post_altair_field {
    ($name:ident, $mut_name:ident, $ty:ty) => {
        pub fn $name(&self) -> Result<&$ty, StateError> {
            match self {
                BeaconState::Phase0(_) => Err(StateError::IncompatibleFork(stringify!($name))),
                BeaconState::Altair(state) => Ok(&state.$name),
                BeaconState::Bellatrix(state) => Ok(&state.$name),
                BeaconState::Capella(state) => Ok(&state.$name),
                BeaconState::Deneb(state) => Ok(&state.$name),
            }
        }

        pub fn $mut_name(&mut self) -> Result<&mut $ty, StateError> {
            match self {
                BeaconState::Phase0(_) => Err(StateError::IncompatibleFork(stringify!($name))),
                BeaconState::Altair(state) => Ok(&mut state.$name),
                BeaconState::Bellatrix(state) => Ok(&mut state.$name),
                BeaconState::Capella(state) => Ok(&mut state.$name),
                BeaconState::Deneb(state) => Ok(&mut state.$name),
            }
        }
    };
}

macro_rules! state_post_capella_field {
    ($name:ident, $mut_name:ident, $ty:ty) => {
        pub fn $name(&self) -> Result<&$ty, StateError> {
            match self {
                BeaconState::Capella(state) => Ok(&state.$name),
                BeaconState::Deneb(state) => Ok(&state.$name),
                _ => Err(StateError::IncompatibleFork(stringify!($name))),
            }
        }

        pub fn $mut_name(&mut self) -> Result<&mut $ty, StateError> {
            match self {
                BeaconState::Capella(state) => Ok(&mut state.$name),
                BeaconState::Deneb(state) => Ok(&mut state.$name),
                _ => Err(StateError::IncompatibleFork(stringify!($name))),
            }
        }
    };
}

impl<P: Preset> BeaconState<P> {
    pub fn fork_name(&self) -> ForkName {
        match self {
            BeaconState::Phase0(_) => ForkName::Phase0,
            BeaconState::Altair(_) => ForkName::Altair,
            BeaconState::Bellatrix(_) => ForkName::Bellatrix,
            BeaconState::Capella(_) => ForkName::Capella,
            BeaconState::Deneb(_) => ForkName::Deneb,
        }
    }

    state_copy_field!(genesis_time, genesis_time_mut, Timestamp);
    state_copy_field!(genesis_validators_root, genesis_validators_root_mut, Root);
    state_copy_field!(slot, slot_mut, Slot);
    state_copy_field!(fork, fork_mut, Fork);
    state_copy_field!(eth1_deposit_index, eth1_deposit_index_mut, DepositIndex);
    state_copy_field!(
        previous_justified_checkpoint,
        previous_justified_checkpoint_mut,
        Checkpoint
    );
    state_copy_field!(
        current_justified_checkpoint,
        current_justified_checkpoint_mut,
        Checkpoint
    );
    state_copy_field!(finalized_checkpoint, finalized_checkpoint_mut, Checkpoint);

    state_ref_field!(latest_block_header, latest_block_header_mut, BeaconBlockHeader);
    state_ref_field!(
        block_roots,
        block_roots_mut,
        FixedVector<Root, P::SlotsPerHistoricalRoot>
    );
    state_ref_field!(
        state_roots,
        state_roots_mut,
        FixedVector<Root, P::SlotsPerHistoricalRoot>
    );
    state_ref_field!(
        historical_roots,
        historical_roots_mut,
        VariableList<Root, P::HistoricalRootsLimit>
    );
    state_ref_field!(eth1_data, eth1_data_mut, Eth1Data);
    state_ref_field!(
        eth1_data_votes,
        eth1_data_votes_mut,
        VariableList<Eth1Data, P::SlotsPerEth1VotingPeriod>
    );
    state_ref_field!(
        validators,
        validators_mut,
        VariableList<Validator, P::ValidatorRegistryLimit>
    );
    state_ref_field!(balances, balances_mut, VariableList<Gwei, P::ValidatorRegistryLimit>);
    state_ref_field!(
        randao_mixes,
        randao_mixes_mut,
        FixedVector<Root, P::EpochsPerHistoricalVector>
    );
    state_ref_field!(
        slashings,
        slashings_mut,
        FixedVector<Gwei, P::EpochsPerSlashingsVector>
    );
    state_ref_field!(
        justification_bits,
        justification_bits_mut,
        BitVector<P::JustificationBitsLength>
    );

    state_post_altair_field!(
        previous_epoch_participation,
        previous_epoch_participation_mut,
        VariableList<ParticipationFlags, P::ValidatorRegistryLimit>
    );
    state_post_altair_field!(
        current_epoch_participation,
        current_epoch_participation_mut,
        VariableList<ParticipationFlags, P::ValidatorRegistryLimit>
    );
    state_post_altair_field!(
        inactivity_scores,
        inactivity_scores_mut,
        VariableList<u64, P::ValidatorRegistryLimit>
    );
    state_post_altair_field!(
        current_sync_committee,
        current_sync_committee_mut,
        Arc<SyncCommittee<P>>
    );
    state_post_altair_field!(next_sync_committee, next_sync_committee_mut, Arc<SyncCommittee<P>>);

    state_post_capella_field!(next_withdrawal_index, next_withdrawal_index_mut, u64);
    state_post_capella_field!(
        next_withdrawal_validator_index,
        next_withdrawal_validator_index_mut,
        ValidatorIndex
    );
    state_post_capella_field!(
        historical_summaries,
        historical_summaries_mut,
        VariableList<HistoricalSummary, P::HistoricalRootsLimit>
    );

    pub fn previous_epoch_attestations(
        &self,
    ) -> Result<&VariableList<PendingAttestation<P>, P::MaxPendingAttestations>, StateError> {
        match self {
            BeaconState::Phase0(state) => Ok(&state.previous_epoch_attestations),
            _ => Err(StateError::IncompatibleFork("previous_epoch_attestations")),
        }
    }

    pub fn previous_epoch_attestations_mut(
        &mut self,
    ) -> Result<&mut VariableList<PendingAttestation<P>, P::MaxPendingAttestations>, StateError>
    {
        match self {
            BeaconState::Phase0(state) => Ok(&mut state.previous_epoch_attestations),
            _ => Err(StateError::IncompatibleFork("previous_epoch_attestations")),
        }
    }

    pub fn current_epoch_attestations(
        &self,
    ) -> Result<&VariableList<PendingAttestation<P>, P::MaxPendingAttestations>, StateError> {
        match self {
            BeaconState::Phase0(state) => Ok(&state.current_epoch_attestations),
            _ => Err(StateError::IncompatibleFork("current_epoch_attestations")),
        }
    }

    pub fn current_epoch_attestations_mut(
        &mut self,
    ) -> Result<&mut VariableList<PendingAttestation<P>, P::MaxPendingAttestations>, StateError>
    {
        match self {
            BeaconState::Phase0(state) => Ok(&mut state.current_epoch_attestations),
            _ => Err(StateError::IncompatibleFork("current_epoch_attestations")),
        }
    }

    /*
     * Epoch accessors
     */

    pub fn current_epoch(&self) -> Epoch {
        compute_epoch_at_slot::<P>(self.slot())
    }

    /// The previous epoch, clamped at genesis.
    pub fn previous_epoch(&self) -> Epoch {
        self.current_epoch().saturating_sub(1)
    }

    /// Return the block root at the start of a recent ``epoch``.
    pub fn get_block_root(&self, epoch: Epoch) -> Result<Root, StateError> {
        self.get_block_root_at_slot(epoch * P::slots_per_epoch())
    }

    /// Return the block root at a recent ``slot``.
    pub fn get_block_root_at_slot(&self, slot: Slot) -> Result<Root, StateError> {
        let state_slot = self.slot();
        if !(slot < state_slot && state_slot <= slot + P::slots_per_historical_root()) {
            return Err(StateError::SlotOutOfRange { slot, state_slot });
        }
        Ok(self.block_roots()[(slot % P::slots_per_historical_root()) as usize])
    }

    /// Return the randao mix at a recent ``epoch``.
    pub fn get_randao_mix(&self, epoch: Epoch) -> Root {
        self.randao_mixes()[(epoch % P::epochs_per_historical_vector()) as usize]
    }

    /// Return the seed at ``epoch``, mixing ``MIN_SEED_LOOKAHEAD`` epochs of
    /// lookahead out of the randao accumulator.
    pub fn get_seed(&self, spec: &Spec, epoch: Epoch, domain_type: DomainType) -> Root {
        let mix = self.get_randao_mix(
            epoch + P::epochs_per_historical_vector() - spec.phase0.min_seed_lookahead - 1,
        );
        let preimage = [domain_type.as_slice(), &epoch.to_le_bytes(), mix.as_slice()].concat();
        Root::from(hash_fixed(&preimage))
    }

    /// Return the signature domain of a message at ``epoch``.
    pub fn get_domain(&self, domain_type: DomainType, epoch: Epoch) -> Domain {
        let fork = self.fork();
        let fork_version = if epoch < fork.epoch {
            fork.previous_version
        } else {
            fork.current_version
        };
        compute_domain(domain_type, fork_version, self.genesis_validators_root())
    }

    /*
     * Registry accessors
     */

    pub fn get_active_validator_indices(&self, epoch: Epoch) -> Vec<ValidatorIndex> {
        self.validators()
            .iter()
            .enumerate()
            .filter_map(|(index, validator)| {
                validator.is_active_at(epoch).then_some(index as u64)
            })
            .collect()
    }

    /// Combined effective balance of ``indices``, floored at one increment to
    /// avoid divisions by zero.
    pub fn get_total_balance<'a>(
        &self,
        spec: &Spec,
        indices: impl IntoIterator<Item = &'a ValidatorIndex>,
    ) -> Gwei {
        let validators = self.validators();
        let total = indices
            .into_iter()
            .map(|&index| {
                validators
                    .get(index as usize)
                    .map(|validator| validator.effective_balance)
                    .unwrap_or(0)
            })
            .sum();
        spec.phase0.effective_balance_increment.max(total)
    }

    pub fn get_total_active_balance(&self, spec: &Spec) -> Gwei {
        let indices = self.get_active_validator_indices(self.current_epoch());
        self.get_total_balance(spec, &indices)
    }

    /// Number of committees each slot of ``epoch`` is divided into.
    pub fn get_committee_count_per_slot(&self, spec: &Spec, epoch: Epoch) -> u64 {
        (self.get_active_validator_indices(epoch).len() as u64
            / P::slots_per_epoch()
            / spec.phase0.target_committee_size)
            .clamp(1, spec.phase0.max_committees_per_slot)
    }

    pub fn get_validator_churn_limit(&self, spec: &Spec) -> u64 {
        let active = self.get_active_validator_indices(self.current_epoch()).len() as u64;
        spec.phase0
            .min_per_epoch_churn_limit
            .max(active / spec.phase0.churn_limit_quotient)
    }

    pub fn is_valid_index(&self, index: ValidatorIndex) -> bool {
        (index as usize) < self.validators().len()
    }

    /*
     * Mutators
     */

    pub fn increase_balance(
        &mut self,
        index: ValidatorIndex,
        delta: Gwei,
    ) -> Result<(), StateError> {
        let balance = self
            .balances_mut()
            .get_mut(index as usize)
            .ok_or(StateError::UnknownValidator(index))?;
        *balance += delta;
        Ok(())
    }

    /// Decrease the balance at ``index`` by ``delta``, saturating at zero.
    pub fn decrease_balance(
        &mut self,
        index: ValidatorIndex,
        delta: Gwei,
    ) -> Result<(), StateError> {
        let balance = self
            .balances_mut()
            .get_mut(index as usize)
            .ok_or(StateError::UnknownValidator(index))?;
        *balance = balance.saturating_sub(delta);
        Ok(())
    }

    /// Queue the validator at ``index`` for exit behind the churn limit.
    pub fn initiate_validator_exit(
        &mut self,
        spec: &Spec,
        index: ValidatorIndex,
    ) -> Result<(), StateError> {
        let validator = self
            .validators()
            .get(index as usize)
            .ok_or(StateError::UnknownValidator(index))?;
        if validator.exit_epoch != FAR_FUTURE_EPOCH {
            return Ok(());
        }

        let mut exit_queue_epoch = self
            .validators()
            .iter()
            .map(|validator| validator.exit_epoch)
            .filter(|&epoch| epoch != FAR_FUTURE_EPOCH)
            .max()
            .unwrap_or(0)
            .max(compute_activation_exit_epoch(spec, self.current_epoch()));
        let exit_queue_churn = self
            .validators()
            .iter()
            .filter(|validator| validator.exit_epoch == exit_queue_epoch)
            .count() as u64;
        if exit_queue_churn >= self.get_validator_churn_limit(spec) {
            exit_queue_epoch += 1;
        }

        let withdrawability_delay = spec.phase0.min_validator_withdrawability_delay;
        let validator = self
            .validators_mut()
            .get_mut(index as usize)
            .ok_or(StateError::UnknownValidator(index))?;
        validator.exit_epoch = exit_queue_epoch;
        validator.withdrawable_epoch = exit_queue_epoch + withdrawability_delay;
        Ok(())
    }

    /// Slash the validator at ``slashed_index``, rewarding the block proposer
    /// and the whistleblower (the proposer when none is named).
    pub fn slash_validator(
        &mut self,
        spec: &Spec,
        slashed_index: ValidatorIndex,
        whistleblower_index: Option<ValidatorIndex>,
        proposer_index: ValidatorIndex,
    ) -> Result<(), StateError> {
        let epoch = self.current_epoch();
        self.initiate_validator_exit(spec, slashed_index)?;

        let epochs_per_slashings_vector = P::epochs_per_slashings_vector();
        let validator = self
            .validators_mut()
            .get_mut(slashed_index as usize)
            .ok_or(StateError::UnknownValidator(slashed_index))?;
        validator.slashed = true;
        validator.withdrawable_epoch = validator
            .withdrawable_epoch
            .max(epoch + epochs_per_slashings_vector);
        let effective_balance = validator.effective_balance;

        self.slashings_mut()[(epoch % epochs_per_slashings_vector) as usize] += effective_balance;
        self.decrease_balance(
            slashed_index,
            effective_balance / spec.min_slashing_penalty_quotient_for(self.fork_name()),
        )?;

        let whistleblower_reward = effective_balance / spec.phase0.whistleblower_reward_quotient;
        let proposer_reward = match self.fork_name() {
            ForkName::Phase0 => whistleblower_reward / spec.phase0.proposer_reward_quotient,
            _ => {
                whistleblower_reward * crate::constants::PROPOSER_WEIGHT
                    / crate::constants::WEIGHT_DENOMINATOR
            }
        };
        let whistleblower_index = whistleblower_index.unwrap_or(proposer_index);
        self.increase_balance(proposer_index, proposer_reward)?;
        self.increase_balance(whistleblower_index, whistleblower_reward - proposer_reward)?;
        Ok(())
    }

    /// Append a validator record and its per-validator parallel list entries.
    pub fn add_validator_to_registry(
        &mut self,
        spec: &Spec,
        pubkey: PubKey,
        withdrawal_credentials: Root,
        amount: Gwei,
    ) -> Result<ValidatorIndex, StateError> {
        let index = self.validators().len() as u64;
        let validator = Validator::from_deposit(spec, pubkey, withdrawal_credentials, amount);
        self.validators_mut()
            .push(validator)
            .map_err(|_| StateError::ListLimitReached("validators"))?;
        self.balances_mut()
            .push(amount)
            .map_err(|_| StateError::ListLimitReached("balances"))?;

        if self.fork_name() >= ForkName::Altair {
            self.previous_epoch_participation_mut()?
                .push(0)
                .map_err(|_| StateError::ListLimitReached("previous_epoch_participation"))?;
            self.current_epoch_participation_mut()?
                .push(0)
                .map_err(|_| StateError::ListLimitReached("current_epoch_participation"))?;
            self.inactivity_scores_mut()?
                .push(0)
                .map_err(|_| StateError::ListLimitReached("inactivity_scores"))?;
        }
        Ok(index)
    }

    /*
     * Canonical encoding
     */

    pub fn as_ssz_bytes(&self) -> Vec<u8> {
        map_state!(self, state => state.as_ssz_bytes())
    }

    pub fn from_ssz_bytes(bytes: &[u8], fork: ForkName) -> Result<Self, ssz::DecodeError> {
        match fork {
            ForkName::Phase0 => phase0::BeaconState::from_ssz_bytes(bytes).map(Self::Phase0),
            ForkName::Altair => altair::BeaconState::from_ssz_bytes(bytes).map(Self::Altair),
            ForkName::Bellatrix => {
                bellatrix::BeaconState::from_ssz_bytes(bytes).map(Self::Bellatrix)
            }
            ForkName::Capella => capella::BeaconState::from_ssz_bytes(bytes).map(Self::Capella),
            ForkName::Deneb => deneb::BeaconState::from_ssz_bytes(bytes).map(Self::Deneb),
        }
    }

    pub fn tree_hash_root(&self) -> Root {
        map_state!(self, state => state.tree_hash_root())
    }
}

macro_rules! map_block {
    ($self:expr, $block:ident => $body:expr) => {
        match $self {
            SignedBeaconBlock::Phase0($block) => $body,
            SignedBeaconBlock::Altair($block) => $body,
            SignedBeaconBlock::Bellatrix($block) => $body,
            SignedBeaconBlock::Capella($block) => $body,
            SignedBeaconBlock::Deneb($block) => $body,
        }
    };
}

macro_rules! block_body_field {
    ($name:ident, $ty:ty) => {
        pub fn $name(&self) -> &$ty {
            map_block!(self, block => &block.message.body.$name)
        }
    };
}

impl<P: Preset> SignedBeaconBlock<P> {
    pub fn fork_name(&self) -> ForkName {
        match self {
            SignedBeaconBlock::Phase0(_) => ForkName::Phase0,
            SignedBeaconBlock::Altair(_) => ForkName::Altair,
            SignedBeaconBlock::Bellatrix(_) => ForkName::Bellatrix,
            SignedBeaconBlock::Capella(_) => ForkName::Capella,
            SignedBeaconBlock::Deneb(_) => ForkName::Deneb,
        }
    }

    pub fn slot(&self) -> Slot {
        map_block!(self, block => block.message.slot)
    }

    pub fn proposer_index(&self) -> ValidatorIndex {
        map_block!(self, block => block.message.proposer_index)
    }

    pub fn parent_root(&self) -> Root {
        map_block!(self, block => block.message.parent_root)
    }

    pub fn state_root(&self) -> Root {
        map_block!(self, block => block.message.state_root)
    }

    pub fn signature(&self) -> &BlsSignature {
        map_block!(self, block => &block.signature)
    }

    /// Header form of the message, with its actual ``state_root``.
    pub fn block_header(&self) -> BeaconBlockHeader {
        map_block!(self, block => block.message.block_header())
    }

    /// Hash-tree-root of the unsigned message.
    pub fn message_tree_hash_root(&self) -> Root {
        map_block!(self, block => block.message.tree_hash_root())
    }

    block_body_field!(randao_reveal, BlsSignature);
    block_body_field!(eth1_data, Eth1Data);
    block_body_field!(graffiti, Root);
    block_body_field!(proposer_slashings, VariableList<ProposerSlashing, P::MaxProposerSlashings>);
    block_body_field!(
        attester_slashings,
        VariableList<AttesterSlashing<P>, P::MaxAttesterSlashings>
    );
    block_body_field!(attestations, VariableList<Attestation<P>, P::MaxAttestations>);
    block_body_field!(deposits, VariableList<Deposit, P::MaxDeposits>);
    block_body_field!(voluntary_exits, VariableList<SignedVoluntaryExit, P::MaxVoluntaryExits>);

    pub fn sync_aggregate(&self) -> Result<&SyncAggregate<P>, StateError> {
        match self {
            SignedBeaconBlock::Phase0(_) => Err(StateError::IncompatibleFork("sync_aggregate")),
            SignedBeaconBlock::Altair(block) => Ok(&block.message.body.sync_aggregate),
            SignedBeaconBlock::Bellatrix(block) => Ok(&block.message.body.sync_aggregate),
            SignedBeaconBlock::Capella(block) => Ok(&block.message.body.sync_aggregate),
            SignedBeaconBlock::Deneb(block) => Ok(&block.message.body.sync_aggregate),
        }
    }

    pub fn bls_to_execution_changes(
        &self,
    ) -> Result<&VariableList<SignedBLSToExecutionChange, P::MaxBlsToExecutionChanges>, StateError>
    {
        match self {
            SignedBeaconBlock::Capella(block) => Ok(&block.message.body.bls_to_execution_changes),
            SignedBeaconBlock::Deneb(block) => Ok(&block.message.body.bls_to_execution_changes),
            _ => Err(StateError::IncompatibleFork("bls_to_execution_changes")),
        }
    }

    pub fn blob_kzg_commitments(
        &self,
    ) -> Result<&VariableList<KzgCommitment, P::MaxBlobCommitmentsPerBlock>, StateError> {
        match self {
            SignedBeaconBlock::Deneb(block) => Ok(&block.message.body.blob_kzg_commitments),
            _ => Err(StateError::IncompatibleFork("blob_kzg_commitments")),
        }
    }

    pub fn as_ssz_bytes(&self) -> Vec<u8> {
        map_block!(self, block => block.as_ssz_bytes())
    }

    pub fn from_ssz_bytes(bytes: &[u8], fork: ForkName) -> Result<Self, ssz::DecodeError> {
        match fork {
            ForkName::Phase0 => phase0::SignedBeaconBlock::from_ssz_bytes(bytes).map(Self::Phase0),
            ForkName::Altair => altair::SignedBeaconBlock::from_ssz_bytes(bytes).map(Self::Altair),
            ForkName::Bellatrix => {
                bellatrix::SignedBeaconBlock::from_ssz_bytes(bytes).map(Self::Bellatrix)
            }
            ForkName::Capella => {
                capella::SignedBeaconBlock::from_ssz_bytes(bytes).map(Self::Capella)
            }
            ForkName::Deneb => deneb::SignedBeaconBlock::from_ssz_bytes(bytes).map(Self::Deneb),
        }
    }
}

//! Pending-attestation accounting: flatten the epoch's attestations into
//! per-validator status records, then drive justification and the reward
//! and penalty deltas from them.

use cairn_types::{
    BeaconState, Gwei, Preset, Slot, Spec, ValidatorIndex,
    constants::BASE_REWARDS_PER_EPOCH,
    misc::integer_squareroot,
};

use crate::{Error, epoch, epochs_context::EpochsContext};

pub const PREV_SOURCE_ATTESTER: u8 = 1;
pub const PREV_TARGET_ATTESTER: u8 = 1 << 1;
pub const PREV_HEAD_ATTESTER: u8 = 1 << 2;
pub const CURR_SOURCE_ATTESTER: u8 = 1 << 3;
pub const CURR_TARGET_ATTESTER: u8 = 1 << 4;
pub const UNSLASHED_ATTESTER: u8 = 1 << 5;
/// Active in the previous epoch, or slashed and not yet withdrawable:
/// subject to rewards and penalties this epoch.
pub const ELIGIBLE_ATTESTER: u8 = 1 << 6;

/// Flattened per-validator participation for one epoch transition.
#[derive(Clone)]
pub struct AttesterStatus {
    pub flags: u8,
    /// Smallest inclusion delay among this validator's attestations.
    pub inclusion_delay: Slot,
    /// Proposer that included the earliest attestation.
    pub inclusion_proposer: ValidatorIndex,
}

impl Default for AttesterStatus {
    fn default() -> Self {
        AttesterStatus {
            flags: 0,
            inclusion_delay: Slot::MAX,
            inclusion_proposer: 0,
        }
    }
}

impl AttesterStatus {
    pub fn has_markers(&self, markers: u8) -> bool {
        self.flags & markers == markers
    }
}

pub fn process_epoch<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
) -> Result<(), Error> {
    let statuses = compute_attester_statuses(epc, state)?;

    process_justification_and_finalization(spec, state, &statuses)?;
    process_rewards_and_penalties(spec, epc, state, &statuses)?;
    epoch::registry::process_registry_updates(spec, state)?;
    epoch::registry::process_slashings(spec, state)?;
    epoch::process_eth1_data_reset::<P>(state);
    epoch::process_effective_balance_updates(spec, state);
    epoch::process_slashings_reset::<P>(state);
    epoch::process_randao_mixes_reset::<P>(state);
    epoch::process_historical_update::<P>(state)?;
    process_participation_record_updates(state)?;
    Ok(())
}

/// Profile every pending attestation into per-validator flags, keeping the
/// earliest inclusion per validator for the proposer micro-reward.
pub fn compute_attester_statuses<P: Preset>(
    epc: &EpochsContext,
    state: &BeaconState<P>,
) -> Result<Vec<AttesterStatus>, Error> {
    let previous_epoch = state.previous_epoch();
    let current_epoch = state.current_epoch();

    let mut statuses = vec![AttesterStatus::default(); state.validators().len()];
    for (index, validator) in state.validators().iter().enumerate() {
        let status = &mut statuses[index];
        if !validator.slashed {
            status.flags |= UNSLASHED_ATTESTER;
        }
        if validator.is_active_at(previous_epoch)
            || (validator.slashed && previous_epoch + 1 < validator.withdrawable_epoch)
        {
            status.flags |= ELIGIBLE_ATTESTER;
        }
    }

    let previous_boundary_root = state.get_block_root(previous_epoch).ok();
    let current_boundary_root = state.get_block_root(current_epoch).ok();

    for pending in state.previous_epoch_attestations()?.iter() {
        let data = &pending.data;
        let committee = epc.get_beacon_committee::<P>(data.slot, data.index)?;

        let mut flags = PREV_SOURCE_ATTESTER;
        if Some(data.target.root) == previous_boundary_root {
            flags |= PREV_TARGET_ATTESTER;
        }
        if state.get_block_root_at_slot(data.slot).ok() == Some(data.beacon_block_root) {
            flags |= PREV_HEAD_ATTESTER;
        }

        for (position, &index) in committee.iter().enumerate() {
            let attested = pending
                .aggregation_bits
                .get(position)
                .map_err(|err| Error::Internal(format!("bitfield read failed: {err:?}")))?;
            if !attested {
                continue;
            }
            let status = &mut statuses[index as usize];
            status.flags |= flags;
            if pending.inclusion_delay < status.inclusion_delay {
                status.inclusion_delay = pending.inclusion_delay;
                status.inclusion_proposer = pending.proposer_index;
            }
        }
    }

    for pending in state.current_epoch_attestations()?.iter() {
        let data = &pending.data;
        let committee = epc.get_beacon_committee::<P>(data.slot, data.index)?;

        let mut flags = CURR_SOURCE_ATTESTER;
        if Some(data.target.root) == current_boundary_root {
            flags |= CURR_TARGET_ATTESTER;
        }

        for (position, &index) in committee.iter().enumerate() {
            let attested = pending
                .aggregation_bits
                .get(position)
                .map_err(|err| Error::Internal(format!("bitfield read failed: {err:?}")))?;
            if attested {
                statuses[index as usize].flags |= flags;
            }
        }
    }

    Ok(statuses)
}

fn process_justification_and_finalization<P: Preset>(
    spec: &Spec,
    state: &mut BeaconState<P>,
    statuses: &[AttesterStatus],
) -> Result<(), Error> {
    if !epoch::justification_is_active(state.current_epoch()) {
        return Ok(());
    }

    let mut previous_target_balance: Gwei = 0;
    let mut current_target_balance: Gwei = 0;
    for (index, status) in statuses.iter().enumerate() {
        let effective_balance = state.validators()[index].effective_balance;
        if status.has_markers(PREV_TARGET_ATTESTER | UNSLASHED_ATTESTER) {
            previous_target_balance += effective_balance;
        }
        if status.has_markers(CURR_TARGET_ATTESTER | UNSLASHED_ATTESTER) {
            current_target_balance += effective_balance;
        }
    }

    let total_active_balance = state.get_total_active_balance(spec);
    epoch::weigh_justification_and_finalization(
        state,
        total_active_balance,
        previous_target_balance,
        current_target_balance,
    )
}

/// FFG-source, FFG-target and head rewards, the inclusion-speed bonus, and
/// the inactivity leak, per attester status.
fn process_rewards_and_penalties<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
    statuses: &[AttesterStatus],
) -> Result<(), Error> {
    // Rewards depend on the previous epoch, so nothing accrues at genesis.
    if state.current_epoch() == cairn_types::constants::GENESIS_EPOCH {
        return Ok(());
    }

    let validator_count = statuses.len();
    let mut rewards = vec![0u64; validator_count];
    let mut penalties = vec![0u64; validator_count];

    let mut total_balance: u128 = 0;
    let mut total_attesting_balance: u128 = 0;
    let mut boundary_balance: u128 = 0;
    let mut matching_head_balance: u128 = 0;
    for (index, status) in statuses.iter().enumerate() {
        let effective_balance = epc.effective_balances[index] as u128;
        total_balance += effective_balance;
        if status.has_markers(PREV_SOURCE_ATTESTER | UNSLASHED_ATTESTER) {
            total_attesting_balance += effective_balance;
        }
        if status.has_markers(PREV_TARGET_ATTESTER | UNSLASHED_ATTESTER) {
            boundary_balance += effective_balance;
        }
        if status.has_markers(PREV_HEAD_ATTESTER | UNSLASHED_ATTESTER) {
            matching_head_balance += effective_balance;
        }
    }

    let previous_epoch = state.previous_epoch();
    let previous_active_indices = state.get_active_validator_indices(previous_epoch);
    let previous_total_balance = state.get_total_balance(spec, &previous_active_indices);
    let balance_sqrt = integer_squareroot(previous_total_balance);
    let finality_delay = previous_epoch - state.finalized_checkpoint().epoch;
    let in_inactivity_leak = finality_delay > spec.phase0.min_epochs_to_inactivity_penalty;

    for (index, status) in statuses.iter().enumerate() {
        if !status.has_markers(ELIGIBLE_ATTESTER) {
            continue;
        }
        let effective_balance = epc.effective_balances[index];
        let base_reward = effective_balance * spec.phase0.base_reward_factor
            / balance_sqrt
            / BASE_REWARDS_PER_EPOCH;

        // Expected FFG source
        if status.has_markers(PREV_SOURCE_ATTESTER | UNSLASHED_ATTESTER) {
            rewards[index] +=
                (base_reward as u128 * total_attesting_balance / total_balance) as u64;

            // Inclusion speed bonus
            let proposer_reward = base_reward / spec.phase0.proposer_reward_quotient;
            rewards[status.inclusion_proposer as usize] += proposer_reward;
            let max_attester_reward = base_reward - proposer_reward;
            let inclusion_offset = P::slots_per_epoch()
                + spec.phase0.min_attestation_inclusion_delay
                - status.inclusion_delay;
            rewards[index] += max_attester_reward * inclusion_offset / P::slots_per_epoch();
        } else {
            penalties[index] += base_reward;
        }

        // Expected FFG target
        if status.has_markers(PREV_TARGET_ATTESTER | UNSLASHED_ATTESTER) {
            rewards[index] += (base_reward as u128 * boundary_balance / total_balance) as u64;
        } else {
            penalties[index] += base_reward;
        }

        // Expected head
        if status.has_markers(PREV_HEAD_ATTESTER | UNSLASHED_ATTESTER) {
            rewards[index] += (base_reward as u128 * matching_head_balance / total_balance) as u64;
        } else {
            penalties[index] += base_reward;
        }

        // Take away max rewards while not finalizing
        if in_inactivity_leak {
            penalties[index] += base_reward * BASE_REWARDS_PER_EPOCH;
            if !status.has_markers(PREV_HEAD_ATTESTER | UNSLASHED_ATTESTER) {
                penalties[index] += (effective_balance as u128 * finality_delay as u128
                    / spec.phase0.inactivity_penalty_quotient as u128)
                    as u64;
            }
        }
    }

    for index in 0..validator_count {
        state.increase_balance(index as u64, rewards[index])?;
        state.decrease_balance(index as u64, penalties[index])?;
    }
    Ok(())
}

fn process_participation_record_updates<P: Preset>(
    state: &mut BeaconState<P>,
) -> Result<(), Error> {
    let current = std::mem::take(state.current_epoch_attestations_mut()?);
    *state.previous_epoch_attestations_mut()? = current;
    Ok(())
}

//! Participation-flag accounting for Altair and the forks after it, plus
//! the sync-committee machinery that rotates on period boundaries.

use std::{collections::HashSet, sync::Arc};

use cairn_bls::PubKey;
use cairn_types::{
    BeaconState, Epoch, Preset, Spec, SyncCommittee, ValidatorIndex,
    constants::{
        DOMAIN_SYNC_COMMITTEE, MAX_RANDOM_BYTE, PARTICIPATION_FLAG_WEIGHTS,
        TIMELY_HEAD_FLAG_INDEX, TIMELY_TARGET_FLAG_INDEX, WEIGHT_DENOMINATOR,
    },
    misc::integer_squareroot,
    participation_flags::has_flag,
};
use ethereum_hashing::hash;
use ssz_types::FixedVector;

use crate::{
    Error, epoch,
    epochs_context::EpochsContext,
    error::ensure_rule,
    shuffle::compute_shuffled_index,
};

pub fn process_epoch<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
) -> Result<(), Error> {
    process_justification_and_finalization(spec, state)?;
    process_inactivity_updates(spec, state)?;
    process_rewards_and_penalties(spec, epc, state)?;
    epoch::registry::process_registry_updates(spec, state)?;
    epoch::registry::process_slashings(spec, state)?;
    epoch::process_eth1_data_reset::<P>(state);
    epoch::process_effective_balance_updates(spec, state);
    epoch::process_slashings_reset::<P>(state);
    epoch::process_randao_mixes_reset::<P>(state);
    epoch::process_historical_update::<P>(state)?;
    process_participation_flag_updates(state)?;
    process_sync_committee_updates(spec, state)?;
    Ok(())
}

pub fn base_reward_per_increment<P: Preset>(spec: &Spec, state: &BeaconState<P>) -> u64 {
    spec.phase0.effective_balance_increment * spec.phase0.base_reward_factor
        / integer_squareroot(state.get_total_active_balance(spec))
}

pub fn get_base_reward<P: Preset>(
    spec: &Spec,
    state: &BeaconState<P>,
    index: ValidatorIndex,
) -> Result<u64, Error> {
    let effective_balance = state
        .validators()
        .get(index as usize)
        .map(|validator| validator.effective_balance)
        .ok_or_else(|| Error::Internal(format!("unknown validator {index}")))?;
    Ok(effective_balance / spec.phase0.effective_balance_increment
        * base_reward_per_increment(spec, state))
}

/// Validators still exposed to rewards and penalties for the previous epoch.
pub fn get_eligible_validator_indices<P: Preset>(state: &BeaconState<P>) -> Vec<ValidatorIndex> {
    let previous_epoch = state.previous_epoch();
    state
        .validators()
        .iter()
        .enumerate()
        .filter_map(|(index, validator)| {
            (validator.is_active_at(previous_epoch)
                || (validator.slashed && previous_epoch + 1 < validator.withdrawable_epoch))
                .then_some(index as u64)
        })
        .collect()
}

/// Active, unslashed validators whose participation record for ``epoch``
/// carries ``flag_index``.
pub fn get_unslashed_participating_indices<P: Preset>(
    state: &BeaconState<P>,
    flag_index: u8,
    epoch: Epoch,
) -> Result<HashSet<ValidatorIndex>, Error> {
    ensure_rule!(
        epoch == state.previous_epoch() || epoch == state.current_epoch(),
        "participation is only tracked for the previous and current epochs"
    );
    let participation = if epoch == state.current_epoch() {
        state.current_epoch_participation()?
    } else {
        state.previous_epoch_participation()?
    };

    let validators = state.validators();
    Ok(state
        .get_active_validator_indices(epoch)
        .into_iter()
        .filter(|&index| {
            has_flag(participation[index as usize], flag_index)
                && !validators[index as usize].slashed
        })
        .collect())
}

pub fn is_in_inactivity_leak<P: Preset>(spec: &Spec, state: &BeaconState<P>) -> bool {
    let finality_delay = state.previous_epoch() - state.finalized_checkpoint().epoch;
    finality_delay > spec.phase0.min_epochs_to_inactivity_penalty
}

fn process_justification_and_finalization<P: Preset>(
    spec: &Spec,
    state: &mut BeaconState<P>,
) -> Result<(), Error> {
    if !epoch::justification_is_active(state.current_epoch()) {
        return Ok(());
    }

    let previous_indices = get_unslashed_participating_indices(
        state,
        TIMELY_TARGET_FLAG_INDEX,
        state.previous_epoch(),
    )?;
    let current_indices = get_unslashed_participating_indices(
        state,
        TIMELY_TARGET_FLAG_INDEX,
        state.current_epoch(),
    )?;

    let total_active_balance = state.get_total_active_balance(spec);
    let previous_target_balance = state.get_total_balance(spec, &previous_indices);
    let current_target_balance = state.get_total_balance(spec, &current_indices);

    epoch::weigh_justification_and_finalization(
        state,
        total_active_balance,
        previous_target_balance,
        current_target_balance,
    )
}

/// Drift inactivity scores: up while missing the target, down while the
/// chain finalizes.
fn process_inactivity_updates<P: Preset>(
    spec: &Spec,
    state: &mut BeaconState<P>,
) -> Result<(), Error> {
    // Score updates are based on the previous epoch's participation, so the
    // genesis epoch is skipped.
    if state.current_epoch() == cairn_types::constants::GENESIS_EPOCH {
        return Ok(());
    }

    let participating = get_unslashed_participating_indices(
        state,
        TIMELY_TARGET_FLAG_INDEX,
        state.previous_epoch(),
    )?;
    let leaking = is_in_inactivity_leak(spec, state);
    let bias = spec.altair.inactivity_score_bias;
    let recovery_rate = spec.altair.inactivity_score_recovery_rate;

    for index in get_eligible_validator_indices(state) {
        let score = &mut state.inactivity_scores_mut()?[index as usize];
        if participating.contains(&index) {
            *score -= 1.min(*score);
        } else {
            *score += bias;
        }
        if !leaking {
            *score -= recovery_rate.min(*score);
        }
    }
    Ok(())
}

fn process_rewards_and_penalties<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
) -> Result<(), Error> {
    if state.current_epoch() == cairn_types::constants::GENESIS_EPOCH {
        return Ok(());
    }

    let previous_epoch = state.previous_epoch();
    let validator_count = state.validators().len();
    let mut rewards = vec![0u64; validator_count];
    let mut penalties = vec![0u64; validator_count];

    let increment = spec.phase0.effective_balance_increment;
    let total_active_balance = state.get_total_active_balance(spec);
    let total_active_increments = (total_active_balance / increment) as u128;
    let reward_per_increment = base_reward_per_increment(spec, state);
    let eligible = get_eligible_validator_indices(state);
    let leaking = is_in_inactivity_leak(spec, state);

    for (flag_index, &weight) in PARTICIPATION_FLAG_WEIGHTS.iter().enumerate() {
        let flag_index = flag_index as u8;
        let unslashed = get_unslashed_participating_indices(state, flag_index, previous_epoch)?;
        let unslashed_increments =
            (state.get_total_balance(spec, &unslashed) / increment) as u128;

        for &index in &eligible {
            let base_reward =
                epc.effective_balances[index as usize] / increment * reward_per_increment;
            if unslashed.contains(&index) {
                if !leaking {
                    let numerator = base_reward as u128 * weight as u128 * unslashed_increments;
                    rewards[index as usize] +=
                        (numerator / (total_active_increments * WEIGHT_DENOMINATOR as u128)) as u64;
                }
            } else if flag_index != TIMELY_HEAD_FLAG_INDEX {
                penalties[index as usize] += base_reward * weight / WEIGHT_DENOMINATOR;
            }
        }
    }

    // Inactivity penalties scale with the accumulated score
    let target_participants =
        get_unslashed_participating_indices(state, TIMELY_TARGET_FLAG_INDEX, previous_epoch)?;
    let penalty_denominator = spec.altair.inactivity_score_bias as u128
        * spec.inactivity_penalty_quotient_for(state.fork_name()) as u128;
    for &index in &eligible {
        if !target_participants.contains(&index) {
            let score = state.inactivity_scores()?[index as usize];
            let numerator = epc.effective_balances[index as usize] as u128 * score as u128;
            penalties[index as usize] += (numerator / penalty_denominator) as u64;
        }
    }

    for index in 0..validator_count {
        state.increase_balance(index as u64, rewards[index])?;
        state.decrease_balance(index as u64, penalties[index])?;
    }
    Ok(())
}

fn process_participation_flag_updates<P: Preset>(state: &mut BeaconState<P>) -> Result<(), Error> {
    let current = std::mem::take(state.current_epoch_participation_mut()?);
    *state.previous_epoch_participation_mut()? = current;
    let validator_count = state.validators().len();
    *state.current_epoch_participation_mut()? = ssz_types::VariableList::new(vec![0; validator_count])
        .map_err(|_| Error::Internal("participation list exceeds the registry limit".into()))?;
    Ok(())
}

fn process_sync_committee_updates<P: Preset>(
    spec: &Spec,
    state: &mut BeaconState<P>,
) -> Result<(), Error> {
    let next_epoch = state.current_epoch() + 1;
    if next_epoch % spec.altair.epochs_per_sync_committee_period != 0 {
        return Ok(());
    }

    let next = Arc::new(get_next_sync_committee(spec, state)?);
    let outgoing = state.next_sync_committee()?.clone();
    *state.current_sync_committee_mut()? = outgoing;
    *state.next_sync_committee_mut()? = next;
    Ok(())
}

/// Sample the sync committee for the period starting at the next epoch,
/// weighted by effective balance. Duplicates are allowed.
pub fn get_next_sync_committee_indices<P: Preset>(
    spec: &Spec,
    state: &BeaconState<P>,
) -> Result<Vec<ValidatorIndex>, Error> {
    let epoch = state.current_epoch() + 1;
    let active = state.get_active_validator_indices(epoch);
    if active.is_empty() {
        return Err(Error::Internal(
            "sync committee selection over an empty active set".into(),
        ));
    }
    let seed = state.get_seed(spec, epoch, DOMAIN_SYNC_COMMITTEE);

    let mut indices = Vec::with_capacity(P::sync_committee_size() as usize);
    let mut i: usize = 0;
    while indices.len() < P::sync_committee_size() as usize {
        let shuffled = compute_shuffled_index(
            i % active.len(),
            active.len(),
            seed,
            spec.phase0.shuffle_round_count,
        )
        .ok_or_else(|| Error::Internal("shuffled index out of range".into()))?;
        let candidate = active[shuffled];

        let random_bytes = hash(&[seed.as_slice(), &((i / 32) as u64).to_le_bytes()].concat());
        let random_byte = random_bytes[i % 32] as u64;
        let effective_balance = state.validators()[candidate as usize].effective_balance;
        if effective_balance * MAX_RANDOM_BYTE >= spec.phase0.max_effective_balance * random_byte {
            indices.push(candidate);
        }
        i += 1;
    }
    Ok(indices)
}

pub fn get_next_sync_committee<P: Preset>(
    spec: &Spec,
    state: &BeaconState<P>,
) -> Result<SyncCommittee<P>, Error> {
    let indices = get_next_sync_committee_indices(spec, state)?;
    let pubkeys = indices
        .iter()
        .map(|&index| state.validators()[index as usize].pubkey.clone())
        .collect::<Vec<_>>();
    let aggregate_pubkey = PubKey::aggregate(&pubkeys.iter().collect::<Vec<_>>())?;

    Ok(SyncCommittee {
        pubkeys: FixedVector::new(pubkeys)
            .map_err(|_| Error::Internal("sync committee size mismatch".into()))?,
        aggregate_pubkey,
    })
}

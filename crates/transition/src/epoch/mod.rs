//! Epoch-boundary processing. The sub-steps run in a fixed order; the
//! phase0 path accounts with pending attestations, the Altair-family path
//! with participation flags. Steps shared by every fork live here.

pub mod altair;
pub mod phase0;
pub mod registry;

use cairn_types::{
    BeaconState, Checkpoint, Epoch, Gwei, HistoricalBatch, Preset, Spec,
    constants::{GENESIS_EPOCH, JUSTIFICATION_BITS_LENGTH},
    spec::ForkName,
};
use tree_hash::TreeHash;

use crate::{Cancel, Error, epochs_context::EpochsContext};

pub fn process_epoch<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
    cancel: &Cancel,
) -> Result<(), Error> {
    cancel.check()?;
    tracing::debug!(epoch = state.current_epoch(), fork = %state.fork_name(), "epoch transition");
    match state.fork_name() {
        ForkName::Phase0 => phase0::process_epoch(spec, epc, state),
        _ => altair::process_epoch(spec, epc, state),
    }
}

/// Shift the justification bits with the two fresh target votes and apply
/// the finalization patterns to the extended history.
pub(crate) fn weigh_justification_and_finalization<P: Preset>(
    state: &mut BeaconState<P>,
    total_active_balance: Gwei,
    previous_epoch_target_balance: Gwei,
    current_epoch_target_balance: Gwei,
) -> Result<(), Error> {
    let previous_epoch = state.previous_epoch();
    let current_epoch = state.current_epoch();
    let old_previous_justified_checkpoint = state.previous_justified_checkpoint();
    let old_current_justified_checkpoint = state.current_justified_checkpoint();

    *state.previous_justified_checkpoint_mut() = old_current_justified_checkpoint;

    let bit_at = |state: &BeaconState<P>, i: usize| -> Result<bool, Error> {
        state
            .justification_bits()
            .get(i)
            .map_err(|err| Error::Internal(format!("justification bit read failed: {err:?}")))
    };
    for i in (1..JUSTIFICATION_BITS_LENGTH).rev() {
        let bit = bit_at(state, i - 1)?;
        set_justification_bit(state, i, bit)?;
    }
    set_justification_bit(state, 0, false)?;

    if previous_epoch_target_balance * 3 >= total_active_balance * 2 {
        *state.current_justified_checkpoint_mut() = Checkpoint {
            epoch: previous_epoch,
            root: state.get_block_root(previous_epoch)?,
        };
        set_justification_bit(state, 1, true)?;
    }
    if current_epoch_target_balance * 3 >= total_active_balance * 2 {
        *state.current_justified_checkpoint_mut() = Checkpoint {
            epoch: current_epoch,
            root: state.get_block_root(current_epoch)?,
        };
        set_justification_bit(state, 0, true)?;
    }

    // Process finalizations
    let bits = state
        .justification_bits()
        .iter()
        .collect::<Vec<bool>>();

    // The 2nd/3rd/4th most recent epochs are justified, the 2nd using the 4th as source
    if bits[1..4].iter().all(|&bit| bit)
        && old_previous_justified_checkpoint.epoch + 3 == current_epoch
    {
        *state.finalized_checkpoint_mut() = old_previous_justified_checkpoint;
    }
    // The 2nd/3rd most recent epochs are justified, the 2nd using the 3rd as source
    if bits[1..3].iter().all(|&bit| bit)
        && old_previous_justified_checkpoint.epoch + 2 == current_epoch
    {
        *state.finalized_checkpoint_mut() = old_previous_justified_checkpoint;
    }
    // The 1st/2nd/3rd most recent epochs are justified, the 1st using the 3rd as source
    if bits[0..3].iter().all(|&bit| bit)
        && old_current_justified_checkpoint.epoch + 2 == current_epoch
    {
        *state.finalized_checkpoint_mut() = old_current_justified_checkpoint;
    }
    // The 1st/2nd most recent epochs are justified, the 1st using the 2nd as source
    if bits[0..2].iter().all(|&bit| bit)
        && old_current_justified_checkpoint.epoch + 1 == current_epoch
    {
        *state.finalized_checkpoint_mut() = old_current_justified_checkpoint;
    }

    Ok(())
}

fn set_justification_bit<P: Preset>(
    state: &mut BeaconState<P>,
    i: usize,
    value: bool,
) -> Result<(), Error> {
    state
        .justification_bits_mut()
        .set(i, value)
        .map_err(|err| Error::Internal(format!("justification bit write failed: {err:?}")))
}

/// Whether justification accounting applies at all yet; the first two epochs
/// still carry the genesis checkpoint stubs.
pub(crate) fn justification_is_active(current_epoch: Epoch) -> bool {
    current_epoch > GENESIS_EPOCH + 1
}

pub(crate) fn process_eth1_data_reset<P: Preset>(state: &mut BeaconState<P>) {
    let next_epoch = state.current_epoch() + 1;
    if next_epoch % P::epochs_per_eth1_voting_period() == 0 {
        *state.eth1_data_votes_mut() = Default::default();
    }
}

/// Update effective balances with hysteresis.
pub(crate) fn process_effective_balance_updates<P: Preset>(spec: &Spec, state: &mut BeaconState<P>) {
    let increment = spec.phase0.effective_balance_increment;
    let hysteresis_increment = increment / spec.phase0.hysteresis_quotient;
    let downward_threshold = hysteresis_increment * spec.phase0.hysteresis_downward_multiplier;
    let upward_threshold = hysteresis_increment * spec.phase0.hysteresis_upward_multiplier;
    let max_effective_balance = spec.phase0.max_effective_balance;

    for index in 0..state.validators().len() {
        let balance = state.balances()[index];
        let validator = &mut state.validators_mut()[index];
        if balance + downward_threshold < validator.effective_balance
            || validator.effective_balance + upward_threshold < balance
        {
            validator.effective_balance =
                (balance - balance % increment).min(max_effective_balance);
        }
    }
}

pub(crate) fn process_slashings_reset<P: Preset>(state: &mut BeaconState<P>) {
    let next_epoch = state.current_epoch() + 1;
    state.slashings_mut()[(next_epoch % P::epochs_per_slashings_vector()) as usize] = 0;
}

pub(crate) fn process_randao_mixes_reset<P: Preset>(state: &mut BeaconState<P>) {
    let current_epoch = state.current_epoch();
    let next_epoch = current_epoch + 1;
    let mix = state.get_randao_mix(current_epoch);
    state.randao_mixes_mut()[(next_epoch % P::epochs_per_historical_vector()) as usize] = mix;
}

/// Fold a batch of roots into the historical accumulator once per
/// ``SLOTS_PER_HISTORICAL_ROOT`` slots: full batch roots before Capella,
/// split summaries afterwards.
pub(crate) fn process_historical_update<P: Preset>(state: &mut BeaconState<P>) -> Result<(), Error> {
    let next_epoch = state.current_epoch() + 1;
    if next_epoch % (P::slots_per_historical_root() / P::slots_per_epoch()) != 0 {
        return Ok(());
    }

    if state.fork_name() >= ForkName::Capella {
        let summary = cairn_types::HistoricalSummary {
            block_summary_root: state.block_roots().tree_hash_root(),
            state_summary_root: state.state_roots().tree_hash_root(),
        };
        state
            .historical_summaries_mut()?
            .push(summary)
            .map_err(|_| Error::Internal("historical summaries at their limit".into()))?;
    } else {
        let batch = HistoricalBatch::<P> {
            block_roots: state.block_roots().clone(),
            state_roots: state.state_roots().clone(),
        };
        let root = batch.tree_hash_root();
        state
            .historical_roots_mut()
            .push(root)
            .map_err(|_| Error::Internal("historical roots at their limit".into()))?;
    }
    Ok(())
}

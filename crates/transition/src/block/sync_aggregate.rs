use cairn_types::{
    BeaconState, Preset, Spec, SyncAggregate,
    constants::{DOMAIN_SYNC_COMMITTEE, PROPOSER_WEIGHT, SYNC_REWARD_WEIGHT, WEIGHT_DENOMINATOR},
    misc::{compute_epoch_at_slot, compute_signing_root},
};

use crate::{
    Error, VerifySignatures,
    epoch::altair::base_reward_per_increment,
    epochs_context::EpochsContext,
    error::ensure_signature,
};

/// Verify the sync committee's vote for the previous slot's block and settle
/// the participation rewards.
pub fn process_sync_aggregate<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
    aggregate: &SyncAggregate<P>,
    verify: VerifySignatures,
) -> Result<(), Error> {
    let committee = state.current_sync_committee()?.clone();

    let previous_slot = state.slot().max(1) - 1;
    if verify.is_true() {
        let participant_pubkeys = committee
            .pubkeys
            .iter()
            .zip(aggregate.sync_committee_bits.iter())
            .filter_map(|(pubkey, bit)| bit.then_some(pubkey))
            .collect::<Vec<_>>();

        let domain = state.get_domain(
            DOMAIN_SYNC_COMMITTEE,
            compute_epoch_at_slot::<P>(previous_slot),
        );
        let signing_root =
            compute_signing_root(&state.get_block_root_at_slot(previous_slot)?, domain);
        ensure_signature!(
            aggregate
                .sync_committee_signature
                .eth_fast_aggregate_verify(&participant_pubkeys, signing_root.as_slice())?,
            "sync aggregate signature does not verify for slot {previous_slot}"
        );
    }

    // Compute participant and proposer rewards
    let total_active_increments =
        state.get_total_active_balance(spec) / spec.phase0.effective_balance_increment;
    let total_base_rewards = base_reward_per_increment(spec, state) * total_active_increments;
    let max_participant_rewards =
        total_base_rewards * SYNC_REWARD_WEIGHT / WEIGHT_DENOMINATOR / P::slots_per_epoch();
    let participant_reward = max_participant_rewards / P::sync_committee_size();
    let proposer_reward =
        participant_reward * PROPOSER_WEIGHT / (WEIGHT_DENOMINATOR - PROPOSER_WEIGHT);

    let committee_indices = committee
        .pubkeys
        .iter()
        .map(|pubkey| {
            epc.validator_index(pubkey).ok_or_else(|| {
                Error::Internal("sync committee member is missing from the registry".into())
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let proposer_index = epc.get_beacon_proposer::<P>(state.slot())?;
    for (participant_index, participation_bit) in committee_indices
        .iter()
        .zip(aggregate.sync_committee_bits.iter())
    {
        if participation_bit {
            state.increase_balance(*participant_index, participant_reward)?;
            state.increase_balance(proposer_index, proposer_reward)?;
        } else {
            state.decrease_balance(*participant_index, participant_reward)?;
        }
    }
    Ok(())
}

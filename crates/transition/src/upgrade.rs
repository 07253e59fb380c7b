//! In-place fork upgrades, applied exactly at activation-epoch boundaries.
//! Each upgrade reshapes the state container and rotates the fork versions;
//! the Altair upgrade additionally translates pending attestations into
//! participation flags and seats the first sync committees.

use std::{mem, sync::Arc};

use cairn_types::{
    BeaconState, Fork, Preset, Spec, SyncCommittee, altair, bellatrix, capella, deneb,
    participation_flags::add_flag,
    spec::ForkName,
};
use ssz_types::VariableList;

use crate::{
    Error,
    block::operations::get_attestation_participation_flag_indices,
    epoch::altair::get_next_sync_committee,
    epochs_context::EpochsContext,
};

/// Apply every upgrade scheduled at or before the state's current epoch.
pub fn apply_scheduled_upgrades<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
) -> Result<(), Error> {
    let target = spec.fork_name_at_epoch(state.current_epoch());
    while state.fork_name() < target {
        let next = state
            .fork_name()
            .next()
            .ok_or_else(|| Error::Internal("no fork beyond the latest".into()))?;
        tracing::debug!(epoch = state.current_epoch(), fork = %next, "fork upgrade");
        match next {
            ForkName::Altair => upgrade_to_altair(spec, epc, state)?,
            ForkName::Bellatrix => upgrade_to_bellatrix(spec, state)?,
            ForkName::Capella => upgrade_to_capella(spec, state)?,
            ForkName::Deneb => upgrade_to_deneb(spec, state)?,
            ForkName::Phase0 => {
                return Err(Error::Internal("cannot upgrade into phase0".into()));
            }
        }
    }
    Ok(())
}

pub fn upgrade_to_altair<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
) -> Result<(), Error> {
    let epoch = state.current_epoch();
    let BeaconState::Phase0(pre) = state else {
        return Err(Error::Internal("altair upgrade expects a phase0 state".into()));
    };

    let validator_count = pre.validators.len();
    let zero_participation = VariableList::new(vec![0; validator_count])
        .map_err(|_| Error::Internal("participation list exceeds the registry limit".into()))?;
    let previous_attestations = mem::take(&mut pre.previous_epoch_attestations);

    let placeholder_committee = Arc::new(SyncCommittee::<P>::default());
    let post = altair::BeaconState {
        genesis_time: pre.genesis_time,
        genesis_validators_root: pre.genesis_validators_root,
        slot: pre.slot,
        fork: Fork {
            previous_version: pre.fork.current_version,
            current_version: spec.altair.altair_fork_version,
            epoch,
        },
        latest_block_header: pre.latest_block_header.clone(),
        block_roots: mem::take(&mut pre.block_roots),
        state_roots: mem::take(&mut pre.state_roots),
        historical_roots: mem::take(&mut pre.historical_roots),
        eth1_data: pre.eth1_data.clone(),
        eth1_data_votes: mem::take(&mut pre.eth1_data_votes),
        eth1_deposit_index: pre.eth1_deposit_index,
        validators: mem::take(&mut pre.validators),
        balances: mem::take(&mut pre.balances),
        randao_mixes: mem::take(&mut pre.randao_mixes),
        slashings: mem::take(&mut pre.slashings),
        previous_epoch_participation: zero_participation.clone(),
        current_epoch_participation: zero_participation,
        justification_bits: pre.justification_bits.clone(),
        previous_justified_checkpoint: pre.previous_justified_checkpoint,
        current_justified_checkpoint: pre.current_justified_checkpoint,
        finalized_checkpoint: pre.finalized_checkpoint,
        inactivity_scores: VariableList::new(vec![0; validator_count])
            .map_err(|_| Error::Internal("inactivity list exceeds the registry limit".into()))?,
        current_sync_committee: placeholder_committee.clone(),
        next_sync_committee: placeholder_committee,
    };
    *state = BeaconState::Altair(post);

    // Replay the pending attestations into participation flags.
    for pending in previous_attestations.iter() {
        let flag_indices = get_attestation_participation_flag_indices(
            spec,
            state,
            &pending.data,
            pending.inclusion_delay,
        )?;
        let committee = epc.get_beacon_committee::<P>(pending.data.slot, pending.data.index)?;
        let attesters = committee
            .iter()
            .enumerate()
            .filter_map(|(position, &index)| {
                pending
                    .aggregation_bits
                    .get(position)
                    .ok()
                    .and_then(|bit| bit.then_some(index))
            })
            .collect::<Vec<_>>();

        let participation = state.previous_epoch_participation_mut()?;
        for index in attesters {
            for &flag_index in &flag_indices {
                let flags = &mut participation[index as usize];
                *flags = add_flag(*flags, flag_index);
            }
        }
    }

    // Both committees start out identical at the fork.
    let committee = Arc::new(get_next_sync_committee(spec, state)?);
    *state.current_sync_committee_mut()? = committee.clone();
    *state.next_sync_committee_mut()? = committee;
    Ok(())
}

pub fn upgrade_to_bellatrix<P: Preset>(spec: &Spec, state: &mut BeaconState<P>) -> Result<(), Error> {
    let epoch = state.current_epoch();
    let BeaconState::Altair(pre) = state else {
        return Err(Error::Internal("bellatrix upgrade expects an altair state".into()));
    };

    let post = bellatrix::BeaconState {
        genesis_time: pre.genesis_time,
        genesis_validators_root: pre.genesis_validators_root,
        slot: pre.slot,
        fork: Fork {
            previous_version: pre.fork.current_version,
            current_version: spec.bellatrix.bellatrix_fork_version,
            epoch,
        },
        latest_block_header: pre.latest_block_header.clone(),
        block_roots: mem::take(&mut pre.block_roots),
        state_roots: mem::take(&mut pre.state_roots),
        historical_roots: mem::take(&mut pre.historical_roots),
        eth1_data: pre.eth1_data.clone(),
        eth1_data_votes: mem::take(&mut pre.eth1_data_votes),
        eth1_deposit_index: pre.eth1_deposit_index,
        validators: mem::take(&mut pre.validators),
        balances: mem::take(&mut pre.balances),
        randao_mixes: mem::take(&mut pre.randao_mixes),
        slashings: mem::take(&mut pre.slashings),
        previous_epoch_participation: mem::take(&mut pre.previous_epoch_participation),
        current_epoch_participation: mem::take(&mut pre.current_epoch_participation),
        justification_bits: pre.justification_bits.clone(),
        previous_justified_checkpoint: pre.previous_justified_checkpoint,
        current_justified_checkpoint: pre.current_justified_checkpoint,
        finalized_checkpoint: pre.finalized_checkpoint,
        inactivity_scores: mem::take(&mut pre.inactivity_scores),
        current_sync_committee: pre.current_sync_committee.clone(),
        next_sync_committee: pre.next_sync_committee.clone(),
        latest_execution_payload_header: Default::default(),
    };
    *state = BeaconState::Bellatrix(post);
    Ok(())
}

pub fn upgrade_to_capella<P: Preset>(spec: &Spec, state: &mut BeaconState<P>) -> Result<(), Error> {
    let epoch = state.current_epoch();
    let BeaconState::Bellatrix(pre) = state else {
        return Err(Error::Internal("capella upgrade expects a bellatrix state".into()));
    };

    let header = &pre.latest_execution_payload_header;
    let latest_execution_payload_header = capella::ExecutionPayloadHeader {
        parent_hash: header.parent_hash,
        fee_recipient: header.fee_recipient,
        state_root: header.state_root,
        receipts_root: header.receipts_root,
        logs_bloom: header.logs_bloom.clone(),
        prev_randao: header.prev_randao,
        block_number: header.block_number,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        timestamp: header.timestamp,
        extra_data: header.extra_data.clone(),
        base_fee_per_gas: header.base_fee_per_gas,
        block_hash: header.block_hash,
        transactions_root: header.transactions_root,
        withdrawals_root: Default::default(),
    };

    let post = capella::BeaconState {
        genesis_time: pre.genesis_time,
        genesis_validators_root: pre.genesis_validators_root,
        slot: pre.slot,
        fork: Fork {
            previous_version: pre.fork.current_version,
            current_version: spec.capella.capella_fork_version,
            epoch,
        },
        latest_block_header: pre.latest_block_header.clone(),
        block_roots: mem::take(&mut pre.block_roots),
        state_roots: mem::take(&mut pre.state_roots),
        historical_roots: mem::take(&mut pre.historical_roots),
        eth1_data: pre.eth1_data.clone(),
        eth1_data_votes: mem::take(&mut pre.eth1_data_votes),
        eth1_deposit_index: pre.eth1_deposit_index,
        validators: mem::take(&mut pre.validators),
        balances: mem::take(&mut pre.balances),
        randao_mixes: mem::take(&mut pre.randao_mixes),
        slashings: mem::take(&mut pre.slashings),
        previous_epoch_participation: mem::take(&mut pre.previous_epoch_participation),
        current_epoch_participation: mem::take(&mut pre.current_epoch_participation),
        justification_bits: pre.justification_bits.clone(),
        previous_justified_checkpoint: pre.previous_justified_checkpoint,
        current_justified_checkpoint: pre.current_justified_checkpoint,
        finalized_checkpoint: pre.finalized_checkpoint,
        inactivity_scores: mem::take(&mut pre.inactivity_scores),
        current_sync_committee: pre.current_sync_committee.clone(),
        next_sync_committee: pre.next_sync_committee.clone(),
        latest_execution_payload_header,
        next_withdrawal_index: 0,
        next_withdrawal_validator_index: 0,
        historical_summaries: Default::default(),
    };
    *state = BeaconState::Capella(post);
    Ok(())
}

pub fn upgrade_to_deneb<P: Preset>(spec: &Spec, state: &mut BeaconState<P>) -> Result<(), Error> {
    let epoch = state.current_epoch();
    let BeaconState::Capella(pre) = state else {
        return Err(Error::Internal("deneb upgrade expects a capella state".into()));
    };

    let header = &pre.latest_execution_payload_header;
    let latest_execution_payload_header = deneb::ExecutionPayloadHeader {
        parent_hash: header.parent_hash,
        fee_recipient: header.fee_recipient,
        state_root: header.state_root,
        receipts_root: header.receipts_root,
        logs_bloom: header.logs_bloom.clone(),
        prev_randao: header.prev_randao,
        block_number: header.block_number,
        gas_limit: header.gas_limit,
        gas_used: header.gas_used,
        timestamp: header.timestamp,
        extra_data: header.extra_data.clone(),
        base_fee_per_gas: header.base_fee_per_gas,
        block_hash: header.block_hash,
        transactions_root: header.transactions_root,
        withdrawals_root: header.withdrawals_root,
        blob_gas_used: 0,
        excess_blob_gas: 0,
    };

    let post = deneb::BeaconState {
        genesis_time: pre.genesis_time,
        genesis_validators_root: pre.genesis_validators_root,
        slot: pre.slot,
        fork: Fork {
            previous_version: pre.fork.current_version,
            current_version: spec.deneb.deneb_fork_version,
            epoch,
        },
        latest_block_header: pre.latest_block_header.clone(),
        block_roots: mem::take(&mut pre.block_roots),
        state_roots: mem::take(&mut pre.state_roots),
        historical_roots: mem::take(&mut pre.historical_roots),
        eth1_data: pre.eth1_data.clone(),
        eth1_data_votes: mem::take(&mut pre.eth1_data_votes),
        eth1_deposit_index: pre.eth1_deposit_index,
        validators: mem::take(&mut pre.validators),
        balances: mem::take(&mut pre.balances),
        randao_mixes: mem::take(&mut pre.randao_mixes),
        slashings: mem::take(&mut pre.slashings),
        previous_epoch_participation: mem::take(&mut pre.previous_epoch_participation),
        current_epoch_participation: mem::take(&mut pre.current_epoch_participation),
        justification_bits: pre.justification_bits.clone(),
        previous_justified_checkpoint: pre.previous_justified_checkpoint,
        current_justified_checkpoint: pre.current_justified_checkpoint,
        finalized_checkpoint: pre.finalized_checkpoint,
        inactivity_scores: mem::take(&mut pre.inactivity_scores),
        current_sync_committee: pre.current_sync_committee.clone(),
        next_sync_committee: pre.next_sync_committee.clone(),
        latest_execution_payload_header,
        next_withdrawal_index: pre.next_withdrawal_index,
        next_withdrawal_validator_index: pre.next_withdrawal_validator_index,
        historical_summaries: mem::take(&mut pre.historical_summaries),
    };
    *state = BeaconState::Deneb(post);
    Ok(())
}

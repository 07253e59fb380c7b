use cairn_types::{
    BeaconState, Preset, SignedBeaconBlock, Spec,
    misc::compute_timestamp_at_slot,
};

use crate::{
    Error,
    error::ensure_rule,
    execution_engine::{ExecutionEngine, NewPayloadRequest, kzg_commitment_to_versioned_hash},
};

/// Validate the execution payload against the consensus state, hand it to
/// the execution engine, and install its header.
pub fn process_execution_payload<P: Preset>(
    spec: &Spec,
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
    engine: &dyn ExecutionEngine<P>,
) -> Result<(), Error> {
    let current_epoch = state.current_epoch();
    let randao_mix = state.get_randao_mix(current_epoch);
    let expected_timestamp = compute_timestamp_at_slot(spec, state.genesis_time(), state.slot());

    match (state, block) {
        (BeaconState::Bellatrix(state), SignedBeaconBlock::Bellatrix(block)) => {
            let payload = &block.message.body.execution_payload;
            let transition_complete =
                state.latest_execution_payload_header != Default::default();

            // Pre-merge blocks carry an empty payload and skip this step.
            if !transition_complete && *payload == Default::default() {
                return Ok(());
            }
            if transition_complete {
                ensure_rule!(
                    payload.parent_hash == state.latest_execution_payload_header.block_hash,
                    "payload parent hash does not extend the latest payload"
                );
            }
            ensure_rule!(
                payload.prev_randao == randao_mix,
                "payload prev_randao does not match the randao mix"
            );
            ensure_rule!(
                payload.timestamp == expected_timestamp,
                "payload timestamp {} does not match the slot ({expected_timestamp})",
                payload.timestamp
            );
            let valid = engine.notify_new_payload(NewPayloadRequest::Bellatrix(payload))?;
            ensure_rule!(valid, "execution engine rejected the payload");

            state.latest_execution_payload_header = payload.to_header();
        }
        (BeaconState::Capella(state), SignedBeaconBlock::Capella(block)) => {
            let payload = &block.message.body.execution_payload;
            ensure_rule!(
                payload.parent_hash == state.latest_execution_payload_header.block_hash,
                "payload parent hash does not extend the latest payload"
            );
            ensure_rule!(
                payload.prev_randao == randao_mix,
                "payload prev_randao does not match the randao mix"
            );
            ensure_rule!(
                payload.timestamp == expected_timestamp,
                "payload timestamp {} does not match the slot ({expected_timestamp})",
                payload.timestamp
            );
            let valid = engine.notify_new_payload(NewPayloadRequest::Capella(payload))?;
            ensure_rule!(valid, "execution engine rejected the payload");

            state.latest_execution_payload_header = payload.to_header();
        }
        (BeaconState::Deneb(state), SignedBeaconBlock::Deneb(block)) => {
            let payload = &block.message.body.execution_payload;
            let commitments = &block.message.body.blob_kzg_commitments;

            ensure_rule!(
                payload.parent_hash == state.latest_execution_payload_header.block_hash,
                "payload parent hash does not extend the latest payload"
            );
            ensure_rule!(
                payload.prev_randao == randao_mix,
                "payload prev_randao does not match the randao mix"
            );
            ensure_rule!(
                payload.timestamp == expected_timestamp,
                "payload timestamp {} does not match the slot ({expected_timestamp})",
                payload.timestamp
            );
            ensure_rule!(
                commitments.len() as u64 <= spec.deneb.max_blobs_per_block,
                "block commits to {} blobs, the maximum is {}",
                commitments.len(),
                spec.deneb.max_blobs_per_block
            );

            let versioned_hashes = commitments
                .iter()
                .map(|commitment| {
                    kzg_commitment_to_versioned_hash(commitment.iter().as_slice())
                })
                .collect();
            let valid = engine.notify_new_payload(NewPayloadRequest::Deneb {
                payload,
                versioned_hashes,
            })?;
            ensure_rule!(valid, "execution engine rejected the payload");

            state.latest_execution_payload_header = payload.to_header();
        }
        _ => {
            return Err(Error::Internal(
                "execution payload processing on a pre-Bellatrix state".into(),
            ));
        }
    }
    Ok(())
}

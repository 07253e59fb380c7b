//! Block-level processing in the order the protocol fixes: header, then the
//! execution-layer steps on the forks that have them, randao, eth1 data,
//! the operations loop, and the sync aggregate.

pub mod execution_payload;
pub mod operations;
pub mod sync_aggregate;
pub mod withdrawals;

use cairn_types::{
    BeaconState, Preset, Root, SignedBeaconBlock, Spec,
    constants::DOMAIN_RANDAO,
    misc::{compute_signing_root, xor},
    spec::ForkName,
};
use ethereum_hashing::hash;
use tree_hash::TreeHash;

use crate::{
    Cancel, Error, VerifySignatures,
    epochs_context::EpochsContext,
    error::{ensure_rule, ensure_signature},
    execution_engine::ExecutionEngine,
};

pub fn process_block<P: Preset>(
    spec: &Spec,
    epc: &mut EpochsContext,
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
    engine: &dyn ExecutionEngine<P>,
    verify: VerifySignatures,
    cancel: &Cancel,
) -> Result<(), Error> {
    ensure_rule!(
        state.fork_name() == block.fork_name(),
        "block fork {} does not match state fork {}",
        block.fork_name(),
        state.fork_name()
    );

    process_block_header(epc, state, block)?;
    if state.fork_name() >= ForkName::Capella {
        withdrawals::process_withdrawals(spec, state, block)?;
    }
    if state.fork_name() >= ForkName::Bellatrix {
        execution_payload::process_execution_payload(spec, state, block, engine)?;
    }
    process_randao(spec, epc, state, block.randao_reveal(), verify)?;
    process_eth1_data(state, block)?;
    operations::process_operations(spec, epc, state, block, verify, cancel)?;
    if state.fork_name() >= ForkName::Altair {
        sync_aggregate::process_sync_aggregate(spec, epc, state, block.sync_aggregate()?, verify)?;
    }
    Ok(())
}

pub fn process_block_header<P: Preset>(
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
) -> Result<(), Error> {
    // Verify that the slots match
    ensure_rule!(
        block.slot() == state.slot(),
        "block slot {} does not match state slot {}",
        block.slot(),
        state.slot()
    );
    // Verify that the block is newer than the latest block header
    ensure_rule!(
        block.slot() > state.latest_block_header().slot,
        "block slot {} is not newer than the latest header slot {}",
        block.slot(),
        state.latest_block_header().slot
    );
    // Verify that the proposer index is the correct index
    let expected_proposer = epc.get_beacon_proposer::<P>(block.slot())?;
    ensure_rule!(
        block.proposer_index() == expected_proposer,
        "block names proposer {}, slot belongs to {expected_proposer}",
        block.proposer_index()
    );
    // Verify that the parent matches
    let parent_root = state.latest_block_header().tree_hash_root();
    ensure_rule!(
        block.parent_root() == parent_root,
        "block parent root does not match the latest block header"
    );

    // Cache the current block as the new latest block. The state root is
    // zeroed here and filled in by the next slot advance.
    let mut header = block.block_header();
    header.state_root = Root::ZERO;
    *state.latest_block_header_mut() = header;

    // Verify the proposer is not slashed
    let proposer = state
        .validators()
        .get(block.proposer_index() as usize)
        .ok_or(Error::Internal(format!(
            "proposer {} missing from the registry",
            block.proposer_index()
        )))?;
    ensure_rule!(!proposer.slashed, "block proposer is slashed");

    Ok(())
}

pub fn process_randao<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
    randao_reveal: &cairn_bls::BlsSignature,
    verify: VerifySignatures,
) -> Result<(), Error> {
    let epoch = state.current_epoch();

    if verify.is_true() {
        let proposer_index = epc.get_beacon_proposer::<P>(state.slot())?;
        let proposer = &state.validators()[proposer_index as usize];
        let signing_root =
            compute_signing_root(&epoch, state.get_domain(DOMAIN_RANDAO, epoch));
        ensure_signature!(
            randao_reveal.verify(&proposer.pubkey, signing_root.as_slice())?,
            "randao reveal does not verify for epoch {epoch}"
        );
    }

    // Mix in the reveal
    let mix = xor(
        state.get_randao_mix(epoch).as_slice(),
        &hash(randao_reveal.to_bytes()),
    );
    state.randao_mixes_mut()[(epoch % P::epochs_per_historical_vector()) as usize] = mix;
    Ok(())
}

pub fn process_eth1_data<P: Preset>(
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
) -> Result<(), Error> {
    let eth1_data = block.eth1_data().clone();
    state
        .eth1_data_votes_mut()
        .push(eth1_data.clone())
        .map_err(|_| Error::Internal("eth1 vote list exceeded its voting period".into()))?;

    let votes = state
        .eth1_data_votes()
        .iter()
        .filter(|vote| **vote == eth1_data)
        .count() as u64;
    if votes * 2 > P::slots_per_eth1_voting_period() {
        tracing::debug!(deposit_count = eth1_data.deposit_count, "eth1 data adopted");
        *state.eth1_data_mut() = eth1_data;
    }
    Ok(())
}

/// Verify the proposer's signature over the block message.
pub fn verify_block_signature<P: Preset>(
    state: &BeaconState<P>,
    block: &SignedBeaconBlock<P>,
) -> Result<(), Error> {
    let proposer = state
        .validators()
        .get(block.proposer_index() as usize)
        .ok_or_else(|| Error::Rule(format!("unknown proposer {}", block.proposer_index())))?;

    let domain = state.get_domain(
        cairn_types::constants::DOMAIN_BEACON_PROPOSER,
        state.current_epoch(),
    );
    let signing_root = cairn_types::SigningData {
        object_root: block.message_tree_hash_root(),
        domain,
    }
    .tree_hash_root();

    ensure_signature!(
        block.signature().verify(&proposer.pubkey, signing_root.as_slice())?,
        "block signature does not verify"
    );
    Ok(())
}
